use groupshift::PairingHistory;
use groupshift::models::Student;
use groupshift::report::PairingReport;

fn roster() -> Vec<Student> {
    vec![
        Student::new("a1", "Ana"),
        Student::new("b2", "Benjamín"),
        Student::new("c3", "Carla"),
        Student::new("d4", "Diego"),
    ]
}

#[test]
fn test_matrix_is_symmetric_with_zero_diagonal() {
    let students = roster();
    let mut h = PairingHistory::new(&students).unwrap();
    h.increment_group(&["a1", "b2", "c3"]).unwrap();
    h.increment_group(&["a1", "b2", "d4"]).unwrap();

    let report = PairingReport::build(&students, &h, 2);
    assert_eq!(report.matrix.len(), 4);
    for i in 0..4 {
        assert_eq!(report.matrix[i][i], 0);
        for j in 0..4 {
            assert_eq!(report.matrix[i][j], report.matrix[j][i]);
        }
    }
    assert_eq!(report.matrix[0][1], 2);
    assert_eq!(report.matrix[2][3], 0);
    assert_eq!(report.total_pairs, 6);
    assert_eq!(report.pairs_seen, 5);
    assert_eq!(report.max_count, 2);
}

#[test]
fn test_repeated_pairs_sorted_by_count() {
    let students = roster();
    let mut h = PairingHistory::new(&students).unwrap();
    for _ in 0..3 {
        h.increment_group(&["c3", "d4"]).unwrap();
    }
    h.increment_group(&["a1", "b2"]).unwrap();
    h.increment_group(&["a1", "b2"]).unwrap();
    h.increment_group(&["a1", "c3"]).unwrap();

    let report = PairingReport::build(&students, &h, 6);
    let pairs: Vec<(&str, &str, u32)> =
        report.repeated_pairs.iter().map(|p| (p.a.as_str(), p.b.as_str(), p.count)).collect();
    assert_eq!(pairs, vec![("c3", "d4", 3), ("a1", "b2", 2)], "sólo pares con más de una coincidencia");
}

#[test]
fn test_render_text_has_names_and_counts() {
    let students = roster();
    let mut h = PairingHistory::new(&students).unwrap();
    h.increment_group(&["a1", "d4"]).unwrap();
    let text = PairingReport::build(&students, &h, 1).render_text();

    assert!(text.starts_with("Group Pairing Frequency Matrix:\n"));
    for name in ["Ana", "Benjamín", "Carla", "Diego"] {
        assert!(text.contains(name), "falta {} en:\n{}", name, text);
    }
    // fila de Ana: 0 con ella misma y 1 con Diego al final
    let ana_row = text.lines().find(|l| l.starts_with("Ana")).unwrap();
    let values: Vec<&str> = ana_row.split_whitespace().skip(1).collect();
    assert_eq!(values, vec!["0", "0", "0", "1"]);
}

#[test]
fn test_report_serializes_to_json() {
    let students = roster();
    let h = PairingHistory::new(&students).unwrap();
    let json = serde_json::to_value(PairingReport::build(&students, &h, 0)).unwrap();
    assert_eq!(json["iterations"], 0);
    assert_eq!(json["students"][1]["id"], "b2");
    assert_eq!(json["matrix"][3][3], 0);
}
