// Reporte de frecuencia de emparejamientos (matriz estudiante x estudiante).
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::algorithm::PairingHistory;
use crate::models::{Student, StudentId};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RepeatedPair {
    pub a: StudentId,
    pub b: StudentId,
    pub count: u32,
}

#[derive(Debug, Clone, Serialize)]
pub struct PairingReport {
    pub generated_at: DateTime<Utc>,
    pub iterations: usize,
    pub students: Vec<Student>,
    /// Matriz simétrica en el orden de `students`; diagonal en 0.
    pub matrix: Vec<Vec<u32>>,
    pub pairs_seen: usize,
    pub total_pairs: usize,
    pub max_count: u32,
    /// Pares que coincidieron más de una vez, de mayor a menor.
    pub repeated_pairs: Vec<RepeatedPair>,
}

impl PairingReport {
    /// `students` debe estar en el mismo orden con que se creó el historial.
    pub fn build(students: &[Student], history: &PairingHistory, iterations: usize) -> Self {
        let n = students.len().min(history.len());
        let matrix: Vec<Vec<u32>> = (0..n).map(|i| (0..n).map(|j| history.count_at(i, j)).collect()).collect();

        let mut repeated_pairs = Vec::new();
        for i in 0..n {
            for j in (i + 1)..n {
                if matrix[i][j] > 1 {
                    repeated_pairs.push(RepeatedPair {
                        a: students[i].id.clone(),
                        b: students[j].id.clone(),
                        count: matrix[i][j],
                    });
                }
            }
        }
        repeated_pairs.sort_by(|x, y| y.count.cmp(&x.count).then_with(|| (&x.a, &x.b).cmp(&(&y.a, &y.b))));

        PairingReport {
            generated_at: Utc::now(),
            iterations,
            students: students[..n].to_vec(),
            matrix,
            pairs_seen: history.total_pairs_seen(),
            total_pairs: n * n.saturating_sub(1) / 2,
            max_count: history.max_count(),
            repeated_pairs,
        }
    }

    /// Tabla alineada con los nombres como encabezados de fila y columna.
    pub fn render_text(&self) -> String {
        let names: Vec<&str> = self.students.iter().map(|s| s.name.as_str()).collect();
        let label_w = names.iter().map(|s| s.chars().count()).max().unwrap_or(0);
        let cell_w = names
            .iter()
            .map(|s| s.chars().count())
            .chain(std::iter::once(self.max_count.to_string().len()))
            .max()
            .unwrap_or(1);

        let mut out = String::new();
        out.push_str("Group Pairing Frequency Matrix:\n");
        out.push_str(&format!("{:label_w$}", ""));
        for name in names.iter() {
            out.push_str(&format!(" {:>cell_w$}", name));
        }
        out.push('\n');
        for (i, row) in self.matrix.iter().enumerate() {
            out.push_str(&format!("{:<label_w$}", names[i]));
            for v in row.iter() {
                out.push_str(&format!(" {:>cell_w$}", v));
            }
            out.push('\n');
        }
        out.push_str(&format!(
            "\n{} iteraciones, {} de {} pares ya coincidieron, máximo {}\n",
            self.iterations, self.pairs_seen, self.total_pairs, self.max_count
        ));
        for p in self.repeated_pairs.iter() {
            out.push_str(&format!("  {} + {}: {} veces\n", p.a, p.b, p.count));
        }
        out
    }
}
