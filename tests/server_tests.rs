use actix_web::{App, http::StatusCode, test, web};
use serde_json::{Value, json};
use tempfile::{TempDir, tempdir};

use groupshift::GroupingConfig;
use groupshift::excel::SpreadsheetRoster;
use groupshift::models::Student;
use groupshift::server::{AppState, configure};

fn setup(n: usize) -> (TempDir, GroupingConfig) {
    let dir = tempdir().unwrap();
    let students: Vec<Student> = (1..=n).map(|i| Student::new(i.to_string(), format!("Estudiante {}", i))).collect();
    SpreadsheetRoster::create(dir.path().join("curso.xlsx"), &students).unwrap();
    let mut cfg = GroupingConfig::default();
    cfg.roster_dir = dir.path().to_path_buf();
    cfg.search.workers = 1;
    (dir, cfg)
}

#[actix_web::test]
async fn test_help_lists_endpoints() {
    let (_dir, cfg) = setup(3);
    let app = test::init_service(App::new().app_data(web::Data::new(AppState::new(cfg))).configure(configure)).await;
    let resp = test::call_service(&app, test::TestRequest::get().uri("/help").to_request()).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = test::read_body_json(resp).await;
    assert!(body["endpoints"]["POST /iterations/next"].is_string());
    assert_eq!(body["group_labels"][0], "cedar");
}

#[actix_web::test]
async fn test_next_iteration_records_groups() {
    let (_dir, cfg) = setup(11);
    let app = test::init_service(App::new().app_data(web::Data::new(AppState::new(cfg))).configure(configure)).await;

    let req = test::TestRequest::post()
        .uri("/iterations/next")
        .set_json(json!({"roster": "curso.xlsx", "seed": 9}))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["iteration"], 1);
    assert_eq!(body["recorded"], true);
    assert_eq!(body["assignment"]["groups"].as_array().map(|g| g.len()), Some(3));

    let report = test::TestRequest::get().uri("/report?roster=curso.xlsx").to_request();
    let resp = test::call_service(&app, report).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["iterations"], 1);
    assert_eq!(body["pairs_seen"], 15);
}

#[actix_web::test]
async fn test_infeasible_class_is_unprocessable() {
    let (_dir, cfg) = setup(5);
    let app = test::init_service(App::new().app_data(web::Data::new(AppState::new(cfg))).configure(configure)).await;
    let req = test::TestRequest::post()
        .uri("/iterations/next")
        .set_json(json!({"roster": "curso.xlsx"}))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["kind"], "class_size_infeasible");
}

#[actix_web::test]
async fn test_bad_roster_paths_are_rejected() {
    let (_dir, cfg) = setup(3);
    let app = test::init_service(App::new().app_data(web::Data::new(AppState::new(cfg))).configure(configure)).await;

    let req = test::TestRequest::post()
        .uri("/iterations/next")
        .set_json(json!({"roster": "../curso.xlsx"}))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::BAD_REQUEST);

    let req = test::TestRequest::get().uri("/report").to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::BAD_REQUEST);

    let req = test::TestRequest::get().uri("/report?roster=no_existe.xlsx").to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::BAD_REQUEST);
}

#[actix_web::test]
async fn test_write_failure_is_server_error() {
    let (dir, cfg) = setup(6);
    // un directorio en lugar del archivo temporal hace fallar la escritura
    std::fs::create_dir(dir.path().join("curso.xlsx.tmp")).unwrap();
    let app = test::init_service(App::new().app_data(web::Data::new(AppState::new(cfg))).configure(configure)).await;
    let req = test::TestRequest::post()
        .uri("/iterations/next")
        .set_json(json!({"roster": "curso.xlsx", "seed": 1}))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["kind"], "io");
}

#[actix_web::test]
async fn test_clashing_labels_are_unprocessable() {
    let (_dir, mut cfg) = setup(6);
    cfg.labels = groupshift::roster::GroupLabels::new(["oak", "OAK"]);
    let app = test::init_service(App::new().app_data(web::Data::new(AppState::new(cfg))).configure(configure)).await;
    let req = test::TestRequest::post()
        .uri("/iterations/next")
        .set_json(json!({"roster": "curso.xlsx"}))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["kind"], "invalid_labels");
}
