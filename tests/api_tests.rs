mod common;

use actix_web::{http::StatusCode, test, web, App};
use serde_json::{json, Value};

use common::app;
use nursopedia_server::{
    app_state::AppState,
    handlers::{configure, json_config},
    models::{
        domain::User,
        dto::request::{CreateAcademicYearRequest, CreateSubjectRequest},
    },
    repositories::UserRepository,
    services::password::hash_password,
};

async fn seed_catalog(state: &AppState) {
    let year = state
        .catalog_service
        .create_year(CreateAcademicYearRequest {
            name: "First Year".to_string(),
            description: None,
        })
        .await
        .unwrap();
    for (name, price) in [("Anatomy", 100.0), ("Physiology", 100.0)] {
        state
            .catalog_service
            .create_subject(CreateSubjectRequest {
                name: name.to_string(),
                description: None,
                academic_year_id: year.id,
                price,
            })
            .await
            .unwrap();
    }
}

#[actix_web::test]
async fn test_content_requires_token() {
    let (state, _store) = app();
    let app = test::init_service(
        App::new()
            .app_data(web::Data::new(state))
            .app_data(json_config())
            .configure(configure),
    )
    .await;

    let req = test::TestRequest::get().uri("/api/content/subjects").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["success"], false);
    assert_eq!(body["message"], "Missing authorization header");

    let req = test::TestRequest::get()
        .uri("/api/me/notifications")
        .insert_header(("Authorization", "Bearer not-a-token"))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

#[actix_web::test]
async fn test_student_cannot_reach_admin_routes() {
    let (state, store) = app();
    let mut student = User::new_student(
        "nurse_amal",
        "amal@example.com",
        &hash_password("nursing123").unwrap(),
        "Amal Hassan",
        "01012345678",
    );
    student.is_active = true;
    let student = UserRepository::create(store.as_ref(), student).await.unwrap();
    let token = state.jwt.create_token(&student).unwrap();

    let app = test::init_service(
        App::new()
            .app_data(web::Data::new(state))
            .app_data(json_config())
            .configure(configure),
    )
    .await;

    let req = test::TestRequest::get()
        .uri("/api/admin/dashboard/stats")
        .insert_header(("Authorization", format!("Bearer {}", token)))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);

    let req = test::TestRequest::get()
        .uri("/api/content/subjects")
        .insert_header(("Authorization", format!("Bearer {}", token)))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["success"], true);
    assert_eq!(body["data"], json!([]));

    let req = test::TestRequest::post()
        .uri("/api/me/notifications/read-all")
        .insert_header(("Authorization", format!("Bearer {}", token)))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["data"]["unread_count"], 0);

    let req = test::TestRequest::get()
        .uri("/api/me/notifications/unread-count")
        .insert_header(("Authorization", format!("Bearer {}", token)))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["data"]["unread_count"], 0);
}

#[actix_web::test]
async fn test_register_over_http() {
    let (state, _store) = app();
    seed_catalog(&state).await;
    let app = test::init_service(
        App::new()
            .app_data(web::Data::new(state))
            .app_data(json_config())
            .configure(configure),
    )
    .await;

    let req = test::TestRequest::post()
        .uri("/api/auth/register")
        .set_json(json!({
            "username": "nurse_amal",
            "email": "amal@example.com",
            "password": "nursing123",
            "full_name": "Amal Hassan",
            "phone_number": "01012345678",
            "academic_year_id": 1,
            "selected_subjects": [1, 2]
        }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::CREATED);

    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["success"], true);
    assert_eq!(body["data"]["total_amount"], 200.0);
    assert_eq!(body["data"]["discount_applied"], false);

    let req = test::TestRequest::post()
        .uri("/api/auth/login")
        .set_json(json!({ "username": "nurse_amal", "password": "nursing123" }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

#[actix_web::test]
async fn test_malformed_body_uses_envelope() {
    let (state, _store) = app();
    let app = test::init_service(
        App::new()
            .app_data(web::Data::new(state))
            .app_data(json_config())
            .configure(configure),
    )
    .await;

    let req = test::TestRequest::post()
        .uri("/api/auth/login")
        .insert_header(("Content-Type", "application/json"))
        .set_payload("{not json")
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["success"], false);
}

#[actix_web::test]
async fn test_public_subject_listing() {
    let (state, _store) = app();
    seed_catalog(&state).await;
    let app = test::init_service(
        App::new()
            .app_data(web::Data::new(state))
            .configure(configure),
    )
    .await;

    let req = test::TestRequest::get().uri("/api/auth/subjects/1").to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["data"].as_array().map(Vec::len), Some(2));

    let req = test::TestRequest::get().uri("/api/auth/subjects/9").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);

    let req = test::TestRequest::get().uri("/health/ready").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::SERVICE_UNAVAILABLE);
}
