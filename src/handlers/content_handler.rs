use actix_web::{get, post, web, HttpResponse};

use crate::{
    app_state::AppState,
    auth::CurrentUser,
    errors::AppError,
    models::dto::{
        request::{ExamSubmissionRequest, ProgressUpdateRequest},
        response::ApiResponse,
    },
};

#[get("/subjects")]
pub async fn my_subjects(
    state: web::Data<AppState>,
    user: CurrentUser,
) -> Result<HttpResponse, AppError> {
    let subjects = state.content_service.subjects_for(user.0.id).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::ok(subjects)))
}

#[get("/subjects/{id}/lessons")]
pub async fn subject_lessons(
    state: web::Data<AppState>,
    subject_id: web::Path<i64>,
    user: CurrentUser,
) -> Result<HttpResponse, AppError> {
    let lessons = state
        .content_service
        .lessons_for(user.0.id, subject_id.into_inner())
        .await?;
    Ok(HttpResponse::Ok().json(ApiResponse::ok(lessons)))
}

#[get("/lessons/{id}")]
pub async fn lesson_detail(
    state: web::Data<AppState>,
    lesson_id: web::Path<i64>,
    user: CurrentUser,
) -> Result<HttpResponse, AppError> {
    let lesson = state
        .content_service
        .lesson_detail(user.0.id, lesson_id.into_inner())
        .await?;
    Ok(HttpResponse::Ok().json(ApiResponse::ok(lesson)))
}

#[post("/lessons/{id}/progress")]
pub async fn update_progress(
    state: web::Data<AppState>,
    lesson_id: web::Path<i64>,
    request: web::Json<ProgressUpdateRequest>,
    user: CurrentUser,
) -> Result<HttpResponse, AppError> {
    let progress = state
        .progress_service
        .update(user.0.id, lesson_id.into_inner(), request.into_inner())
        .await?;
    Ok(HttpResponse::Ok().json(ApiResponse::with_message(progress, "Progress updated")))
}

#[get("/subjects/{id}/exams")]
pub async fn subject_exams(
    state: web::Data<AppState>,
    subject_id: web::Path<i64>,
    user: CurrentUser,
) -> Result<HttpResponse, AppError> {
    let exams = state
        .exam_service
        .list_for_subject(user.0.id, subject_id.into_inner())
        .await?;
    Ok(HttpResponse::Ok().json(ApiResponse::ok(exams)))
}

#[get("/exams/{id}")]
pub async fn exam_detail(
    state: web::Data<AppState>,
    exam_id: web::Path<i64>,
    user: CurrentUser,
) -> Result<HttpResponse, AppError> {
    let exam = state
        .exam_service
        .present(user.0.id, exam_id.into_inner())
        .await?;
    Ok(HttpResponse::Ok().json(ApiResponse::ok(exam)))
}

#[post("/exams/{id}/submit")]
pub async fn submit_exam(
    state: web::Data<AppState>,
    exam_id: web::Path<i64>,
    request: web::Json<ExamSubmissionRequest>,
    user: CurrentUser,
) -> Result<HttpResponse, AppError> {
    let result = state
        .exam_service
        .submit(user.0.id, exam_id.into_inner(), request.into_inner())
        .await?;
    Ok(HttpResponse::Ok().json(ApiResponse::with_message(result, "Exam submitted")))
}

#[get("/exams/{id}/attempts")]
pub async fn exam_attempts(
    state: web::Data<AppState>,
    exam_id: web::Path<i64>,
    user: CurrentUser,
) -> Result<HttpResponse, AppError> {
    let attempts = state
        .exam_service
        .attempts(user.0.id, exam_id.into_inner())
        .await?;
    Ok(HttpResponse::Ok().json(ApiResponse::ok(attempts)))
}
