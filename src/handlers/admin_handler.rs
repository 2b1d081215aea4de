use actix_web::{delete, get, post, put, web, HttpResponse};
use serde::Deserialize;

use crate::{
    app_state::AppState,
    auth::AdminUser,
    errors::AppError,
    models::dto::{
        request::{
            CreateAcademicYearRequest, CreateAnswerRequest, CreateExamRequest,
            CreateLessonRequest, CreateQuestionRequest, CreateSubjectRequest, ListQuery,
            ReviewRequest, UpdateAnswerRequest, UpdateExamRequest, UpdateLessonRequest,
            UpdateQuestionRequest, UpdateSubjectRequest,
        },
        response::ApiResponse,
    },
};

#[derive(Debug, Deserialize)]
pub struct SubjectFilter {
    pub academic_year_id: Option<i64>,
}

#[get("/dashboard/stats")]
pub async fn dashboard_stats(
    state: web::Data<AppState>,
    _admin: AdminUser,
) -> Result<HttpResponse, AppError> {
    let stats = state.profile_service.dashboard().await?;
    Ok(HttpResponse::Ok().json(ApiResponse::ok(stats)))
}

#[get("/students")]
pub async fn list_students(
    state: web::Data<AppState>,
    query: web::Query<ListQuery>,
    _admin: AdminUser,
) -> Result<HttpResponse, AppError> {
    let students = state.profile_service.list_students(&query).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::ok(students)))
}

#[post("/students/{id}/toggle-status")]
pub async fn toggle_student_status(
    state: web::Data<AppState>,
    student_id: web::Path<i64>,
    _admin: AdminUser,
) -> Result<HttpResponse, AppError> {
    let student = state
        .profile_service
        .toggle_student(student_id.into_inner())
        .await?;
    let message = if student.is_active {
        "Student activated"
    } else {
        "Student deactivated"
    };
    Ok(HttpResponse::Ok().json(ApiResponse::with_message(student, message)))
}

#[get("/users/{id}/profile")]
pub async fn user_profile(
    state: web::Data<AppState>,
    user_id: web::Path<i64>,
    _admin: AdminUser,
) -> Result<HttpResponse, AppError> {
    let profile = state.profile_service.student_profile(user_id.into_inner()).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::ok(profile)))
}

#[get("/reports/students")]
pub async fn students_report(
    state: web::Data<AppState>,
    _admin: AdminUser,
) -> Result<HttpResponse, AppError> {
    let report = state.profile_service.students_report().await?;
    Ok(HttpResponse::Ok().json(ApiResponse::ok(report)))
}

#[get("/subscription-requests")]
pub async fn list_subscription_requests(
    state: web::Data<AppState>,
    query: web::Query<ListQuery>,
    _admin: AdminUser,
) -> Result<HttpResponse, AppError> {
    let requests = state.subscription_service.list_requests(&query).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::ok(requests)))
}

#[post("/subscription-requests/{id}/approve")]
pub async fn approve_request(
    state: web::Data<AppState>,
    request_id: web::Path<i64>,
    review: Option<web::Json<ReviewRequest>>,
    admin: AdminUser,
) -> Result<HttpResponse, AppError> {
    let notes = review.and_then(|r| r.into_inner().notes);
    let request = state
        .subscription_service
        .approve(request_id.into_inner(), &admin.0, notes)
        .await?;
    Ok(HttpResponse::Ok().json(ApiResponse::with_message(
        request,
        "Subscription request approved",
    )))
}

#[post("/subscription-requests/{id}/reject")]
pub async fn reject_request(
    state: web::Data<AppState>,
    request_id: web::Path<i64>,
    review: Option<web::Json<ReviewRequest>>,
    admin: AdminUser,
) -> Result<HttpResponse, AppError> {
    let notes = review.and_then(|r| r.into_inner().notes);
    let request = state
        .subscription_service
        .reject(request_id.into_inner(), &admin.0, notes)
        .await?;
    Ok(HttpResponse::Ok().json(ApiResponse::with_message(
        request,
        "Subscription request rejected",
    )))
}

#[get("/academic-years")]
pub async fn list_academic_years(
    state: web::Data<AppState>,
    _admin: AdminUser,
) -> Result<HttpResponse, AppError> {
    let years = state.catalog_service.list_years(false).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::ok(years)))
}

#[post("/academic-years")]
pub async fn create_academic_year(
    state: web::Data<AppState>,
    request: web::Json<CreateAcademicYearRequest>,
    _admin: AdminUser,
) -> Result<HttpResponse, AppError> {
    let year = state.catalog_service.create_year(request.into_inner()).await?;
    Ok(HttpResponse::Created().json(ApiResponse::ok(year)))
}

#[get("/subjects")]
pub async fn list_subjects(
    state: web::Data<AppState>,
    filter: web::Query<SubjectFilter>,
    _admin: AdminUser,
) -> Result<HttpResponse, AppError> {
    let subjects = state
        .catalog_service
        .list_subjects(filter.academic_year_id)
        .await?;
    Ok(HttpResponse::Ok().json(ApiResponse::ok(subjects)))
}

#[post("/subjects")]
pub async fn create_subject(
    state: web::Data<AppState>,
    request: web::Json<CreateSubjectRequest>,
    _admin: AdminUser,
) -> Result<HttpResponse, AppError> {
    let subject = state.catalog_service.create_subject(request.into_inner()).await?;
    Ok(HttpResponse::Created().json(ApiResponse::ok(subject)))
}

#[put("/subjects/{id}")]
pub async fn update_subject(
    state: web::Data<AppState>,
    subject_id: web::Path<i64>,
    request: web::Json<UpdateSubjectRequest>,
    _admin: AdminUser,
) -> Result<HttpResponse, AppError> {
    let subject = state
        .catalog_service
        .update_subject(subject_id.into_inner(), request.into_inner())
        .await?;
    Ok(HttpResponse::Ok().json(ApiResponse::ok(subject)))
}

#[delete("/subjects/{id}")]
pub async fn delete_subject(
    state: web::Data<AppState>,
    subject_id: web::Path<i64>,
    _admin: AdminUser,
) -> Result<HttpResponse, AppError> {
    state
        .catalog_service
        .delete_subject(subject_id.into_inner())
        .await?;
    Ok(HttpResponse::Ok().json(ApiResponse::message("Subject deleted")))
}

#[get("/subjects/{id}/lessons")]
pub async fn list_lessons(
    state: web::Data<AppState>,
    subject_id: web::Path<i64>,
    _admin: AdminUser,
) -> Result<HttpResponse, AppError> {
    let lessons = state
        .catalog_service
        .list_lessons(subject_id.into_inner())
        .await?;
    Ok(HttpResponse::Ok().json(ApiResponse::ok(lessons)))
}

#[post("/lessons")]
pub async fn create_lesson(
    state: web::Data<AppState>,
    request: web::Json<CreateLessonRequest>,
    _admin: AdminUser,
) -> Result<HttpResponse, AppError> {
    let lesson = state.catalog_service.create_lesson(request.into_inner()).await?;
    Ok(HttpResponse::Created().json(ApiResponse::ok(lesson)))
}

#[put("/lessons/{id}")]
pub async fn update_lesson(
    state: web::Data<AppState>,
    lesson_id: web::Path<i64>,
    request: web::Json<UpdateLessonRequest>,
    _admin: AdminUser,
) -> Result<HttpResponse, AppError> {
    let lesson = state
        .catalog_service
        .update_lesson(lesson_id.into_inner(), request.into_inner())
        .await?;
    Ok(HttpResponse::Ok().json(ApiResponse::ok(lesson)))
}

#[delete("/lessons/{id}")]
pub async fn delete_lesson(
    state: web::Data<AppState>,
    lesson_id: web::Path<i64>,
    _admin: AdminUser,
) -> Result<HttpResponse, AppError> {
    state
        .catalog_service
        .delete_lesson(lesson_id.into_inner())
        .await?;
    Ok(HttpResponse::Ok().json(ApiResponse::message("Lesson deleted")))
}

#[get("/lessons/{id}/exams")]
pub async fn list_exams(
    state: web::Data<AppState>,
    lesson_id: web::Path<i64>,
    _admin: AdminUser,
) -> Result<HttpResponse, AppError> {
    let exams = state
        .catalog_service
        .list_exams(lesson_id.into_inner())
        .await?;
    Ok(HttpResponse::Ok().json(ApiResponse::ok(exams)))
}

#[post("/exams")]
pub async fn create_exam(
    state: web::Data<AppState>,
    request: web::Json<CreateExamRequest>,
    _admin: AdminUser,
) -> Result<HttpResponse, AppError> {
    let exam = state.catalog_service.create_exam(request.into_inner()).await?;
    Ok(HttpResponse::Created().json(ApiResponse::ok(exam)))
}

#[put("/exams/{id}")]
pub async fn update_exam(
    state: web::Data<AppState>,
    exam_id: web::Path<i64>,
    request: web::Json<UpdateExamRequest>,
    _admin: AdminUser,
) -> Result<HttpResponse, AppError> {
    let exam = state
        .catalog_service
        .update_exam(exam_id.into_inner(), request.into_inner())
        .await?;
    Ok(HttpResponse::Ok().json(ApiResponse::ok(exam)))
}

#[delete("/exams/{id}")]
pub async fn delete_exam(
    state: web::Data<AppState>,
    exam_id: web::Path<i64>,
    _admin: AdminUser,
) -> Result<HttpResponse, AppError> {
    state.catalog_service.delete_exam(exam_id.into_inner()).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::message("Exam deleted")))
}

#[get("/exams/{id}/questions")]
pub async fn list_questions(
    state: web::Data<AppState>,
    exam_id: web::Path<i64>,
    _admin: AdminUser,
) -> Result<HttpResponse, AppError> {
    let questions = state
        .catalog_service
        .list_questions(exam_id.into_inner())
        .await?;
    Ok(HttpResponse::Ok().json(ApiResponse::ok(questions)))
}

#[post("/questions")]
pub async fn create_question(
    state: web::Data<AppState>,
    request: web::Json<CreateQuestionRequest>,
    _admin: AdminUser,
) -> Result<HttpResponse, AppError> {
    let question = state
        .catalog_service
        .create_question(request.into_inner())
        .await?;
    Ok(HttpResponse::Created().json(ApiResponse::ok(question)))
}

#[put("/questions/{id}")]
pub async fn update_question(
    state: web::Data<AppState>,
    question_id: web::Path<i64>,
    request: web::Json<UpdateQuestionRequest>,
    _admin: AdminUser,
) -> Result<HttpResponse, AppError> {
    let question = state
        .catalog_service
        .update_question(question_id.into_inner(), request.into_inner())
        .await?;
    Ok(HttpResponse::Ok().json(ApiResponse::ok(question)))
}

#[delete("/questions/{id}")]
pub async fn delete_question(
    state: web::Data<AppState>,
    question_id: web::Path<i64>,
    _admin: AdminUser,
) -> Result<HttpResponse, AppError> {
    state
        .catalog_service
        .delete_question(question_id.into_inner())
        .await?;
    Ok(HttpResponse::Ok().json(ApiResponse::message("Question deleted")))
}

#[post("/answers")]
pub async fn create_answer(
    state: web::Data<AppState>,
    request: web::Json<CreateAnswerRequest>,
    _admin: AdminUser,
) -> Result<HttpResponse, AppError> {
    let answer = state.catalog_service.create_answer(request.into_inner()).await?;
    Ok(HttpResponse::Created().json(ApiResponse::ok(answer)))
}

#[put("/answers/{id}")]
pub async fn update_answer(
    state: web::Data<AppState>,
    answer_id: web::Path<i64>,
    request: web::Json<UpdateAnswerRequest>,
    _admin: AdminUser,
) -> Result<HttpResponse, AppError> {
    let answer = state
        .catalog_service
        .update_answer(answer_id.into_inner(), request.into_inner())
        .await?;
    Ok(HttpResponse::Ok().json(ApiResponse::ok(answer)))
}

#[delete("/answers/{id}")]
pub async fn delete_answer(
    state: web::Data<AppState>,
    answer_id: web::Path<i64>,
    _admin: AdminUser,
) -> Result<HttpResponse, AppError> {
    state
        .catalog_service
        .delete_answer(answer_id.into_inner())
        .await?;
    Ok(HttpResponse::Ok().json(ApiResponse::message("Answer deleted")))
}
