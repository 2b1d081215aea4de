pub mod admin_handler;
pub mod auth_handler;
pub mod content_handler;
pub mod health_handler;
pub mod me_handler;

use actix_multipart::{form::MultipartFormConfig, MultipartError};
use actix_web::{error::JsonPayloadError, web, HttpRequest};

use crate::{auth::AuthMiddleware, errors::AppError};

pub use health_handler::{health_check, health_check_live, health_check_ready};

const MAX_RECEIPT_BYTES: usize = 10 * 1024 * 1024;

/// Malformed bodies answer with the usual JSON envelope instead of actix's plain text.
pub fn json_config() -> web::JsonConfig {
    web::JsonConfig::default().error_handler(|err: JsonPayloadError, _req: &HttpRequest| {
        AppError::ValidationError(format!("Invalid request body: {}", err)).into()
    })
}

pub fn multipart_config() -> MultipartFormConfig {
    MultipartFormConfig::default()
        .total_limit(MAX_RECEIPT_BYTES + 64 * 1024)
        .memory_limit(MAX_RECEIPT_BYTES)
        .error_handler(|err: MultipartError, _req: &HttpRequest| {
            AppError::ValidationError(format!("Invalid upload: {}", err)).into()
        })
}

/// Registers every route. Everything outside `/api/auth` and the health probes needs a bearer token.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(health_check)
        .service(health_check_live)
        .service(health_check_ready)
        .service(
            web::scope("/api/auth")
                .service(auth_handler::login)
                .service(auth_handler::register)
                .service(auth_handler::verify_token)
                .service(auth_handler::forgot_password)
                .service(auth_handler::reset_password)
                .service(auth_handler::upload_receipt)
                .service(auth_handler::academic_years)
                .service(auth_handler::subjects_for_year),
        )
        .service(
            web::scope("/api/content")
                .wrap(AuthMiddleware)
                .service(content_handler::my_subjects)
                .service(content_handler::subject_lessons)
                .service(content_handler::subject_exams)
                .service(content_handler::lesson_detail)
                .service(content_handler::update_progress)
                .service(content_handler::exam_detail)
                .service(content_handler::submit_exam)
                .service(content_handler::exam_attempts),
        )
        .service(
            web::scope("/api/me")
                .wrap(AuthMiddleware)
                .service(me_handler::my_profile)
                .service(me_handler::list_notifications)
                .service(me_handler::unread_count)
                .service(me_handler::mark_all_read)
                .service(me_handler::mark_read)
                .service(me_handler::mark_unread)
                .service(me_handler::delete_notification)
                .service(me_handler::delete_all_notifications),
        )
        .service(
            web::scope("/api/admin")
                .wrap(AuthMiddleware)
                .service(admin_handler::dashboard_stats)
                .service(admin_handler::list_students)
                .service(admin_handler::toggle_student_status)
                .service(admin_handler::user_profile)
                .service(admin_handler::students_report)
                .service(admin_handler::list_subscription_requests)
                .service(admin_handler::approve_request)
                .service(admin_handler::reject_request)
                .service(admin_handler::list_academic_years)
                .service(admin_handler::create_academic_year)
                .service(admin_handler::list_subjects)
                .service(admin_handler::create_subject)
                .service(admin_handler::update_subject)
                .service(admin_handler::delete_subject)
                .service(admin_handler::list_lessons)
                .service(admin_handler::create_lesson)
                .service(admin_handler::update_lesson)
                .service(admin_handler::delete_lesson)
                .service(admin_handler::list_exams)
                .service(admin_handler::create_exam)
                .service(admin_handler::update_exam)
                .service(admin_handler::delete_exam)
                .service(admin_handler::list_questions)
                .service(admin_handler::create_question)
                .service(admin_handler::update_question)
                .service(admin_handler::delete_question)
                .service(admin_handler::create_answer)
                .service(admin_handler::update_answer)
                .service(admin_handler::delete_answer),
        );
}
