use actix_multipart::form::{bytes::Bytes, text::Text, MultipartForm};
use actix_web::{get, post, web, HttpResponse};

use crate::{
    app_state::AppState,
    errors::AppError,
    models::dto::{
        request::{
            ForgotPasswordRequest, LoginRequest, RegisterRequest, ResetPasswordRequest,
            VerifyTokenRequest,
        },
        response::ApiResponse,
    },
};

#[derive(MultipartForm)]
pub struct ReceiptForm {
    #[multipart(limit = "10MB")]
    pub receipt: Bytes,
    pub user_id: Text<i64>,
}

#[post("/login")]
pub async fn login(
    state: web::Data<AppState>,
    request: web::Json<LoginRequest>,
) -> Result<HttpResponse, AppError> {
    let response = state.auth_service.login(request.into_inner()).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::with_message(response, "Login successful")))
}

#[post("/register")]
pub async fn register(
    state: web::Data<AppState>,
    request: web::Json<RegisterRequest>,
) -> Result<HttpResponse, AppError> {
    let response = state.auth_service.register(request.into_inner()).await?;
    Ok(HttpResponse::Created().json(ApiResponse::with_message(
        response,
        "Registration successful. Please upload your payment receipt",
    )))
}

#[post("/verify-token")]
pub async fn verify_token(
    state: web::Data<AppState>,
    request: web::Json<VerifyTokenRequest>,
) -> Result<HttpResponse, AppError> {
    let user = state.auth_service.verify_token(&request.token).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::ok(user)))
}

#[post("/forgot-password")]
pub async fn forgot_password(
    state: web::Data<AppState>,
    request: web::Json<ForgotPasswordRequest>,
) -> Result<HttpResponse, AppError> {
    let issued = state.auth_service.forgot_password(request.into_inner()).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::with_message(
        issued,
        "Password reset token issued",
    )))
}

#[post("/reset-password")]
pub async fn reset_password(
    state: web::Data<AppState>,
    request: web::Json<ResetPasswordRequest>,
) -> Result<HttpResponse, AppError> {
    state.auth_service.reset_password(request.into_inner()).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::message("Password has been reset")))
}

#[post("/upload-receipt")]
pub async fn upload_receipt(
    state: web::Data<AppState>,
    MultipartForm(form): MultipartForm<ReceiptForm>,
) -> Result<HttpResponse, AppError> {
    let file_name = form.receipt.file_name.clone().unwrap_or_default();
    let uploaded = state
        .auth_service
        .upload_receipt(form.user_id.into_inner(), &file_name, &form.receipt.data)
        .await?;
    Ok(HttpResponse::Ok().json(ApiResponse::with_message(
        uploaded,
        "Receipt uploaded successfully",
    )))
}

#[get("/academic-years")]
pub async fn academic_years(state: web::Data<AppState>) -> Result<HttpResponse, AppError> {
    let years = state.catalog_service.list_years(true).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::ok(years)))
}

#[get("/subjects/{academic_year_id}")]
pub async fn subjects_for_year(
    state: web::Data<AppState>,
    academic_year_id: web::Path<i64>,
) -> Result<HttpResponse, AppError> {
    let subjects = state
        .catalog_service
        .public_subjects(academic_year_id.into_inner())
        .await?;
    Ok(HttpResponse::Ok().json(ApiResponse::ok(subjects)))
}
