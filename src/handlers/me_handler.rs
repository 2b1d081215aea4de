use actix_web::{delete, get, post, web, HttpResponse};

use crate::{
    app_state::AppState,
    auth::CurrentUser,
    errors::AppError,
    models::dto::response::{ApiResponse, UnreadCount},
};

#[get("/profile")]
pub async fn my_profile(
    state: web::Data<AppState>,
    user: CurrentUser,
) -> Result<HttpResponse, AppError> {
    let profile = state.profile_service.profile(user.0).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::ok(profile)))
}

#[get("/notifications")]
pub async fn list_notifications(
    state: web::Data<AppState>,
    user: CurrentUser,
) -> Result<HttpResponse, AppError> {
    let notifications = state.notification_service.list(user.0.id).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::ok(notifications)))
}

#[get("/notifications/unread-count")]
pub async fn unread_count(
    state: web::Data<AppState>,
    user: CurrentUser,
) -> Result<HttpResponse, AppError> {
    let unread = state.notification_service.unread_count(user.0.id).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::ok(UnreadCount { unread_count: unread })))
}

#[post("/notifications/read-all")]
pub async fn mark_all_read(
    state: web::Data<AppState>,
    user: CurrentUser,
) -> Result<HttpResponse, AppError> {
    let remaining = state.notification_service.mark_all_read(user.0.id).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::ok(UnreadCount { unread_count: remaining })))
}

#[post("/notifications/{id}/read")]
pub async fn mark_read(
    state: web::Data<AppState>,
    notification_id: web::Path<i64>,
    user: CurrentUser,
) -> Result<HttpResponse, AppError> {
    state
        .notification_service
        .set_read(user.0.id, notification_id.into_inner(), true)
        .await?;
    Ok(HttpResponse::Ok().json(ApiResponse::message("Notification marked as read")))
}

#[post("/notifications/{id}/unread")]
pub async fn mark_unread(
    state: web::Data<AppState>,
    notification_id: web::Path<i64>,
    user: CurrentUser,
) -> Result<HttpResponse, AppError> {
    state
        .notification_service
        .set_read(user.0.id, notification_id.into_inner(), false)
        .await?;
    Ok(HttpResponse::Ok().json(ApiResponse::message("Notification marked as unread")))
}

#[delete("/notifications/{id}")]
pub async fn delete_notification(
    state: web::Data<AppState>,
    notification_id: web::Path<i64>,
    user: CurrentUser,
) -> Result<HttpResponse, AppError> {
    state
        .notification_service
        .delete(user.0.id, notification_id.into_inner())
        .await?;
    Ok(HttpResponse::Ok().json(ApiResponse::message("Notification deleted")))
}

#[delete("/notifications")]
pub async fn delete_all_notifications(
    state: web::Data<AppState>,
    user: CurrentUser,
) -> Result<HttpResponse, AppError> {
    let deleted = state.notification_service.delete_all(user.0.id).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::message(format!(
        "{} notifications deleted",
        deleted
    ))))
}
