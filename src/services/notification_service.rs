use std::sync::Arc;

use crate::{
    errors::{AppError, AppResult},
    models::domain::Notification,
    repositories::NotificationRepository,
};

pub struct NotificationService {
    repository: Arc<dyn NotificationRepository>,
}

impl NotificationService {
    pub fn new(repository: Arc<dyn NotificationRepository>) -> Self {
        Self { repository }
    }

    pub async fn list(&self, user_id: i64) -> AppResult<Vec<Notification>> {
        self.repository.list_for_user(user_id).await
    }

    pub async fn set_read(&self, user_id: i64, notification_id: i64, is_read: bool) -> AppResult<()> {
        if !self.repository.set_read(notification_id, user_id, is_read).await? {
            return Err(AppError::NotFound(format!(
                "Notification {} not found",
                notification_id
            )));
        }
        Ok(())
    }

    /// Returns how many unread notifications remain afterwards.
    pub async fn mark_all_read(&self, user_id: i64) -> AppResult<u64> {
        self.repository.mark_all_read(user_id).await?;
        self.repository.count_unread(user_id).await
    }

    pub async fn delete(&self, user_id: i64, notification_id: i64) -> AppResult<()> {
        if !self.repository.delete(notification_id, user_id).await? {
            return Err(AppError::NotFound(format!(
                "Notification {} not found",
                notification_id
            )));
        }
        Ok(())
    }

    pub async fn delete_all(&self, user_id: i64) -> AppResult<u64> {
        self.repository.delete_all(user_id).await
    }

    pub async fn unread_count(&self, user_id: i64) -> AppResult<u64> {
        self.repository.count_unread(user_id).await
    }

    /// Tells every subscriber about a new lesson. Failures are logged, never returned.
    pub async fn broadcast_new_lesson(&self, user_ids: &[i64], subject_name: &str, lesson_title: &str) -> u64 {
        let notifications: Vec<Notification> = user_ids
            .iter()
            .map(|user_id| Notification::new_lesson(*user_id, subject_name, lesson_title))
            .collect();

        match self.repository.create_many(notifications).await {
            Ok(created) => created,
            Err(err) => {
                log::warn!(
                    "Failed to notify {} subscribers about lesson '{}': {}",
                    user_ids.len(),
                    lesson_title,
                    err
                );
                0
            }
        }
    }
}
