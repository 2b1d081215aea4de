use std::sync::Arc;

use crate::{
    errors::{AppError, AppResult},
    repositories::SubscriptionRepository,
};

/// Decides whether a student may see a subject's lessons and exams.
pub struct AccessGate {
    subscriptions: Arc<dyn SubscriptionRepository>,
}

impl AccessGate {
    pub fn new(subscriptions: Arc<dyn SubscriptionRepository>) -> Self {
        Self { subscriptions }
    }

    /// True iff the user holds an active grant for the subject. `end_date` is not consulted.
    pub async fn has_access(&self, user_id: i64, subject_id: i64) -> AppResult<bool> {
        self.subscriptions.has_active(user_id, subject_id).await
    }

    pub async fn ensure_access(&self, user_id: i64, subject_id: i64) -> AppResult<()> {
        if !self.has_access(user_id, subject_id).await? {
            return Err(AppError::Forbidden(
                "You do not have access to this subject".to_string(),
            ));
        }
        Ok(())
    }
}
