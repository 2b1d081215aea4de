use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationType {
    SubscriptionApproved,
    SubscriptionRejected,
    NewLesson,
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
pub struct Notification {
    pub id: i64,
    pub user_id: i64,
    pub title: String,
    pub message: String,
    #[serde(rename = "type")]
    pub notification_type: NotificationType,
    pub is_read: bool,
    pub created_at: DateTime<Utc>,
}

impl Notification {
    pub fn new(user_id: i64, notification_type: NotificationType, title: &str, message: &str) -> Self {
        Notification {
            id: 0,
            user_id,
            title: title.to_string(),
            message: message.to_string(),
            notification_type,
            is_read: false,
            created_at: Utc::now(),
        }
    }

    pub fn subscription_approved(user_id: i64) -> Self {
        Notification::new(
            user_id,
            NotificationType::SubscriptionApproved,
            "Subscription approved",
            "Your subscription request was approved and your account is active. You can now access your subjects.",
        )
    }

    pub fn subscription_rejected(user_id: i64, reason: &str) -> Self {
        Notification::new(
            user_id,
            NotificationType::SubscriptionRejected,
            "Subscription rejected",
            &format!("Your subscription request was rejected. Reason: {}", reason),
        )
    }

    pub fn new_lesson(user_id: i64, subject_name: &str, lesson_title: &str) -> Self {
        Notification::new(
            user_id,
            NotificationType::NewLesson,
            &format!("New lesson: {}", lesson_title),
            &format!("A new lesson was added to {}: {}", subject_name, lesson_title),
        )
    }
}
