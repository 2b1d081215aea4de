use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::domain::notification::Notification;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RequestStatus {
    #[default]
    Pending,
    Approved,
    Rejected,
}

impl RequestStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RequestStatus::Pending => "pending",
            RequestStatus::Approved => "approved",
            RequestStatus::Rejected => "rejected",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "pending" => Some(RequestStatus::Pending),
            "approved" => Some(RequestStatus::Approved),
            "rejected" => Some(RequestStatus::Rejected),
            _ => None,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct SubscriptionRequest {
    pub id: i64,
    pub user_id: i64,
    pub academic_year_id: i64,
    pub selected_subjects: Vec<i64>,
    pub total_amount: f64,
    #[serde(default)]
    pub discount_applied: bool,
    #[serde(default)]
    pub payment_receipt_url: Option<String>,
    pub status: RequestStatus,
    #[serde(default)]
    pub admin_notes: Option<String>,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub reviewed_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub reviewed_by: Option<i64>,
}

impl SubscriptionRequest {
    pub fn new_pending(
        user_id: i64,
        academic_year_id: i64,
        selected_subjects: Vec<i64>,
        total_amount: f64,
        discount_applied: bool,
    ) -> Self {
        SubscriptionRequest {
            id: 0,
            user_id,
            academic_year_id,
            selected_subjects,
            total_amount,
            discount_applied,
            payment_receipt_url: None,
            status: RequestStatus::Pending,
            admin_notes: None,
            created_at: Utc::now(),
            reviewed_at: None,
            reviewed_by: None,
        }
    }

    pub fn is_pending(&self) -> bool {
        self.status == RequestStatus::Pending
    }
}

#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct ActiveSubscription {
    pub id: i64,
    pub user_id: i64,
    pub subject_id: i64,
    pub subscription_request_id: i64,
    pub start_date: DateTime<Utc>,
    // Stored for time-limited plans; access checks only look at `is_active`.
    #[serde(default)]
    pub end_date: Option<DateTime<Utc>>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

impl ActiveSubscription {
    pub fn grant(user_id: i64, subject_id: i64, subscription_request_id: i64) -> Self {
        let now = Utc::now();
        ActiveSubscription {
            id: 0,
            user_id,
            subject_id,
            subscription_request_id,
            start_date: now,
            end_date: None,
            is_active: true,
            created_at: now,
        }
    }
}

/// Everything a review writes, applied atomically and only while the request is still pending.
#[derive(Clone, Debug)]
pub struct ReviewDecision {
    pub request_id: i64,
    pub user_id: i64,
    pub status: RequestStatus,
    pub reviewed_by: i64,
    pub reviewed_at: DateTime<Utc>,
    pub admin_notes: String,
    pub activate_user: bool,
    pub grants: Vec<ActiveSubscription>,
    pub notification: Notification,
}
