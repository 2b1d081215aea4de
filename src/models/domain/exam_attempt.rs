use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Attempt number whose score is authoritative for a user and exam.
pub const COUNTED_ATTEMPT_NUMBER: i32 = 1;

#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct ExamAttempt {
    pub id: i64,
    pub user_id: i64,
    pub exam_id: i64,
    pub attempt_number: i32,
    pub score: f64, // percentage
    pub correct_answers: i32,
    pub total_questions: i32,
    pub is_passed: bool,
    pub submitted_at: DateTime<Utc>,
}

impl ExamAttempt {
    pub fn is_counted(&self) -> bool {
        self.attempt_number == COUNTED_ATTEMPT_NUMBER
    }
}
