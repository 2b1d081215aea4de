use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub const DEFAULT_MAX_ATTEMPTS: i32 = 3;
pub const DEFAULT_PASSING_SCORE: f64 = 60.0;

#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct Exam {
    pub id: i64,
    pub lesson_id: i64,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    pub duration_minutes: i32,
    pub max_attempts: i32, // surfaced to clients, never enforced
    pub passing_score: f64,
    pub show_results_immediately: bool,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Exam {
    pub fn new(lesson_id: i64, title: &str, duration_minutes: i32) -> Self {
        let now = Utc::now();
        Exam {
            id: 0,
            lesson_id,
            title: title.to_string(),
            description: None,
            duration_minutes,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            passing_score: DEFAULT_PASSING_SCORE,
            show_results_immediately: true,
            is_active: true,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_passing(&self, score: f64) -> bool {
        score >= self.passing_score
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exam_defaults() {
        let exam = Exam::new(4, "Midterm", 30);

        assert_eq!(exam.max_attempts, DEFAULT_MAX_ATTEMPTS);
        assert_eq!(exam.passing_score, DEFAULT_PASSING_SCORE);
        assert!(exam.show_results_immediately);
    }

    #[test]
    fn test_passing_threshold_is_inclusive() {
        let exam = Exam::new(1, "Quiz", 10);

        assert!(exam.is_passing(60.0));
        assert!(exam.is_passing(66.67));
        assert!(!exam.is_passing(59.99));
    }
}
