use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
pub struct LessonProgress {
    pub id: i64,
    pub user_id: i64,
    pub lesson_id: i64,
    pub watch_time_seconds: i64,
    pub is_completed: bool,
    pub first_accessed_at: DateTime<Utc>,
    pub last_accessed_at: DateTime<Utc>,
}

impl LessonProgress {
    pub fn start(user_id: i64, lesson_id: i64) -> Self {
        let now = Utc::now();
        LessonProgress {
            id: 0,
            user_id,
            lesson_id,
            watch_time_seconds: 0,
            is_completed: false,
            first_accessed_at: now,
            last_accessed_at: now,
        }
    }

    /// Applies only the fields that were supplied; the access time always moves.
    pub fn apply(&mut self, watch_time_seconds: Option<i64>, completed: Option<bool>) {
        if let Some(seconds) = watch_time_seconds {
            self.watch_time_seconds = seconds;
        }
        if let Some(completed) = completed {
            self.is_completed = completed;
        }
        self.last_accessed_at = Utc::now();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn start_is_empty() {
        let progress = LessonProgress::start(1, 2);

        assert_eq!(progress.watch_time_seconds, 0);
        assert!(!progress.is_completed);
    }

    #[test]
    fn completed_only_keeps_watch_time() {
        let mut progress = LessonProgress::start(1, 2);
        progress.apply(Some(540), None);
        let before = progress.last_accessed_at;

        progress.apply(None, Some(true));

        assert_eq!(progress.watch_time_seconds, 540);
        assert!(progress.is_completed);
        assert!(progress.last_accessed_at >= before);
    }

    #[test]
    fn watch_time_only_keeps_completion() {
        let mut progress = LessonProgress::start(1, 2);
        progress.apply(None, Some(true));

        progress.apply(Some(30), None);

        assert!(progress.is_completed);
        assert_eq!(progress.watch_time_seconds, 30);
    }
}
