use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct AcademicYear {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

impl AcademicYear {
    pub fn new(name: &str, description: Option<String>) -> Self {
        AcademicYear {
            id: 0,
            name: name.to_string(),
            description,
            is_active: true,
            created_at: Utc::now(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct Subject {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub academic_year_id: i64,
    pub price: f64,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Subject {
    pub fn new(name: &str, academic_year_id: i64, price: f64) -> Self {
        let now = Utc::now();
        Subject {
            id: 0,
            name: name.to_string(),
            description: None,
            academic_year_id,
            price,
            is_active: true,
            created_at: now,
            updated_at: now,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct Lesson {
    pub id: i64,
    pub subject_id: i64,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub video_url: Option<String>,
    #[serde(default)]
    pub video_duration: Option<i64>, // seconds
    #[serde(default)]
    pub attachments: Vec<String>,
    pub lesson_order: i32,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Lesson {
    pub fn new(subject_id: i64, title: &str, lesson_order: i32) -> Self {
        let now = Utc::now();
        Lesson {
            id: 0,
            subject_id,
            title: title.to_string(),
            description: None,
            video_url: None,
            video_duration: None,
            attachments: Vec::new(),
            lesson_order,
            is_active: true,
            created_at: now,
            updated_at: now,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lesson_defaults() {
        let lesson = Lesson::new(3, "Vital signs", 2);

        assert_eq!(lesson.subject_id, 3);
        assert_eq!(lesson.lesson_order, 2);
        assert!(lesson.attachments.is_empty());
        assert!(lesson.is_active);
    }

    #[test]
    fn test_lesson_without_attachments_deserializes() {
        let json = serde_json::json!({
            "id": 1,
            "subject_id": 2,
            "title": "Intro",
            "lesson_order": 1,
            "is_active": true,
            "created_at": "2024-01-01T00:00:00Z",
            "updated_at": "2024-01-01T00:00:00Z"
        });

        let lesson: Lesson = serde_json::from_value(json).expect("lesson should deserialize");
        assert!(lesson.attachments.is_empty());
        assert!(lesson.video_url.is_none());
    }
}
