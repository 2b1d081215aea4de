use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum QuestionType {
    #[default]
    MultipleChoice,
    TrueFalse,
    ShortAnswer,
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
pub struct Question {
    pub id: i64,
    pub exam_id: i64,
    pub question_text: String,
    pub question_type: QuestionType,
    pub order: i32,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Question {
    pub fn new(exam_id: i64, question_text: &str, question_type: QuestionType, order: i32) -> Self {
        let now = Utc::now();
        Question {
            id: 0,
            exam_id,
            question_text: question_text.to_string(),
            question_type,
            order,
            is_active: true,
            created_at: now,
            updated_at: now,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
pub struct Answer {
    pub id: i64,
    pub question_id: i64,
    pub answer_text: String,
    pub is_correct: bool,
    pub order: i32,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Answer {
    pub fn new(question_id: i64, answer_text: &str, is_correct: bool, order: i32) -> Self {
        let now = Utc::now();
        Answer {
            id: 0,
            question_id,
            answer_text: answer_text.to_string(),
            is_correct,
            order,
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
    fn question_type_uses_snake_case_tags() {
        let json = serde_json::to_string(&QuestionType::TrueFalse).expect("should serialize");
        assert_eq!(json, "\"true_false\"");

        let parsed: QuestionType =
            serde_json::from_str("\"multiple_choice\"").expect("should deserialize");
        assert_eq!(parsed, QuestionType::MultipleChoice);
    }

    #[test]
    fn question_type_rejects_unknown_variant() {
        let parsed = serde_json::from_str::<QuestionType>("\"essay\"");
        assert!(parsed.is_err());
    }
}
