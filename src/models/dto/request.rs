use std::collections::HashMap;

use once_cell::sync::Lazy;
use serde::Deserialize;
use validator::{Validate, ValidationError};

use crate::models::domain::QuestionType;

const DEFAULT_PAGE_SIZE: u64 = 20;
const MAX_PAGE_SIZE: u64 = 100;

static PHONE_REGEX: Lazy<regex::Regex> =
    Lazy::new(|| regex::Regex::new(r"^[0-9]{10,}$").expect("PHONE_REGEX is a valid regex pattern"));

pub fn validate_username(value: &str) -> Result<(), ValidationError> {
    if value.chars().count() < 4 {
        return Err(ValidationError::new("username_length")
            .with_message("Username must be at least 4 characters".into()));
    }
    if value.chars().any(char::is_whitespace) {
        return Err(ValidationError::new("username_whitespace")
            .with_message("Username must not contain spaces".into()));
    }
    Ok(())
}

pub fn validate_phone(value: &str) -> Result<(), ValidationError> {
    if !PHONE_REGEX.is_match(value) {
        return Err(ValidationError::new("phone_format")
            .with_message("Phone number must be at least 10 digits".into()));
    }
    Ok(())
}

/// At least 8 characters, and neither purely letters nor purely digits.
pub fn validate_password_policy(value: &str) -> Result<(), ValidationError> {
    if value.chars().count() < 8 {
        return Err(ValidationError::new("password_length")
            .with_message("Password must be at least 8 characters".into()));
    }
    if value.chars().all(char::is_alphabetic) {
        return Err(ValidationError::new("password_letters_only")
            .with_message("Password must not contain letters only".into()));
    }
    if value.chars().all(char::is_numeric) {
        return Err(ValidationError::new("password_digits_only")
            .with_message("Password must not contain digits only".into()));
    }
    Ok(())
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(length(min = 1, message = "Username is required"))]
    pub username: String,

    #[validate(length(min = 1, message = "Password is required"))]
    pub password: String,

    #[serde(default)]
    pub captcha_token: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct RegisterRequest {
    #[validate(custom(function = "validate_username"))]
    pub username: String,

    #[validate(email(message = "Invalid email format"))]
    pub email: String,

    #[validate(custom(function = "validate_password_policy"))]
    pub password: String,

    #[validate(length(min = 1, max = 200, message = "Full name is required"))]
    pub full_name: String,

    #[validate(custom(function = "validate_phone"))]
    pub phone_number: String,

    pub academic_year_id: i64,

    #[validate(length(min = 1, message = "Select at least one subject"))]
    pub selected_subjects: Vec<i64>,

    #[serde(default)]
    pub captcha_token: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct VerifyTokenRequest {
    #[validate(length(min = 1, message = "Token is required"))]
    pub token: String,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct ForgotPasswordRequest {
    #[validate(email(message = "Invalid email format"))]
    pub email: String,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct ResetPasswordRequest {
    #[validate(length(min = 1, message = "Token is required"))]
    pub token: String,

    #[validate(custom(function = "validate_password_policy"))]
    pub new_password: String,
}

#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct ProgressUpdateRequest {
    #[validate(range(min = 0, message = "Watch time cannot be negative"))]
    pub watch_time: Option<i64>,

    pub completed: Option<bool>,
}

/// Question id (as sent in the JSON object key) to chosen answer id.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ExamSubmissionRequest {
    pub answers: HashMap<String, i64>,
}

impl ExamSubmissionRequest {
    /// Keys that are not integer question ids are dropped.
    pub fn choices(&self) -> HashMap<i64, i64> {
        self.answers
            .iter()
            .filter_map(|(question, answer)| {
                question.trim().parse::<i64>().ok().map(|q| (q, *answer))
            })
            .collect()
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ReviewRequest {
    #[serde(default)]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ListQuery {
    pub status: Option<String>,
    pub search: Option<String>,
    pub page: Option<u64>,
    pub per_page: Option<u64>,
}

impl ListQuery {
    pub fn page(&self) -> u64 {
        self.page.unwrap_or(1).max(1)
    }

    pub fn per_page(&self) -> u64 {
        self.per_page
            .unwrap_or(DEFAULT_PAGE_SIZE)
            .clamp(1, MAX_PAGE_SIZE)
    }

    pub fn offset(&self) -> usize {
        usize::try_from((self.page() - 1).saturating_mul(self.per_page())).unwrap_or(usize::MAX)
    }

    /// Lowercased, trimmed search term; `None` when blank.
    pub fn search_term(&self) -> Option<String> {
        self.search
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_lowercase)
    }
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateAcademicYearRequest {
    #[validate(length(min = 1, max = 100, message = "Name is required"))]
    pub name: String,

    pub description: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateSubjectRequest {
    #[validate(length(min = 1, max = 200, message = "Name is required"))]
    pub name: String,

    pub description: Option<String>,

    pub academic_year_id: i64,

    #[validate(range(min = 0.0, message = "Price cannot be negative"))]
    pub price: f64,
}

#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct UpdateSubjectRequest {
    #[validate(length(min = 1, max = 200))]
    pub name: Option<String>,

    pub description: Option<String>,

    pub academic_year_id: Option<i64>,

    #[validate(range(min = 0.0, message = "Price cannot be negative"))]
    pub price: Option<f64>,

    pub is_active: Option<bool>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateLessonRequest {
    pub subject_id: i64,

    #[validate(length(min = 1, max = 300, message = "Title is required"))]
    pub title: String,

    pub description: Option<String>,

    #[validate(url(message = "Invalid video URL"))]
    pub video_url: Option<String>,

    #[validate(range(min = 0))]
    pub video_duration: Option<i64>,

    pub attachments: Option<Vec<String>>,

    pub lesson_order: Option<i32>,
}

#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct UpdateLessonRequest {
    #[validate(length(min = 1, max = 300))]
    pub title: Option<String>,

    pub description: Option<String>,

    #[validate(url(message = "Invalid video URL"))]
    pub video_url: Option<String>,

    #[validate(range(min = 0))]
    pub video_duration: Option<i64>,

    pub attachments: Option<Vec<String>>,

    pub lesson_order: Option<i32>,

    pub is_active: Option<bool>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateExamRequest {
    pub lesson_id: i64,

    #[validate(length(min = 1, max = 300, message = "Title is required"))]
    pub title: String,

    pub description: Option<String>,

    #[validate(range(min = 1, message = "Duration must be at least one minute"))]
    pub duration_minutes: Option<i32>,

    #[validate(range(min = 1))]
    pub max_attempts: Option<i32>,

    #[validate(range(min = 0.0, max = 100.0, message = "Passing score must be between 0 and 100"))]
    pub passing_score: Option<f64>,

    pub show_results_immediately: Option<bool>,
}

#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct UpdateExamRequest {
    #[validate(length(min = 1, max = 300))]
    pub title: Option<String>,

    pub description: Option<String>,

    #[validate(range(min = 1, message = "Duration must be at least one minute"))]
    pub duration_minutes: Option<i32>,

    #[validate(range(min = 1))]
    pub max_attempts: Option<i32>,

    #[validate(range(min = 0.0, max = 100.0, message = "Passing score must be between 0 and 100"))]
    pub passing_score: Option<f64>,

    pub show_results_immediately: Option<bool>,

    pub is_active: Option<bool>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewAnswerInput {
    pub answer_text: String,
    #[serde(default)]
    pub is_correct: bool,
    pub order: Option<i32>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateQuestionRequest {
    pub exam_id: i64,

    #[validate(length(min = 1, message = "Question text is required"))]
    pub question_text: String,

    #[serde(default)]
    pub question_type: QuestionType,

    pub order: Option<i32>,

    #[serde(default)]
    pub answers: Vec<NewAnswerInput>,
}

#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct UpdateQuestionRequest {
    #[validate(length(min = 1))]
    pub question_text: Option<String>,

    pub question_type: Option<QuestionType>,

    pub order: Option<i32>,

    pub is_active: Option<bool>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateAnswerRequest {
    pub question_id: i64,

    #[validate(length(min = 1, message = "Answer text is required"))]
    pub answer_text: String,

    #[serde(default)]
    pub is_correct: bool,

    pub order: Option<i32>,
}

#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct UpdateAnswerRequest {
    #[validate(length(min = 1))]
    pub answer_text: Option<String>,

    pub is_correct: Option<bool>,

    pub order: Option<i32>,

    pub is_active: Option<bool>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registration() -> RegisterRequest {
        RegisterRequest {
            username: "nurse_amal".to_string(),
            email: "amal@example.com".to_string(),
            password: "secret123".to_string(),
            full_name: "Amal Hassan".to_string(),
            phone_number: "01012345678".to_string(),
            academic_year_id: 1,
            selected_subjects: vec![1, 2],
            captcha_token: None,
        }
    }

    #[test]
    fn test_valid_registration() {
        assert!(registration().validate().is_ok());
    }

    #[test]
    fn test_username_rules() {
        assert!(validate_username("abc").is_err());
        assert!(validate_username("ab cd").is_err());
        assert!(validate_username("abcd").is_ok());
    }

    #[test]
    fn test_phone_rules() {
        assert!(validate_phone("0101234567").is_ok());
        assert!(validate_phone("010123456").is_err());
        assert!(validate_phone("01012a45678").is_err());
    }

    #[test]
    fn test_password_policy() {
        assert!(validate_password_policy("short1").is_err());
        assert!(validate_password_policy("onlyletters").is_err());
        assert!(validate_password_policy("1234567890").is_err());
        assert!(validate_password_policy("letters123").is_ok());
        assert!(validate_password_policy("١٢٣٤٥٦٧٨").is_err());
    }

    #[test]
    fn test_registration_requires_subjects() {
        let mut request = registration();
        request.selected_subjects.clear();

        assert!(request.validate().is_err());
    }

    #[test]
    fn test_submission_choices_skip_bad_keys() {
        let mut answers = HashMap::new();
        answers.insert("7".to_string(), 21);
        answers.insert("x".to_string(), 22);
        let submission = ExamSubmissionRequest { answers };

        let choices = submission.choices();

        assert_eq!(choices.len(), 1);
        assert_eq!(choices.get(&7), Some(&21));
    }

    #[test]
    fn test_list_query_defaults_and_bounds() {
        let query = ListQuery::default();
        assert_eq!(query.page(), 1);
        assert_eq!(query.per_page(), 20);
        assert_eq!(query.offset(), 0);

        let query = ListQuery {
            page: Some(3),
            per_page: Some(500),
            search: Some("  Amal ".to_string()),
            status: None,
        };
        assert_eq!(query.per_page(), 100);
        assert_eq!(query.offset(), 200);
        assert_eq!(query.search_term().as_deref(), Some("amal"));
    }

    #[test]
    fn test_huge_page_does_not_overflow_offset() {
        let query = ListQuery {
            page: Some(u64::MAX),
            per_page: Some(20),
            ..ListQuery::default()
        };

        assert!(query.offset() > 0);
    }
}
