use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::models::domain::{
    AcademicYear, Answer, Exam, ExamAttempt, Lesson, LessonProgress, Question, QuestionType,
    Subject, SubscriptionRequest, User, UserRole,
};

/// Envelope shared by every JSON response.
#[derive(Debug, Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn ok(data: T) -> Self {
        ApiResponse {
            success: true,
            message: None,
            data: Some(data),
        }
    }

    pub fn with_message(data: T, message: impl Into<String>) -> Self {
        ApiResponse {
            success: true,
            message: Some(message.into()),
            data: Some(data),
        }
    }
}

impl ApiResponse<()> {
    pub fn message(message: impl Into<String>) -> Self {
        ApiResponse {
            success: true,
            message: Some(message.into()),
            data: None,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct UserDto {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub full_name: String,
    pub phone_number: String,
    pub role: UserRole,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_login: Option<DateTime<Utc>>,
}

impl From<User> for UserDto {
    fn from(user: User) -> Self {
        UserDto {
            id: user.id,
            username: user.username,
            email: user.email,
            full_name: user.full_name,
            phone_number: user.phone_number,
            role: user.role,
            is_active: user.is_active,
            created_at: user.created_at,
            last_login: user.last_login,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct PageInfo {
    pub page: u64,
    pub per_page: u64,
    pub total: u64,
    pub pages: u64,
}

impl PageInfo {
    pub fn new(page: u64, per_page: u64, total: u64) -> Self {
        let pages = if per_page == 0 {
            0
        } else {
            total.div_ceil(per_page)
        };
        PageInfo {
            page,
            per_page,
            total,
            pages,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Paginated<T: Serialize> {
    pub items: Vec<T>,
    pub pagination: PageInfo,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub token: String,
    pub user: UserDto,
}

#[derive(Debug, Clone, Serialize)]
pub struct RegistrationResponse {
    pub user_id: i64,
    pub total_amount: f64,
    pub discount_applied: bool,
    pub discount_amount: f64,
    pub payment_number: String,
}

#[derive(Debug, Serialize)]
pub struct PasswordResetIssued {
    pub reset_token: String,
    pub expires_at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct ReceiptUploaded {
    pub receipt_url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subscription_request_id: Option<i64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SubjectSummary {
    pub id: i64,
    pub name: String,
    pub price: f64,
}

impl From<&Subject> for SubjectSummary {
    fn from(subject: &Subject) -> Self {
        SubjectSummary {
            id: subject.id,
            name: subject.name.clone(),
            price: subject.price,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SubscriptionRequestView {
    #[serde(flatten)]
    pub request: SubscriptionRequest,
    pub user: Option<UserDto>,
    pub subjects: Vec<SubjectSummary>,
}

#[derive(Debug, Serialize)]
pub struct StudentSubjectView {
    #[serde(flatten)]
    pub subject: Subject,
    pub subscription_date: DateTime<Utc>,
    pub lessons_count: u64,
    pub completed_lessons: u64,
}

#[derive(Debug, Serialize)]
pub struct LessonListItem {
    #[serde(flatten)]
    pub lesson: Lesson,
    pub watch_time_seconds: i64,
    pub is_completed: bool,
}

#[derive(Debug, Serialize)]
pub struct LessonDetailView {
    #[serde(flatten)]
    pub lesson: Lesson,
    pub subject: SubjectSummary,
    pub progress: LessonProgress,
    pub exams: Vec<Exam>,
}

#[derive(Debug, Serialize)]
pub struct ExamSummary {
    #[serde(flatten)]
    pub exam: Exam,
    pub attempts_count: u64,
    pub best_score: Option<f64>,
    pub last_attempt: Option<DateTime<Utc>>,
    pub remaining_attempts: Option<i32>,
}

#[derive(Debug, Clone, Serialize)]
pub struct AnswerView {
    pub id: i64,
    pub answer_text: String,
    pub order: i32,
}

impl From<Answer> for AnswerView {
    fn from(answer: Answer) -> Self {
        AnswerView {
            id: answer.id,
            answer_text: answer.answer_text,
            order: answer.order,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct QuestionView {
    pub id: i64,
    pub question_text: String,
    pub question_type: QuestionType,
    pub order: i32,
    pub answers: Vec<AnswerView>,
}

/// Exam as presented to a student: the answer key is not part of it.
#[derive(Debug, Serialize)]
pub struct ExamView {
    #[serde(flatten)]
    pub exam: Exam,
    pub questions: Vec<QuestionView>,
    pub attempts_count: u64,
    pub counted_score: Option<f64>,
    pub remaining_attempts: Option<i32>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SubmissionResult {
    pub score: f64,
    pub counted_score: f64,
    pub counted: bool,
    pub correct_answers: i32,
    pub total_questions: i32,
    pub passed: bool,
    pub attempt_number: i32,
}

#[derive(Debug, Serialize)]
pub struct AdminSubjectView {
    #[serde(flatten)]
    pub subject: Subject,
    pub lessons_count: u64,
    pub exams_count: u64,
    pub active_subscriptions: u64,
}

#[derive(Debug, Serialize)]
pub struct AdminExamView {
    #[serde(flatten)]
    pub exam: Exam,
    pub questions_count: u64,
}

#[derive(Debug, Serialize)]
pub struct AdminQuestionView {
    #[serde(flatten)]
    pub question: Question,
    pub answers: Vec<Answer>,
}

#[derive(Debug, Serialize)]
pub struct UnreadCount {
    pub unread_count: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct SubjectProgressView {
    pub id: i64,
    pub name: String,
    pub lessons_completed: u64,
    pub exams_attempted: u64,
    pub success_percentage: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct ProfileStats {
    pub exams_taken: u64,
    pub overall_success_percentage: f64,
    pub last_result: Option<ExamAttempt>,
}

#[derive(Debug, Serialize)]
pub struct ProfileView {
    pub user: UserDto,
    pub academic_year: Option<AcademicYear>,
    pub subjects: Vec<SubjectProgressView>,
    pub stats: ProfileStats,
}

#[derive(Debug, Clone, Serialize)]
pub struct StudentSubjectProgress {
    pub id: i64,
    pub name: String,
    pub subscription_date: DateTime<Utc>,
    pub progress_percentage: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct StudentProfileStats {
    pub exams_taken: u64,
    pub overall_success_percentage: f64,
    pub best_score: f64,
    pub completed_lessons: u64,
    pub total_lessons: u64,
    pub overall_progress_percentage: f64,
    pub last_activity: Option<DateTime<Utc>>,
}

/// Admin view of one student.
#[derive(Debug, Serialize)]
pub struct StudentProfileView {
    pub user: UserDto,
    pub academic_year: Option<String>,
    pub stats: StudentProfileStats,
    pub subjects: Vec<StudentSubjectProgress>,
}

#[derive(Debug, Serialize)]
pub struct DashboardStats {
    pub total_students: u64,
    pub active_students: u64,
    pub pending_requests: u64,
    pub active_subjects: u64,
    pub active_lessons: u64,
    pub active_exams: u64,
    pub total_revenue: f64,
    pub recent_registrations: Vec<UserDto>,
    pub recent_requests: Vec<SubscriptionRequestView>,
}

#[derive(Debug, Serialize)]
pub struct StudentListItem {
    #[serde(flatten)]
    pub user: UserDto,
    pub active_subscriptions: u64,
}
