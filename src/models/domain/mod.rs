pub mod catalog;
pub mod exam;
pub mod exam_attempt;
pub mod lesson_progress;
pub mod notification;
pub mod question;
pub mod subscription;
pub mod user;
pub use catalog::{AcademicYear, Lesson, Subject};
pub use exam::Exam;
pub use exam_attempt::ExamAttempt;
pub use lesson_progress::LessonProgress;
pub use notification::{Notification, NotificationType};
pub use question::{Answer, Question, QuestionType};
pub use subscription::{ActiveSubscription, RequestStatus, ReviewDecision, SubscriptionRequest};
pub use user::{User, UserRole};
