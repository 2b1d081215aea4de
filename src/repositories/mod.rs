pub mod catalog_repository;
pub mod exam_attempt_repository;
pub mod exam_repository;
pub mod lesson_repository;
pub mod notification_repository;
pub mod progress_repository;
pub mod subscription_repository;
pub mod user_repository;

use mongodb::{bson::Document, options::IndexOptions, IndexModel};

pub use catalog_repository::{CatalogRepository, MongoCatalogRepository};
pub use exam_attempt_repository::{ExamAttemptRepository, MongoExamAttemptRepository};
pub use exam_repository::{ExamRepository, MongoExamRepository};
pub use lesson_repository::{LessonRepository, MongoLessonRepository};
pub use notification_repository::{MongoNotificationRepository, NotificationRepository};
pub use progress_repository::{MongoProgressRepository, ProgressRepository};
pub use subscription_repository::{MongoSubscriptionRepository, SubscriptionRepository};
pub use user_repository::{MongoUserRepository, UserRepository};

pub(crate) fn unique_index(keys: Document, name: &str) -> IndexModel {
    IndexModel::builder()
        .keys(keys)
        .options(
            IndexOptions::builder()
                .unique(true)
                .name(name.to_string())
                .build(),
        )
        .build()
}

pub(crate) fn plain_index(keys: Document, name: &str) -> IndexModel {
    IndexModel::builder()
        .keys(keys)
        .options(IndexOptions::builder().name(name.to_string()).build())
        .build()
}
