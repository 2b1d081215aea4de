use async_trait::async_trait;
use futures::TryStreamExt;
use mongodb::{bson::doc, Collection};

use crate::{
    db::{is_duplicate_key, Database},
    errors::{AppError, AppResult},
    models::domain::LessonProgress,
    repositories::{plain_index, unique_index},
};

const PROGRESS_COLLECTION: &str = "lesson_progress";

#[async_trait]
pub trait ProgressRepository: Send + Sync {
    async fn find(&self, user_id: i64, lesson_id: i64) -> AppResult<Option<LessonProgress>>;
    /// Fails with `AlreadyExists` when the user already has progress on the lesson.
    async fn create(&self, progress: LessonProgress) -> AppResult<LessonProgress>;
    async fn save(&self, progress: LessonProgress) -> AppResult<LessonProgress>;
    async fn list_for_lessons(&self, user_id: i64, lesson_ids: &[i64]) -> AppResult<Vec<LessonProgress>>;
    async fn delete_by_lesson(&self, lesson_id: i64) -> AppResult<u64>;
    async fn ensure_indexes(&self) -> AppResult<()>;
}

pub struct MongoProgressRepository {
    db: Database,
    collection: Collection<LessonProgress>,
}

impl MongoProgressRepository {
    pub fn new(db: &Database) -> Self {
        Self {
            db: db.clone(),
            collection: db.get_collection(PROGRESS_COLLECTION),
        }
    }
}

#[async_trait]
impl ProgressRepository for MongoProgressRepository {
    async fn find(&self, user_id: i64, lesson_id: i64) -> AppResult<Option<LessonProgress>> {
        let progress = self
            .collection
            .find_one(doc! { "user_id": user_id, "lesson_id": lesson_id })
            .await?;
        Ok(progress)
    }

    async fn create(&self, mut progress: LessonProgress) -> AppResult<LessonProgress> {
        progress.id = self.db.next_id(PROGRESS_COLLECTION).await?;

        match self.collection.insert_one(&progress).await {
            Ok(_) => Ok(progress),
            Err(err) if is_duplicate_key(&err) => Err(AppError::AlreadyExists(format!(
                "Progress for lesson {} already exists",
                progress.lesson_id
            ))),
            Err(err) => Err(err.into()),
        }
    }

    async fn save(&self, progress: LessonProgress) -> AppResult<LessonProgress> {
        let result = self
            .collection
            .replace_one(doc! { "id": progress.id }, &progress)
            .await?;
        if result.matched_count == 0 {
            return Err(AppError::NotFound(format!(
                "Progress {} not found",
                progress.id
            )));
        }
        Ok(progress)
    }

    async fn list_for_lessons(&self, user_id: i64, lesson_ids: &[i64]) -> AppResult<Vec<LessonProgress>> {
        let cursor = self
            .collection
            .find(doc! { "user_id": user_id, "lesson_id": { "$in": lesson_ids } })
            .await?;
        Ok(cursor.try_collect().await?)
    }

    async fn delete_by_lesson(&self, lesson_id: i64) -> AppResult<u64> {
        let result = self
            .collection
            .delete_many(doc! { "lesson_id": lesson_id })
            .await?;
        Ok(result.deleted_count)
    }

    async fn ensure_indexes(&self) -> AppResult<()> {
        self.collection
            .create_index(unique_index(doc! { "id": 1 }, "id_unique"))
            .await?;
        self.collection
            .create_index(unique_index(
                doc! { "user_id": 1, "lesson_id": 1 },
                "user_lesson_unique",
            ))
            .await?;
        self.collection
            .create_index(plain_index(doc! { "lesson_id": 1 }, "lesson_id"))
            .await?;

        log::info!("Created indexes for {} collection", PROGRESS_COLLECTION);
        Ok(())
    }
}
