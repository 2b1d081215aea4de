use async_trait::async_trait;
use futures::TryStreamExt;
use mongodb::{bson::doc, Collection};

use crate::{
    db::Database,
    errors::{AppError, AppResult},
    models::domain::Lesson,
    repositories::{plain_index, unique_index},
};

const LESSONS_COLLECTION: &str = "lessons";

#[async_trait]
pub trait LessonRepository: Send + Sync {
    async fn create(&self, lesson: Lesson) -> AppResult<Lesson>;
    async fn find_by_id(&self, id: i64) -> AppResult<Option<Lesson>>;
    /// Ordered by `lesson_order`, then id.
    async fn list_by_subject(&self, subject_id: i64, active_only: bool) -> AppResult<Vec<Lesson>>;
    async fn update(&self, lesson: Lesson) -> AppResult<Lesson>;
    async fn delete(&self, id: i64) -> AppResult<()>;
    async fn count_by_subject(&self, subject_id: i64) -> AppResult<u64>;
    async fn count_active(&self) -> AppResult<u64>;
    async fn ensure_indexes(&self) -> AppResult<()>;
}

pub struct MongoLessonRepository {
    db: Database,
    collection: Collection<Lesson>,
}

impl MongoLessonRepository {
    pub fn new(db: &Database) -> Self {
        Self {
            db: db.clone(),
            collection: db.get_collection(LESSONS_COLLECTION),
        }
    }
}

#[async_trait]
impl LessonRepository for MongoLessonRepository {
    async fn create(&self, mut lesson: Lesson) -> AppResult<Lesson> {
        lesson.id = self.db.next_id(LESSONS_COLLECTION).await?;
        self.collection.insert_one(&lesson).await?;
        Ok(lesson)
    }

    async fn find_by_id(&self, id: i64) -> AppResult<Option<Lesson>> {
        Ok(self.collection.find_one(doc! { "id": id }).await?)
    }

    async fn list_by_subject(&self, subject_id: i64, active_only: bool) -> AppResult<Vec<Lesson>> {
        let mut filter = doc! { "subject_id": subject_id };
        if active_only {
            filter.insert("is_active", true);
        }
        let cursor = self
            .collection
            .find(filter)
            .sort(doc! { "lesson_order": 1, "id": 1 })
            .await?;
        Ok(cursor.try_collect().await?)
    }

    async fn update(&self, lesson: Lesson) -> AppResult<Lesson> {
        let result = self
            .collection
            .replace_one(doc! { "id": lesson.id }, &lesson)
            .await?;
        if result.matched_count == 0 {
            return Err(AppError::NotFound(format!("Lesson {} not found", lesson.id)));
        }
        Ok(lesson)
    }

    async fn delete(&self, id: i64) -> AppResult<()> {
        let result = self.collection.delete_one(doc! { "id": id }).await?;
        if result.deleted_count == 0 {
            return Err(AppError::NotFound(format!("Lesson {} not found", id)));
        }
        Ok(())
    }

    async fn count_by_subject(&self, subject_id: i64) -> AppResult<u64> {
        Ok(self
            .collection
            .count_documents(doc! { "subject_id": subject_id })
            .await?)
    }

    async fn count_active(&self) -> AppResult<u64> {
        Ok(self.collection.count_documents(doc! { "is_active": true }).await?)
    }

    async fn ensure_indexes(&self) -> AppResult<()> {
        self.collection
            .create_index(unique_index(doc! { "id": 1 }, "id_unique"))
            .await?;
        self.collection
            .create_index(plain_index(doc! { "subject_id": 1, "lesson_order": 1 }, "subject_order"))
            .await?;

        log::info!("Created indexes for {} collection", LESSONS_COLLECTION);
        Ok(())
    }
}
