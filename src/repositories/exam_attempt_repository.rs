use async_trait::async_trait;
use futures::TryStreamExt;
use mongodb::{bson::doc, Collection};

use crate::{
    db::{is_duplicate_key, Database},
    errors::AppResult,
    models::domain::ExamAttempt,
    repositories::{plain_index, unique_index},
};

const ATTEMPTS_COLLECTION: &str = "exam_attempts";

#[async_trait]
pub trait ExamAttemptRepository: Send + Sync {
    async fn count(&self, user_id: i64, exam_id: i64) -> AppResult<u64>;
    async fn find_first(&self, user_id: i64, exam_id: i64) -> AppResult<Option<ExamAttempt>>;
    /// Returns `None` when an attempt with the same number was already stored.
    async fn insert(&self, attempt: ExamAttempt) -> AppResult<Option<ExamAttempt>>;
    async fn list_for_exam(&self, user_id: i64, exam_id: i64) -> AppResult<Vec<ExamAttempt>>;
    /// Newest first.
    async fn list_for_user(&self, user_id: i64) -> AppResult<Vec<ExamAttempt>>;
    async fn delete_by_exams(&self, exam_ids: &[i64]) -> AppResult<u64>;
    async fn ensure_indexes(&self) -> AppResult<()>;
}

pub struct MongoExamAttemptRepository {
    db: Database,
    collection: Collection<ExamAttempt>,
}

impl MongoExamAttemptRepository {
    pub fn new(db: &Database) -> Self {
        Self {
            db: db.clone(),
            collection: db.get_collection(ATTEMPTS_COLLECTION),
        }
    }
}

#[async_trait]
impl ExamAttemptRepository for MongoExamAttemptRepository {
    async fn count(&self, user_id: i64, exam_id: i64) -> AppResult<u64> {
        Ok(self
            .collection
            .count_documents(doc! { "user_id": user_id, "exam_id": exam_id })
            .await?)
    }

    async fn find_first(&self, user_id: i64, exam_id: i64) -> AppResult<Option<ExamAttempt>> {
        let attempt = self
            .collection
            .find_one(doc! { "user_id": user_id, "exam_id": exam_id })
            .sort(doc! { "attempt_number": 1 })
            .await?;
        Ok(attempt)
    }

    async fn insert(&self, mut attempt: ExamAttempt) -> AppResult<Option<ExamAttempt>> {
        attempt.id = self.db.next_id(ATTEMPTS_COLLECTION).await?;

        match self.collection.insert_one(&attempt).await {
            Ok(_) => Ok(Some(attempt)),
            Err(err) if is_duplicate_key(&err) => {
                log::info!(
                    "Attempt {} for user {} on exam {} already recorded",
                    attempt.attempt_number,
                    attempt.user_id,
                    attempt.exam_id
                );
                Ok(None)
            }
            Err(err) => Err(err.into()),
        }
    }

    async fn list_for_exam(&self, user_id: i64, exam_id: i64) -> AppResult<Vec<ExamAttempt>> {
        let cursor = self
            .collection
            .find(doc! { "user_id": user_id, "exam_id": exam_id })
            .sort(doc! { "attempt_number": 1 })
            .await?;
        Ok(cursor.try_collect().await?)
    }

    async fn list_for_user(&self, user_id: i64) -> AppResult<Vec<ExamAttempt>> {
        let cursor = self
            .collection
            .find(doc! { "user_id": user_id })
            .sort(doc! { "id": -1 })
            .await?;
        Ok(cursor.try_collect().await?)
    }

    async fn delete_by_exams(&self, exam_ids: &[i64]) -> AppResult<u64> {
        let result = self
            .collection
            .delete_many(doc! { "exam_id": { "$in": exam_ids } })
            .await?;
        Ok(result.deleted_count)
    }

    async fn ensure_indexes(&self) -> AppResult<()> {
        self.collection
            .create_index(unique_index(doc! { "id": 1 }, "id_unique"))
            .await?;
        self.collection
            .create_index(unique_index(
                doc! { "user_id": 1, "exam_id": 1, "attempt_number": 1 },
                "user_exam_attempt_unique",
            ))
            .await?;
        self.collection
            .create_index(plain_index(doc! { "user_id": 1 }, "user_id"))
            .await?;

        log::info!("Created indexes for {} collection", ATTEMPTS_COLLECTION);
        Ok(())
    }
}
