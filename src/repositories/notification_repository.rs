use async_trait::async_trait;
use futures::TryStreamExt;
use mongodb::{bson::doc, Collection};

use crate::{
    db::{finish_transaction, Database},
    errors::{AppError, AppResult},
    models::domain::Notification,
    repositories::{plain_index, unique_index},
};

pub const NOTIFICATIONS_COLLECTION: &str = "notifications";

#[async_trait]
pub trait NotificationRepository: Send + Sync {
    /// Inserts all of them or none.
    async fn create_many(&self, notifications: Vec<Notification>) -> AppResult<u64>;
    /// Newest first.
    async fn list_for_user(&self, user_id: i64) -> AppResult<Vec<Notification>>;
    /// Returns false when no notification with that id belongs to the user.
    async fn set_read(&self, id: i64, user_id: i64, is_read: bool) -> AppResult<bool>;
    async fn mark_all_read(&self, user_id: i64) -> AppResult<u64>;
    async fn delete(&self, id: i64, user_id: i64) -> AppResult<bool>;
    async fn delete_all(&self, user_id: i64) -> AppResult<u64>;
    async fn count_unread(&self, user_id: i64) -> AppResult<u64>;
    async fn ensure_indexes(&self) -> AppResult<()>;
}

pub struct MongoNotificationRepository {
    db: Database,
    collection: Collection<Notification>,
}

impl MongoNotificationRepository {
    pub fn new(db: &Database) -> Self {
        Self {
            db: db.clone(),
            collection: db.get_collection(NOTIFICATIONS_COLLECTION),
        }
    }
}

#[async_trait]
impl NotificationRepository for MongoNotificationRepository {
    async fn create_many(&self, mut notifications: Vec<Notification>) -> AppResult<u64> {
        if notifications.is_empty() {
            return Ok(0);
        }
        let first_id = self
            .db
            .next_ids(NOTIFICATIONS_COLLECTION, notifications.len())
            .await?;
        for (id, notification) in (first_id..).zip(notifications.iter_mut()) {
            notification.id = id;
        }

        let mut session = self.db.start_transaction().await?;
        let result = self
            .collection
            .insert_many(&notifications)
            .session(&mut session)
            .await
            .map(|inserted| inserted.inserted_ids.len() as u64)
            .map_err(AppError::from);
        finish_transaction(session, result).await
    }

    async fn list_for_user(&self, user_id: i64) -> AppResult<Vec<Notification>> {
        let cursor = self
            .collection
            .find(doc! { "user_id": user_id })
            .sort(doc! { "id": -1 })
            .await?;
        Ok(cursor.try_collect().await?)
    }

    async fn set_read(&self, id: i64, user_id: i64, is_read: bool) -> AppResult<bool> {
        let result = self
            .collection
            .update_one(
                doc! { "id": id, "user_id": user_id },
                doc! { "$set": { "is_read": is_read } },
            )
            .await?;
        Ok(result.matched_count > 0)
    }

    async fn mark_all_read(&self, user_id: i64) -> AppResult<u64> {
        let result = self
            .collection
            .update_many(
                doc! { "user_id": user_id, "is_read": false },
                doc! { "$set": { "is_read": true } },
            )
            .await?;
        Ok(result.modified_count)
    }

    async fn delete(&self, id: i64, user_id: i64) -> AppResult<bool> {
        let result = self
            .collection
            .delete_one(doc! { "id": id, "user_id": user_id })
            .await?;
        Ok(result.deleted_count > 0)
    }

    async fn delete_all(&self, user_id: i64) -> AppResult<u64> {
        let result = self
            .collection
            .delete_many(doc! { "user_id": user_id })
            .await?;
        Ok(result.deleted_count)
    }

    async fn count_unread(&self, user_id: i64) -> AppResult<u64> {
        Ok(self
            .collection
            .count_documents(doc! { "user_id": user_id, "is_read": false })
            .await?)
    }

    async fn ensure_indexes(&self) -> AppResult<()> {
        self.collection
            .create_index(unique_index(doc! { "id": 1 }, "id_unique"))
            .await?;
        self.collection
            .create_index(plain_index(doc! { "user_id": 1, "is_read": 1 }, "user_read"))
            .await?;

        log::info!("Created indexes for {} collection", NOTIFICATIONS_COLLECTION);
        Ok(())
    }
}
