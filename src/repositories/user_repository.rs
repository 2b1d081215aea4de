use async_trait::async_trait;
use futures::TryStreamExt;
use mongodb::{bson::doc, Collection};

use crate::{
    db::{is_duplicate_key, Database},
    errors::{AppError, AppResult},
    models::domain::{User, UserRole},
    repositories::{plain_index, unique_index},
};

pub const USERS_COLLECTION: &str = "users";

#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn create(&self, user: User) -> AppResult<User>;
    async fn find_by_id(&self, id: i64) -> AppResult<Option<User>>;
    async fn find_by_username(&self, username: &str) -> AppResult<Option<User>>;
    async fn find_by_email(&self, email: &str) -> AppResult<Option<User>>;
    async fn find_many(&self, ids: &[i64]) -> AppResult<Vec<User>>;
    /// Students, newest first.
    async fn list_students(&self) -> AppResult<Vec<User>>;
    async fn count_students(&self, active: Option<bool>) -> AppResult<u64>;
    async fn update(&self, user: User) -> AppResult<User>;
    async fn ensure_indexes(&self) -> AppResult<()>;
}

pub struct MongoUserRepository {
    db: Database,
    collection: Collection<User>,
}

impl MongoUserRepository {
    pub fn new(db: &Database) -> Self {
        let collection = db.get_collection(USERS_COLLECTION);
        Self {
            db: db.clone(),
            collection,
        }
    }
}

#[async_trait]
impl UserRepository for MongoUserRepository {
    async fn create(&self, mut user: User) -> AppResult<User> {
        user.id = self.db.next_id(USERS_COLLECTION).await?;

        match self.collection.insert_one(&user).await {
            Ok(_) => Ok(user),
            Err(err) if is_duplicate_key(&err) => Err(AppError::AlreadyExists(format!(
                "User '{}' already exists",
                user.username
            ))),
            Err(err) => Err(err.into()),
        }
    }

    async fn find_by_id(&self, id: i64) -> AppResult<Option<User>> {
        let user = self.collection.find_one(doc! { "id": id }).await?;
        Ok(user)
    }

    async fn find_by_username(&self, username: &str) -> AppResult<Option<User>> {
        let user = self
            .collection
            .find_one(doc! { "username": username })
            .await?;
        Ok(user)
    }

    async fn find_by_email(&self, email: &str) -> AppResult<Option<User>> {
        let user = self.collection.find_one(doc! { "email": email }).await?;
        Ok(user)
    }

    async fn find_many(&self, ids: &[i64]) -> AppResult<Vec<User>> {
        let cursor = self.collection.find(doc! { "id": { "$in": ids } }).await?;
        let users: Vec<User> = cursor.try_collect().await?;
        Ok(users)
    }

    async fn list_students(&self) -> AppResult<Vec<User>> {
        let cursor = self
            .collection
            .find(doc! { "role": UserRole::Student.as_str() })
            .sort(doc! { "id": -1 })
            .await?;
        let users: Vec<User> = cursor.try_collect().await?;
        Ok(users)
    }

    async fn count_students(&self, active: Option<bool>) -> AppResult<u64> {
        let mut filter = doc! { "role": UserRole::Student.as_str() };
        if let Some(active) = active {
            filter.insert("is_active", active);
        }
        Ok(self.collection.count_documents(filter).await?)
    }

    async fn update(&self, user: User) -> AppResult<User> {
        let result = self
            .collection
            .replace_one(doc! { "id": user.id }, &user)
            .await?;

        if result.matched_count == 0 {
            return Err(AppError::NotFound(format!("User {} not found", user.id)));
        }

        Ok(user)
    }

    async fn ensure_indexes(&self) -> AppResult<()> {
        self.collection
            .create_index(unique_index(doc! { "id": 1 }, "id_unique"))
            .await?;
        self.collection
            .create_index(unique_index(doc! { "username": 1 }, "username_unique"))
            .await?;
        self.collection
            .create_index(unique_index(doc! { "email": 1 }, "email_unique"))
            .await?;
        self.collection
            .create_index(plain_index(doc! { "role": 1, "is_active": 1 }, "role_active"))
            .await?;

        log::info!("Created indexes for {} collection", USERS_COLLECTION);
        Ok(())
    }
}
