use async_trait::async_trait;
use futures::TryStreamExt;
use mongodb::{
    bson::{doc, to_bson, Document},
    options::ReturnDocument,
    ClientSession, Collection,
};

use crate::{
    db::{finish_transaction, is_duplicate_key, Database},
    errors::{AppError, AppResult},
    models::domain::{
        ActiveSubscription, Notification, RequestStatus, ReviewDecision, SubscriptionRequest, User,
    },
    repositories::{
        notification_repository::NOTIFICATIONS_COLLECTION, plain_index, unique_index,
        user_repository::USERS_COLLECTION,
    },
};

const REQUESTS_COLLECTION: &str = "subscription_requests";
const GRANTS_COLLECTION: &str = "active_subscriptions";

/// Subscription requests and the per-subject grants created when they are approved.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SubscriptionRepository: Send + Sync {
    /// Stores a new student and their pending request as one unit.
    async fn create_registration(
        &self,
        user: User,
        request: SubscriptionRequest,
    ) -> AppResult<(User, SubscriptionRequest)>;
    async fn find_request(&self, id: i64) -> AppResult<Option<SubscriptionRequest>>;
    async fn find_pending_for_user(&self, user_id: i64) -> AppResult<Option<SubscriptionRequest>>;
    /// Newest first; `None` lists every status.
    async fn list_requests(&self, status: Option<RequestStatus>) -> AppResult<Vec<SubscriptionRequest>>;
    async fn count_requests(&self, status: Option<RequestStatus>) -> AppResult<u64>;
    async fn set_receipt(&self, request_id: i64, receipt_url: &str) -> AppResult<()>;
    async fn approved_revenue(&self) -> AppResult<f64>;
    /// Applies the decision only while the request is still pending.
    /// `None` means another review got there first and nothing was written.
    async fn apply_review(&self, decision: ReviewDecision) -> AppResult<Option<SubscriptionRequest>>;

    async fn has_active(&self, user_id: i64, subject_id: i64) -> AppResult<bool>;
    async fn active_for_user(&self, user_id: i64) -> AppResult<Vec<ActiveSubscription>>;
    async fn active_user_ids_for_subject(&self, subject_id: i64) -> AppResult<Vec<i64>>;
    async fn count_active_for_subject(&self, subject_id: i64) -> AppResult<u64>;

    async fn ensure_indexes(&self) -> AppResult<()>;
}

pub struct MongoSubscriptionRepository {
    db: Database,
    requests: Collection<SubscriptionRequest>,
    grants: Collection<ActiveSubscription>,
    users: Collection<User>,
    notifications: Collection<Notification>,
}

impl MongoSubscriptionRepository {
    pub fn new(db: &Database) -> Self {
        Self {
            db: db.clone(),
            requests: db.get_collection(REQUESTS_COLLECTION),
            grants: db.get_collection(GRANTS_COLLECTION),
            users: db.get_collection(USERS_COLLECTION),
            notifications: db.get_collection(NOTIFICATIONS_COLLECTION),
        }
    }

    async fn insert_registration(
        &self,
        session: &mut ClientSession,
        user: &User,
        request: &SubscriptionRequest,
    ) -> AppResult<()> {
        if let Err(err) = self.users.insert_one(user).session(&mut *session).await {
            if is_duplicate_key(&err) {
                return Err(AppError::AlreadyExists(format!(
                    "User '{}' already exists",
                    user.username
                )));
            }
            return Err(err.into());
        }

        self.requests
            .insert_one(request)
            .session(&mut *session)
            .await?;
        Ok(())
    }

    async fn apply_review_in(
        &self,
        session: &mut ClientSession,
        decision: &ReviewDecision,
    ) -> AppResult<Option<SubscriptionRequest>> {
        let reviewed_at = to_bson(&decision.reviewed_at)?;

        let reviewed = self
            .requests
            .find_one_and_update(
                doc! { "id": decision.request_id, "status": RequestStatus::Pending.as_str() },
                doc! { "$set": {
                    "status": decision.status.as_str(),
                    "reviewed_by": decision.reviewed_by,
                    "reviewed_at": reviewed_at.clone(),
                    "admin_notes": decision.admin_notes.as_str(),
                } },
            )
            .return_document(ReturnDocument::After)
            .session(&mut *session)
            .await?;

        let Some(request) = reviewed else {
            return Ok(None);
        };

        if decision.activate_user {
            let result = self
                .users
                .update_one(
                    doc! { "id": decision.user_id },
                    doc! { "$set": { "is_active": true, "updated_at": reviewed_at } },
                )
                .session(&mut *session)
                .await?;
            if result.matched_count == 0 {
                return Err(AppError::NotFound(format!(
                    "User {} not found",
                    decision.user_id
                )));
            }
        }

        for grant in &decision.grants {
            let existing = self
                .grants
                .find_one(doc! { "user_id": grant.user_id, "subject_id": grant.subject_id })
                .session(&mut *session)
                .await?;
            if existing.is_some() {
                continue;
            }

            let mut grant = grant.clone();
            grant.id = self.db.next_id(GRANTS_COLLECTION).await?;
            self.grants.insert_one(&grant).session(&mut *session).await?;
        }

        let mut notification = decision.notification.clone();
        notification.id = self.db.next_id(NOTIFICATIONS_COLLECTION).await?;
        self.notifications
            .insert_one(&notification)
            .session(&mut *session)
            .await?;

        Ok(Some(request))
    }
}

fn status_filter(status: Option<RequestStatus>) -> Document {
    match status {
        Some(status) => doc! { "status": status.as_str() },
        None => doc! {},
    }
}

#[async_trait]
impl SubscriptionRepository for MongoSubscriptionRepository {
    async fn create_registration(
        &self,
        mut user: User,
        mut request: SubscriptionRequest,
    ) -> AppResult<(User, SubscriptionRequest)> {
        user.id = self.db.next_id(USERS_COLLECTION).await?;
        request.id = self.db.next_id(REQUESTS_COLLECTION).await?;
        request.user_id = user.id;

        let mut session = self.db.start_transaction().await?;
        let result = self.insert_registration(&mut session, &user, &request).await;
        finish_transaction(session, result).await?;

        Ok((user, request))
    }

    async fn find_request(&self, id: i64) -> AppResult<Option<SubscriptionRequest>> {
        Ok(self.requests.find_one(doc! { "id": id }).await?)
    }

    async fn find_pending_for_user(&self, user_id: i64) -> AppResult<Option<SubscriptionRequest>> {
        let request = self
            .requests
            .find_one(doc! { "user_id": user_id, "status": RequestStatus::Pending.as_str() })
            .sort(doc! { "id": -1 })
            .await?;
        Ok(request)
    }

    async fn list_requests(&self, status: Option<RequestStatus>) -> AppResult<Vec<SubscriptionRequest>> {
        let cursor = self
            .requests
            .find(status_filter(status))
            .sort(doc! { "id": -1 })
            .await?;
        Ok(cursor.try_collect().await?)
    }

    async fn count_requests(&self, status: Option<RequestStatus>) -> AppResult<u64> {
        Ok(self.requests.count_documents(status_filter(status)).await?)
    }

    async fn set_receipt(&self, request_id: i64, receipt_url: &str) -> AppResult<()> {
        let result = self
            .requests
            .update_one(
                doc! { "id": request_id },
                doc! { "$set": { "payment_receipt_url": receipt_url } },
            )
            .await?;
        if result.matched_count == 0 {
            return Err(AppError::NotFound(format!(
                "Subscription request {} not found",
                request_id
            )));
        }
        Ok(())
    }

    async fn approved_revenue(&self) -> AppResult<f64> {
        let pipeline = vec![
            doc! { "$match": { "status": RequestStatus::Approved.as_str() } },
            doc! { "$group": { "_id": null, "total": { "$sum": "$total_amount" } } },
        ];
        let mut cursor = self.requests.aggregate(pipeline).await?;

        match cursor.try_next().await? {
            Some(summary) => Ok(summary.get_f64("total").unwrap_or(0.0)),
            None => Ok(0.0),
        }
    }

    async fn apply_review(&self, decision: ReviewDecision) -> AppResult<Option<SubscriptionRequest>> {
        let mut session = self.db.start_transaction().await?;
        let result = self.apply_review_in(&mut session, &decision).await;
        finish_transaction(session, result).await
    }

    async fn has_active(&self, user_id: i64, subject_id: i64) -> AppResult<bool> {
        let grant = self
            .grants
            .find_one(doc! { "user_id": user_id, "subject_id": subject_id, "is_active": true })
            .await?;
        Ok(grant.is_some())
    }

    async fn active_for_user(&self, user_id: i64) -> AppResult<Vec<ActiveSubscription>> {
        let cursor = self
            .grants
            .find(doc! { "user_id": user_id, "is_active": true })
            .sort(doc! { "id": 1 })
            .await?;
        Ok(cursor.try_collect().await?)
    }

    async fn active_user_ids_for_subject(&self, subject_id: i64) -> AppResult<Vec<i64>> {
        let cursor = self
            .grants
            .find(doc! { "subject_id": subject_id, "is_active": true })
            .await?;
        let grants: Vec<ActiveSubscription> = cursor.try_collect().await?;
        Ok(grants.into_iter().map(|g| g.user_id).collect())
    }

    async fn count_active_for_subject(&self, subject_id: i64) -> AppResult<u64> {
        Ok(self
            .grants
            .count_documents(doc! { "subject_id": subject_id, "is_active": true })
            .await?)
    }

    async fn ensure_indexes(&self) -> AppResult<()> {
        self.requests
            .create_index(unique_index(doc! { "id": 1 }, "id_unique"))
            .await?;
        self.requests
            .create_index(plain_index(doc! { "user_id": 1, "status": 1 }, "user_status"))
            .await?;
        self.grants
            .create_index(unique_index(doc! { "id": 1 }, "id_unique"))
            .await?;
        self.grants
            .create_index(unique_index(
                doc! { "user_id": 1, "subject_id": 1 },
                "user_subject_unique",
            ))
            .await?;

        log::info!("Created indexes for subscription collections");
        Ok(())
    }
}
