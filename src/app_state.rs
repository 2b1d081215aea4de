use std::sync::Arc;

use crate::{
    auth::JwtService,
    config::Config,
    db::Database,
    errors::AppResult,
    repositories::{
        CatalogRepository, ExamAttemptRepository, ExamRepository, LessonRepository,
        MongoCatalogRepository, MongoExamAttemptRepository, MongoExamRepository,
        MongoLessonRepository, MongoNotificationRepository, MongoProgressRepository,
        MongoSubscriptionRepository, MongoUserRepository, NotificationRepository,
        ProgressRepository, SubscriptionRepository, UserRepository,
    },
    services::{
        access_service::AccessGate,
        auth_service::AuthService,
        captcha::{CaptchaVerifier, RecaptchaVerifier},
        catalog_service::CatalogService,
        content_service::ContentService,
        exam_service::ExamService,
        notification_service::NotificationService,
        profile_service::ProfileService,
        progress_service::ProgressService,
        receipt_storage::ReceiptStorage,
        subscription_service::SubscriptionService,
    },
};

/// Every persistence port the services need.
#[derive(Clone)]
pub struct Repositories {
    pub users: Arc<dyn UserRepository>,
    pub catalog: Arc<dyn CatalogRepository>,
    pub lessons: Arc<dyn LessonRepository>,
    pub exams: Arc<dyn ExamRepository>,
    pub attempts: Arc<dyn ExamAttemptRepository>,
    pub progress: Arc<dyn ProgressRepository>,
    pub subscriptions: Arc<dyn SubscriptionRepository>,
    pub notifications: Arc<dyn NotificationRepository>,
}

impl Repositories {
    pub fn mongo(db: &Database) -> Self {
        Self {
            users: Arc::new(MongoUserRepository::new(db)),
            catalog: Arc::new(MongoCatalogRepository::new(db)),
            lessons: Arc::new(MongoLessonRepository::new(db)),
            exams: Arc::new(MongoExamRepository::new(db)),
            attempts: Arc::new(MongoExamAttemptRepository::new(db)),
            progress: Arc::new(MongoProgressRepository::new(db)),
            subscriptions: Arc::new(MongoSubscriptionRepository::new(db)),
            notifications: Arc::new(MongoNotificationRepository::new(db)),
        }
    }

    pub async fn ensure_indexes(&self) -> AppResult<()> {
        self.users.ensure_indexes().await?;
        self.catalog.ensure_indexes().await?;
        self.lessons.ensure_indexes().await?;
        self.exams.ensure_indexes().await?;
        self.attempts.ensure_indexes().await?;
        self.progress.ensure_indexes().await?;
        self.subscriptions.ensure_indexes().await?;
        self.notifications.ensure_indexes().await?;
        Ok(())
    }
}

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    /// Absent when the state is assembled over non-Mongo repositories.
    pub db: Option<Database>,
    pub jwt: JwtService,
    pub auth_service: Arc<AuthService>,
    pub subscription_service: Arc<SubscriptionService>,
    pub catalog_service: Arc<CatalogService>,
    pub content_service: Arc<ContentService>,
    pub progress_service: Arc<ProgressService>,
    pub exam_service: Arc<ExamService>,
    pub notification_service: Arc<NotificationService>,
    pub profile_service: Arc<ProfileService>,
}

impl AppState {
    pub async fn new(config: Config) -> AppResult<Self> {
        let db = Database::connect(&config).await?;

        let repositories = Repositories::mongo(&db);
        repositories.ensure_indexes().await?;

        let captcha: Option<Arc<dyn CaptchaVerifier>> = match &config.captcha_secret {
            Some(secret) => Some(Arc::new(RecaptchaVerifier::new(
                secret.clone(),
                &config.captcha_verify_url,
            ))),
            None => {
                log::warn!("CAPTCHA_SECRET not set, captcha verification is disabled");
                None
            }
        };

        let state = Self::assemble(config, Some(db), repositories, captcha);

        if let Some(seed) = &state.config.admin_seed {
            state.auth_service.seed_admin(seed).await?;
        }

        Ok(state)
    }

    /// Wires services over the given repositories.
    pub fn assemble(
        config: Config,
        db: Option<Database>,
        repos: Repositories,
        captcha: Option<Arc<dyn CaptchaVerifier>>,
    ) -> Self {
        let jwt = JwtService::new(
            &config.jwt_secret,
            config.jwt_expiration_hours,
            config.reset_token_expiration_hours,
        );
        let receipts = ReceiptStorage::new(&config.upload_dir, &config.receipt_url_prefix);

        let gate = Arc::new(AccessGate::new(repos.subscriptions.clone()));
        let notification_service = Arc::new(NotificationService::new(repos.notifications.clone()));
        let progress_service = Arc::new(ProgressService::new(
            repos.progress.clone(),
            repos.lessons.clone(),
            gate.clone(),
        ));
        let subscription_service = Arc::new(SubscriptionService::new(
            repos.subscriptions.clone(),
            repos.users.clone(),
            repos.catalog.clone(),
        ));

        let auth_service = Arc::new(AuthService::new(
            repos.users.clone(),
            repos.subscriptions.clone(),
            repos.catalog.clone(),
            jwt.clone(),
            captcha,
            receipts,
            config.payment_number.clone(),
        ));
        let catalog_service = Arc::new(CatalogService::new(
            repos.catalog.clone(),
            repos.lessons.clone(),
            repos.exams.clone(),
            repos.attempts.clone(),
            repos.progress.clone(),
            repos.subscriptions.clone(),
            notification_service.clone(),
        ));
        let content_service = Arc::new(ContentService::new(
            repos.subscriptions.clone(),
            repos.catalog.clone(),
            repos.lessons.clone(),
            repos.exams.clone(),
            repos.progress.clone(),
            progress_service.clone(),
            gate.clone(),
        ));
        let exam_service = Arc::new(ExamService::new(
            repos.exams.clone(),
            repos.attempts.clone(),
            repos.lessons.clone(),
            gate,
        ));
        let profile_service = Arc::new(ProfileService::new(
            repos.users,
            repos.subscriptions,
            repos.catalog,
            repos.lessons,
            repos.exams,
            repos.attempts,
            repos.progress,
            subscription_service.clone(),
        ));

        Self {
            config: Arc::new(config),
            db,
            jwt,
            auth_service,
            subscription_service,
            catalog_service,
            content_service,
            progress_service,
            exam_service,
            notification_service,
            profile_service,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_app_state_is_cloneable() {
        fn assert_clone<T: Clone>() {}
        assert_clone::<AppState>();
    }
}
