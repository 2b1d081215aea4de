use std::sync::Arc;

use chrono::Utc;
use secrecy::ExposeSecret;
use validator::Validate;

use crate::{
    auth::{hash_token, require_active, JwtService},
    config::AdminSeed,
    errors::{AppError, AppResult},
    models::{
        domain::{SubscriptionRequest, User},
        dto::{
            request::{
                validate_password_policy, ForgotPasswordRequest, LoginRequest, RegisterRequest,
                ResetPasswordRequest,
            },
            response::{
                LoginResponse, PasswordResetIssued, ReceiptUploaded, RegistrationResponse, UserDto,
            },
        },
    },
    repositories::{CatalogRepository, SubscriptionRepository, UserRepository},
    services::{
        captcha::CaptchaVerifier,
        password::{hash_password, verify_password},
        pricing,
        receipt_storage::ReceiptStorage,
    },
};

/// Sign-in, registration and password recovery.
pub struct AuthService {
    users: Arc<dyn UserRepository>,
    subscriptions: Arc<dyn SubscriptionRepository>,
    catalog: Arc<dyn CatalogRepository>,
    jwt: JwtService,
    captcha: Option<Arc<dyn CaptchaVerifier>>,
    receipts: ReceiptStorage,
    payment_number: String,
}

impl AuthService {
    pub fn new(
        users: Arc<dyn UserRepository>,
        subscriptions: Arc<dyn SubscriptionRepository>,
        catalog: Arc<dyn CatalogRepository>,
        jwt: JwtService,
        captcha: Option<Arc<dyn CaptchaVerifier>>,
        receipts: ReceiptStorage,
        payment_number: String,
    ) -> Self {
        Self {
            users,
            subscriptions,
            catalog,
            jwt,
            captcha,
            receipts,
            payment_number,
        }
    }

    /// Only enforced when a verifier is configured.
    async fn check_captcha(&self, token: Option<&str>) -> AppResult<()> {
        let Some(verifier) = &self.captcha else {
            return Ok(());
        };

        let token = token.map(str::trim).filter(|t| !t.is_empty());
        let passed = match token {
            Some(token) => verifier.verify(token).await?,
            None => false,
        };

        if !passed {
            return Err(AppError::ValidationError(
                "Captcha verification failed".to_string(),
            ));
        }
        Ok(())
    }

    pub async fn login(&self, request: LoginRequest) -> AppResult<LoginResponse> {
        self.check_captcha(request.captcha_token.as_deref()).await?;
        request.validate()?;

        let mut user = self
            .users
            .find_by_username(request.username.trim())
            .await?
            .filter(|user| verify_password(&request.password, &user.password_hash))
            .ok_or_else(|| AppError::Unauthorized("Invalid username or password".to_string()))?;

        if !user.is_active {
            return Err(AppError::Unauthorized(
                "Your account is not active yet. Please wait for admin approval".to_string(),
            ));
        }

        user.last_login = Some(Utc::now());
        let user = self.users.update(user).await?;
        let token = self.jwt.create_token(&user)?;

        log::info!("User {} logged in", user.id);
        Ok(LoginResponse {
            token,
            user: user.into(),
        })
    }

    pub async fn register(&self, request: RegisterRequest) -> AppResult<RegistrationResponse> {
        self.check_captcha(request.captcha_token.as_deref()).await?;
        request.validate()?;

        let username = request.username.trim();
        let email = request.email.trim();

        if self.users.find_by_username(username).await?.is_some() {
            return Err(AppError::AlreadyExists("Username already exists".to_string()));
        }
        if self.users.find_by_email(email).await?.is_some() {
            return Err(AppError::AlreadyExists("Email already exists".to_string()));
        }

        let year = self
            .catalog
            .find_year(request.academic_year_id)
            .await?
            .ok_or_else(|| AppError::ValidationError("Academic year not found".to_string()))?;

        let mut subject_ids = request.selected_subjects.clone();
        subject_ids.sort_unstable();
        subject_ids.dedup();

        let subjects = self.catalog.find_subjects(&subject_ids).await?;
        if subjects.len() != subject_ids.len() {
            return Err(AppError::ValidationError(
                "One or more selected subjects do not exist".to_string(),
            ));
        }

        let quote = pricing::quote(&subjects);
        let password_hash = hash_password(&request.password)?;

        let user = User::new_student(
            username,
            email,
            &password_hash,
            request.full_name.trim(),
            request.phone_number.trim(),
        );
        let pending = SubscriptionRequest::new_pending(
            0,
            year.id,
            subject_ids,
            quote.total_amount,
            quote.discount_applied,
        );

        let (user, pending) = self.subscriptions.create_registration(user, pending).await?;

        log::info!(
            "Registered user {} with subscription request {} ({:.2})",
            user.id,
            pending.id,
            pending.total_amount
        );

        Ok(RegistrationResponse {
            user_id: user.id,
            total_amount: quote.total_amount,
            discount_applied: quote.discount_applied,
            discount_amount: quote.discount_amount,
            payment_number: self.payment_number.clone(),
        })
    }

    /// Loads the account behind a session; missing or inactive accounts are not authenticated.
    pub async fn current_user(&self, user_id: i64) -> AppResult<User> {
        let user = self
            .users
            .find_by_id(user_id)
            .await?
            .ok_or_else(|| AppError::Unauthorized("User not found or inactive".to_string()))?;
        require_active(&user)
            .map_err(|_| AppError::Unauthorized("User not found or inactive".to_string()))?;
        Ok(user)
    }

    pub async fn verify_token(&self, token: &str) -> AppResult<UserDto> {
        let claims = self.jwt.validate_token(token)?;
        let user_id = claims
            .user_id()
            .ok_or_else(|| AppError::Unauthorized("Invalid token subject".to_string()))?;
        let user = self.current_user(user_id).await?;
        Ok(user.into())
    }

    /// Issues a reset token. It is returned to the caller because no mail transport exists.
    pub async fn forgot_password(&self, request: ForgotPasswordRequest) -> AppResult<PasswordResetIssued> {
        request.validate()?;

        let mut user = self
            .users
            .find_by_email(request.email.trim())
            .await?
            .ok_or_else(|| AppError::NotFound("Email not found".to_string()))?;

        let (token, expires_at) = self.jwt.create_reset_token(user.id)?;
        user.password_reset_token = Some(hash_token(&token));
        user.password_reset_expires = Some(expires_at);
        user.touch();
        self.users.update(user).await?;

        Ok(PasswordResetIssued {
            reset_token: token,
            expires_at,
        })
    }

    pub async fn reset_password(&self, request: ResetPasswordRequest) -> AppResult<()> {
        request.validate()?;

        let invalid = || AppError::ValidationError("Reset token is invalid or expired".to_string());

        let claims = self
            .jwt
            .validate_reset_token(&request.token)
            .map_err(|_| invalid())?;
        let user_id: i64 = claims.sub.parse().map_err(|_| invalid())?;

        let mut user = self.users.find_by_id(user_id).await?.ok_or_else(invalid)?;

        let token_matches = user.password_reset_token.as_deref() == Some(hash_token(&request.token).as_str());
        let unexpired = user
            .password_reset_expires
            .map(|expires| expires > Utc::now())
            .unwrap_or(false);
        if !token_matches || !unexpired {
            return Err(invalid());
        }

        user.password_hash = hash_password(&request.new_password)?;
        user.clear_password_reset();
        user.touch();
        self.users.update(user).await?;

        log::info!("Password reset for user {}", user_id);
        Ok(())
    }

    /// Stores the receipt and attaches it to the user's pending request, if there is one.
    pub async fn upload_receipt(
        &self,
        user_id: i64,
        original_name: &str,
        contents: &[u8],
    ) -> AppResult<ReceiptUploaded> {
        let url = self.receipts.store(user_id, original_name, contents).await?;

        let pending = self.subscriptions.find_pending_for_user(user_id).await?;
        let subscription_request_id = match pending {
            Some(request) => {
                self.subscriptions.set_receipt(request.id, &url).await?;
                Some(request.id)
            }
            None => None,
        };

        Ok(ReceiptUploaded {
            receipt_url: url,
            subscription_request_id,
        })
    }

    /// Creates the configured admin account unless the username is already taken.
    pub async fn seed_admin(&self, seed: &AdminSeed) -> AppResult<()> {
        if self.users.find_by_username(&seed.username).await?.is_some() {
            log::info!("Admin account '{}' already present", seed.username);
            return Ok(());
        }

        validate_password_policy(seed.password.expose_secret()).map_err(|_| {
            AppError::ValidationError("Admin password does not meet the password policy".to_string())
        })?;

        let password_hash = hash_password(seed.password.expose_secret())?;
        let admin = User::new_admin(&seed.username, &seed.email, &password_hash);
        let admin = self.users.create(admin).await?;

        log::info!("Seeded admin account '{}' ({})", admin.username, admin.id);
        Ok(())
    }
}
