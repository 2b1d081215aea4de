use std::env;
use secrecy::SecretString;

use crate::errors::{AppError, AppResult};

const DEFAULT_JWT_SECRET: &str = "dev_secret_key_change_in_production";

#[derive(Clone, Debug)]
pub struct Config {
    pub mongo_conn_string: String,
    pub mongo_db_name: String,
    pub web_server_host: String,
    pub web_server_port: u16,
    pub jwt_secret: SecretString,
    pub jwt_expiration_hours: i64,
    pub reset_token_expiration_hours: i64,
    pub upload_dir: String,
    pub receipt_url_prefix: String,
    pub payment_number: String,
    pub captcha_secret: Option<SecretString>,
    pub captcha_verify_url: String,
    pub admin_seed: Option<AdminSeed>,
    pub app_env: String,
}

/// Credentials for the admin account created at startup when none exists.
#[derive(Clone, Debug)]
pub struct AdminSeed {
    pub username: String,
    pub email: String,
    pub password: SecretString,
}

impl Config {
    pub fn from_env() -> Self {
        Self {
            mongo_conn_string: env::var("MONGO_CONN_STRING")
                .unwrap_or_else(|_| "mongodb://localhost:27017/?replicaSet=rs0".to_string()),
            mongo_db_name: env::var("MONGO_DB_NAME")
                .unwrap_or_else(|_| "nursopedia-local".to_string()),
            web_server_host: env::var("WEB_SERVER_HOST")
                .unwrap_or_else(|_| "localhost".to_string()),
            web_server_port: env::var("WEB_SERVER_PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(8080),
            jwt_secret: SecretString::from(
                env::var("JWT_SECRET").unwrap_or_else(|_| DEFAULT_JWT_SECRET.to_string()),
            ),
            jwt_expiration_hours: env::var("JWT_EXPIRATION_HOURS")
                .ok()
                .and_then(|h| h.parse().ok())
                .unwrap_or(24 * 7),
            reset_token_expiration_hours: env::var("RESET_TOKEN_EXPIRATION_HOURS")
                .ok()
                .and_then(|h| h.parse().ok())
                .unwrap_or(1),
            upload_dir: env::var("UPLOAD_DIR").unwrap_or_else(|_| "static/receipts".to_string()),
            receipt_url_prefix: env::var("RECEIPT_URL_PREFIX")
                .unwrap_or_else(|_| "/static/receipts".to_string()),
            payment_number: env::var("PAYMENT_NUMBER")
                .unwrap_or_else(|_| "01080938298".to_string()),
            captcha_secret: env::var("CAPTCHA_SECRET")
                .ok()
                .filter(|s| !s.trim().is_empty())
                .map(SecretString::from),
            captcha_verify_url: env::var("CAPTCHA_VERIFY_URL")
                .unwrap_or_else(|_| "https://www.google.com/recaptcha/api/siteverify".to_string()),
            admin_seed: Self::admin_seed_from_env(),
            app_env: env::var("APP_ENV").unwrap_or_else(|_| "development".to_string()),
        }
    }

    fn admin_seed_from_env() -> Option<AdminSeed> {
        let username = env::var("ADMIN_USERNAME").ok()?;
        let password = env::var("ADMIN_PASSWORD").ok()?;
        let email = env::var("ADMIN_EMAIL").unwrap_or_else(|_| format!("{}@nursopedia.local", username));

        Some(AdminSeed {
            username,
            email,
            password: SecretString::from(password),
        })
    }

    pub fn is_production(&self) -> bool {
        self.app_env.eq_ignore_ascii_case("production")
    }

    /// Refuses to start a production server with development secrets.
    pub fn validate_for_production(&self) -> AppResult<()> {
        use secrecy::ExposeSecret;

        let jwt_secret = self.jwt_secret.expose_secret();

        if jwt_secret == DEFAULT_JWT_SECRET {
            return Err(AppError::InternalError(
                "JWT_SECRET is using its default value; set it to a secure random string".to_string(),
            ));
        }

        if jwt_secret.len() < 32 {
            return Err(AppError::InternalError(format!(
                "JWT_SECRET is too short ({}); it must be at least 32 characters",
                jwt_secret.len()
            )));
        }

        Ok(())
    }

    #[cfg(test)]
    pub fn test_config() -> Self {
        Self {
            mongo_conn_string: "mongodb://localhost:27017".to_string(),
            mongo_db_name: "nursopedia-test".to_string(),
            web_server_host: "127.0.0.1".to_string(),
            web_server_port: 8080,
            jwt_secret: SecretString::from("test_jwt_secret_key".to_string()),
            jwt_expiration_hours: 1,
            reset_token_expiration_hours: 1,
            upload_dir: "target/test-receipts".to_string(),
            receipt_url_prefix: "/static/receipts".to_string(),
            payment_number: "01000000000".to_string(),
            captcha_secret: None,
            captcha_verify_url: "http://localhost/verify".to_string(),
            admin_seed: None,
            app_env: "test".to_string(),
        }
    }
}
