use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;

use crate::errors::{AppError, AppResult};

#[async_trait]
pub trait CaptchaVerifier: Send + Sync {
    async fn verify(&self, token: &str) -> AppResult<bool>;
}

#[derive(Debug, Deserialize)]
struct SiteVerifyResponse {
    success: bool,
    #[serde(default, rename = "error-codes")]
    error_codes: Vec<String>,
}

/// Checks tokens against a reCAPTCHA-compatible `siteverify` endpoint.
pub struct RecaptchaVerifier {
    client: reqwest::Client,
    secret: SecretString,
    verify_url: String,
}

impl RecaptchaVerifier {
    pub fn new(secret: SecretString, verify_url: &str) -> Self {
        Self {
            client: reqwest::Client::new(),
            secret,
            verify_url: verify_url.to_string(),
        }
    }
}

#[async_trait]
impl CaptchaVerifier for RecaptchaVerifier {
    async fn verify(&self, token: &str) -> AppResult<bool> {
        let response = self
            .client
            .post(&self.verify_url)
            .form(&[
                ("secret", self.secret.expose_secret()),
                ("response", token),
            ])
            .send()
            .await
            .map_err(|e| AppError::InternalError(format!("Captcha verification failed: {}", e)))?;

        let body: SiteVerifyResponse = response
            .json()
            .await
            .map_err(|e| AppError::InternalError(format!("Invalid captcha response: {}", e)))?;

        if !body.success {
            log::info!("Captcha rejected: {:?}", body.error_codes);
        }

        Ok(body.success)
    }
}
