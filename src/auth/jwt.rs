use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use secrecy::{ExposeSecret, SecretString};

use crate::{
    auth::claims::{Claims, ResetClaims, PASSWORD_RESET_TOKEN_TYPE},
    errors::{AppError, AppResult},
    models::domain::user::User,
};

#[derive(Clone)]
pub struct JwtService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
    expiration_hours: i64,
    reset_expiration_hours: i64,
}

impl JwtService {
    pub fn new(secret: &SecretString, expiration_hours: i64, reset_expiration_hours: i64) -> Self {
        let secret_bytes = secret.expose_secret().as_bytes();

        Self {
            encoding_key: EncodingKey::from_secret(secret_bytes),
            decoding_key: DecodingKey::from_secret(secret_bytes),
            validation: Validation::default(),
            expiration_hours,
            reset_expiration_hours,
        }
    }

    pub fn create_token(&self, user: &User) -> AppResult<String> {
        let claims = Claims::new(user, self.expiration_hours);

        encode(&Header::default(), &claims, &self.encoding_key)
            .map_err(|e| AppError::InternalError(format!("Failed to create JWT: {}", e)))
    }

    pub fn validate_token(&self, token: &str) -> AppResult<Claims> {
        decode::<Claims>(token, &self.decoding_key, &self.validation)
            .map(|data| data.claims)
            .map_err(|e| AppError::Unauthorized(format!("Invalid token: {}", e)))
    }

    /// Issues a reset token for `user_id` and returns it with its expiry.
    pub fn create_reset_token(&self, user_id: i64) -> AppResult<(String, DateTime<Utc>)> {
        let claims = ResetClaims::new(user_id, self.reset_expiration_hours);
        let expires_at = Utc::now() + Duration::hours(self.reset_expiration_hours);

        let token = encode(&Header::default(), &claims, &self.encoding_key).map_err(|e| {
            AppError::InternalError(format!("Failed to create reset token: {}", e))
        })?;

        Ok((token, expires_at))
    }

    pub fn validate_reset_token(&self, token: &str) -> AppResult<ResetClaims> {
        let token_data = decode::<ResetClaims>(token, &self.decoding_key, &self.validation)
            .map_err(|e| match e.kind() {
                jsonwebtoken::errors::ErrorKind::ExpiredSignature => {
                    AppError::ValidationError("Reset token has expired".to_string())
                }
                _ => AppError::ValidationError("Invalid reset token".to_string()),
            })?;

        if token_data.claims.token_type != PASSWORD_RESET_TOKEN_TYPE {
            return Err(AppError::ValidationError("Invalid reset token".to_string()));
        }

        Ok(token_data.claims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;

    fn service() -> JwtService {
        let config = Config::test_config();
        JwtService::new(&config.jwt_secret, 168, 1)
    }

    #[test]
    fn test_jwt_create_and_validate() {
        let jwt_service = service();
        let user = User::test_student(3, "huda_s");

        let token = jwt_service.create_token(&user).unwrap();
        let claims = jwt_service.validate_token(&token).unwrap();

        assert_eq!(claims.user_id(), Some(3));
        assert_eq!(claims.username, "huda_s");
    }

    #[test]
    fn test_jwt_invalid_token() {
        let result = service().validate_token("invalid.token.here");
        assert!(matches!(result, Err(AppError::Unauthorized(_))));
    }

    #[test]
    fn test_reset_token_create_and_validate() {
        let jwt_service = service();

        let (token, expires_at) = jwt_service.create_reset_token(3).unwrap();
        let claims = jwt_service.validate_reset_token(&token).unwrap();

        assert_eq!(claims.sub, "3");
        assert!(expires_at > Utc::now());
    }

    #[test]
    fn test_login_token_is_not_a_reset_token() {
        let jwt_service = service();
        let token = jwt_service
            .create_token(&User::test_student(3, "huda_s"))
            .unwrap();

        let result = jwt_service.validate_reset_token(&token);

        assert!(matches!(result, Err(AppError::ValidationError(_))));
    }
}
