use sha2::{Digest, Sha256};

use crate::{
    errors::{AppError, AppResult},
    models::domain::user::{User, UserRole},
};

pub fn require_admin(user: &User) -> AppResult<()> {
    if user.role != UserRole::Admin {
        return Err(AppError::Forbidden(
            "Only admins can perform this action".to_string(),
        ));
    }
    Ok(())
}

pub fn require_active(user: &User) -> AppResult<()> {
    if !user.is_active {
        return Err(AppError::Unauthorized(
            "Account is not active".to_string(),
        ));
    }
    Ok(())
}

/// Hex SHA-256 of a token, the only form in which issued tokens are stored.
pub fn hash_token(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    format!("{:x}", hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_require_admin() {
        let mut user = User::test_student(1, "student1");
        assert!(matches!(require_admin(&user), Err(AppError::Forbidden(_))));

        user.role = UserRole::Admin;
        assert!(require_admin(&user).is_ok());
    }

    #[test]
    fn test_require_active() {
        let mut user = User::test_student(1, "student1");
        user.is_active = false;

        assert!(matches!(require_active(&user), Err(AppError::Unauthorized(_))));
    }

    #[test]
    fn test_hash_token_is_stable_hex() {
        let first = hash_token("abc");

        assert_eq!(first, hash_token("abc"));
        assert_eq!(first.len(), 64);
        assert_eq!(
            first,
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }
}
