use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    #[default]
    Student,
    Admin,
}

impl UserRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            UserRole::Student => "student",
            UserRole::Admin => "admin",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub full_name: String,
    pub phone_number: String,
    pub role: UserRole,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_login: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password_reset_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password_reset_expires: Option<DateTime<Utc>>,
}

impl User {
    /// A freshly registered student awaiting approval. The id is assigned on insert.
    pub fn new_student(
        username: &str,
        email: &str,
        password_hash: &str,
        full_name: &str,
        phone_number: &str,
    ) -> Self {
        let now = Utc::now();
        User {
            id: 0,
            username: username.to_string(),
            email: email.to_string(),
            password_hash: password_hash.to_string(),
            full_name: full_name.to_string(),
            phone_number: phone_number.to_string(),
            role: UserRole::Student,
            is_active: false,
            created_at: now,
            updated_at: now,
            last_login: None,
            password_reset_token: None,
            password_reset_expires: None,
        }
    }

    pub fn new_admin(username: &str, email: &str, password_hash: &str) -> Self {
        User {
            role: UserRole::Admin,
            is_active: true,
            ..User::new_student(username, email, password_hash, "Administrator", "0000000000")
        }
    }

    pub fn is_admin(&self) -> bool {
        self.role == UserRole::Admin
    }

    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }

    pub fn clear_password_reset(&mut self) {
        self.password_reset_token = None;
        self.password_reset_expires = None;
    }
}

#[cfg(test)]
impl User {
    pub fn test_student(id: i64, username: &str) -> Self {
        User {
            id,
            ..User::new_student(
                username,
                &format!("{}@example.com", username),
                "hash",
                "Test Student",
                "01000000000",
            )
        }
    }
}
