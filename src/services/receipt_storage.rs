use std::path::PathBuf;

use uuid::Uuid;

use crate::errors::{AppError, AppResult};

const ALLOWED_EXTENSIONS: [&str; 5] = ["png", "jpg", "jpeg", "gif", "pdf"];

/// Writes payment receipts to a local directory served under `url_prefix`.
#[derive(Debug, Clone)]
pub struct ReceiptStorage {
    dir: PathBuf,
    url_prefix: String,
}

pub fn allowed_extension(filename: &str) -> bool {
    filename
        .rsplit_once('.')
        .map(|(_, ext)| ALLOWED_EXTENSIONS.contains(&ext.to_lowercase().as_str()))
        .unwrap_or(false)
}

/// Keeps ASCII letters, digits, dots, dashes and underscores; spaces become underscores.
pub fn sanitize_filename(filename: &str) -> String {
    let base = filename.rsplit(['/', '\\']).next().unwrap_or(filename);
    let cleaned: String = base
        .trim()
        .chars()
        .filter_map(|c| match c {
            c if c.is_ascii_alphanumeric() || c == '.' || c == '-' || c == '_' => Some(c),
            c if c.is_whitespace() => Some('_'),
            _ => None,
        })
        .collect();

    cleaned.trim_start_matches('.').to_string()
}

impl ReceiptStorage {
    pub fn new(dir: impl Into<PathBuf>, url_prefix: &str) -> Self {
        Self {
            dir: dir.into(),
            url_prefix: url_prefix.trim_end_matches('/').to_string(),
        }
    }

    /// Saves the file and returns the public URL it is served from.
    pub async fn store(&self, user_id: i64, original_name: &str, contents: &[u8]) -> AppResult<String> {
        if original_name.trim().is_empty() {
            return Err(AppError::ValidationError("No file selected".to_string()));
        }
        if !allowed_extension(original_name) {
            return Err(AppError::ValidationError(
                "Unsupported file type".to_string(),
            ));
        }

        let filename = format!(
            "{}_{}_{}",
            user_id,
            Uuid::new_v4().simple(),
            sanitize_filename(original_name)
        );

        tokio::fs::create_dir_all(&self.dir).await?;
        tokio::fs::write(self.dir.join(&filename), contents).await?;

        log::info!("Stored receipt {} for user {}", filename, user_id);
        Ok(format!("{}/{}", self.url_prefix, filename))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_allowed_extensions() {
        assert!(allowed_extension("receipt.PNG"));
        assert!(allowed_extension("scan.final.pdf"));
        assert!(!allowed_extension("script.exe"));
        assert!(!allowed_extension("noextension"));
    }

    #[test]
    fn test_sanitize_filename() {
        assert_eq!(sanitize_filename("../../etc/passwd"), "passwd");
        assert_eq!(sanitize_filename("my receipt (1).jpg"), "my_receipt_1.jpg");
        assert_eq!(sanitize_filename(".hidden.png"), "hidden.png");
    }

    #[tokio::test]
    async fn test_store_writes_file_and_returns_url() {
        let dir = std::env::temp_dir().join(format!("receipts-{}", Uuid::new_v4()));
        let storage = ReceiptStorage::new(&dir, "/static/receipts/");

        let url = storage.store(7, "bank slip.pdf", b"%PDF-1.4").await.unwrap();

        assert!(url.starts_with("/static/receipts/7_"));
        assert!(url.ends_with("_bank_slip.pdf"));
        let name = url.rsplit('/').next().unwrap();
        assert_eq!(tokio::fs::read(dir.join(name)).await.unwrap(), b"%PDF-1.4");

        tokio::fs::remove_dir_all(&dir).await.unwrap();
    }

    #[tokio::test]
    async fn test_store_rejects_unsupported_type() {
        let storage = ReceiptStorage::new(std::env::temp_dir(), "/static/receipts");

        let result = storage.store(7, "virus.exe", b"MZ").await;

        assert!(matches!(result, Err(AppError::ValidationError(_))));
    }
}
