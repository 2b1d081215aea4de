pub mod access_service;
pub mod auth_service;
pub mod captcha;
pub mod catalog_service;
pub mod content_service;
pub mod exam_service;
pub mod notification_service;
pub mod password;
pub mod pricing;
pub mod profile_service;
pub mod progress_service;
pub mod receipt_storage;
pub mod subscription_service;
