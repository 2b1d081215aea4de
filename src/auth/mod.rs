pub mod claims;
pub mod jwt;
pub mod middleware;
pub mod utils;

pub use claims::{Claims, ResetClaims};
pub use jwt::JwtService;
pub use middleware::{AdminUser, AuthMiddleware, CurrentUser};
pub use utils::{hash_token, require_active, require_admin};
