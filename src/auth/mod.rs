mod helpers;
mod jwt;
mod middleware;
mod password;

pub use helpers::load_actor;
pub use jwt::{Claims, TokenIssuer, generate_secret};
pub use middleware::{AuthError, RequireAuth};
pub use password::{generate_password, hash_password, verify_password};
