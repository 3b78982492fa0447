pub use identity::{AuthError, Identity};
pub use token::{Claims, InvalidToken, TokenService};

pub mod identity;
pub mod password;
pub mod token;
