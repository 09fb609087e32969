pub mod auth;
pub mod rate_limit;

pub use auth::SecretVerifier;
pub use rate_limit::{RateDecision, SlidingWindowLimiter};
