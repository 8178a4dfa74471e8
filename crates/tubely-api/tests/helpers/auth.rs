use chrono::Duration;
use tubely_api::auth::JwtValidator;
use uuid::Uuid;

/// Secret shared by the test server and the tokens minted here.
pub const TEST_JWT_SECRET: &str = "test-jwt-secret-at-least-32-characters-long";

pub fn validator() -> JwtValidator {
    JwtValidator::new(TEST_JWT_SECRET)
}

/// A valid access token for `user_id`.
pub fn token_for(user_id: Uuid) -> String {
    validator()
        .issue_token(user_id, Duration::hours(1))
        .expect("Failed to issue test token")
}

/// `Authorization` header value for `user_id`.
pub fn bearer(user_id: Uuid) -> String {
    format!("Bearer {}", token_for(user_id))
}
