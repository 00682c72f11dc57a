//! Signed identity tokens.
//!
//! Tokens are HS256 JWTs carrying a fixed-shape claim set: the subject user id
//! (string-encoded) and an absolute expiry instant. There is no server-side
//! token store and no revocation; a token is valid iff its signature matches
//! the process-wide secret and the current time is before its expiry.

use anyhow::{Context, Result};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

/// Token lifetime in seconds. Observed behavior of the system being tracked;
/// see DESIGN.md before changing.
pub const TOKEN_TTL_SECS: i64 = 60;

/// Claim set carried by an identity token. Fixed shape: no open-ended map.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Subject user id, string-encoded.
    #[serde(rename = "userID")]
    pub user_id: String,
    /// Expiry as unix seconds.
    pub exp: i64,
}

/// Issue a token for the given user id, expiring `TOKEN_TTL_SECS` from now.
pub fn issue_token(secret: &[u8], user_id: i64) -> Result<String> {
    let claims = Claims {
        user_id: user_id.to_string(),
        exp: (Utc::now() + Duration::seconds(TOKEN_TTL_SECS)).timestamp(),
    };
    encode(&Header::new(Algorithm::HS256), &claims, &EncodingKey::from_secret(secret))
        .context("token signing failed")
}

/// Validate a token string and return its claims.
///
/// Rejects tokens signed with anything other than HS256 (algorithm
/// substitution), bad signatures, malformed tokens, and expired tokens.
/// Expiry is checked with zero leeway so the TTL bound holds exactly.
/// Callers get pass/fail only; the distinct cause is for logging.
pub fn validate_token(token: &str, secret: &[u8]) -> Result<Claims> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.leeway = 0;
    let data = decode::<Claims>(token, &DecodingKey::from_secret(secret), &validation)
        .context("token validation failed")?;
    Ok(data.claims)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &[u8] = b"unit-test-secret";

    #[test]
    fn issue_then_validate_returns_subject() {
        let tok = issue_token(SECRET, 42).unwrap();
        let claims = validate_token(&tok, SECRET).unwrap();
        assert_eq!(claims.user_id, "42");
        assert!(claims.exp > Utc::now().timestamp());
    }

    #[test]
    fn wrong_secret_rejected() {
        let tok = issue_token(SECRET, 7).unwrap();
        assert!(validate_token(&tok, b"a-different-secret").is_err());
    }

    #[test]
    fn malformed_and_empty_tokens_rejected() {
        assert!(validate_token("", SECRET).is_err());
        assert!(validate_token("not.a.jwt", SECRET).is_err());
    }

    #[test]
    fn expired_token_rejected_even_with_correct_secret() {
        let claims = Claims { user_id: "42".into(), exp: (Utc::now() - Duration::seconds(30)).timestamp() };
        let tok = encode(&Header::new(Algorithm::HS256), &claims, &EncodingKey::from_secret(SECRET)).unwrap();
        assert!(validate_token(&tok, SECRET).is_err());
    }

    #[test]
    fn non_hs256_algorithm_rejected() {
        let claims = Claims { user_id: "42".into(), exp: (Utc::now() + Duration::seconds(60)).timestamp() };
        let tok = encode(&Header::new(Algorithm::HS384), &claims, &EncodingKey::from_secret(SECRET)).unwrap();
        assert!(validate_token(&tok, SECRET).is_err());
    }

    #[test]
    fn token_omits_plaintext_subject_secret() {
        // The claim set is exactly {userID, exp}; nothing else rides along.
        let tok = issue_token(SECRET, 9).unwrap();
        let claims = validate_token(&tok, SECRET).unwrap();
        let json = serde_json::to_value(&claims).unwrap();
        assert_eq!(json.as_object().unwrap().len(), 2);
        assert_eq!(json["userID"], "9");
    }
}
