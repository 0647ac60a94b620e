use anyhow::{Result, anyhow};
use chrono::{Duration, Utc};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};

/// Bearer token claims. `sub` is the acting admin's id.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    pub sub: String,
    pub exp: usize,
    pub jti: String,
}

/// Issues a short-lived token. Token issuance belongs to the identity service; this
/// exists for local tooling and tests.
pub fn create_jwt(actor_id: &str, secret: &str) -> Result<String> {
    let expiration = Utc::now()
        .checked_add_signed(Duration::hours(24))
        .ok_or_else(|| anyhow!("invalid token expiry"))?
        .timestamp();

    let claims = Claims {
        sub: actor_id.to_owned(),
        exp: expiration as usize,
        jti: uuid::Uuid::new_v4().to_string(),
    };

    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_ref()),
    )?;

    Ok(token)
}

pub fn validate_jwt(token: &str, secret: &str) -> Result<Claims> {
    let token_data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_ref()),
        &Validation::default(),
    )?;
    Ok(token_data.claims)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_jwt_cycle() {
        let token = create_jwt("admin_1", "test_secret").unwrap();
        let claims = validate_jwt(&token, "test_secret").unwrap();
        assert_eq!(claims.sub, "admin_1");
    }

    #[test]
    fn test_wrong_secret_rejected() {
        let token = create_jwt("admin_1", "test_secret").unwrap();
        assert!(validate_jwt(&token, "other_secret").is_err());
        assert!(validate_jwt("not-a-token", "test_secret").is_err());
    }
}
