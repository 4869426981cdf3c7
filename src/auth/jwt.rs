use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use time::{Duration, OffsetDateTime};
use tracing::debug;
use uuid::Uuid;

use super::claims::Claims;

/// Sessions last three days from issuance.
pub const SESSION_TTL: Duration = Duration::days(3);

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum TokenError {
    #[error("invalid token")]
    Invalid,
    #[error("token expired")]
    Expired,
}

/// Signs and verifies session tokens with a single process-wide secret.
#[derive(Clone)]
pub struct TokenService {
    encoding: EncodingKey,
    decoding: DecodingKey,
    ttl: Duration,
}

impl std::fmt::Debug for TokenService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenService")
            .field("ttl", &self.ttl)
            .finish_non_exhaustive()
    }
}

impl TokenService {
    pub fn new(secret: &[u8], ttl: Duration) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
            ttl,
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn issue(&self, email: &str, user_id: Uuid) -> anyhow::Result<String> {
        self.issue_at(email, user_id, OffsetDateTime::now_utc())
    }

    pub fn issue_at(&self, email: &str, user_id: Uuid, now: OffsetDateTime) -> anyhow::Result<String> {
        let claims = Claims {
            sub: user_id,
            email: email.to_string(),
            iat: now.unix_timestamp(),
            exp: (now + self.ttl).unix_timestamp(),
        };
        let token = encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)?;
        debug!(user_id = %user_id, "jwt signed");
        Ok(token)
    }

    pub fn verify(&self, token: &str) -> Result<Claims, TokenError> {
        self.verify_at(token, OffsetDateTime::now_utc())
    }

    /// Checks signature and expiry against `now`. Expiry is strict: a token
    /// is dead from its `exp` second onwards, with no leeway.
    pub fn verify_at(&self, token: &str, now: OffsetDateTime) -> Result<Claims, TokenError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = false;
        validation.leeway = 0;
        let data = decode::<Claims>(token, &self.decoding, &validation).map_err(|e| {
            debug!(error = %e, "jwt rejected");
            TokenError::Invalid
        })?;
        if data.claims.exp <= now.unix_timestamp() {
            debug!(user_id = %data.claims.sub, "jwt expired");
            return Err(TokenError::Expired);
        }
        debug!(user_id = %data.claims.sub, "jwt verified");
        Ok(data.claims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn service(secret: &str) -> TokenService {
        TokenService::new(secret.as_bytes(), SESSION_TTL)
    }

    #[test]
    fn issue_and_verify() {
        let tokens = service("dev-secret");
        let user_id = Uuid::new_v4();
        let token = tokens.issue("ada@example.com", user_id).expect("issue");
        let claims = tokens.verify(&token).expect("verify");
        assert_eq!(claims.sub, user_id);
        assert_eq!(claims.email, "ada@example.com");
        assert_eq!(claims.exp - claims.iat, 3 * 24 * 60 * 60);
    }

    #[test]
    fn valid_after_an_hour_expired_after_three_days() {
        let tokens = service("dev-secret");
        let t = OffsetDateTime::now_utc();
        let token = tokens.issue_at("ada@example.com", Uuid::new_v4(), t).unwrap();

        assert!(tokens.verify_at(&token, t + Duration::hours(1)).is_ok());
        assert_eq!(
            tokens.verify_at(&token, t + Duration::days(3) + Duration::seconds(1)),
            Err(TokenError::Expired)
        );
    }

    #[test]
    fn rejects_token_signed_with_other_key() {
        let good = service("same-secret");
        let bad = service("other-secret");
        let token = good.issue("ada@example.com", Uuid::new_v4()).unwrap();
        assert_eq!(bad.verify(&token), Err(TokenError::Invalid));
    }

    #[test]
    fn rejects_garbage_and_tampered_tokens() {
        let tokens = service("dev-secret");
        assert_eq!(tokens.verify("not.a.jwt"), Err(TokenError::Invalid));
        assert_eq!(tokens.verify(""), Err(TokenError::Invalid));

        // Swap in the payload of another user's token, keep the original signature.
        let victim = tokens.issue("ada@example.com", Uuid::new_v4()).unwrap();
        let forged = tokens.issue("eve@example.com", Uuid::new_v4()).unwrap();
        let v: Vec<&str> = victim.split('.').collect();
        let f: Vec<&str> = forged.split('.').collect();
        let tampered = format!("{}.{}.{}", v[0], f[1], v[2]);
        assert_eq!(tokens.verify(&tampered), Err(TokenError::Invalid));
    }
}
