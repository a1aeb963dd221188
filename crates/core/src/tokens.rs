//! Token issuance and password hashing.
//!
//! Access and refresh tokens are HS256 JWTs. A refresh token's `jti` can
//! be revoked at logout; revocations persist in the entity store so they
//! survive restarts. Password strength policy is delegated to argon2's
//! defaults.

use crate::config::CoreConfig;
use crate::error::{AdherenceError, AdherenceResult};
use crate::store::EntityStore;
use argon2::password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Whether a token grants API access or only a refresh exchange.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenKind {
    Access,
    Refresh,
}

/// JWT claims carried by both token kinds.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// User id.
    pub sub: Uuid,
    /// Unique token id, the unit of revocation for refresh tokens.
    pub jti: String,
    pub kind: TokenKind,
    pub iat: i64,
    pub exp: i64,
}

/// An access/refresh pair issued at login.
#[derive(Debug, Clone)]
pub struct TokenPair {
    pub access: String,
    pub refresh: String,
}

/// Issues, verifies, and revokes tokens; hashes and verifies passwords.
pub struct TokenService {
    encoding: EncodingKey,
    decoding: DecodingKey,
    access_ttl: Duration,
    refresh_ttl: Duration,
}

impl TokenService {
    pub fn new(cfg: &CoreConfig) -> Self {
        let secret = cfg.token_secret().as_bytes();
        Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
            access_ttl: Duration::seconds(cfg.access_ttl_secs()),
            refresh_ttl: Duration::seconds(cfg.refresh_ttl_secs()),
        }
    }

    /// Hashes a password with a fresh random salt.
    pub fn hash_password(&self, password: &str) -> AdherenceResult<String> {
        let salt = SaltString::generate(&mut OsRng);
        Argon2::default()
            .hash_password(password.as_bytes(), &salt)
            .map(|hash| hash.to_string())
            .map_err(AdherenceError::PasswordHash)
    }

    /// Verifies a password against a stored hash. An unparseable hash
    /// verifies as false rather than erroring.
    pub fn verify_password(&self, password: &str, hash: &str) -> bool {
        PasswordHash::new(hash)
            .map(|parsed| {
                Argon2::default()
                    .verify_password(password.as_bytes(), &parsed)
                    .is_ok()
            })
            .unwrap_or(false)
    }

    /// Issues an access/refresh pair for a user.
    pub fn issue_pair(&self, user_id: Uuid, now: DateTime<Utc>) -> AdherenceResult<TokenPair> {
        Ok(TokenPair {
            access: self.issue(user_id, TokenKind::Access, self.access_ttl, now)?,
            refresh: self.issue(user_id, TokenKind::Refresh, self.refresh_ttl, now)?,
        })
    }

    fn issue(
        &self,
        user_id: Uuid,
        kind: TokenKind,
        ttl: Duration,
        now: DateTime<Utc>,
    ) -> AdherenceResult<String> {
        let claims = Claims {
            sub: user_id,
            jti: Uuid::new_v4().to_string(),
            kind,
            iat: now.timestamp(),
            exp: (now + ttl).timestamp(),
        };
        encode(&Header::default(), &claims, &self.encoding).map_err(AdherenceError::TokenEncode)
    }

    /// Decodes a token and checks its kind. Expiry is validated by the
    /// JWT library; a refresh token presented where an access token is
    /// expected (or vice versa) is rejected.
    pub fn verify(&self, token: &str, expected: TokenKind) -> AdherenceResult<Claims> {
        let data = decode::<Claims>(token, &self.decoding, &Validation::default())
            .map_err(|e| AdherenceError::Auth(format!("invalid token: {e}")))?;
        if data.claims.kind != expected {
            return Err(AdherenceError::Auth("wrong token kind".into()));
        }
        Ok(data.claims)
    }

    /// Exchanges a valid, un-revoked refresh token for a new access token.
    pub fn refresh_access(
        &self,
        store: &EntityStore,
        refresh_token: &str,
        now: DateTime<Utc>,
    ) -> AdherenceResult<String> {
        let claims = self.verify(refresh_token, TokenKind::Refresh)?;
        if store.is_jti_revoked(&claims.jti) {
            return Err(AdherenceError::Auth("refresh token has been revoked".into()));
        }
        self.issue(claims.sub, TokenKind::Access, self.access_ttl, now)
    }

    /// Revokes a refresh token. A malformed or already revoked token is
    /// an auth error.
    pub fn revoke_refresh(&self, store: &EntityStore, refresh_token: &str) -> AdherenceResult<()> {
        let claims = self.verify(refresh_token, TokenKind::Refresh)?;
        store.revoke_jti(&claims.jti)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::NonEmptyText;
    use tempfile::TempDir;

    fn service_and_store() -> (TokenService, EntityStore, TempDir) {
        let dir = TempDir::new().unwrap();
        let cfg = CoreConfig::new(
            dir.path().to_path_buf(),
            NonEmptyText::new("test-secret").unwrap(),
            3600,
            604800,
        )
        .unwrap();
        let store = EntityStore::open(&cfg).unwrap();
        (TokenService::new(&cfg), store, dir)
    }

    #[test]
    fn password_hash_verifies_and_rejects_wrong_password() {
        let (service, _, _dir) = service_and_store();
        let hash = service.hash_password("correct horse").unwrap();

        assert!(service.verify_password("correct horse", &hash));
        assert!(!service.verify_password("battery staple", &hash));
        assert!(!service.verify_password("correct horse", "not-a-hash"));
    }

    #[test]
    fn issued_pair_verifies_by_kind() {
        let (service, _, _dir) = service_and_store();
        let user_id = Uuid::new_v4();
        let pair = service.issue_pair(user_id, Utc::now()).unwrap();

        let access = service.verify(&pair.access, TokenKind::Access).unwrap();
        assert_eq!(access.sub, user_id);

        let refresh = service.verify(&pair.refresh, TokenKind::Refresh).unwrap();
        assert_eq!(refresh.sub, user_id);
    }

    #[test]
    fn access_token_is_not_a_refresh_token() {
        let (service, store, _dir) = service_and_store();
        let pair = service.issue_pair(Uuid::new_v4(), Utc::now()).unwrap();

        let err = service
            .refresh_access(&store, &pair.access, Utc::now())
            .expect_err("access token must not refresh");
        assert!(matches!(err, AdherenceError::Auth(_)));

        let err = service
            .verify(&pair.refresh, TokenKind::Access)
            .expect_err("refresh token must not authenticate");
        assert!(matches!(err, AdherenceError::Auth(_)));
    }

    #[test]
    fn refresh_exchange_yields_a_working_access_token() {
        let (service, store, _dir) = service_and_store();
        let user_id = Uuid::new_v4();
        let pair = service.issue_pair(user_id, Utc::now()).unwrap();

        let access = service
            .refresh_access(&store, &pair.refresh, Utc::now())
            .unwrap();
        let claims = service.verify(&access, TokenKind::Access).unwrap();
        assert_eq!(claims.sub, user_id);
    }

    #[test]
    fn revoked_refresh_token_stops_refreshing_and_cannot_revoke_again() {
        let (service, store, _dir) = service_and_store();
        let pair = service.issue_pair(Uuid::new_v4(), Utc::now()).unwrap();

        service.revoke_refresh(&store, &pair.refresh).unwrap();

        let err = service
            .refresh_access(&store, &pair.refresh, Utc::now())
            .expect_err("revoked token must not refresh");
        assert!(matches!(err, AdherenceError::Auth(_)));

        let err = service
            .revoke_refresh(&store, &pair.refresh)
            .expect_err("second revocation must fail");
        assert!(matches!(err, AdherenceError::Auth(_)));
    }

    #[test]
    fn malformed_refresh_token_is_an_auth_error() {
        let (service, store, _dir) = service_and_store();
        let err = service
            .revoke_refresh(&store, "not-a-token")
            .expect_err("garbage must not revoke");
        assert!(matches!(err, AdherenceError::Auth(_)));
    }

    #[test]
    fn expired_token_is_rejected() {
        let (service, _, _dir) = service_and_store();
        // Issued far enough in the past that even validation leeway
        // cannot save it.
        let long_ago = Utc::now() - Duration::days(30);
        let pair = service.issue_pair(Uuid::new_v4(), long_ago).unwrap();

        let err = service
            .verify(&pair.access, TokenKind::Access)
            .expect_err("expired token must be rejected");
        assert!(matches!(err, AdherenceError::Auth(_)));
    }
}
