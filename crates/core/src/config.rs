//! Core runtime configuration.
//!
//! Configuration is resolved once at process startup and then passed into
//! core services. Request handlers never read process-wide environment
//! variables, which keeps behaviour consistent across multi-threaded
//! runtimes and test harnesses.

use crate::{AdherenceError, AdherenceResult, NonEmptyText};
use std::path::{Path, PathBuf};

/// Default lifetime of an access token: one hour.
pub const DEFAULT_ACCESS_TTL_SECS: i64 = 60 * 60;
/// Default lifetime of a refresh token: seven days.
pub const DEFAULT_REFRESH_TTL_SECS: i64 = 7 * 24 * 60 * 60;

/// Core configuration resolved at startup.
#[derive(Clone, Debug)]
pub struct CoreConfig {
    data_dir: PathBuf,
    token_secret: NonEmptyText,
    access_ttl_secs: i64,
    refresh_ttl_secs: i64,
}

impl CoreConfig {
    /// Create a new `CoreConfig`.
    ///
    /// Token lifetimes must be positive; the secret cannot be empty (the
    /// `NonEmptyText` type enforces that at construction).
    pub fn new(
        data_dir: PathBuf,
        token_secret: NonEmptyText,
        access_ttl_secs: i64,
        refresh_ttl_secs: i64,
    ) -> AdherenceResult<Self> {
        if access_ttl_secs <= 0 || refresh_ttl_secs <= 0 {
            return Err(AdherenceError::Validation(
                "token lifetimes must be positive".into(),
            ));
        }

        Ok(Self {
            data_dir,
            token_secret,
            access_ttl_secs,
            refresh_ttl_secs,
        })
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    pub fn token_secret(&self) -> &str {
        self.token_secret.as_str()
    }

    pub fn access_ttl_secs(&self) -> i64 {
        self.access_ttl_secs
    }

    pub fn refresh_ttl_secs(&self) -> i64 {
        self.refresh_ttl_secs
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_non_positive_token_lifetimes() {
        let secret = NonEmptyText::new("secret").unwrap();
        let err = CoreConfig::new(PathBuf::from("/tmp/x"), secret.clone(), 0, 60)
            .expect_err("zero access ttl should be rejected");
        assert!(matches!(err, AdherenceError::Validation(_)));

        let err = CoreConfig::new(PathBuf::from("/tmp/x"), secret, 60, -1)
            .expect_err("negative refresh ttl should be rejected");
        assert!(matches!(err, AdherenceError::Validation(_)));
    }

    #[test]
    fn exposes_resolved_values() {
        let cfg = CoreConfig::new(
            PathBuf::from("/data"),
            NonEmptyText::new("secret").unwrap(),
            DEFAULT_ACCESS_TTL_SECS,
            DEFAULT_REFRESH_TTL_SECS,
        )
        .unwrap();

        assert_eq!(cfg.data_dir(), Path::new("/data"));
        assert_eq!(cfg.token_secret(), "secret");
        assert_eq!(cfg.access_ttl_secs(), 3600);
        assert_eq!(cfg.refresh_ttl_secs(), 604800);
    }
}
