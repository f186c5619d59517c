//! Username/password authentication against the external user store.

use std::{sync::Arc, time::Duration};

use thiserror::Error;

use crate::{models::Principal, store::UserStoreState};

/// Cost-12 bcrypt hash matching no real account. Unknown usernames are verified against it so
/// they take as long to reject as a wrong password.
pub const UNKNOWN_USER_HASH: &str = "$2b$12$35cpdnfwZvmsyeS.PziIweH6KR1iw.1fAztj2oJSA7BLyJgjJabdG";

/// Why a login attempt failed.
///
/// Both variants reach the caller as the same generic response; the distinction only exists for
/// logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum AuthFailure {
    #[error("invalid credentials")]
    CredentialInvalid,
    #[error("user store unavailable")]
    StoreUnavailable,
}

/// The one-way comparison primitive applied to a stored password hash.
///
/// Implementations may be CPU-bound; the validator always calls them on the blocking pool.
pub trait PasswordVerifier: Send + Sync {
    fn verify(&self, password: &str, stored_hash: &str) -> bool;
}

/// bcrypt-backed [`PasswordVerifier`]. Malformed hashes never match.
#[derive(Debug, Default, Clone, Copy)]
pub struct BcryptVerifier;

impl PasswordVerifier for BcryptVerifier {
    fn verify(&self, password: &str, stored_hash: &str) -> bool {
        bcrypt::verify(password, stored_hash).unwrap_or(false)
    }
}

/// CredentialValidator
///
/// Performs exactly one store read and exactly one password verification per call, and never
/// writes or retries. The lookup is bounded by `lookup_timeout`; a slow store fails the attempt
/// instead of stalling the request.
pub struct CredentialValidator {
    store: UserStoreState,
    verifier: Arc<dyn PasswordVerifier>,
    lookup_timeout: Duration,
}

impl CredentialValidator {
    pub fn new(
        store: UserStoreState,
        verifier: impl PasswordVerifier + 'static,
        lookup_timeout: Duration,
    ) -> Self {
        Self {
            store,
            verifier: Arc::new(verifier),
            lookup_timeout,
        }
    }

    pub async fn authenticate(
        &self,
        username: &str,
        password: &str,
    ) -> Result<Principal, AuthFailure> {
        let lookup = self.store.find_by_username(username);
        let record = match tokio::time::timeout(self.lookup_timeout, lookup).await {
            Ok(Ok(record)) => record,
            Ok(Err(e)) => {
                tracing::warn!(error = %e, "login rejected: user store error");
                return Err(AuthFailure::StoreUnavailable);
            }
            Err(_) => {
                tracing::warn!(
                    timeout_ms = self.lookup_timeout.as_millis() as u64,
                    "login rejected: user store lookup timed out"
                );
                return Err(AuthFailure::StoreUnavailable);
            }
        };

        let stored_hash = record
            .as_ref()
            .map_or(UNKNOWN_USER_HASH, |r| r.password_hash.as_str())
            .to_owned();
        let matched = self.verify_password(password, stored_hash).await;

        match record {
            Some(record) if matched => Ok(record.into_principal()),
            Some(record) => {
                tracing::debug!(user_id = %record.id, "login rejected: password mismatch");
                Err(AuthFailure::CredentialInvalid)
            }
            None => {
                tracing::debug!("login rejected: unknown username");
                Err(AuthFailure::CredentialInvalid)
            }
        }
    }

    async fn verify_password(&self, password: &str, stored_hash: String) -> bool {
        let verifier = Arc::clone(&self.verifier);
        let password = password.to_owned();

        match tokio::task::spawn_blocking(move || verifier.verify(&password, &stored_hash)).await {
            Ok(matched) => matched,
            Err(e) => {
                tracing::error!(error = %e, "password verification task failed");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::{
        sync::{
            Mutex,
            atomic::{AtomicUsize, Ordering},
        },
        time::Instant,
    };

    use async_trait::async_trait;
    use uuid::Uuid;

    use super::*;
    use crate::{
        models::{UserRecord, role_set},
        store::{MemoryUserStore, StoreError, UserStore},
    };

    /// Compares the password to the "hash" verbatim, so tests skip bcrypt's cost.
    struct PlainVerifier;

    impl PasswordVerifier for PlainVerifier {
        fn verify(&self, password: &str, stored_hash: &str) -> bool {
            password == stored_hash
        }
    }

    /// Plain comparison that records how often it ran and which hash it was handed.
    #[derive(Default)]
    struct CountingVerifier {
        calls: AtomicUsize,
        last_hash: Mutex<Option<String>>,
    }

    impl PasswordVerifier for Arc<CountingVerifier> {
        fn verify(&self, password: &str, stored_hash: &str) -> bool {
            self.calls.fetch_add(1, Ordering::SeqCst);
            *self.last_hash.lock().unwrap() = Some(stored_hash.to_owned());
            password == stored_hash
        }
    }

    /// Plain comparison that holds its thread the way an expensive hash would.
    struct SluggishVerifier(Duration);

    impl PasswordVerifier for SluggishVerifier {
        fn verify(&self, password: &str, stored_hash: &str) -> bool {
            std::thread::sleep(self.0);
            password == stored_hash
        }
    }

    struct CountingStore {
        inner: MemoryUserStore,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl UserStore for CountingStore {
        async fn find_by_username(
            &self,
            username: &str,
        ) -> Result<Option<UserRecord>, StoreError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.inner.find_by_username(username).await
        }
    }

    struct SlowStore;

    #[async_trait]
    impl UserStore for SlowStore {
        async fn find_by_username(&self, _: &str) -> Result<Option<UserRecord>, StoreError> {
            tokio::time::sleep(Duration::from_secs(60)).await;
            Ok(None)
        }
    }

    struct BrokenStore;

    #[async_trait]
    impl UserStore for BrokenStore {
        async fn find_by_username(&self, _: &str) -> Result<Option<UserRecord>, StoreError> {
            Err(StoreError::Unavailable("connection refused".into()))
        }
    }

    fn alice() -> UserRecord {
        UserRecord {
            id: Uuid::from_u128(7),
            username: "alice".into(),
            password_hash: "s3cret".into(),
            roles: role_set(["USER", "MODERATOR"]),
        }
    }

    fn validator(store: UserStoreState) -> CredentialValidator {
        CredentialValidator::new(store, PlainVerifier, Duration::from_millis(50))
    }

    #[tokio::test]
    async fn valid_credentials_yield_principal() {
        let v = validator(Arc::new(MemoryUserStore::new([alice()])));

        let principal = v.authenticate("alice", "s3cret").await.unwrap();
        assert_eq!(principal.id(), Uuid::from_u128(7).to_string());
        assert_eq!(principal.username(), "alice");
        assert_eq!(principal.roles(), &role_set(["MODERATOR", "USER"]));
    }

    #[tokio::test]
    async fn unknown_user_and_wrong_password_are_indistinguishable() {
        let v = validator(Arc::new(MemoryUserStore::new([alice()])));

        let unknown = v.authenticate("mallory", "s3cret").await.unwrap_err();
        let wrong = v.authenticate("alice", "guess").await.unwrap_err();

        assert_eq!(unknown, AuthFailure::CredentialInvalid);
        assert_eq!(unknown, wrong);
        assert_eq!(unknown.to_string(), wrong.to_string());
    }

    #[tokio::test]
    async fn one_store_read_per_attempt() {
        let store = Arc::new(CountingStore {
            inner: MemoryUserStore::new([alice()]),
            calls: AtomicUsize::new(0),
        });
        let v = validator(store.clone());

        let _ = v.authenticate("alice", "guess").await;
        let _ = v.authenticate("nobody", "guess").await;
        assert_eq!(store.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn unknown_user_still_pays_for_one_verification() {
        let verifier = Arc::new(CountingVerifier::default());
        let v = CredentialValidator::new(
            Arc::new(MemoryUserStore::new([alice()])),
            verifier.clone(),
            Duration::from_millis(50),
        );

        let unknown = v.authenticate("mallory", "s3cret").await;
        assert_eq!(unknown, Err(AuthFailure::CredentialInvalid));
        assert_eq!(verifier.calls.load(Ordering::SeqCst), 1);
        assert_eq!(
            verifier.last_hash.lock().unwrap().as_deref(),
            Some(UNKNOWN_USER_HASH)
        );

        let wrong = v.authenticate("alice", "guess").await;
        assert_eq!(wrong, Err(AuthFailure::CredentialInvalid));
        assert_eq!(verifier.calls.load(Ordering::SeqCst), 2);
        assert_eq!(verifier.last_hash.lock().unwrap().as_deref(), Some("s3cret"));
    }

    #[tokio::test]
    async fn store_failures_skip_verification() {
        let verifier = Arc::new(CountingVerifier::default());
        let v = CredentialValidator::new(
            Arc::new(BrokenStore),
            verifier.clone(),
            Duration::from_millis(50),
        );

        let _ = v.authenticate("alice", "s3cret").await;
        assert_eq!(verifier.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn verification_does_not_stall_the_runtime() {
        // `#[tokio::test]` runs on a single thread, so a verifier executed inline would hold
        // the timer below until it returned.
        let v = CredentialValidator::new(
            Arc::new(MemoryUserStore::new([alice()])),
            SluggishVerifier(Duration::from_millis(300)),
            Duration::from_millis(50),
        );
        let started = Instant::now();

        let (result, timer_fired_after) = tokio::join!(v.authenticate("alice", "s3cret"), async {
            tokio::time::sleep(Duration::from_millis(10)).await;
            started.elapsed()
        });

        assert!(result.is_ok());
        assert!(
            timer_fired_after < Duration::from_millis(200),
            "timer delayed by {timer_fired_after:?}"
        );
    }

    #[tokio::test]
    async fn slow_store_fails_closed() {
        let v = validator(Arc::new(SlowStore));
        assert_eq!(
            v.authenticate("alice", "s3cret").await,
            Err(AuthFailure::StoreUnavailable)
        );
    }

    #[tokio::test]
    async fn store_errors_fail_closed() {
        let v = validator(Arc::new(BrokenStore));
        assert_eq!(
            v.authenticate("alice", "s3cret").await,
            Err(AuthFailure::StoreUnavailable)
        );
    }

    #[test]
    fn bcrypt_verifier_checks_hashes() {
        let hash = bcrypt::hash("hunter2", 4).unwrap();
        assert!(BcryptVerifier.verify("hunter2", &hash));
        assert!(!BcryptVerifier.verify("hunter3", &hash));
        assert!(!BcryptVerifier.verify("hunter2", "not-a-hash"));
    }

    #[test]
    fn unknown_user_hash_costs_the_same_as_stored_hashes() {
        assert!(UNKNOWN_USER_HASH.starts_with(&format!("$2b${}$", bcrypt::DEFAULT_COST)));
        // Well-formed, so bcrypt does the full work and reports a mismatch instead of an error.
        assert!(matches!(bcrypt::verify("s3cret", UNKNOWN_USER_HASH), Ok(false)));
    }
}
