//! Bearer token resolution.
//!
//! The client never stores credentials. A [`CredentialProvider`] is asked for
//! the token at the start of every operation, so a token that disappears (or
//! appears) mid-run is noticed on the next call.
//!
//! Providers:
//! - [`EnvCredentialProvider`]: an environment variable (`SUPA_AUTH_TOKEN` by default)
//! - [`KeyringCredentialProvider`]: the OS keychain via the `keyring` crate
//! - [`StaticCredentialProvider`]: a fixed value, for embedding and tests

use std::fmt;
use std::sync::Arc;

use thiserror::Error;

use crate::config::{AuthConfig, CredentialSource};

/// Errors that can occur while resolving the bearer token.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum CredentialError {
    /// No token is configured at the named location.
    #[error("authorization token not found ({0})")]
    Missing(String),

    /// The credential store could not be read.
    #[error("credential store unavailable: {0}")]
    Unavailable(String),
}

/// Result type for credential lookups.
pub type CredentialResult<T> = Result<T, CredentialError>;

/// An opaque bearer token. `Debug` never prints the value.
#[derive(Clone, PartialEq, Eq)]
pub struct BearerToken(String);

impl BearerToken {
    /// Wrap a token. Returns `None` for an empty or blank string.
    pub fn new(token: impl Into<String>) -> Option<Self> {
        let token = token.into();
        if token.trim().is_empty() {
            None
        } else {
            Some(Self(token))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for BearerToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("BearerToken(<redacted>)")
    }
}

/// Supplies the bearer token on demand.
pub trait CredentialProvider: Send + Sync {
    /// Look the token up now.
    fn resolve(&self) -> CredentialResult<BearerToken>;

    /// Where the token is looked up, for log and error messages.
    fn describe(&self) -> String;
}

/// Reads the token from an environment variable on every call.
#[derive(Debug, Clone)]
pub struct EnvCredentialProvider {
    var: String,
}

impl EnvCredentialProvider {
    pub fn new(var: impl Into<String>) -> Self {
        Self { var: var.into() }
    }
}

impl CredentialProvider for EnvCredentialProvider {
    fn resolve(&self) -> CredentialResult<BearerToken> {
        std::env::var(&self.var)
            .ok()
            .and_then(BearerToken::new)
            .ok_or_else(|| CredentialError::Missing(self.describe()))
    }

    fn describe(&self) -> String {
        format!("environment variable {}", self.var)
    }
}

/// Read access to a secret store.
///
/// This indirection allows an in-memory store in tests.
pub trait KeychainBackend: Send + Sync {
    /// Retrieve a secret, or `Missing` if there is no entry.
    fn get_secret(&self, service: &str, key: &str) -> CredentialResult<String>;

    /// Create or overwrite a secret.
    fn set_secret(&self, service: &str, key: &str, value: &str) -> CredentialResult<()>;
}

/// The system keychain (macOS Keychain, Windows Credential Manager, Secret Service).
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemKeychain;

impl SystemKeychain {
    fn entry(service: &str, key: &str) -> CredentialResult<keyring::Entry> {
        keyring::Entry::new(service, key).map_err(|e| CredentialError::Unavailable(e.to_string()))
    }

    fn map_error(service: &str, key: &str, e: keyring::Error) -> CredentialError {
        match e {
            keyring::Error::NoEntry => {
                CredentialError::Missing(format!("keychain entry {}/{}", service, key))
            }
            keyring::Error::NoStorageAccess(_) => {
                CredentialError::Unavailable("No storage access".to_string())
            }
            keyring::Error::PlatformFailure(_) => {
                CredentialError::Unavailable("Platform failure".to_string())
            }
            _ => CredentialError::Unavailable(e.to_string()),
        }
    }
}

impl KeychainBackend for SystemKeychain {
    fn get_secret(&self, service: &str, key: &str) -> CredentialResult<String> {
        Self::entry(service, key)?
            .get_password()
            .map_err(|e| Self::map_error(service, key, e))
    }

    fn set_secret(&self, service: &str, key: &str, value: &str) -> CredentialResult<()> {
        Self::entry(service, key)?
            .set_password(value)
            .map_err(|e| Self::map_error(service, key, e))
    }
}

/// Reads the token from a keychain entry on every call.
pub struct KeyringCredentialProvider<B: KeychainBackend = SystemKeychain> {
    backend: B,
    service: String,
    user: String,
}

impl KeyringCredentialProvider<SystemKeychain> {
    /// Provider backed by the system keychain.
    pub fn system(service: impl Into<String>, user: impl Into<String>) -> Self {
        Self::with_backend(SystemKeychain, service, user)
    }
}

impl<B: KeychainBackend> KeyringCredentialProvider<B> {
    pub fn with_backend(backend: B, service: impl Into<String>, user: impl Into<String>) -> Self {
        Self {
            backend,
            service: service.into(),
            user: user.into(),
        }
    }

    /// Save `token` to the configured entry, replacing any previous value.
    pub fn store(&self, token: &BearerToken) -> CredentialResult<()> {
        self.backend
            .set_secret(&self.service, &self.user, token.as_str())
    }
}

impl<B: KeychainBackend> CredentialProvider for KeyringCredentialProvider<B> {
    fn resolve(&self) -> CredentialResult<BearerToken> {
        let secret = self.backend.get_secret(&self.service, &self.user)?;
        BearerToken::new(secret).ok_or_else(|| CredentialError::Missing(self.describe()))
    }

    fn describe(&self) -> String {
        format!("keychain entry {}/{}", self.service, self.user)
    }
}

/// A fixed token, or a fixed absence of one.
#[derive(Debug, Clone, Default)]
pub struct StaticCredentialProvider {
    token: Option<BearerToken>,
}

impl StaticCredentialProvider {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: BearerToken::new(token),
        }
    }

    /// A provider that always reports a missing token.
    pub fn missing() -> Self {
        Self { token: None }
    }
}

impl CredentialProvider for StaticCredentialProvider {
    fn resolve(&self) -> CredentialResult<BearerToken> {
        self.token
            .clone()
            .ok_or_else(|| CredentialError::Missing(self.describe()))
    }

    fn describe(&self) -> String {
        "static token".to_string()
    }
}

/// Build the provider selected by the `[auth]` section.
pub fn provider_from_config(auth: &AuthConfig) -> Arc<dyn CredentialProvider> {
    match auth.source {
        CredentialSource::Env => Arc::new(EnvCredentialProvider::new(&auth.token_env)),
        CredentialSource::Keyring => Arc::new(KeyringCredentialProvider::system(
            &auth.keyring_service,
            &auth.keyring_user,
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::collections::HashMap;
    use std::sync::Mutex;

    /// In-memory keychain for tests.
    #[derive(Default)]
    struct MockKeychain {
        storage: Mutex<HashMap<String, String>>,
        unavailable: bool,
    }

    impl MockKeychain {
        fn with_entry(service: &str, key: &str, value: &str) -> Self {
            let keychain = Self::default();
            keychain
                .storage
                .lock()
                .unwrap()
                .insert(format!("{}:{}", service, key), value.to_string());
            keychain
        }
    }

    impl KeychainBackend for MockKeychain {
        fn get_secret(&self, service: &str, key: &str) -> CredentialResult<String> {
            if self.unavailable {
                return Err(CredentialError::Unavailable("locked".to_string()));
            }
            self.storage
                .lock()
                .unwrap()
                .get(&format!("{}:{}", service, key))
                .cloned()
                .ok_or_else(|| CredentialError::Missing(format!("{}/{}", service, key)))
        }

        fn set_secret(&self, service: &str, key: &str, value: &str) -> CredentialResult<()> {
            if self.unavailable {
                return Err(CredentialError::Unavailable("locked".to_string()));
            }
            self.storage
                .lock()
                .unwrap()
                .insert(format!("{}:{}", service, key), value.to_string());
            Ok(())
        }
    }

    const TEST_VAR: &str = "FILE_EXCHANGE_TEST_TOKEN";

    #[test]
    fn test_bearer_token_rejects_blank() {
        assert!(BearerToken::new("").is_none());
        assert!(BearerToken::new("   ").is_none());
        assert_eq!(BearerToken::new("abc").unwrap().as_str(), "abc");
    }

    #[test]
    fn test_bearer_token_debug_is_redacted() {
        let token = BearerToken::new("super-secret").unwrap();
        let debug = format!("{:?}", token);
        assert!(!debug.contains("super-secret"));
    }

    #[test]
    #[serial]
    fn test_env_provider_reads_each_call() {
        std::env::remove_var(TEST_VAR);
        let provider = EnvCredentialProvider::new(TEST_VAR);

        assert!(matches!(provider.resolve(), Err(CredentialError::Missing(_))));

        std::env::set_var(TEST_VAR, "token-1");
        assert_eq!(provider.resolve().unwrap().as_str(), "token-1");

        std::env::set_var(TEST_VAR, "token-2");
        assert_eq!(provider.resolve().unwrap().as_str(), "token-2");

        std::env::remove_var(TEST_VAR);
        assert!(provider.resolve().is_err());
    }

    #[test]
    #[serial]
    fn test_env_provider_empty_is_missing() {
        std::env::set_var(TEST_VAR, "");
        let provider = EnvCredentialProvider::new(TEST_VAR);
        let err = provider.resolve().unwrap_err();
        assert!(err.to_string().contains(TEST_VAR));
        std::env::remove_var(TEST_VAR);
    }

    #[test]
    fn test_keyring_provider_found() {
        let backend = MockKeychain::with_entry("file-exchange", "bearer_token", "kc-token");
        let provider = KeyringCredentialProvider::with_backend(backend, "file-exchange", "bearer_token");
        assert_eq!(provider.resolve().unwrap().as_str(), "kc-token");
    }

    #[test]
    fn test_keyring_provider_missing_entry() {
        let provider =
            KeyringCredentialProvider::with_backend(MockKeychain::default(), "svc", "user");
        assert!(matches!(provider.resolve(), Err(CredentialError::Missing(_))));
    }

    #[test]
    fn test_keyring_provider_blank_entry_is_missing() {
        let backend = MockKeychain::with_entry("svc", "user", "  ");
        let provider = KeyringCredentialProvider::with_backend(backend, "svc", "user");
        assert!(matches!(provider.resolve(), Err(CredentialError::Missing(_))));
    }

    #[test]
    fn test_keyring_provider_unavailable() {
        let backend = MockKeychain {
            unavailable: true,
            ..Default::default()
        };
        let provider = KeyringCredentialProvider::with_backend(backend, "svc", "user");
        assert!(matches!(
            provider.resolve(),
            Err(CredentialError::Unavailable(_))
        ));
    }

    #[test]
    fn test_keyring_provider_store_then_resolve() {
        let provider =
            KeyringCredentialProvider::with_backend(MockKeychain::default(), "svc", "user");
        let token = BearerToken::new("stored").unwrap();
        provider.store(&token).unwrap();
        assert_eq!(provider.resolve().unwrap(), token);
    }

    #[test]
    #[serial]
    fn test_system_keychain_persists_between_entries() {
        let provider = KeyringCredentialProvider::system("file-exchange-test", "round-trip");
        let token = BearerToken::new("kc-round-trip").unwrap();

        match provider.store(&token) {
            Ok(()) => {}
            // No keychain service on this host (e.g. headless Linux without D-Bus).
            Err(CredentialError::Unavailable(_)) => return,
            Err(e) => panic!("unexpected store error: {:?}", e),
        }

        // A fresh Entry must see the value; the in-memory fallback store would not.
        let resolved = provider.resolve();
        if let Ok(entry) = keyring::Entry::new("file-exchange-test", "round-trip") {
            let _ = entry.delete_credential();
        }
        assert_eq!(resolved.unwrap(), token);
    }

    #[test]
    fn test_static_provider() {
        assert_eq!(
            StaticCredentialProvider::new("t").resolve().unwrap().as_str(),
            "t"
        );
        assert!(StaticCredentialProvider::missing().resolve().is_err());
    }

    #[test]
    fn test_provider_from_config_env() {
        let auth = AuthConfig::default();
        let provider = provider_from_config(&auth);
        assert_eq!(provider.describe(), "environment variable SUPA_AUTH_TOKEN");
    }

    #[test]
    fn test_provider_from_config_keyring() {
        let auth = AuthConfig {
            source: CredentialSource::Keyring,
            ..Default::default()
        };
        let provider = provider_from_config(&auth);
        assert_eq!(provider.describe(), "keychain entry file-exchange/bearer_token");
    }
}
