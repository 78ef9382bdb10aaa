//! Account-enablement precedence.
//!
//! Resolution is a pure function of the explicit parameters, an
//! environment snapshot, and the store contents; it holds no state of its
//! own. Precedence: stored name, then explicit token, then environment
//! variables, then stored defaults. Ambiguous inputs degrade to a warning
//! and best-effort resolution, never a hard failure.

use tracing::warn;

use super::manager::{AccountManager, ListFilter};
use super::model::{Account, Channel, ProxyConfiguration};
use crate::error::{Error, Result};

/// Environment variable holding the token.
pub const TOKEN_ENV: &str = "QISKIT_IBM_TOKEN";

/// Environment variable holding the API endpoint.
pub const URL_ENV: &str = "QISKIT_IBM_URL";

/// Environment variable holding the service instance.
pub const INSTANCE_ENV: &str = "QISKIT_IBM_INSTANCE";

/// A snapshot of the account-related environment variables.
///
/// Resolution reads only the snapshot, never the process environment, so
/// tests can substitute deterministic values without mutating global state.
#[derive(Debug, Clone, Default)]
pub struct EnvSnapshot {
    /// Value of `QISKIT_IBM_TOKEN`.
    pub token: Option<String>,
    /// Value of `QISKIT_IBM_URL`.
    pub url: Option<String>,
    /// Value of `QISKIT_IBM_INSTANCE`.
    pub instance: Option<String>,
}

impl EnvSnapshot {
    /// Captures the current process environment.
    #[must_use]
    pub fn from_process() -> Self {
        Self {
            token: std::env::var(TOKEN_ENV).ok().filter(|v| !v.is_empty()),
            url: std::env::var(URL_ENV).ok().filter(|v| !v.is_empty()),
            instance: std::env::var(INSTANCE_ENV).ok().filter(|v| !v.is_empty()),
        }
    }

    /// A snapshot with nothing set.
    #[must_use]
    pub const fn empty() -> Self {
        Self {
            token: None,
            url: None,
            instance: None,
        }
    }
}

/// Explicit parameters supplied by the caller at enablement time.
#[derive(Debug, Clone, Default)]
pub struct ResolveOptions {
    /// Stored profile name. Takes precedence over every other source;
    /// `token`/`url` supplied alongside it are ignored with a warning.
    pub name: Option<String>,
    /// Explicit token; builds an ad-hoc account instead of reading the
    /// store.
    pub token: Option<String>,
    /// Explicit API endpoint.
    pub url: Option<String>,
    /// Explicit service instance; overrides the resolved account's value.
    pub instance: Option<String>,
    /// Explicit proxy settings; override the resolved account's value.
    pub proxies: Option<ProxyConfiguration>,
    /// Explicit TLS verification flag; overrides the resolved account's
    /// value.
    pub verify: Option<bool>,
    /// Channel for ad-hoc accounts and for narrowing the stored-default
    /// fallback.
    pub channel: Option<Channel>,
}

/// Resolves exactly one validated account from the precedence chain.
///
/// # Errors
///
/// Returns [`Error::AccountNotFound`] when no source yields a token, and
/// validation errors when the selection (after overlaying the explicit
/// secondary preferences) is invalid.
pub fn resolve(
    manager: &AccountManager,
    env: &EnvSnapshot,
    options: &ResolveOptions,
) -> Result<Account> {
    let mut account = select(manager, env, options)?;

    // Explicit secondary preferences always win over stored/env values.
    if let Some(instance) = &options.instance {
        account.instance = Some(instance.clone());
    }
    if let Some(proxies) = &options.proxies {
        account.proxies = Some(proxies.clone());
    }
    if let Some(verify) = options.verify {
        account.verify = verify;
    }

    account.validate()?;
    Ok(account)
}

/// Walks the precedence chain and picks the account source.
fn select(
    manager: &AccountManager,
    env: &EnvSnapshot,
    options: &ResolveOptions,
) -> Result<Account> {
    if let Some(name) = &options.name {
        warn_ignored_params(name, options);
        return manager.get(Some(name), None);
    }

    if let Some(token) = &options.token {
        let channel = options.channel.unwrap_or(Channel::IbmQuantum);
        let mut account = Account::new(channel, token.clone());
        if let Some(url) = &options.url {
            account.url.clone_from(url);
        }
        return Ok(account);
    }

    // From here on the token comes from the environment or the store, so an
    // explicit url would pair a caller value with a foreign token.
    if options.url.is_some() {
        warn!(
            "Provided `url` is ignored because the token comes from a \
             different source; the saved or default url is used instead."
        );
    }

    if let Some(token) = &env.token {
        let mut account = Account::new(Channel::IbmQuantum, token.clone());
        if let Some(url) = &env.url {
            account.url.clone_from(url);
        }
        account.instance = env.instance.clone();
        return Ok(account);
    }

    if let Some(channel) = options.channel {
        return match manager.get(None, Some(channel)) {
            Err(Error::AccountNotFound(_)) => {
                // No default slot for the channel; a lone stored profile of
                // that channel is still unambiguous.
                let stored = manager.list(&ListFilter {
                    channel: Some(channel),
                    ..ListFilter::default()
                })?;
                match stored.as_slice() {
                    [(_, account)] => Ok(account.clone()),
                    _ => Err(Error::AccountNotFound(format!(
                        "no account found for channel `{channel}`"
                    ))),
                }
            }
            other => other,
        };
    }

    let stored = manager.list(&ListFilter::default())?;
    if let [(_, account)] = stored.as_slice() {
        return Ok(account.clone());
    }

    manager
        .get(None, None)
        .map_err(|_| Error::AccountNotFound("no account in any source".to_string()))
}

/// One warning naming every explicit credential parameter that a stored
/// profile lookup overrides.
fn warn_ignored_params(name: &str, options: &ResolveOptions) {
    let mut ignored = Vec::new();
    if options.token.is_some() {
        ignored.push("token");
    }
    if options.url.is_some() {
        ignored.push("url");
    }
    if !ignored.is_empty() {
        warn!(
            "Loading account with name `{name}`. Input parameters {ignored:?} \
             are ignored."
        );
    }
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::redundant_clone,
    clippy::manual_string_new,
    clippy::needless_collect,
    clippy::unreadable_literal,
    clippy::used_underscore_items,
    clippy::similar_names
)]
mod tests {
    use super::*;
    use crate::account::model::IBM_QUANTUM_API_URL;
    use crate::account::storage::ConfigStore;
    use serde_json::json;
    use std::collections::HashMap;

    fn temp_manager() -> (tempfile::TempDir, AccountManager) {
        let dir = tempfile::tempdir().unwrap();
        let store = ConfigStore::new(dir.path().join("accounts.json"));
        (dir, AccountManager::new(store))
    }

    fn quantum_account(token: &str) -> Account {
        Account::new(Channel::IbmQuantum, token).with_instance("ibm-q/open/main")
    }

    /// Runs `f` under a subscriber that records log output, returning the
    /// captured text so tests can assert on emitted warnings.
    fn capture_logs(f: impl FnOnce()) -> String {
        use std::sync::{Arc, Mutex};

        #[derive(Clone, Default)]
        struct Sink(Arc<Mutex<Vec<u8>>>);

        impl std::io::Write for Sink {
            fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
                self.0.lock().unwrap().extend_from_slice(buf);
                Ok(buf.len())
            }

            fn flush(&mut self) -> std::io::Result<()> {
                Ok(())
            }
        }

        impl<'a> tracing_subscriber::fmt::MakeWriter<'a> for Sink {
            type Writer = Self;

            fn make_writer(&'a self) -> Self::Writer {
                self.clone()
            }
        }

        let sink = Sink::default();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(sink.clone())
            .with_ansi(false)
            .without_time()
            .finish();
        tracing::subscriber::with_default(subscriber, f);
        let bytes = sink.0.lock().unwrap().clone();
        String::from_utf8_lossy(&bytes).into_owned()
    }

    #[test]
    fn test_resolve_by_name() {
        let (_dir, manager) = temp_manager();
        let account = quantum_account("token-foo");
        manager.save(&account, Some("foo"), false).unwrap();

        let options = ResolveOptions {
            name: Some("foo".to_string()),
            ..Default::default()
        };
        let resolved = resolve(&manager, &EnvSnapshot::empty(), &options).unwrap();
        assert_eq!(resolved, account);
    }

    #[test]
    fn test_resolve_by_name_ignores_explicit_credentials() {
        let (_dir, manager) = temp_manager();
        let account = quantum_account("token-foo");
        manager.save(&account, Some("foo"), false).unwrap();

        let options = ResolveOptions {
            name: Some("foo".to_string()),
            token: Some("ignored".to_string()),
            url: Some("ignored-url".to_string()),
            ..Default::default()
        };
        let resolved = resolve(&manager, &EnvSnapshot::empty(), &options).unwrap();
        assert_eq!(resolved.token, "token-foo");
        assert_eq!(resolved.url, IBM_QUANTUM_API_URL);
    }

    #[test]
    fn test_resolve_by_name_warns_ignored_parameters() {
        let (_dir, manager) = temp_manager();
        manager.save(&quantum_account("token-foo"), Some("foo"), false).unwrap();

        let options = ResolveOptions {
            name: Some("foo".to_string()),
            token: Some("other-token".to_string()),
            url: Some("other-url".to_string()),
            ..Default::default()
        };
        let logs = capture_logs(|| {
            let resolved = resolve(&manager, &EnvSnapshot::empty(), &options).unwrap();
            assert_eq!(resolved.token, "token-foo");
        });
        assert!(logs.contains("are ignored"), "missing warning in: {logs}");
        assert!(logs.contains("token"));
        assert!(logs.contains("url"));
    }

    #[test]
    fn test_resolve_by_name_alone_warns_nothing() {
        let (_dir, manager) = temp_manager();
        manager.save(&quantum_account("token-foo"), Some("foo"), false).unwrap();

        let options = ResolveOptions {
            name: Some("foo".to_string()),
            ..Default::default()
        };
        let logs = capture_logs(|| {
            resolve(&manager, &EnvSnapshot::empty(), &options).unwrap();
        });
        assert!(!logs.contains("are ignored"));
    }

    #[test]
    fn test_resolve_foreign_token_warns_about_url() {
        let (_dir, manager) = temp_manager();
        manager.save(&quantum_account("token-x"), None, false).unwrap();

        let options = ResolveOptions {
            url: Some("some_url".to_string()),
            ..Default::default()
        };
        let logs = capture_logs(|| {
            let resolved = resolve(&manager, &EnvSnapshot::empty(), &options).unwrap();
            assert_eq!(resolved.url, IBM_QUANTUM_API_URL);
        });
        assert!(logs.contains("`url` is ignored"), "missing warning in: {logs}");
    }

    #[test]
    fn test_resolve_bad_name() {
        let (_dir, manager) = temp_manager();
        let options = ResolveOptions {
            name: Some("phantom".to_string()),
            ..Default::default()
        };
        let err = resolve(&manager, &EnvSnapshot::empty(), &options).unwrap_err();
        assert!(matches!(err, Error::AccountNotFound(_)));
        assert!(err.to_string().contains("phantom"));
    }

    #[test]
    fn test_resolve_by_explicit_token() {
        let (_dir, manager) = temp_manager();
        let options = ResolveOptions {
            token: Some("tok".to_string()),
            ..Default::default()
        };
        let resolved = resolve(&manager, &EnvSnapshot::empty(), &options).unwrap();
        assert_eq!(resolved.token, "tok");
        assert_eq!(resolved.url, IBM_QUANTUM_API_URL);
        assert_eq!(resolved.channel, Channel::IbmQuantum);
    }

    #[test]
    fn test_resolve_by_explicit_token_and_url() {
        let (_dir, manager) = temp_manager();
        let options = ResolveOptions {
            token: Some("tok".to_string()),
            url: Some("some_url".to_string()),
            ..Default::default()
        };
        let resolved = resolve(&manager, &EnvSnapshot::empty(), &options).unwrap();
        assert_eq!(resolved.url, "some_url");
    }

    #[test]
    fn test_resolve_from_env() {
        let (_dir, manager) = temp_manager();
        let env = EnvSnapshot {
            token: Some("tok".to_string()),
            url: Some("u".to_string()),
            instance: Some("h/g/p".to_string()),
        };
        let resolved = resolve(&manager, &env, &ResolveOptions::default()).unwrap();
        assert_eq!(resolved.token, "tok");
        assert_eq!(resolved.url, "u");
        assert_eq!(resolved.instance.as_deref(), Some("h/g/p"));
        assert_eq!(resolved.channel, Channel::IbmQuantum);
    }

    #[test]
    fn test_resolve_env_url_defaults_when_unset() {
        let (_dir, manager) = temp_manager();
        let env = EnvSnapshot {
            token: Some("tok".to_string()),
            ..Default::default()
        };
        let resolved = resolve(&manager, &env, &ResolveOptions::default()).unwrap();
        assert_eq!(resolved.url, IBM_QUANTUM_API_URL);
    }

    #[test]
    fn test_resolve_explicit_url_without_token_is_ignored() {
        let (_dir, manager) = temp_manager();
        manager.save(&quantum_account("token-x"), None, false).unwrap();

        let options = ResolveOptions {
            url: Some("some_url".to_string()),
            ..Default::default()
        };
        let resolved = resolve(&manager, &EnvSnapshot::empty(), &options).unwrap();
        assert_eq!(resolved.token, "token-x");
        assert_eq!(resolved.url, IBM_QUANTUM_API_URL);
    }

    #[test]
    fn test_resolve_single_stored_profile() {
        let (_dir, manager) = temp_manager();
        let account = quantum_account("only-one");
        manager.save(&account, Some("whatever"), false).unwrap();
        let resolved =
            resolve(&manager, &EnvSnapshot::empty(), &ResolveOptions::default()).unwrap();
        assert_eq!(resolved, account);
    }

    #[test]
    fn test_resolve_multi_default_tie_break() {
        let (_dir, manager) = temp_manager();
        let mut profiles = serde_json::Map::new();
        profiles.insert(
            "default-cloud".to_string(),
            json!({"auth": "cloud", "token": "cloud-tok", "instance": "crn:v1"}),
        );
        profiles.insert(
            "default-legacy".to_string(),
            json!({"auth": "legacy", "token": "legacy-tok"}),
        );
        profiles.insert(
            "default-ibm-quantum".to_string(),
            json!({"channel": "ibm_quantum", "token": "quantum-tok"}),
        );
        manager.store().save(&profiles).unwrap();

        let resolved =
            resolve(&manager, &EnvSnapshot::empty(), &ResolveOptions::default()).unwrap();
        assert_eq!(resolved.token, "quantum-tok");
    }

    #[test]
    fn test_resolve_channel_narrows_default() {
        let (_dir, manager) = temp_manager();
        manager.save(&quantum_account("q-tok"), None, false).unwrap();
        manager
            .save(
                &Account::new(Channel::IbmCloud, "c-tok").with_instance("crn:v1"),
                None,
                false,
            )
            .unwrap();

        let options = ResolveOptions {
            channel: Some(Channel::IbmCloud),
            ..Default::default()
        };
        let resolved = resolve(&manager, &EnvSnapshot::empty(), &options).unwrap();
        assert_eq!(resolved.token, "c-tok");
    }

    #[test]
    fn test_resolve_nothing_available() {
        let (_dir, manager) = temp_manager();
        let err = resolve(&manager, &EnvSnapshot::empty(), &ResolveOptions::default())
            .unwrap_err();
        assert!(matches!(err, Error::AccountNotFound(_)));
    }

    #[test]
    fn test_resolve_overlays_secondary_preferences() {
        let (_dir, manager) = temp_manager();
        manager.save(&quantum_account("token-x"), Some("foo"), false).unwrap();

        let proxies = ProxyConfiguration::new()
            .with_urls(HashMap::from([("https".to_string(), "127.0.0.1".to_string())]));
        let options = ResolveOptions {
            name: Some("foo".to_string()),
            instance: Some("h1/g1/p1".to_string()),
            proxies: Some(proxies.clone()),
            verify: Some(false),
            ..Default::default()
        };
        let resolved = resolve(&manager, &EnvSnapshot::empty(), &options).unwrap();
        assert_eq!(resolved.instance.as_deref(), Some("h1/g1/p1"));
        assert_eq!(resolved.proxies, Some(proxies));
        assert!(!resolved.verify);
    }

    #[test]
    fn test_resolve_env_with_overlay() {
        let (_dir, manager) = temp_manager();
        let env = EnvSnapshot {
            token: Some("tok".to_string()),
            url: Some("u".to_string()),
            instance: Some("h/g/p".to_string()),
        };
        let options = ResolveOptions {
            instance: Some("h1/g1/p1".to_string()),
            ..Default::default()
        };
        let resolved = resolve(&manager, &env, &options).unwrap();
        assert_eq!(resolved.instance.as_deref(), Some("h1/g1/p1"));
    }

    #[test]
    fn test_resolve_revalidates_after_overlay() {
        let (_dir, manager) = temp_manager();
        manager.save(&quantum_account("token-x"), Some("foo"), false).unwrap();

        let options = ResolveOptions {
            name: Some("foo".to_string()),
            instance: Some("not-hgp-format".to_string()),
            ..Default::default()
        };
        let err = resolve(&manager, &EnvSnapshot::empty(), &options).unwrap_err();
        assert!(err.to_string().contains("Invalid `instance` value."));
    }
}
