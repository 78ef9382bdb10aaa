//! Integration tests for account persistence and resolution.
//!
//! These tests run the full save/get/list/delete and resolve flows against
//! real files in a temporary directory, with environment values supplied
//! through snapshots instead of the process environment.

use std::collections::HashMap;

use quantline_accounts::{
    Account, AccountManager, Channel, ConfigStore, EnvSnapshot, Error, IBM_QUANTUM_API_URL,
    ListFilter, ProxyConfiguration, ResolveOptions, resolve,
};

fn temp_manager() -> (tempfile::TempDir, AccountManager) {
    let dir = tempfile::tempdir().expect("tempdir");
    let store = ConfigStore::new(dir.path().join("accounts.json"));
    (dir, AccountManager::new(store))
}

fn quantum_account(token: &str) -> Account {
    Account::new(Channel::IbmQuantum, token).with_instance("ibm-q/open/main")
}

#[test]
fn saved_profiles_survive_manager_recreation() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("accounts.json");

    let account = quantum_account("token-x")
        .with_proxies(ProxyConfiguration::new().with_ntlm("user", "pass"))
        .with_verify(false);
    AccountManager::new(ConfigStore::new(&path))
        .save(&account, Some("persisted"), false)
        .expect("save");

    // A fresh manager over the same path sees the profile: the file, not
    // any in-memory state, is the source of truth.
    let reread = AccountManager::new(ConfigStore::new(&path))
        .get(Some("persisted"), None)
        .expect("get");
    assert_eq!(reread, account);
}

#[test]
fn full_profile_lifecycle() {
    let (_dir, manager) = temp_manager();

    manager
        .save(&quantum_account("tok-1"), Some("acct-1"), false)
        .expect("save named");
    manager
        .save(&quantum_account("tok-2"), None, false)
        .expect("save default");

    let names: Vec<String> = manager
        .list(&ListFilter::default())
        .expect("list")
        .into_iter()
        .map(|(name, _)| name)
        .collect();
    assert_eq!(names, ["acct-1", "default-ibm-quantum"]);

    assert!(manager.delete(Some("acct-1"), None).expect("delete"));
    assert!(!manager.delete(Some("acct-1"), None).expect("redelete"));
    assert!(manager.delete(None, Some(Channel::IbmQuantum)).expect("delete default"));
    assert!(manager.list(&ListFilter::default()).expect("list").is_empty());
}

#[test]
fn overwrite_policy_end_to_end() {
    let (_dir, manager) = temp_manager();
    manager
        .save(&quantum_account("original"), Some("slot"), false)
        .expect("save");

    let err = manager
        .save(&quantum_account("replacement"), Some("slot"), false)
        .expect_err("conflict");
    assert!(matches!(err, Error::AccountAlreadyExists(_)));

    manager
        .save(&quantum_account("replacement"), Some("slot"), true)
        .expect("overwrite");
    assert_eq!(
        manager.get(Some("slot"), None).expect("get").token,
        "replacement"
    );
}

#[test]
fn resolve_from_env_snapshot_with_empty_store() {
    let (_dir, manager) = temp_manager();
    let env = EnvSnapshot {
        token: Some("tok".to_string()),
        url: Some("u".to_string()),
        instance: Some("h/g/p".to_string()),
    };
    let account = resolve(&manager, &env, &ResolveOptions::default()).expect("resolve");
    assert_eq!(account.token, "tok");
    assert_eq!(account.url, "u");
    assert_eq!(account.instance.as_deref(), Some("h/g/p"));
}

#[test]
fn resolve_name_beats_env_and_explicit_token() {
    let (_dir, manager) = temp_manager();
    let stored = quantum_account("stored-token");
    manager.save(&stored, Some("foo"), false).expect("save");

    let env = EnvSnapshot {
        token: Some("env-token".to_string()),
        ..EnvSnapshot::empty()
    };
    let options = ResolveOptions {
        name: Some("foo".to_string()),
        token: Some("explicit-token".to_string()),
        ..ResolveOptions::default()
    };
    let account = resolve(&manager, &env, &options).expect("resolve");
    assert_eq!(account, stored);
}

#[test]
fn resolve_with_preferences_over_stored_profile() {
    let (_dir, manager) = temp_manager();
    manager
        .save(&quantum_account("token-x"), Some("foo"), false)
        .expect("save");

    let proxies = ProxyConfiguration::new()
        .with_urls(HashMap::from([("https".to_string(), "127.0.0.1".to_string())]));
    let options = ResolveOptions {
        name: Some("foo".to_string()),
        instance: Some("h1/g1/p1".to_string()),
        proxies: Some(proxies.clone()),
        verify: Some(false),
        ..ResolveOptions::default()
    };
    let account = resolve(&manager, &EnvSnapshot::empty(), &options).expect("resolve");
    assert_eq!(account.instance.as_deref(), Some("h1/g1/p1"));
    assert_eq!(account.proxies, Some(proxies));
    assert!(!account.verify);
    assert_eq!(account.token, "token-x");
}

#[test]
fn resolve_nothing_available_fails() {
    let (_dir, manager) = temp_manager();
    let err = resolve(&manager, &EnvSnapshot::empty(), &ResolveOptions::default())
        .expect_err("no source");
    assert!(matches!(err, Error::AccountNotFound(_)));
}

#[test]
fn adhoc_token_defaults_to_quantum_endpoint() {
    let (_dir, manager) = temp_manager();
    let options = ResolveOptions {
        token: Some("tok".to_string()),
        ..ResolveOptions::default()
    };
    let account = resolve(&manager, &EnvSnapshot::empty(), &options).expect("resolve");
    assert_eq!(account.url, IBM_QUANTUM_API_URL);
    assert_eq!(account.channel, Channel::IbmQuantum);
}
