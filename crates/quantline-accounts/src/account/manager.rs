//! Profile orchestration over the on-disk store.
//!
//! Naming and overwrite policy live here; the store below is pure
//! persistence and the account types validate themselves.

use serde_json::Value;
use tracing::warn;

use super::model::{Account, Channel, SavedAccount};
use super::storage::ConfigStore;
use crate::error::{Error, Result};

/// Filters applied by [`AccountManager::list`].
#[derive(Debug, Clone, Default)]
pub struct ListFilter {
    /// Only profiles for this channel.
    pub channel: Option<Channel>,
    /// Only profiles whose name is (or is not) a channel default slot.
    pub default: Option<bool>,
    /// Only the profile with this exact name.
    pub name: Option<String>,
}

/// Manages named account profiles in the configuration store.
///
/// Every call re-reads the store, so concurrent writers from other
/// processes race last-write-wins; callers needing stronger guarantees
/// must serialize access themselves.
#[derive(Debug, Clone)]
pub struct AccountManager {
    store: ConfigStore,
}

impl AccountManager {
    /// Creates a manager over `store`.
    #[must_use]
    pub const fn new(store: ConfigStore) -> Self {
        Self { store }
    }

    /// Creates a manager over the store at its default location.
    ///
    /// # Errors
    ///
    /// Returns an error when the user home directory cannot be determined.
    pub fn default_location() -> Result<Self> {
        Ok(Self::new(ConfigStore::default_location()?))
    }

    /// Validates `account` and writes it under `name`, or under the
    /// channel's default slot when no name is given.
    ///
    /// A profile already stored under the resolved name blocks the save
    /// unless `overwrite` is set. The deprecated default slot of the same
    /// channel counts as occupying the default name, so old-style profiles
    /// conflict too.
    ///
    /// # Errors
    ///
    /// Returns validation errors from the account, or
    /// [`Error::AccountAlreadyExists`] on an unresolved name collision.
    pub fn save(&self, account: &Account, name: Option<&str>, overwrite: bool) -> Result<()> {
        account.validate()?;
        let name = name.unwrap_or_else(|| account.channel.default_account_name());

        let mut profiles = self.store.load()?;
        if !overwrite {
            let occupied = profiles.contains_key(name)
                || (name == account.channel.default_account_name()
                    && profiles.contains_key(account.channel.deprecated_account_name()));
            if occupied {
                return Err(Error::AccountAlreadyExists(format!(
                    "`{name}`; set overwrite=true to replace it"
                )));
            }
        }

        profiles.insert(
            name.to_string(),
            serde_json::to_value(account.to_saved_format())?,
        );
        self.store.save(&profiles)
    }

    /// Reads one stored profile: by exact `name`, by the default slot of
    /// `channel`, or the first default slot present in the fixed preference
    /// order when neither is given.
    ///
    /// # Errors
    ///
    /// Returns [`Error::AccountNotFound`] naming the failed criterion, or a
    /// validation error when the stored entry cannot be decoded.
    pub fn get(&self, name: Option<&str>, channel: Option<Channel>) -> Result<Account> {
        let profiles = self.store.load()?;

        let entry = match (name, channel) {
            (Some(name), _) => profiles.get(name).ok_or_else(|| {
                Error::AccountNotFound(format!("no account saved under the name `{name}`"))
            })?,
            (None, Some(channel)) => default_slots_for(channel)
                .into_iter()
                .find_map(|slot| profiles.get(slot))
                .ok_or_else(|| {
                    Error::AccountNotFound(format!(
                        "no default account saved for channel `{channel}`"
                    ))
                })?,
            (None, None) => preference_order()
                .into_iter()
                .find_map(|slot| profiles.get(slot))
                .ok_or_else(|| {
                    Error::AccountNotFound("no default account saved".to_string())
                })?,
        };
        decode(entry)
    }

    /// Lists stored profiles matching `filter`, in store order except that
    /// default-slot entries always come after non-default entries.
    ///
    /// Entries that fail to decode are skipped with a warning so one
    /// corrupt profile does not hide the rest.
    ///
    /// # Errors
    ///
    /// Returns an error when the store itself cannot be read.
    pub fn list(&self, filter: &ListFilter) -> Result<Vec<(String, Account)>> {
        let profiles = self.store.load()?;

        let mut named = Vec::new();
        let mut default_named = Vec::new();
        for (name, entry) in &profiles {
            let account = match decode(entry) {
                Ok(account) => account,
                Err(err) => {
                    warn!("Skipping stored profile `{name}`: {err}");
                    continue;
                }
            };
            let is_default = Channel::of_default_name(name).is_some();
            if let Some(channel) = filter.channel
                && account.channel != channel
            {
                continue;
            }
            if let Some(default) = filter.default
                && is_default != default
            {
                continue;
            }
            if let Some(wanted) = &filter.name
                && name != wanted
            {
                continue;
            }
            if is_default {
                default_named.push((name.clone(), account));
            } else {
                named.push((name.clone(), account));
            }
        }
        named.extend(default_named);
        Ok(named)
    }

    /// Deletes one stored profile: by exact `name`, by the default slot of
    /// `channel`, or the first default slot present in the preference order
    /// when neither is given.
    ///
    /// Returns whether an entry was actually removed; deleting a missing
    /// profile is not an error, which makes the call idempotent.
    ///
    /// # Errors
    ///
    /// Returns an error only when the store cannot be read or written.
    pub fn delete(&self, name: Option<&str>, channel: Option<Channel>) -> Result<bool> {
        let mut profiles = self.store.load()?;

        let target = match (name, channel) {
            (Some(name), _) => profiles.contains_key(name).then(|| name.to_string()),
            (None, Some(channel)) => default_slots_for(channel)
                .into_iter()
                .find(|slot| profiles.contains_key(*slot))
                .map(String::from),
            (None, None) => preference_order()
                .into_iter()
                .find(|slot| profiles.contains_key(*slot))
                .map(String::from),
        };

        match target {
            Some(target) => {
                profiles.remove(&target);
                self.store.save(&profiles)?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// The backing store.
    #[must_use]
    pub const fn store(&self) -> &ConfigStore {
        &self.store
    }
}

/// Default slots of one channel, canonical spelling first.
fn default_slots_for(channel: Channel) -> [&'static str; 2] {
    [
        channel.default_account_name(),
        channel.deprecated_account_name(),
    ]
}

/// Fixed cross-channel preference order for default slots: the quantum
/// channel before cloud (matching the implicit channel used by the
/// environment-variable path), canonical spelling before deprecated.
fn preference_order() -> [&'static str; 4] {
    [
        Channel::IbmQuantum.default_account_name(),
        Channel::IbmQuantum.deprecated_account_name(),
        Channel::IbmCloud.default_account_name(),
        Channel::IbmCloud.deprecated_account_name(),
    ]
}

fn decode(entry: &Value) -> Result<Account> {
    let saved: SavedAccount = serde_json::from_value(entry.clone())?;
    Account::from_saved(&saved)
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
    use serde_json::json;

    fn temp_manager() -> (tempfile::TempDir, AccountManager) {
        let dir = tempfile::tempdir().unwrap();
        let store = ConfigStore::new(dir.path().join("accounts.json"));
        (dir, AccountManager::new(store))
    }

    fn quantum_account() -> Account {
        Account::new(Channel::IbmQuantum, "token-x").with_instance("ibm-q/open/main")
    }

    fn cloud_account() -> Account {
        Account::new(Channel::IbmCloud, "token-y").with_instance("crn:v1:cloud")
    }

    #[test]
    fn test_save_get_named() {
        let (_dir, manager) = temp_manager();
        let account = quantum_account();
        manager.save(&account, Some("acct-1"), false).unwrap();
        assert_eq!(manager.get(Some("acct-1"), None).unwrap(), account);
    }

    #[test]
    fn test_save_get_default_name() {
        let (_dir, manager) = temp_manager();
        let account = quantum_account();
        manager.save(&account, None, false).unwrap();
        assert_eq!(manager.get(Some("default-ibm-quantum"), None).unwrap(), account);
        assert_eq!(manager.get(None, Some(Channel::IbmQuantum)).unwrap(), account);
    }

    #[test]
    fn test_save_rejects_invalid_account() {
        let (_dir, manager) = temp_manager();
        let invalid = Account::new(Channel::IbmQuantum, "");
        assert!(manager.save(&invalid, Some("bad"), false).is_err());
        assert!(manager.list(&ListFilter::default()).unwrap().is_empty());
    }

    #[test]
    fn test_save_without_overwrite_conflicts() {
        let (_dir, manager) = temp_manager();
        manager.save(&quantum_account(), Some("conflict"), false).unwrap();
        let err = manager
            .save(&quantum_account(), Some("conflict"), false)
            .unwrap_err();
        assert!(matches!(err, Error::AccountAlreadyExists(_)));
        assert!(err.to_string().contains("conflict"));
    }

    #[test]
    fn test_save_with_overwrite_replaces() {
        let (_dir, manager) = temp_manager();
        manager.save(&quantum_account(), Some("acct"), false).unwrap();
        let replacement = quantum_account().with_verify(false);
        manager.save(&replacement, Some("acct"), true).unwrap();
        assert_eq!(manager.get(Some("acct"), None).unwrap(), replacement);
    }

    #[test]
    fn test_save_default_conflicts_with_deprecated_slot() {
        let (_dir, manager) = temp_manager();
        let mut profiles = serde_json::Map::new();
        profiles.insert(
            "default-legacy".to_string(),
            json!({"auth": "legacy", "token": "token-old"}),
        );
        manager.store().save(&profiles).unwrap();

        let err = manager.save(&quantum_account(), None, false).unwrap_err();
        assert!(matches!(err, Error::AccountAlreadyExists(_)));

        manager.save(&quantum_account(), None, true).unwrap();
        assert_eq!(
            manager.get(None, Some(Channel::IbmQuantum)).unwrap(),
            quantum_account()
        );
    }

    #[test]
    fn test_get_unknown_name() {
        let (_dir, manager) = temp_manager();
        manager.save(&quantum_account(), Some("conflict"), false).unwrap();
        let err = manager.get(Some("bla"), None).unwrap_err();
        assert!(matches!(err, Error::AccountNotFound(_)));
        assert!(err.to_string().contains("bla"));
    }

    #[test]
    fn test_get_deprecated_default_slot() {
        let (_dir, manager) = temp_manager();
        let mut profiles = serde_json::Map::new();
        profiles.insert(
            "default-legacy".to_string(),
            json!({"auth": "legacy", "token": "token-old"}),
        );
        manager.store().save(&profiles).unwrap();
        let account = manager.get(None, Some(Channel::IbmQuantum)).unwrap();
        assert_eq!(account.channel, Channel::IbmQuantum);
        assert_eq!(account.token, "token-old");
    }

    #[test]
    fn test_list_unfiltered() {
        let (_dir, manager) = temp_manager();
        manager.save(&quantum_account(), Some("key2"), false).unwrap();
        let accounts = manager.list(&ListFilter::default()).unwrap();
        assert_eq!(accounts.len(), 1);
        assert_eq!(accounts[0].0, "key2");
    }

    #[test]
    fn test_list_by_channel_defaults_last() {
        let (_dir, manager) = temp_manager();
        // Default slot written first, so raw store order would list it first.
        manager.save(&quantum_account(), None, false).unwrap();
        manager.save(&quantum_account(), Some("key2"), false).unwrap();
        manager.save(&cloud_account(), Some("cloudy"), false).unwrap();

        let names: Vec<String> = manager
            .list(&ListFilter {
                channel: Some(Channel::IbmQuantum),
                ..Default::default()
            })
            .unwrap()
            .into_iter()
            .map(|(name, _)| name)
            .collect();
        assert_eq!(names, ["key2", "default-ibm-quantum"]);
    }

    #[test]
    fn test_list_default_filter() {
        let (_dir, manager) = temp_manager();
        manager.save(&quantum_account(), None, false).unwrap();
        manager.save(&quantum_account(), Some("key2"), false).unwrap();

        let defaults = manager
            .list(&ListFilter {
                default: Some(true),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(defaults.len(), 1);
        assert_eq!(defaults[0].0, "default-ibm-quantum");

        let others = manager
            .list(&ListFilter {
                default: Some(false),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(others.len(), 1);
        assert_eq!(others[0].0, "key2");
    }

    #[test]
    fn test_list_by_name() {
        let (_dir, manager) = temp_manager();
        manager.save(&quantum_account(), Some("key1"), false).unwrap();
        manager.save(&quantum_account(), Some("key2"), false).unwrap();
        let accounts = manager
            .list(&ListFilter {
                name: Some("key1".to_string()),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(accounts.len(), 1);
        assert_eq!(accounts[0].0, "key1");
    }

    #[test]
    fn test_list_skips_corrupt_entries() {
        let (_dir, manager) = temp_manager();
        let mut profiles = serde_json::Map::new();
        profiles.insert("broken".to_string(), json!({"channel": "phantom", "token": "t"}));
        profiles.insert(
            "good".to_string(),
            json!({"channel": "ibm_quantum", "token": "token-x"}),
        );
        manager.store().save(&profiles).unwrap();
        let accounts = manager.list(&ListFilter::default()).unwrap();
        assert_eq!(accounts.len(), 1);
        assert_eq!(accounts[0].0, "good");
    }

    #[test]
    fn test_delete_named_is_idempotent() {
        let (_dir, manager) = temp_manager();
        manager.save(&quantum_account(), Some("key1"), false).unwrap();
        assert!(manager.delete(Some("key1"), None).unwrap());
        assert!(!manager.delete(Some("key1"), None).unwrap());
    }

    #[test]
    fn test_delete_default_by_channel() {
        let (_dir, manager) = temp_manager();
        manager.save(&quantum_account(), None, false).unwrap();
        assert!(manager.delete(None, Some(Channel::IbmQuantum)).unwrap());
        assert!(manager.list(&ListFilter::default()).unwrap().is_empty());
    }

    #[test]
    fn test_delete_deprecated_default_slot() {
        let (_dir, manager) = temp_manager();
        let mut profiles = serde_json::Map::new();
        profiles.insert(
            "default-legacy".to_string(),
            json!({"auth": "legacy", "token": "token-old"}),
        );
        manager.store().save(&profiles).unwrap();
        assert!(manager.delete(None, None).unwrap());
        assert!(!manager.delete(None, None).unwrap());
    }
}
