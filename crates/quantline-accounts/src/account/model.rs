//! Account model types.

use std::collections::HashMap;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::validation;
use crate::error::{Error, Result};

/// Default API endpoint for the `ibm_quantum` channel.
pub const IBM_QUANTUM_API_URL: &str = "https://auth.quantum-computing.ibm.com/api";

/// Default API endpoint for the `ibm_cloud` channel.
pub const IBM_CLOUD_API_URL: &str = "https://cloud.ibm.com";

/// Service channel an account authenticates against.
///
/// Historically each channel was also spelled through the deprecated `auth`
/// field (`legacy` and `cloud`); those aliases normalize to the same
/// enumerated value everywhere.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Channel {
    /// IBM Quantum channel (deprecated `auth` spelling: `legacy`).
    #[serde(alias = "legacy")]
    IbmQuantum,
    /// IBM Cloud channel (deprecated `auth` spelling: `cloud`).
    #[serde(alias = "cloud")]
    IbmCloud,
}

impl Channel {
    /// Canonical string spelling of the channel.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::IbmQuantum => "ibm_quantum",
            Self::IbmCloud => "ibm_cloud",
        }
    }

    /// Well-known default API endpoint for the channel.
    #[must_use]
    pub const fn default_url(&self) -> &'static str {
        match self {
            Self::IbmQuantum => IBM_QUANTUM_API_URL,
            Self::IbmCloud => IBM_CLOUD_API_URL,
        }
    }

    /// Profile name used when saving without an explicit name.
    #[must_use]
    pub const fn default_account_name(&self) -> &'static str {
        match self {
            Self::IbmQuantum => "default-ibm-quantum",
            Self::IbmCloud => "default-ibm-cloud",
        }
    }

    /// Default profile name written by old clients through the deprecated
    /// `auth` spelling. Still honored for lookup and conflict checks.
    #[must_use]
    pub const fn deprecated_account_name(&self) -> &'static str {
        match self {
            Self::IbmQuantum => "default-legacy",
            Self::IbmCloud => "default-cloud",
        }
    }

    /// Returns the channel whose default slot (canonical or deprecated)
    /// `name` is, if any.
    #[must_use]
    pub fn of_default_name(name: &str) -> Option<Self> {
        [Self::IbmQuantum, Self::IbmCloud]
            .into_iter()
            .find(|c| name == c.default_account_name() || name == c.deprecated_account_name())
    }
}

impl FromStr for Channel {
    type Err = Error;

    /// Parses canonical spellings plus the deprecated `auth` aliases.
    fn from_str(s: &str) -> Result<Self> {
        match s {
            "ibm_quantum" | "legacy" => Ok(Self::IbmQuantum),
            "ibm_cloud" | "cloud" => Ok(Self::IbmCloud),
            _ => Err(Error::invalid_field("channel")),
        }
    }
}

impl std::fmt::Display for Channel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Optional HTTP proxy settings carried by an account.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProxyConfiguration {
    /// Mapping of scheme to proxy address.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub urls: Option<HashMap<String, String>>,
    /// NTLM username; must be set together with `password_ntlm`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username_ntlm: Option<String>,
    /// NTLM password; must be set together with `username_ntlm`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password_ntlm: Option<String>,
}

impl ProxyConfiguration {
    /// Creates an empty proxy configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the scheme-to-address mapping.
    #[must_use]
    pub fn with_urls(mut self, urls: HashMap<String, String>) -> Self {
        self.urls = Some(urls);
        self
    }

    /// Sets the paired NTLM credentials.
    #[must_use]
    pub fn with_ntlm(
        mut self,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        self.username_ntlm = Some(username.into());
        self.password_ntlm = Some(password.into());
        self
    }

    /// Validates the proxy settings. No side effects.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidConfiguration`] when exactly one of the NTLM
    /// fields is set, or when `urls` is present but empty.
    pub fn validate(&self) -> Result<()> {
        if self.username_ntlm.is_some() != self.password_ntlm.is_some() {
            return Err(Error::InvalidConfiguration(
                "`username_ntlm` and `password_ntlm` must be set together".to_string(),
            ));
        }
        if let Some(urls) = &self.urls
            && urls.is_empty()
        {
            return Err(Error::InvalidConfiguration(
                "`urls` must be a non-empty mapping".to_string(),
            ));
        }
        Ok(())
    }
}

/// A validated credential profile for one service channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Account {
    /// Service channel this account targets.
    pub channel: Channel,
    /// Authentication token.
    pub token: String,
    /// API endpoint; defaults to the channel's well-known URL.
    pub url: String,
    /// Service instance (`hub/group/project` or an opaque identifier,
    /// depending on the channel).
    pub instance: Option<String>,
    /// Optional proxy settings.
    pub proxies: Option<ProxyConfiguration>,
    /// Whether to verify TLS certificates downstream. Carried, not enforced.
    pub verify: bool,
}

impl Account {
    /// Creates an account for `channel` with the channel's default endpoint.
    #[must_use]
    pub fn new(channel: Channel, token: impl Into<String>) -> Self {
        Self {
            channel,
            token: token.into(),
            url: channel.default_url().to_string(),
            instance: None,
            proxies: None,
            verify: true,
        }
    }

    /// Sets the API endpoint.
    #[must_use]
    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = url.into();
        self
    }

    /// Sets the service instance.
    #[must_use]
    pub fn with_instance(mut self, instance: impl Into<String>) -> Self {
        self.instance = Some(instance.into());
        self
    }

    /// Sets the proxy configuration.
    #[must_use]
    pub fn with_proxies(mut self, proxies: ProxyConfiguration) -> Self {
        self.proxies = Some(proxies);
        self
    }

    /// Sets TLS verification.
    #[must_use]
    pub const fn with_verify(mut self, verify: bool) -> Self {
        self.verify = verify;
        self
    }

    /// Validates all fields. Idempotent; never mutates the account.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidAccount`] for token or instance violations,
    /// and surfaces [`Error::InvalidConfiguration`] from the proxy settings
    /// unwrapped so callers can tell the two apart.
    pub fn validate(&self) -> Result<()> {
        validation::validate_token(&self.token)?;
        validation::validate_instance(self.channel, self.instance.as_deref())?;
        if let Some(proxies) = &self.proxies {
            proxies.validate()?;
        }
        Ok(())
    }

    /// Produces the serialized form written to the profile store.
    #[must_use]
    pub fn to_saved_format(&self) -> SavedAccount {
        SavedAccount {
            channel: Some(self.channel.as_str().to_string()),
            auth: None,
            token: Value::String(self.token.clone()),
            url: Some(Value::String(self.url.clone())),
            instance: self.instance.clone(),
            proxies: self.proxies.clone(),
            verify: self.verify,
        }
    }

    /// Reconstructs an account from its saved form, normalizing the
    /// deprecated `auth` spelling into the canonical channel.
    ///
    /// # Errors
    ///
    /// Returns the channel-field error when neither spelling is present,
    /// when the spelling is outside the supported set, or when `channel`
    /// and `auth` name different channels; the token/url-field errors when
    /// those entries are not strings.
    pub fn from_saved(saved: &SavedAccount) -> Result<Self> {
        let channel = saved.channel()?;
        let token = saved
            .token
            .as_str()
            .ok_or_else(|| Error::invalid_field("token"))?
            .to_string();
        let url = match &saved.url {
            None => channel.default_url().to_string(),
            Some(value) => value
                .as_str()
                .ok_or_else(|| Error::invalid_field("url"))?
                .to_string(),
        };
        Ok(Self {
            channel,
            token,
            url,
            instance: saved.instance.clone(),
            proxies: saved.proxies.clone(),
            verify: saved.verify,
        })
    }
}

/// On-disk representation of one account profile.
///
/// Token and url stay as raw JSON values so files written by hand (or by
/// buggy tooling) fail with the matching field error instead of an opaque
/// parse error.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SavedAccount {
    /// Canonical channel spelling.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub channel: Option<String>,
    /// Deprecated alias spelling, read for backward compatibility and
    /// never written.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub auth: Option<String>,
    /// Authentication token.
    pub token: Value,
    /// API endpoint.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<Value>,
    /// Service instance.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub instance: Option<String>,
    /// Proxy settings.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub proxies: Option<ProxyConfiguration>,
    /// TLS verification flag.
    #[serde(default = "default_verify")]
    pub verify: bool,
}

impl SavedAccount {
    /// Resolves the canonical channel, reconciling the two spellings.
    ///
    /// # Errors
    ///
    /// Returns the channel-field error on a missing, unknown, or
    /// conflicting spelling.
    pub fn channel(&self) -> Result<Channel> {
        match (self.channel.as_deref(), self.auth.as_deref()) {
            (Some(channel), Some(auth)) => {
                let canonical = Channel::from_str(channel)?;
                if canonical == Channel::from_str(auth)? {
                    Ok(canonical)
                } else {
                    Err(Error::invalid_field("channel"))
                }
            }
            (Some(channel), None) => Channel::from_str(channel),
            (None, Some(auth)) => Channel::from_str(auth),
            (None, None) => Err(Error::invalid_field("channel")),
        }
    }
}

const fn default_verify() -> bool {
    true
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

    mod channel_tests {
        use super::*;

        #[test]
        fn canonical_spellings() {
            assert_eq!(Channel::from_str("ibm_quantum").unwrap(), Channel::IbmQuantum);
            assert_eq!(Channel::from_str("ibm_cloud").unwrap(), Channel::IbmCloud);
        }

        #[test]
        fn deprecated_aliases() {
            assert_eq!(Channel::from_str("legacy").unwrap(), Channel::IbmQuantum);
            assert_eq!(Channel::from_str("cloud").unwrap(), Channel::IbmCloud);
        }

        #[test]
        fn unknown_spelling() {
            let err = Channel::from_str("phantom").unwrap_err();
            assert!(err.to_string().contains("Invalid `channel` value."));
        }

        #[test]
        fn default_urls() {
            assert_eq!(Channel::IbmQuantum.default_url(), IBM_QUANTUM_API_URL);
            assert_eq!(Channel::IbmCloud.default_url(), IBM_CLOUD_API_URL);
        }

        #[test]
        fn default_name_owner() {
            assert_eq!(
                Channel::of_default_name("default-ibm-quantum"),
                Some(Channel::IbmQuantum)
            );
            assert_eq!(
                Channel::of_default_name("default-legacy"),
                Some(Channel::IbmQuantum)
            );
            assert_eq!(
                Channel::of_default_name("default-cloud"),
                Some(Channel::IbmCloud)
            );
            assert_eq!(Channel::of_default_name("custom"), None);
        }
    }

    mod proxy_tests {
        use super::*;

        #[test]
        fn empty_is_valid() {
            assert!(ProxyConfiguration::new().validate().is_ok());
        }

        #[test]
        fn username_only_fails() {
            let proxies = ProxyConfiguration {
                username_ntlm: Some("user-only".to_string()),
                ..Default::default()
            };
            let err = proxies.validate().unwrap_err();
            assert!(err.to_string().contains("Invalid proxy configuration"));
        }

        #[test]
        fn password_only_fails() {
            let proxies = ProxyConfiguration {
                password_ntlm: Some("password-only".to_string()),
                ..Default::default()
            };
            assert!(proxies.validate().is_err());
        }

        #[test]
        fn paired_ntlm_is_valid() {
            let proxies = ProxyConfiguration::new().with_ntlm("user", "pass");
            assert!(proxies.validate().is_ok());
        }

        #[test]
        fn empty_urls_fails() {
            let proxies = ProxyConfiguration::new().with_urls(HashMap::new());
            assert!(proxies.validate().is_err());
        }

        #[test]
        fn non_empty_urls_is_valid() {
            let urls = HashMap::from([("https".to_string(), "127.0.0.1".to_string())]);
            assert!(ProxyConfiguration::new().with_urls(urls).validate().is_ok());
        }
    }

    mod account_tests {
        use super::*;

        #[test]
        fn new_defaults_url_to_channel_endpoint() {
            let account = Account::new(Channel::IbmQuantum, "token-x");
            assert_eq!(account.url, IBM_QUANTUM_API_URL);
            assert!(account.verify);
            assert!(account.instance.is_none());
        }

        #[test]
        fn validate_is_idempotent() {
            let account =
                Account::new(Channel::IbmQuantum, "token-x").with_instance("hub/group/project");
            assert!(account.validate().is_ok());
            assert!(account.validate().is_ok());
        }

        #[test]
        fn validate_empty_token() {
            let err = Account::new(Channel::IbmQuantum, "").validate().unwrap_err();
            assert!(err.to_string().contains("Invalid `token` value."));
        }

        #[test]
        fn validate_bad_instance() {
            let account = Account::new(Channel::IbmQuantum, "token-x").with_instance("no-hgp");
            let err = account.validate().unwrap_err();
            assert!(err.to_string().contains("Invalid `instance` value."));
        }

        #[test]
        fn validate_cloud_requires_instance() {
            let err = Account::new(Channel::IbmCloud, "token-x").validate().unwrap_err();
            assert!(err.to_string().contains("Invalid `instance` value."));
        }

        #[test]
        fn validate_surfaces_proxy_error_unwrapped() {
            let account = Account::new(Channel::IbmQuantum, "token-x").with_proxies(
                ProxyConfiguration {
                    username_ntlm: Some("user-only".to_string()),
                    ..Default::default()
                },
            );
            let err = account.validate().unwrap_err();
            assert!(matches!(err, Error::InvalidConfiguration(_)));
        }

        #[test]
        fn saved_format_round_trip() {
            let account = Account::new(Channel::IbmQuantum, "token-x")
                .with_instance("hub/group/project")
                .with_proxies(ProxyConfiguration::new().with_ntlm("user", "pass"))
                .with_verify(false);
            let restored = Account::from_saved(&account.to_saved_format()).unwrap();
            assert_eq!(account, restored);
            assert!(restored.validate().is_ok());
        }

        #[test]
        fn from_saved_normalizes_auth_alias() {
            let saved: SavedAccount = serde_json::from_value(serde_json::json!({
                "auth": "legacy",
                "token": "token-x",
                "url": IBM_QUANTUM_API_URL,
                "instance": "ibm-q/open/main",
            }))
            .unwrap();
            let account = Account::from_saved(&saved).unwrap();
            assert_eq!(account.channel, Channel::IbmQuantum);
        }

        #[test]
        fn from_saved_conflicting_spellings() {
            let saved: SavedAccount = serde_json::from_value(serde_json::json!({
                "channel": "ibm_cloud",
                "auth": "legacy",
                "token": "token-x",
            }))
            .unwrap();
            let err = Account::from_saved(&saved).unwrap_err();
            assert!(err.to_string().contains("Invalid `channel` value."));
        }

        #[test]
        fn from_saved_non_string_token() {
            let saved: SavedAccount = serde_json::from_value(serde_json::json!({
                "channel": "ibm_quantum",
                "token": 1,
            }))
            .unwrap();
            let err = Account::from_saved(&saved).unwrap_err();
            assert!(err.to_string().contains("Invalid `token` value."));
        }

        #[test]
        fn from_saved_non_string_url() {
            let saved: SavedAccount = serde_json::from_value(serde_json::json!({
                "channel": "ibm_quantum",
                "token": "token-x",
                "url": 123,
            }))
            .unwrap();
            let err = Account::from_saved(&saved).unwrap_err();
            assert!(err.to_string().contains("Invalid `url` value."));
        }

        #[test]
        fn from_saved_missing_url_defaults() {
            let saved: SavedAccount = serde_json::from_value(serde_json::json!({
                "channel": "ibm_cloud",
                "token": "token-x",
                "instance": "crn:v1",
            }))
            .unwrap();
            let account = Account::from_saved(&saved).unwrap();
            assert_eq!(account.url, IBM_CLOUD_API_URL);
            assert!(account.verify);
        }
    }
}
