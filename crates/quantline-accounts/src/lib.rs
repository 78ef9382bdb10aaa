//! # quantline-accounts
//!
//! Account profile management for the `quantline` quantum-service client.
//!
//! This crate provides:
//! - The validated [`Account`] entity and its channel-specific rules
//! - [`ProxyConfiguration`] for optional HTTP proxy settings
//! - A JSON profile store ([`ConfigStore`]) and the [`AccountManager`]
//!   save/get/list/delete surface over it
//! - The [`resolve`] precedence chain that picks exactly one account from
//!   explicit parameters, environment variables, and stored profiles
//!
//! The transport client consuming the resolved account lives elsewhere;
//! nothing in this crate performs network I/O.
//!
//! ## Quick Start
//!
//! ```ignore
//! use quantline_accounts::{
//!     Account, AccountManager, Channel, EnvSnapshot, ResolveOptions, resolve,
//! };
//!
//! let manager = AccountManager::default_location()?;
//! let account = Account::new(Channel::IbmQuantum, "my-token")
//!     .with_instance("hub/group/project");
//! manager.save(&account, None, false)?;
//!
//! let resolved = resolve(
//!     &manager,
//!     &EnvSnapshot::from_process(),
//!     &ResolveOptions::default(),
//! )?;
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

pub mod account;
mod error;

pub use account::{
    Account, AccountManager, Channel, ConfigStore, EnvSnapshot, IBM_CLOUD_API_URL,
    IBM_QUANTUM_API_URL, INSTANCE_ENV, ListFilter, ProxyConfiguration, ResolveOptions,
    SavedAccount, TOKEN_ENV, URL_ENV, resolve,
};
pub use error::{Error, Result};
