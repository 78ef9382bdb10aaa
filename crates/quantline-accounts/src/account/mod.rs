//! Account management module.
//!
//! Provides account profiles, validation, persistence, and the
//! enablement-precedence resolver.

mod manager;
mod model;
mod resolver;
mod storage;
mod validation;

pub use manager::{AccountManager, ListFilter};
pub use model::{
    Account, Channel, IBM_CLOUD_API_URL, IBM_QUANTUM_API_URL, ProxyConfiguration, SavedAccount,
};
pub use resolver::{EnvSnapshot, INSTANCE_ENV, ResolveOptions, TOKEN_ENV, URL_ENV, resolve};
pub use storage::ConfigStore;
