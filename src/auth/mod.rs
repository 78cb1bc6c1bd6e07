//! Credential storage, token refresh, and the login affordance.

pub mod credential;
pub mod error;
pub mod lifecycle;
pub mod login;
pub mod service;
pub mod store;

pub use credential::Credential;
pub use error::AuthError;
pub use lifecycle::{AuthState, CredentialSource, TokenLifecycleManager};
pub use service::{HttpTokenService, TokenService};
pub use store::{
    CredentialStore, CredentialStoreConfig, FileCredentialStore, MemoryCredentialStore,
};
