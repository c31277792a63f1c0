//! Port definitions (hexagonal architecture)
//!
//! Ports define the interfaces for external dependencies. The facade and
//! boot sequencer depend only on these traits, not on concrete adapters.

mod auth;
mod requests;
mod storage;

pub use auth::{
    AuthEvent, AuthEventKind, AuthEvents, AuthProvider, AuthSubscription, GoogleLoginOptions,
    OAuthRedirect,
};
pub use requests::RequestRepository;
pub use storage::{keys, LocalStore, StorageBackend};
