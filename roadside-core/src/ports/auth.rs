//! Authentication port and auth-change notifications

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use crate::domain::result::Result;
use crate::domain::User;

/// Options for the Google sign-in redirect
#[derive(Debug, Clone, Default)]
pub struct GoogleLoginOptions {
    /// Where the auth service should send the browser afterwards
    pub redirect_to: Option<String>,
}

/// URL the user must open to continue an OAuth sign-in
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OAuthRedirect {
    pub url: String,
}

/// What happened to the session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AuthEventKind {
    SignedIn,
    SignedOut,
    TokenRefreshed,
    UserUpdated,
}

/// Auth state change, already mapped to the public user shape
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthEvent {
    pub kind: AuthEventKind,
    pub user: Option<User>,
}

impl AuthEvent {
    pub fn signed_in(user: User) -> Self {
        Self {
            kind: AuthEventKind::SignedIn,
            user: Some(user),
        }
    }

    pub fn signed_out() -> Self {
        Self {
            kind: AuthEventKind::SignedOut,
            user: None,
        }
    }
}

/// Fan-out hub for auth events
#[derive(Debug, Clone)]
pub struct AuthEvents {
    sender: broadcast::Sender<AuthEvent>,
}

impl AuthEvents {
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(16);
        Self { sender }
    }

    /// Deliver an event to every live subscription
    pub fn emit(&self, event: AuthEvent) {
        // No receivers is fine
        let _ = self.sender.send(event);
    }

    pub fn subscribe(&self) -> AuthSubscription {
        AuthSubscription {
            receiver: Some(self.sender.subscribe()),
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for AuthEvents {
    fn default() -> Self {
        Self::new()
    }
}

/// Caller-owned handle on the auth event stream
///
/// Dropping the handle unsubscribes.
#[derive(Debug)]
pub struct AuthSubscription {
    receiver: Option<broadcast::Receiver<AuthEvent>>,
}

impl AuthSubscription {
    /// A subscription that never yields (no push channel available)
    pub fn inert() -> Self {
        Self { receiver: None }
    }

    pub fn is_inert(&self) -> bool {
        self.receiver.is_none()
    }

    /// Wait for the next event; `None` once the stream is closed or inert
    pub async fn next(&mut self) -> Option<AuthEvent> {
        let receiver = self.receiver.as_mut()?;
        loop {
            match receiver.recv().await {
                Ok(event) => return Some(event),
                // Older events were dropped; the latest state is what matters
                Err(broadcast::error::RecvError::Lagged(_)) => continue,
                Err(broadcast::error::RecvError::Closed) => {
                    self.receiver = None;
                    return None;
                }
            }
        }
    }

    /// Release the subscription
    pub fn unsubscribe(mut self) {
        self.receiver.take();
    }
}

/// Authentication provider
#[async_trait]
pub trait AuthProvider: Send + Sync {
    /// Create an account and sign it in
    async fn register(&self, email: &str, password: &str) -> Result<User>;

    /// Sign in with email and password
    async fn login(&self, email: &str, password: &str) -> Result<User>;

    /// Start a Google OAuth sign-in
    async fn google_redirect(&self, options: &GoogleLoginOptions) -> Result<OAuthRedirect>;

    /// Finish an OAuth sign-in from the callback URL the browser landed on
    async fn complete_oauth(&self, callback_url: &str) -> Result<User>;

    /// Clear the active session
    async fn logout(&self) -> Result<()>;

    /// Resolve the signed-in user; `Ok(None)` when signed out
    async fn current_user(&self) -> Result<Option<User>>;

    /// Subscribe to auth state changes
    fn subscribe(&self) -> AuthSubscription;
}
