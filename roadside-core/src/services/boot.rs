//! Boot sequencer and top-level routing
//!
//! On start the sequencer resolves the current user (bounded by the boot
//! timeout) while already listening for auth changes, so a sign-in that
//! lands mid-boot is not lost. Boot always completes: a failed or slow
//! lookup leaves the app signed out with a `boot_error` to show.

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tokio::task::JoinHandle;

use super::access::DataAccess;
use super::bounded::{bounded, Waited};
use crate::config::{Config, DEFAULT_BOOT_TIMEOUT_MS};
use crate::domain::result::Result;
use crate::domain::User;
use crate::ports::{AuthEvent, AuthEventKind};

#[derive(Debug, Clone, Copy)]
pub struct BootOptions {
    /// Bound on the initial current-user lookup
    pub timeout: Duration,
}

impl Default for BootOptions {
    fn default() -> Self {
        Self {
            timeout: Duration::from_millis(DEFAULT_BOOT_TIMEOUT_MS),
        }
    }
}

impl From<&Config> for BootOptions {
    fn from(config: &Config) -> Self {
        Self {
            timeout: config.boot_timeout,
        }
    }
}

/// Application-level session state
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppState {
    pub user: Option<User>,
    pub boot_complete: bool,
    pub boot_error: Option<String>,
}

impl AppState {
    fn apply_event(&mut self, event: &AuthEvent) {
        match event.kind {
            AuthEventKind::SignedOut => self.user = None,
            AuthEventKind::SignedIn
            | AuthEventKind::TokenRefreshed
            | AuthEventKind::UserUpdated => {
                if let Some(user) = &event.user {
                    self.user = Some(user.clone());
                }
            }
        }
    }

    /// Record the boot lookup; an auth event seen earlier wins over it
    fn finish_boot(&mut self, outcome: Waited<Result<Option<User>>>, keep_user: bool) {
        self.boot_complete = true;
        match outcome {
            Waited::Ready(Ok(user)) => {
                if !keep_user {
                    self.user = user;
                }
            }
            Waited::Ready(Err(e)) => {
                if !keep_user {
                    self.user = None;
                }
                self.boot_error = Some(e.to_string());
            }
            Waited::Fallback(_) => {
                if !keep_user {
                    self.user = None;
                }
                self.boot_error =
                    Some("Timed out checking your session; continuing signed out".to_string());
            }
        }
    }
}

pub struct BootSequencer;

impl BootSequencer {
    /// Start booting; must be called inside a tokio runtime
    pub fn start(access: Arc<DataAccess>, options: BootOptions) -> BootHandle {
        let (sender, receiver) = watch::channel(AppState::default());
        let mut subscription = access.subscribe_to_auth_changes();

        let task = tokio::spawn(async move {
            let lookup = bounded(
                async { access.get_current_user().await },
                options.timeout,
                Ok(None),
            );
            tokio::pin!(lookup);

            let mut booted = false;
            let mut listening = true;
            let mut saw_event = false;

            loop {
                tokio::select! {
                    outcome = &mut lookup, if !booted => {
                        booted = true;
                        sender.send_modify(|state| state.finish_boot(outcome, saw_event));
                    }
                    event = subscription.next(), if listening => match event {
                        Some(event) => {
                            saw_event = true;
                            sender.send_modify(|state| state.apply_event(&event));
                        }
                        None => listening = false,
                    },
                    else => break,
                }
            }
        });

        BootHandle {
            state: receiver,
            task: Some(task),
        }
    }
}

/// Owner of a running boot sequence
///
/// Dropping the handle stops listening for auth changes.
pub struct BootHandle {
    state: watch::Receiver<AppState>,
    task: Option<JoinHandle<()>>,
}

impl BootHandle {
    /// Snapshot of the current state
    pub fn state(&self) -> AppState {
        self.state.borrow().clone()
    }

    /// Wait for the next state change; `None` once the sequencer has stopped
    pub async fn changed(&mut self) -> Option<AppState> {
        self.state.changed().await.ok()?;
        Some(self.state.borrow_and_update().clone())
    }

    /// Wait until boot has completed
    pub async fn booted(&mut self) -> AppState {
        if let Ok(state) = self.state.wait_for(|state| state.boot_complete).await {
            return state.clone();
        }
        // Sequencer gone; the last value is final
        self.state()
    }

    /// Stop listening and wait until the subscription is released
    pub async fn shutdown(mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
            let _ = task.await;
        }
    }
}

impl Drop for BootHandle {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

/// Top-level screens
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Route {
    Login,
    Register,
    Home,
    SubmitRequest,
    Requests,
    RequestDetail(String),
}

impl Route {
    /// Screens that need a signed-in user
    pub fn is_protected(&self) -> bool {
        matches!(
            self,
            Route::SubmitRequest | Route::Requests | Route::RequestDetail(_)
        )
    }

    fn is_auth_screen(&self) -> bool {
        matches!(self, Route::Login | Route::Register)
    }
}

/// What to show for a requested route
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RouteDecision {
    Loading,
    Redirect(Route),
    Render(Route),
}

pub fn resolve_route(state: &AppState, route: Route) -> RouteDecision {
    if !state.boot_complete {
        return RouteDecision::Loading;
    }
    let signed_in = state.user.is_some();
    if !signed_in && route.is_protected() {
        RouteDecision::Redirect(Route::Login)
    } else if signed_in && route.is_auth_screen() {
        RouteDecision::Redirect(Route::Home)
    } else {
        RouteDecision::Render(route)
    }
}
