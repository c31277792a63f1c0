//! Data access facade
//!
//! Single entry point for auth and request operations. The backend is
//! picked once, at construction, from the configuration: the hosted
//! service when it is fully configured, the local store otherwise.

use std::sync::Arc;

use chrono::Utc;
use uuid::Uuid;

use crate::adapters::hosted::HostedBackend;
use crate::adapters::mock::MockBackend;
use crate::config::{Config, Mode};
use crate::domain::result::{Error, Result};
use crate::domain::{Contact, FeeSchedule, ListFilter, NewRequest, Request, User, Vehicle};
use crate::ports::{
    AuthProvider, AuthSubscription, GoogleLoginOptions, LocalStore, OAuthRedirect,
    RequestRepository,
};

const MIN_PASSWORD_LEN: usize = 6;

pub struct DataAccess {
    mode: Mode,
    auth: Arc<dyn AuthProvider>,
    requests: Arc<dyn RequestRepository>,
}

impl DataAccess {
    /// Build the facade for `config`, keeping local state in `store`
    pub fn new(config: &Config, store: LocalStore) -> Result<Self> {
        match config.mode() {
            Mode::Mock => {
                let backend = Arc::new(MockBackend::new(store)?);
                Ok(Self::with_backends(Mode::Mock, backend.clone(), backend))
            }
            Mode::Hosted => {
                let (Some(url), Some(key)) = (&config.hosted_url, &config.hosted_anon_key) else {
                    return Err(Error::config("Hosted backend URL and key are both required"));
                };
                let backend = Arc::new(HostedBackend::new(url, key, store)?);
                Ok(Self::with_backends(Mode::Hosted, backend.clone(), backend))
            }
        }
    }

    /// Assemble the facade from explicit backends
    pub fn with_backends(
        mode: Mode,
        auth: Arc<dyn AuthProvider>,
        requests: Arc<dyn RequestRepository>,
    ) -> Self {
        Self {
            mode,
            auth,
            requests,
        }
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    /// Whether the hosted backend is in use
    pub fn is_supabase_configured(&self) -> bool {
        self.mode == Mode::Hosted
    }

    pub async fn register(&self, email: &str, password: &str) -> Result<User> {
        let email = validate_email(email)?;
        if password.chars().count() < MIN_PASSWORD_LEN {
            return Err(Error::validation(format!(
                "Password must be at least {} characters.",
                MIN_PASSWORD_LEN
            )));
        }
        self.auth.register(email, password).await
    }

    pub async fn login(&self, email: &str, password: &str) -> Result<User> {
        let email = validate_email(email)?;
        if password.is_empty() {
            return Err(Error::validation("Please enter your password."));
        }
        self.auth.login(email, password).await
    }

    /// Start a Google sign-in; the caller opens the returned URL
    pub async fn login_with_google(&self, options: GoogleLoginOptions) -> Result<OAuthRedirect> {
        self.auth.google_redirect(&options).await
    }

    /// Finish a Google sign-in from the URL the browser was sent back to
    pub async fn complete_oauth_redirect(&self, callback_url: &str) -> Result<User> {
        self.auth.complete_oauth(callback_url).await
    }

    pub async fn logout(&self) -> Result<()> {
        self.auth.logout().await
    }

    /// The signed-in user, or `None`
    ///
    /// In hosted mode a slow or unreachable backend also yields `None`.
    pub async fn get_current_user(&self) -> Result<Option<User>> {
        self.auth.current_user().await
    }

    pub fn subscribe_to_auth_changes(&self) -> AuthSubscription {
        self.auth.subscribe()
    }

    /// Requests matching `filter`, newest first
    pub async fn list_requests(&self, filter: ListFilter) -> Result<Vec<Request>> {
        self.requests.list_requests(&filter).await
    }

    pub async fn get_request_by_id(&self, id: &str) -> Result<Option<Request>> {
        let requests = self.requests.list_requests(&ListFilter::all()).await?;
        Ok(requests.into_iter().find(|r| r.id == id))
    }

    /// Submit a new request on behalf of `input.user`
    pub async fn create_request(&self, input: NewRequest) -> Result<Request> {
        let user = input
            .user
            .ok_or_else(|| Error::validation("You must be logged in to submit a request."))?;

        let issue_description = input.issue_description.trim().to_string();
        if issue_description.is_empty() {
            return Err(Error::validation("Please describe the issue."));
        }

        let contact = Contact::from_json(&input.contact);
        if contact.phone.trim().is_empty() {
            return Err(Error::validation("Please provide a contact phone number."));
        }

        let request = Request {
            id: Uuid::new_v4().to_string(),
            created_at: Utc::now(),
            user_id: user.id,
            user_email: user.email,
            vehicle: Vehicle::from_json(&input.vehicle),
            issue_description,
            contact,
            status: NewRequest::INITIAL_STATUS.as_str().to_string(),
            assigned_mechanic_id: None,
            assigned_mechanic_email: None,
            notes: Vec::new(),
        };

        self.requests.insert_request(&request).await
    }

    /// Remove every locally stored request; mock mode only
    pub async fn clear_requests(&self) -> Result<usize> {
        self.requests.clear_requests().await
    }

    pub async fn fee_schedule(&self) -> Result<FeeSchedule> {
        self.requests.fee_schedule().await
    }
}

fn validate_email(email: &str) -> Result<&str> {
    let email = email.trim();
    if email.is_empty() || !email.contains('@') {
        return Err(Error::validation("Please enter a valid email address."));
    }
    Ok(email)
}
