//! Hosted backend client
//!
//! Talks to a hosted auth + table service over HTTP:
//! - auth: `/auth/v1/signup`, `/auth/v1/token`, `/auth/v1/user`,
//!   `/auth/v1/logout`, `/auth/v1/authorize`
//! - tables: `/rest/v1/profiles` and `/rest/v1/requests`
//!
//! Every call carries the project's anon key as `apikey`; calls made on
//! behalf of a signed-in user carry the user's access token as the bearer.
//! Session tokens are kept in the local store so the next run can resume.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use reqwest::{Client, RequestBuilder, StatusCode};
use serde::Deserialize;
use serde_json::{json, Value as JsonValue};
use url::Url;

use crate::adapters::rows::{migrate_all, migrate_request};
use crate::domain::result::{Error, Result};
use crate::domain::{filter_and_sort, FeeSchedule, HostedSession, ListFilter, Request, Role, User};
use crate::ports::{
    keys, AuthEvent, AuthEventKind, AuthEvents, AuthProvider, AuthSubscription,
    GoogleLoginOptions, LocalStore, OAuthRedirect, RequestRepository,
};
use crate::services::bounded::bounded;

/// Bound on each identity / role lookup
pub const LOOKUP_TIMEOUT: Duration = Duration::from_millis(3500);

/// Overall HTTP timeout for every other call
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Identity as returned by the auth service
#[derive(Debug, Clone, Deserialize)]
struct AuthUser {
    id: String,
    #[serde(default)]
    email: Option<String>,
}

/// Token grant response
#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    refresh_token: Option<String>,
    #[serde(default)]
    expires_in: Option<i64>,
    #[serde(default)]
    expires_at: Option<i64>,
    user: AuthUser,
}

impl TokenResponse {
    fn session(&self) -> HostedSession {
        session_from(
            &self.access_token,
            self.refresh_token.clone(),
            self.expires_at,
            self.expires_in,
        )
    }
}

/// Row of the `profiles` table
#[derive(Debug, Deserialize)]
struct ProfileRow {
    id: String,
    #[serde(default)]
    email: Option<String>,
    #[serde(default)]
    role: Option<String>,
    #[serde(default)]
    approved: Option<bool>,
}

fn session_from(
    access_token: &str,
    refresh_token: Option<String>,
    expires_at: Option<i64>,
    expires_in: Option<i64>,
) -> HostedSession {
    let expires_at = expires_at
        .and_then(|secs| Utc.timestamp_opt(secs, 0).single())
        .or_else(|| expires_in.map(|secs| Utc::now() + chrono::Duration::seconds(secs)));
    HostedSession {
        access_token: access_token.to_string(),
        refresh_token,
        expires_at,
    }
}

/// Pull a human-readable message out of an error body
fn error_message(status: StatusCode, body: &JsonValue) -> String {
    ["msg", "error_description", "message", "error"]
        .iter()
        .find_map(|key| body.get(*key).and_then(JsonValue::as_str))
        .map(str::to_string)
        .unwrap_or_else(|| format!("Hosted backend error: HTTP {}", status.as_u16()))
}

/// Hosted backend adapter
pub struct HostedBackend {
    client: Client,
    base_url: String,
    anon_key: String,
    store: LocalStore,
    events: AuthEvents,
    lookup_timeout: Duration,
}

impl HostedBackend {
    /// Create a client for the project at `base_url`
    pub fn new(base_url: &str, anon_key: &str, store: LocalStore) -> Result<Self> {
        let parsed = Url::parse(base_url)
            .map_err(|e| Error::config(format!("Invalid hosted backend URL: {}", e)))?;
        if parsed.scheme() != "https" && parsed.scheme() != "http" {
            return Err(Error::config("Hosted backend URL must use http or https"));
        }
        if anon_key.trim().is_empty() {
            return Err(Error::config("Hosted backend key is empty"));
        }

        let client = Client::builder().timeout(REQUEST_TIMEOUT).build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            anon_key: anon_key.to_string(),
            store,
            events: AuthEvents::new(),
            lookup_timeout: LOOKUP_TIMEOUT,
        })
    }

    /// Override the identity / role lookup bound
    pub fn with_lookup_timeout(mut self, timeout: Duration) -> Self {
        self.lookup_timeout = timeout;
        self
    }

    fn auth_url(&self, path: &str) -> String {
        format!("{}/auth/v1/{}", self.base_url, path)
    }

    fn rest_url(&self, table: &str) -> String {
        format!("{}/rest/v1/{}", self.base_url, table)
    }

    fn session(&self) -> Option<HostedSession> {
        self.store.read_opt(keys::HOSTED_SESSION)
    }

    fn save_session(&self, session: &HostedSession) {
        self.store.write(keys::HOSTED_SESSION, session);
    }

    fn clear_session(&self) {
        self.store.remove(keys::HOSTED_SESSION);
    }

    /// Drop a session the backend no longer honours and tell subscribers
    fn end_session(&self) {
        self.clear_session();
        self.events.emit(AuthEvent::signed_out());
    }

    /// Attach the anon key and a bearer (user token when signed in)
    fn authorized(&self, builder: RequestBuilder, token: Option<&str>) -> RequestBuilder {
        let bearer = token
            .map(str::to_string)
            .or_else(|| self.session().map(|s| s.access_token))
            .unwrap_or_else(|| self.anon_key.clone());
        builder.header("apikey", &self.anon_key).bearer_auth(bearer)
    }

    /// Send a request and return the status with the parsed body (Null if empty)
    async fn send(&self, builder: RequestBuilder) -> Result<(StatusCode, JsonValue)> {
        let response = builder.send().await?;
        let status = response.status();
        let text = response.text().await?;
        let body = if text.trim().is_empty() {
            JsonValue::Null
        } else {
            serde_json::from_str(&text).unwrap_or(JsonValue::String(text))
        };
        Ok((status, body))
    }

    /// Look up the user behind `token`; `Ok(None)` if the token is rejected
    async fn fetch_identity(&self, token: &str) -> Result<Option<AuthUser>> {
        let request = self.authorized(self.client.get(self.auth_url("user")), Some(token));
        let (status, body) = self.send(request).await?;
        match status {
            s if s.is_success() => Ok(Some(serde_json::from_value(body)?)),
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Ok(None),
            s => Err(Error::network(error_message(s, &body))),
        }
    }

    async fn fetch_profile(&self, user_id: &str) -> Result<Option<ProfileRow>> {
        let request = self
            .authorized(self.client.get(self.rest_url("profiles")), None)
            .query(&[
                ("select", "id,email,role,approved".to_string()),
                ("id", format!("eq.{}", user_id)),
            ]);
        let (status, body) = self.send(request).await?;
        if !status.is_success() {
            return Err(Error::network(error_message(status, &body)));
        }
        let mut rows: Vec<ProfileRow> = serde_json::from_value(body)?;
        Ok(if rows.is_empty() { None } else { Some(rows.remove(0)) })
    }

    /// Map an identity to the public user shape
    ///
    /// The role lookup is best effort: if it fails or times out, the user
    /// comes back as a minimal identity rather than not at all.
    async fn resolve_user(&self, identity: &AuthUser) -> User {
        let email = identity.email.clone().unwrap_or_default();
        let lookup = bounded(
            self.fetch_profile(&identity.id),
            self.lookup_timeout,
            Err(Error::Timeout("role lookup".to_string())),
        )
        .await
        .into_inner();

        match lookup {
            Ok(Some(profile)) => User {
                id: profile.id,
                email: profile.email.filter(|e| !e.is_empty()).unwrap_or(email),
                role: profile
                    .role
                    .as_deref()
                    .and_then(|r| r.parse::<Role>().ok())
                    .unwrap_or_default(),
                approved: profile.approved.unwrap_or(false),
                profile: None,
            },
            _ => User::minimal(&identity.id, email),
        }
    }

    /// Exchange the refresh token for a new session
    async fn refresh(&self, refresh_token: &str) -> Result<TokenResponse> {
        let request = self
            .authorized(
                self.client.post(self.auth_url("token")),
                Some(&self.anon_key),
            )
            .query(&[("grant_type", "refresh_token")])
            .json(&json!({ "refresh_token": refresh_token }));
        let (status, body) = self.send(request).await?;
        if !status.is_success() {
            return Err(Error::auth(error_message(status, &body)));
        }
        Ok(serde_json::from_value(body)?)
    }

    /// Store a fresh session, resolve its user and announce it
    async fn establish(&self, tokens: &TokenResponse, kind: AuthEventKind) -> User {
        self.save_session(&tokens.session());
        let user = self.resolve_user(&tokens.user).await;
        self.events.emit(AuthEvent {
            kind,
            user: Some(user.clone()),
        });
        user
    }
}

#[async_trait]
impl AuthProvider for HostedBackend {
    async fn register(&self, email: &str, password: &str) -> Result<User> {
        let request = self
            .authorized(self.client.post(self.auth_url("signup")), Some(&self.anon_key))
            .json(&json!({ "email": email, "password": password }));
        let (status, body) = self.send(request).await?;
        if !status.is_success() {
            return Err(Error::validation(error_message(status, &body)));
        }

        if body.get("access_token").is_some() {
            let tokens: TokenResponse = serde_json::from_value(body)?;
            return Ok(self.establish(&tokens, AuthEventKind::SignedIn).await);
        }

        // Email confirmation pending: the body is the user (or wraps it)
        let identity: AuthUser = match body.get("user") {
            Some(user) => serde_json::from_value(user.clone())?,
            None => serde_json::from_value(body)?,
        };
        Ok(self.resolve_user(&identity).await)
    }

    async fn login(&self, email: &str, password: &str) -> Result<User> {
        let request = self
            .authorized(self.client.post(self.auth_url("token")), Some(&self.anon_key))
            .query(&[("grant_type", "password")])
            .json(&json!({ "email": email, "password": password }));
        let (status, body) = self.send(request).await?;
        match status {
            s if s.is_success() => {
                let tokens: TokenResponse = serde_json::from_value(body)?;
                Ok(self.establish(&tokens, AuthEventKind::SignedIn).await)
            }
            StatusCode::BAD_REQUEST | StatusCode::UNAUTHORIZED => {
                Err(Error::auth("Invalid email or password"))
            }
            s => Err(Error::network(error_message(s, &body))),
        }
    }

    async fn google_redirect(&self, options: &GoogleLoginOptions) -> Result<OAuthRedirect> {
        let mut params = vec![("provider", "google".to_string())];
        if let Some(redirect_to) = &options.redirect_to {
            params.push(("redirect_to", redirect_to.clone()));
        }
        let url = Url::parse_with_params(&self.auth_url("authorize"), &params)
            .map_err(|e| Error::config(format!("Invalid hosted backend URL: {}", e)))?;
        Ok(OAuthRedirect {
            url: url.to_string(),
        })
    }

    async fn complete_oauth(&self, callback_url: &str) -> Result<User> {
        let url = Url::parse(callback_url)
            .map_err(|e| Error::validation(format!("Invalid callback URL: {}", e)))?;

        // Tokens arrive in the fragment; some flows put them in the query
        let source = url.fragment().unwrap_or_else(|| url.query().unwrap_or_default());
        let params: std::collections::HashMap<String, String> =
            url::form_urlencoded::parse(source.as_bytes())
                .into_owned()
                .collect();

        if let Some(error) = params
            .get("error_description")
            .or_else(|| params.get("error"))
        {
            return Err(Error::auth(error.clone()));
        }
        let access_token = params
            .get("access_token")
            .ok_or_else(|| Error::validation("Callback URL carries no access token"))?;

        let session = session_from(
            access_token,
            params.get("refresh_token").cloned(),
            params.get("expires_at").and_then(|v| v.parse().ok()),
            params.get("expires_in").and_then(|v| v.parse().ok()),
        );
        self.save_session(&session);

        let identity = bounded(
            self.fetch_identity(access_token),
            self.lookup_timeout,
            Err(Error::Timeout("identity lookup".to_string())),
        )
        .await
        .into_inner();

        let identity = match identity {
            Ok(Some(identity)) => identity,
            Ok(None) => {
                self.clear_session();
                return Err(Error::auth("Sign-in could not be verified"));
            }
            Err(e) => {
                self.clear_session();
                return Err(e);
            }
        };

        let user = self.resolve_user(&identity).await;
        self.events.emit(AuthEvent::signed_in(user.clone()));
        Ok(user)
    }

    async fn logout(&self) -> Result<()> {
        if let Some(session) = self.session() {
            let request = self.authorized(
                self.client.post(self.auth_url("logout")),
                Some(&session.access_token),
            );
            // The local session goes away whether or not the server heard us
            let _ = bounded(
                self.send(request),
                self.lookup_timeout,
                Ok((StatusCode::OK, JsonValue::Null)),
            )
            .await;
        }
        self.clear_session();
        self.events.emit(AuthEvent::signed_out());
        Ok(())
    }

    async fn current_user(&self) -> Result<Option<User>> {
        let Some(mut session) = self.session() else {
            return Ok(None);
        };

        let mut refreshed = false;
        if session.is_expired(Utc::now()) {
            let Some(refresh_token) = session.refresh_token.clone() else {
                self.end_session();
                return Ok(None);
            };
            let attempt = bounded(
                self.refresh(&refresh_token),
                self.lookup_timeout,
                Err(Error::Timeout("token refresh".to_string())),
            )
            .await
            .into_inner();
            match attempt {
                Ok(tokens) => {
                    session = tokens.session();
                    self.save_session(&session);
                    refreshed = true;
                }
                Err(Error::Auth(_)) => {
                    self.end_session();
                    return Ok(None);
                }
                Err(_) => return Ok(None),
            }
        }

        let identity = bounded(
            self.fetch_identity(&session.access_token),
            self.lookup_timeout,
            Err(Error::Timeout("identity lookup".to_string())),
        )
        .await
        .into_inner();

        let identity = match identity {
            Ok(Some(identity)) => identity,
            Ok(None) => {
                self.end_session();
                return Ok(None);
            }
            // Unreachable or slow backend: treat as signed out, keep the tokens
            Err(_) => return Ok(None),
        };

        let user = self.resolve_user(&identity).await;
        if refreshed {
            self.events.emit(AuthEvent {
                kind: AuthEventKind::TokenRefreshed,
                user: Some(user.clone()),
            });
        }
        Ok(Some(user))
    }

    fn subscribe(&self) -> AuthSubscription {
        self.events.subscribe()
    }
}

#[async_trait]
impl RequestRepository for HostedBackend {
    async fn list_requests(&self, filter: &ListFilter) -> Result<Vec<Request>> {
        let mut query = vec![
            ("select", "*".to_string()),
            ("order", "created_at.desc".to_string()),
        ];
        if let Some(user_id) = &filter.for_user_id {
            query.push(("user_id", format!("eq.{}", user_id)));
        }

        let request = self
            .authorized(self.client.get(self.rest_url("requests")), None)
            .query(&query);
        let (status, body) = self.send(request).await?;
        if !status.is_success() {
            return Err(Error::network(error_message(status, &body)));
        }

        let rows: Vec<JsonValue> = serde_json::from_value(body)?;
        let (requests, _) = migrate_all(&rows);
        Ok(filter_and_sort(requests, filter))
    }

    async fn insert_request(&self, request: &Request) -> Result<Request> {
        let row = json!({
            "user_id": request.user_id,
            "user_email": request.user_email,
            "vehicle": request.vehicle,
            "issue_description": request.issue_description,
            "contact": request.contact,
            "status": request.status,
            "assigned_mechanic_id": JsonValue::Null,
            "assigned_mechanic_email": JsonValue::Null,
            "notes": request.notes,
        });

        let builder = self
            .authorized(self.client.post(self.rest_url("requests")), None)
            .header("Prefer", "return=representation")
            .json(&row);
        let (status, body) = self.send(builder).await?;
        if !status.is_success() {
            return Err(Error::network(error_message(status, &body)));
        }

        // The row now exists; a malformed echo is reported but not undone
        let stored = match &body {
            JsonValue::Array(rows) => rows.first(),
            JsonValue::Object(_) => Some(&body),
            _ => None,
        };
        stored
            .and_then(migrate_request)
            .map(|migrated| migrated.request)
            .ok_or_else(|| Error::Other("Inserted request could not be read back".to_string()))
    }

    async fn clear_requests(&self) -> Result<usize> {
        Err(Error::config("Clearing all requests is only available in mock mode"))
    }

    async fn fee_schedule(&self) -> Result<FeeSchedule> {
        Ok(FeeSchedule::default())
    }
}
