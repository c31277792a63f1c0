//! Mock backend - auth and requests over the local store
//!
//! Used whenever no hosted backend is configured. Everything lives in the
//! profile's local storage; there is no push channel, so auth subscriptions
//! are inert.
//!
//! The first time a profile is opened it is seeded with one demo account per
//! role, two demo requests and the default fee schedule.

use async_trait::async_trait;
use base64::Engine;
use chrono::{DateTime, Duration, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use uuid::Uuid;

use crate::adapters::rows::migrate_all;
use crate::domain::result::{Error, Result};
use crate::domain::{
    filter_and_sort, normalize_email, CanonicalStatus, Contact, FeeSchedule, ListFilter, Profile,
    Request, Role, Session, User, Vehicle,
};
use crate::ports::{
    keys, AuthProvider, AuthSubscription, GoogleLoginOptions, LocalStore, OAuthRedirect,
    RequestRepository,
};

/// Password shared by the seeded demo accounts
pub const DEMO_PASSWORD: &str = "demo1234";

pub const DEMO_USER_EMAIL: &str = "user@demo.test";
pub const DEMO_MECHANIC_EMAIL: &str = "mechanic@demo.test";
pub const DEMO_ADMIN_EMAIL: &str = "admin@demo.test";

const DEMO_USER_ID: &str = "demo-user";
const DEMO_MECHANIC_ID: &str = "demo-mechanic";
const DEMO_ADMIN_ID: &str = "demo-admin";

/// Argon2id parameters for locally stored passwords
const HASH_MEMORY_KIB: u32 = 4096;
const HASH_TIME_COST: u32 = 2;
const HASH_PARALLELISM: u32 = 1;
const HASH_LEN: usize = 32;

/// User record as kept in local storage
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StoredUser {
    id: String,
    email: String,
    #[serde(default)]
    role: Role,
    #[serde(default)]
    approved: bool,
    #[serde(default)]
    profile: Option<Profile>,
    password_salt: String,
    password_hash: String,
    created_at: DateTime<Utc>,
}

impl StoredUser {
    fn new(id: String, email: &str, password: &str, role: Role) -> Result<Self> {
        let (salt, hash) = hash_password(password)?;
        Ok(Self {
            id,
            email: normalize_email(email),
            role,
            approved: true,
            profile: None,
            password_salt: salt,
            password_hash: hash,
            created_at: Utc::now(),
        })
    }

    fn to_user(&self) -> User {
        User {
            id: self.id.clone(),
            email: self.email.clone(),
            role: self.role,
            approved: self.approved,
            profile: self.profile.clone(),
        }
    }
}

fn argon2() -> Result<argon2::Argon2<'static>> {
    let params = argon2::Params::new(
        HASH_MEMORY_KIB,
        HASH_TIME_COST,
        HASH_PARALLELISM,
        Some(HASH_LEN),
    )
    .map_err(|e| Error::Other(format!("Failed to create argon2 params: {:?}", e)))?;

    Ok(argon2::Argon2::new(
        argon2::Algorithm::Argon2id,
        argon2::Version::V0x13,
        params,
    ))
}

fn derive(password: &str, salt: &[u8]) -> Result<Vec<u8>> {
    let mut hash = vec![0u8; HASH_LEN];
    argon2()?
        .hash_password_into(password.as_bytes(), salt, &mut hash)
        .map_err(|e| Error::Other(format!("Failed to hash password: {:?}", e)))?;
    Ok(hash)
}

/// Hash a password with a fresh salt; returns (salt, hash) as base64
fn hash_password(password: &str) -> Result<(String, String)> {
    let salt: [u8; 16] = rand::thread_rng().gen();
    let hash = derive(password, &salt)?;
    let engine = base64::engine::general_purpose::STANDARD;
    Ok((engine.encode(salt), engine.encode(hash)))
}

fn verify_password(user: &StoredUser, password: &str) -> bool {
    let engine = base64::engine::general_purpose::STANDARD;
    let (Ok(salt), Ok(expected)) = (
        engine.decode(&user.password_salt),
        engine.decode(&user.password_hash),
    ) else {
        return false;
    };
    match derive(password, &salt) {
        Ok(actual) => {
            actual.len() == expected.len()
                && actual
                    .iter()
                    .zip(expected.iter())
                    .fold(0u8, |acc, (a, b)| acc | (a ^ b))
                    == 0
        }
        Err(_) => false,
    }
}

/// Local-storage backed implementation of both ports
pub struct MockBackend {
    store: LocalStore,
}

impl MockBackend {
    /// Open the mock backend, seeding demo data on first access
    pub fn new(store: LocalStore) -> Result<Self> {
        let backend = Self { store };
        backend.ensure_seeded()?;
        backend.absorb_legacy_requests();
        Ok(backend)
    }

    fn ensure_seeded(&self) -> Result<()> {
        if self.store.contains(keys::SEEDED) {
            return Ok(());
        }

        let mut users = self.users();
        for seed in demo_users()? {
            if !users.iter().any(|u| u.email == seed.email) {
                users.push(seed);
            }
        }
        self.store.write(keys::USERS, &users);

        let mut raw = self.raw_requests();
        for request in demo_requests() {
            raw.push(request.to_stored()?);
        }
        self.store.write(keys::REQUESTS, &raw);

        if !self.store.contains(keys::FEES) {
            self.store.write(keys::FEES, &FeeSchedule::default());
        }

        self.store.write(keys::SEEDED, &true);
        Ok(())
    }

    /// Fold the older page-local request list into the main list
    fn absorb_legacy_requests(&self) {
        let Some(legacy) = self.store.read_opt::<Vec<JsonValue>>(keys::LEGACY_SIMPLE_REQUESTS)
        else {
            return;
        };

        let (legacy_requests, _) = migrate_all(&legacy);
        let (mut requests, _) = migrate_all(&self.raw_requests());
        for request in legacy_requests {
            if !requests.iter().any(|r| r.id == request.id) {
                requests.push(request);
            }
        }
        self.save_requests(&requests);
        self.store.remove(keys::LEGACY_SIMPLE_REQUESTS);
    }

    fn users(&self) -> Vec<StoredUser> {
        self.store.read(keys::USERS, Vec::new())
    }

    fn raw_requests(&self) -> Vec<JsonValue> {
        self.store.read(keys::REQUESTS, Vec::new())
    }

    fn save_requests(&self, requests: &[Request]) {
        let stored: Vec<JsonValue> = requests
            .iter()
            .filter_map(|r| r.to_stored().ok())
            .collect();
        self.store.write(keys::REQUESTS, &stored);
    }

    /// Load all requests, rewriting the list once if any record was migrated
    fn load_requests(&self) -> Vec<Request> {
        let (requests, changed) = migrate_all(&self.raw_requests());
        if changed {
            self.save_requests(&requests);
        }
        requests
    }

    fn start_session(&self, user: &StoredUser) {
        self.store.write(
            keys::SESSION,
            &Session {
                user_id: user.id.clone(),
            },
        );
    }
}

#[async_trait]
impl AuthProvider for MockBackend {
    async fn register(&self, email: &str, password: &str) -> Result<User> {
        let email = normalize_email(email);
        let mut users = self.users();
        if users.iter().any(|u| u.email == email) {
            return Err(Error::validation("Email already registered."));
        }

        let user = StoredUser::new(Uuid::new_v4().to_string(), &email, password, Role::User)?;
        users.push(user.clone());
        self.store.write(keys::USERS, &users);
        self.start_session(&user);

        Ok(user.to_user())
    }

    async fn login(&self, email: &str, password: &str) -> Result<User> {
        let email = normalize_email(email);
        let user = self
            .users()
            .into_iter()
            .find(|u| u.email == email)
            .filter(|u| verify_password(u, password))
            .ok_or_else(|| Error::auth("Invalid email or password"))?;

        self.start_session(&user);
        Ok(user.to_user())
    }

    async fn google_redirect(&self, _options: &GoogleLoginOptions) -> Result<OAuthRedirect> {
        Err(Error::config(
            "Google sign-in requires a hosted backend; none is configured",
        ))
    }

    async fn complete_oauth(&self, _callback_url: &str) -> Result<User> {
        Err(Error::config(
            "Google sign-in requires a hosted backend; none is configured",
        ))
    }

    async fn logout(&self) -> Result<()> {
        self.store.remove(keys::SESSION);
        Ok(())
    }

    async fn current_user(&self) -> Result<Option<User>> {
        let Some(session) = self.store.read_opt::<Session>(keys::SESSION) else {
            return Ok(None);
        };
        Ok(self
            .users()
            .iter()
            .find(|u| u.id == session.user_id)
            .map(StoredUser::to_user))
    }

    fn subscribe(&self) -> AuthSubscription {
        AuthSubscription::inert()
    }
}

#[async_trait]
impl RequestRepository for MockBackend {
    async fn list_requests(&self, filter: &ListFilter) -> Result<Vec<Request>> {
        Ok(filter_and_sort(self.load_requests(), filter))
    }

    async fn insert_request(&self, request: &Request) -> Result<Request> {
        let mut requests = self.load_requests();
        requests.push(request.clone());
        self.save_requests(&requests);
        Ok(request.clone())
    }

    async fn clear_requests(&self) -> Result<usize> {
        let count = self.load_requests().len();
        self.store.write(keys::REQUESTS, &Vec::<JsonValue>::new());
        self.store.remove(keys::LEGACY_SIMPLE_REQUESTS);
        Ok(count)
    }

    async fn fee_schedule(&self) -> Result<FeeSchedule> {
        Ok(self.store.read(keys::FEES, FeeSchedule::default()))
    }
}

fn demo_users() -> Result<Vec<StoredUser>> {
    Ok(vec![
        StoredUser::new(DEMO_USER_ID.to_string(), DEMO_USER_EMAIL, DEMO_PASSWORD, Role::User)?,
        StoredUser::new(
            DEMO_MECHANIC_ID.to_string(),
            DEMO_MECHANIC_EMAIL,
            DEMO_PASSWORD,
            Role::Mechanic,
        )?,
        StoredUser::new(DEMO_ADMIN_ID.to_string(), DEMO_ADMIN_EMAIL, DEMO_PASSWORD, Role::Admin)?,
    ])
}

fn demo_requests() -> Vec<Request> {
    let now = Utc::now();
    vec![
        Request {
            id: "demo-request-1".to_string(),
            created_at: now - Duration::days(2),
            user_id: DEMO_USER_ID.to_string(),
            user_email: DEMO_USER_EMAIL.to_string(),
            vehicle: Vehicle::new("Toyota", "Corolla"),
            issue_description: "Flat tire on the highway shoulder".to_string(),
            contact: Contact::new("Demo User", "555-0100"),
            status: CanonicalStatus::Assigned.as_str().to_string(),
            assigned_mechanic_id: Some(DEMO_MECHANIC_ID.to_string()),
            assigned_mechanic_email: Some(DEMO_MECHANIC_EMAIL.to_string()),
            notes: Vec::new(),
        },
        Request {
            id: "demo-request-2".to_string(),
            created_at: now - Duration::hours(3),
            user_id: DEMO_USER_ID.to_string(),
            user_email: DEMO_USER_EMAIL.to_string(),
            vehicle: Vehicle::new("Honda", "Civic"),
            issue_description: "Car will not start, battery seems dead".to_string(),
            contact: Contact::new("Demo User", "555-0100"),
            status: CanonicalStatus::Open.as_str().to_string(),
            assigned_mechanic_id: None,
            assigned_mechanic_email: None,
            notes: Vec::new(),
        },
    ]
}
