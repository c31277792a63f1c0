//! Integration tests for roadside-core
//!
//! These exercise the facade end to end over the real file-backed store in a
//! temporary profile directory. No network is involved: every profile here
//! is in mock mode.
//!
//! Run with: cargo test --test integration_tests -- --nocapture

use std::io::{Read, Write};
use std::net::TcpListener;
use std::sync::Arc;
use std::thread;

use serde_json::json;
use tempfile::TempDir;

use roadside_core::adapters::file_store::FileStorage;
use roadside_core::adapters::mock::{DEMO_MECHANIC_EMAIL, DEMO_PASSWORD, DEMO_USER_EMAIL};
use roadside_core::config::Config;
use roadside_core::domain::{normalize_status, status_label, Vehicle};
use roadside_core::ports::{keys, LocalStore, StorageBackend};
use roadside_core::services::{
    map_preview, resolve_route, DataAccess, MapPreview, MapTarget,
};
use roadside_core::{
    BootSequencer, CanonicalStatus, Error, ListFilter, Mode, NewRequest, RoadsideContext, Role,
    Route, RouteDecision,
};

// ============================================================================
// Test Helpers
// ============================================================================

/// Profile directory pinned to mock mode regardless of the environment
fn mock_profile() -> TempDir {
    let dir = TempDir::new().unwrap();
    std::fs::write(
        dir.path().join("settings.json"),
        r#"{"app": {"mockMode": true}}"#,
    )
    .unwrap();
    dir
}

/// Local Nominatim stand-in answering one search with `body`
fn geocoding_server(body: &'static str) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();
    thread::spawn(move || {
        if let Ok((mut stream, _)) = listener.accept() {
            let mut buffer = [0; 4096];
            let _ = stream.read(&mut buffer);
            let response = format!(
                "HTTP/1.1 200 OK\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                body.len(),
                body
            );
            let _ = stream.write_all(response.as_bytes());
        }
    });
    format!("http://127.0.0.1:{}", port)
}

fn open_access(dir: &TempDir) -> DataAccess {
    let store = LocalStore::new(Arc::new(FileStorage::new(dir.path()).unwrap()));
    DataAccess::new(&Config::default(), store).unwrap()
}

fn submission(user: roadside_core::User) -> NewRequest {
    NewRequest {
        user: Some(user),
        vehicle: json!({"make": "Toyota", "model": "Corolla", "year": "2020", "plate": "XYZ"}),
        issue_description: "Flat tire on the highway".to_string(),
        contact: json!({"name": "Sam", "phone": "555-0100", "email": "ignored@x.com"}),
    }
}

// ============================================================================
// Facade scenarios
// ============================================================================

#[tokio::test]
async fn test_register_scenario() {
    let dir = mock_profile();
    let access = open_access(&dir);

    let user = access.register("a@x.com", "secret1").await.unwrap();
    assert_eq!(user.role, Role::User);
    assert!(user.approved);

    let err = access.register("a@x.com", "secret1").await.unwrap_err();
    assert!(matches!(err, Error::Validation(_)));
    assert_eq!(err.to_string(), "Email already registered.");
}

#[tokio::test]
async fn test_submitted_vehicle_is_make_and_model_on_disk() {
    let dir = mock_profile();
    let access = open_access(&dir);
    let user = access.register("a@x.com", "secret1").await.unwrap();

    let created = access.create_request(submission(user)).await.unwrap();
    assert_eq!(created.vehicle, Vehicle::new("Toyota", "Corolla"));

    // Inspect the raw persisted record, not just the typed view
    let storage = FileStorage::new(dir.path()).unwrap();
    let raw = storage.get_item(keys::REQUESTS).unwrap().unwrap();
    let records: Vec<serde_json::Value> = serde_json::from_str(&raw).unwrap();
    let stored = records
        .iter()
        .find(|r| r["id"] == json!(created.id))
        .unwrap();
    assert_eq!(stored["vehicle"], json!({"make": "Toyota", "model": "Corolla"}));
    assert_eq!(stored["contact"], json!({"name": "Sam", "phone": "555-0100"}));
    assert_eq!(stored["status"], json!("OPEN"));
    assert_eq!(stored["schema"], json!(1));
}

#[tokio::test]
async fn test_session_survives_reopen() {
    let dir = mock_profile();
    {
        let access = open_access(&dir);
        access.login(DEMO_USER_EMAIL, DEMO_PASSWORD).await.unwrap();
    }

    let access = open_access(&dir);
    let user = access.get_current_user().await.unwrap().unwrap();
    assert_eq!(user.email, DEMO_USER_EMAIL);

    access.logout().await.unwrap();
    let access = open_access(&dir);
    assert!(access.get_current_user().await.unwrap().is_none());
}

#[tokio::test]
async fn test_seed_runs_once() {
    let dir = mock_profile();
    let access = open_access(&dir);
    let mechanic = access.login(DEMO_MECHANIC_EMAIL, DEMO_PASSWORD).await.unwrap();
    assert_eq!(mechanic.role, Role::Mechanic);

    assert_eq!(access.clear_requests().await.unwrap(), 2);

    // Reopening must not bring the demo requests back
    let access = open_access(&dir);
    assert!(access.list_requests(ListFilter::all()).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_listing_per_user_newest_first() {
    let dir = mock_profile();
    let access = open_access(&dir);
    let a = access.register("a@x.com", "secret1").await.unwrap();
    let b = access.register("b@x.com", "secret1").await.unwrap();

    let first = access.create_request(submission(a.clone())).await.unwrap();
    access.create_request(submission(b.clone())).await.unwrap();
    let second = access.create_request(submission(a.clone())).await.unwrap();

    let mine = access.list_requests(ListFilter::for_user(&a.id)).await.unwrap();
    let ids: Vec<&str> = mine.iter().map(|r| r.id.as_str()).collect();
    assert_eq!(ids, vec![second.id.as_str(), first.id.as_str()]);
}

#[tokio::test]
async fn test_legacy_page_local_list_is_absorbed() {
    let dir = mock_profile();
    let storage = FileStorage::new(dir.path()).unwrap();
    storage
        .set_item(
            keys::LEGACY_SIMPLE_REQUESTS,
            &json!([{
                "id": "legacy-1",
                "createdAt": "2023-01-01T08:00:00Z",
                "userId": "demo-user",
                "make": "Honda",
                "model": "Jazz",
                "issue": "Dead battery",
                "phone": "777",
                "status": "closed"
            }])
            .to_string(),
        )
        .unwrap();

    let access = open_access(&dir);
    let legacy = access.get_request_by_id("legacy-1").await.unwrap().unwrap();
    assert_eq!(legacy.vehicle, Vehicle::new("Honda", "Jazz"));
    assert_eq!(legacy.contact.phone, "777");
    assert_eq!(legacy.status, "COMPLETED");
    assert!(storage.get_item(keys::LEGACY_SIMPLE_REQUESTS).unwrap().is_none());
}

#[tokio::test]
async fn test_corrupt_storage_falls_back() {
    let dir = mock_profile();
    std::fs::write(dir.path().join("storage.json"), "{not json").unwrap();

    // Unreadable storage reads as empty and is reseeded
    let access = open_access(&dir);
    let user = access.login(DEMO_USER_EMAIL, DEMO_PASSWORD).await.unwrap();
    assert_eq!(user.email, DEMO_USER_EMAIL);
}

// ============================================================================
// Context and boot
// ============================================================================

#[tokio::test]
async fn test_context_boot_in_mock_mode() {
    let dir = mock_profile();
    let ctx = RoadsideContext::new(dir.path()).unwrap();
    assert_eq!(ctx.config.mode(), Mode::Mock);
    assert!(!ctx.access.is_supabase_configured());

    let err = ctx
        .access
        .login_with_google(Default::default())
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Config(_)));

    let mut handle = BootSequencer::start(Arc::clone(&ctx.access), ctx.boot_options());
    let state = handle.booted().await;
    assert!(state.user.is_none());
    assert_eq!(
        resolve_route(&state, Route::Requests),
        RouteDecision::Redirect(Route::Login)
    );
    handle.shutdown().await;
}

#[tokio::test]
async fn test_geocoding_is_blocked_in_mock_mode() {
    let dir = mock_profile();
    let ctx = RoadsideContext::new(dir.path()).unwrap();

    let err = ctx.geocoder.lookup("10 Downing Street").await.unwrap_err();
    match err {
        Error::Blocked(url) => assert!(url.contains("/search?")),
        other => panic!("expected Blocked, got {:?}", other),
    }
}

#[tokio::test]
async fn test_geocoding_works_without_hosted_credentials() {
    let base = geocoding_server(
        r#"[{"lat": "51.5034", "lon": "-0.1276", "display_name": "10 Downing Street"}]"#,
    );
    let dir = TempDir::new().unwrap();
    std::fs::write(
        dir.path().join("settings.json"),
        json!({"app": {"mockMode": false}, "geocoding": {"baseUrl": base}}).to_string(),
    )
    .unwrap();

    let ctx = RoadsideContext::new(dir.path()).unwrap();
    // Requests still go to the local store; fetches are not blocked
    assert_eq!(ctx.config.mode(), Mode::Mock);
    let place = ctx.geocoder.lookup("10 Downing Street").await.unwrap();
    assert_eq!(place.display_name, "10 Downing Street");
    assert!((place.lat - 51.5034).abs() < 1e-9);
}

// ============================================================================
// Presentation helpers
// ============================================================================

#[test]
fn test_status_examples() {
    assert_eq!(normalize_status(Some("in review")).as_str(), "OPEN");
    assert_eq!(normalize_status(Some("Accepted")).as_str(), "ASSIGNED");
    assert_eq!(normalize_status(Some("")).as_str(), "OPEN");
    assert_eq!(
        normalize_status(Some("  en   route ")).canonical(),
        Some(CanonicalStatus::EnRoute)
    );

    for raw in ["pending", "In Progress", "cancelled", "on hold", ""] {
        let normalized = normalize_status(Some(raw));
        assert_eq!(status_label(Some(normalized.as_str())), status_label(Some(raw)));
    }
}

#[test]
fn test_map_preview_degrades() {
    assert!(matches!(
        map_preview(&MapTarget::Coordinates { lat: 40.7, lon: -74.0 }),
        MapPreview::Embed { .. }
    ));
    assert!(map_preview(&MapTarget::Coordinates { lat: 400.0, lon: 0.0 }).is_placeholder());
}
