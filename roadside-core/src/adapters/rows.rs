//! Request record migration
//!
//! Request records have been written in several shapes over time: camelCase
//! objects from the local store, snake_case rows from the hosted table,
//! `vehicle`/`contact` stored as JSON strings, or flattened into
//! `vehicle_make`/`contact_phone` style columns. Every adapter passes raw
//! records through [`migrate_request`] exactly once, at the storage boundary,
//! and works with typed [`Request`]s from then on.

use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use serde_json::{Map, Value as JsonValue};

use crate::domain::{normalize_status, Contact, Request, Vehicle, REQUEST_SCHEMA_VERSION};

/// A migrated record plus whether it was already in the current shape
#[derive(Debug, Clone)]
pub struct Migrated {
    pub request: Request,
    pub current: bool,
}

/// Migrate one raw record; `None` if it has no usable id
pub fn migrate_request(raw: &JsonValue) -> Option<Migrated> {
    let obj = raw.as_object()?;
    let id = id_field(obj, &["id"])?;

    let current = obj
        .get("schema")
        .and_then(JsonValue::as_u64)
        .map(|v| v == REQUEST_SCHEMA_VERSION as u64)
        .unwrap_or(false);

    let request = Request {
        id,
        created_at: timestamp_field(obj, &["created_at", "createdAt"]),
        user_id: id_field(obj, &["user_id", "userId"]).unwrap_or_default(),
        user_email: str_field(obj, &["user_email", "userEmail"]).unwrap_or_default(),
        vehicle: vehicle_from(obj),
        issue_description: str_field(
            obj,
            &["issue_description", "issueDescription", "issue", "description"],
        )
        .unwrap_or_default(),
        contact: contact_from(obj),
        status: normalize_status(str_field(obj, &["status"]).as_deref())
            .as_str()
            .to_string(),
        assigned_mechanic_id: id_field(obj, &["assigned_mechanic_id", "assignedMechanicId"]),
        assigned_mechanic_email: str_field(
            obj,
            &["assigned_mechanic_email", "assignedMechanicEmail"],
        ),
        notes: notes_from(obj),
    };

    Some(Migrated { request, current })
}

/// Migrate a list of raw records, dropping unusable ones
///
/// Returns the requests and whether any record needed migrating.
pub fn migrate_all(raw: &[JsonValue]) -> (Vec<Request>, bool) {
    let mut changed = false;
    let mut requests = Vec::with_capacity(raw.len());
    for value in raw {
        match migrate_request(value) {
            Some(migrated) => {
                changed |= !migrated.current;
                requests.push(migrated.request);
            }
            None => changed = true,
        }
    }
    (requests, changed)
}

fn vehicle_from(obj: &Map<String, JsonValue>) -> Vehicle {
    if let Some(structured) = structured_field(obj, "vehicle") {
        return Vehicle::from_json(&structured);
    }
    Vehicle {
        make: str_field(obj, &["vehicle_make", "vehicleMake", "make"]).unwrap_or_default(),
        model: str_field(obj, &["vehicle_model", "vehicleModel", "model"]).unwrap_or_default(),
    }
}

fn contact_from(obj: &Map<String, JsonValue>) -> Contact {
    if let Some(structured) = structured_field(obj, "contact") {
        return Contact::from_json(&structured);
    }
    Contact {
        name: str_field(obj, &["contact_name", "contactName", "name"]).unwrap_or_default(),
        phone: str_field(obj, &["contact_phone", "contactPhone", "phone"]).unwrap_or_default(),
    }
}

/// An object stored directly or as a JSON-encoded string
fn structured_field(obj: &Map<String, JsonValue>, key: &str) -> Option<JsonValue> {
    match obj.get(key)? {
        value @ JsonValue::Object(_) => Some(value.clone()),
        JsonValue::String(s) => serde_json::from_str::<JsonValue>(s)
            .ok()
            .filter(JsonValue::is_object),
        _ => None,
    }
}

fn str_field(obj: &Map<String, JsonValue>, keys: &[&str]) -> Option<String> {
    keys.iter()
        .find_map(|key| obj.get(*key).and_then(JsonValue::as_str))
        .map(str::to_string)
}

fn id_field(obj: &Map<String, JsonValue>, keys: &[&str]) -> Option<String> {
    keys.iter().find_map(|key| match obj.get(*key)? {
        JsonValue::String(s) if !s.is_empty() => Some(s.clone()),
        JsonValue::Number(n) => Some(n.to_string()),
        _ => None,
    })
}

fn timestamp_field(obj: &Map<String, JsonValue>, keys: &[&str]) -> DateTime<Utc> {
    keys.iter()
        .find_map(|key| match obj.get(*key)? {
            JsonValue::String(s) => parse_timestamp(s),
            JsonValue::Number(n) => n
                .as_i64()
                .and_then(|ms| Utc.timestamp_millis_opt(ms).single()),
            _ => None,
        })
        .unwrap_or(DateTime::<Utc>::UNIX_EPOCH)
}

fn parse_timestamp(s: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    // Postgres text output, e.g. "2024-05-01 10:00:00.123+00"
    if let Ok(dt) = DateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%.f%#z") {
        return Some(dt.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f")
        .ok()
        .map(|naive| naive.and_utc())
}

fn notes_from(obj: &Map<String, JsonValue>) -> Vec<String> {
    match obj.get("notes") {
        Some(JsonValue::Array(items)) => items
            .iter()
            .map(|item| match item {
                JsonValue::String(s) => s.clone(),
                other => other.to_string(),
            })
            .collect(),
        _ => Vec::new(),
    }
}
