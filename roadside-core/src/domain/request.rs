//! Roadside assistance request domain model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use super::status::{normalize_status, CanonicalStatus, NormalizedStatus};
use super::user::User;

/// Current on-disk / on-wire schema version for request records
pub const REQUEST_SCHEMA_VERSION: u32 = 1;

/// Vehicle as persisted: exactly `make` and `model`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Vehicle {
    pub make: String,
    pub model: String,
}

impl Vehicle {
    pub fn new(make: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            make: make.into(),
            model: model.into(),
        }
    }

    /// Build a vehicle from any submitted JSON, keeping only `make` and `model`
    ///
    /// Non-string values become empty strings. Other keys (year, plate, ...)
    /// are dropped.
    pub fn from_json(value: &JsonValue) -> Self {
        Self {
            make: string_field(value, "make"),
            model: string_field(value, "model"),
        }
    }
}

/// Contact details for a request
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Contact {
    pub name: String,
    pub phone: String,
}

impl Contact {
    pub fn new(name: impl Into<String>, phone: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            phone: phone.into(),
        }
    }

    pub fn from_json(value: &JsonValue) -> Self {
        Self {
            name: string_field(value, "name"),
            phone: string_field(value, "phone"),
        }
    }
}

/// A persisted roadside assistance request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Request {
    pub id: String,
    pub created_at: DateTime<Utc>,
    pub user_id: String,
    pub user_email: String,
    pub vehicle: Vehicle,
    pub issue_description: String,
    pub contact: Contact,
    /// Canonical status token (or an unmapped token kept verbatim)
    pub status: String,
    pub assigned_mechanic_id: Option<String>,
    pub assigned_mechanic_email: Option<String>,
    #[serde(default)]
    pub notes: Vec<String>,
}

impl Request {
    pub fn normalized_status(&self) -> NormalizedStatus {
        normalize_status(Some(&self.status))
    }

    /// Serialize for local storage, tagged with the schema version
    pub fn to_stored(&self) -> serde_json::Result<JsonValue> {
        let mut value = serde_json::to_value(self)?;
        if let Some(obj) = value.as_object_mut() {
            obj.insert("schema".to_string(), JsonValue::from(REQUEST_SCHEMA_VERSION));
        }
        Ok(value)
    }
}

/// Input for creating a request
///
/// `vehicle` is accepted as free-form JSON so forms can pass whatever they
/// collected; only `make` and `model` survive.
#[derive(Debug, Clone)]
pub struct NewRequest {
    pub user: Option<User>,
    pub vehicle: JsonValue,
    pub issue_description: String,
    pub contact: JsonValue,
}

impl NewRequest {
    /// Status every new request starts in
    pub const INITIAL_STATUS: CanonicalStatus = CanonicalStatus::Open;
}

/// Filter for listing requests
#[derive(Debug, Clone, Default)]
pub struct ListFilter {
    pub for_user_id: Option<String>,
}

impl ListFilter {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn for_user(user_id: impl Into<String>) -> Self {
        Self {
            for_user_id: Some(user_id.into()),
        }
    }
}

/// Apply a list filter and sort newest first
pub fn filter_and_sort(mut requests: Vec<Request>, filter: &ListFilter) -> Vec<Request> {
    if let Some(user_id) = &filter.for_user_id {
        requests.retain(|r| &r.user_id == user_id);
    }
    requests.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    requests
}

fn string_field(value: &JsonValue, key: &str) -> String {
    value
        .get(key)
        .and_then(JsonValue::as_str)
        .unwrap_or_default()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    fn request(id: &str, user_id: &str, ts: i64) -> Request {
        Request {
            id: id.to_string(),
            created_at: Utc.timestamp_opt(ts, 0).unwrap(),
            user_id: user_id.to_string(),
            user_email: format!("{}@x.com", user_id),
            vehicle: Vehicle::new("Toyota", "Corolla"),
            issue_description: "Flat tire".to_string(),
            contact: Contact::new("Sam", "555-0100"),
            status: "OPEN".to_string(),
            assigned_mechanic_id: None,
            assigned_mechanic_email: None,
            notes: vec![],
        }
    }

    #[test]
    fn test_vehicle_drops_extra_fields() {
        let vehicle = Vehicle::from_json(&json!({
            "make": "Toyota", "model": "Corolla", "year": "2020", "plate": "ABC123"
        }));
        assert_eq!(vehicle, Vehicle::new("Toyota", "Corolla"));

        let value = serde_json::to_value(&vehicle).unwrap();
        let keys: Vec<&String> = value.as_object().unwrap().keys().collect();
        assert_eq!(keys, vec!["make", "model"]);
    }

    #[test]
    fn test_vehicle_non_string_fields_become_empty() {
        let vehicle = Vehicle::from_json(&json!({"make": 42}));
        assert_eq!(vehicle, Vehicle::new("", ""));
        assert_eq!(Vehicle::from_json(&JsonValue::Null), Vehicle::default());
    }

    #[test]
    fn test_filter_and_sort() {
        let requests = vec![
            request("a", "u1", 100),
            request("b", "u2", 300),
            request("c", "u1", 200),
        ];

        let all = filter_and_sort(requests.clone(), &ListFilter::all());
        let ids: Vec<&str> = all.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["b", "c", "a"]);

        let mine = filter_and_sort(requests, &ListFilter::for_user("u1"));
        let ids: Vec<&str> = mine.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["c", "a"]);
    }

    #[test]
    fn test_stored_shape_is_versioned() {
        let stored = request("a", "u1", 100).to_stored().unwrap();
        assert_eq!(stored["schema"], json!(REQUEST_SCHEMA_VERSION));
        assert_eq!(stored["issueDescription"], json!("Flat tire"));
    }
}
