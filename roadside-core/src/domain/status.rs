//! Request status normalization
//!
//! Status strings reach us from several places: the hosted `requests` table,
//! older local records, and values typed into forms. They are folded into a
//! six-value canonical set before anything is displayed.

use std::fmt;
use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

/// Canonical request lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CanonicalStatus {
    Open,
    Assigned,
    EnRoute,
    Working,
    Completed,
    Canceled,
}

impl CanonicalStatus {
    pub const ALL: [CanonicalStatus; 6] = [
        CanonicalStatus::Open,
        CanonicalStatus::Assigned,
        CanonicalStatus::EnRoute,
        CanonicalStatus::Working,
        CanonicalStatus::Completed,
        CanonicalStatus::Canceled,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            CanonicalStatus::Open => "OPEN",
            CanonicalStatus::Assigned => "ASSIGNED",
            CanonicalStatus::EnRoute => "EN_ROUTE",
            CanonicalStatus::Working => "WORKING",
            CanonicalStatus::Completed => "COMPLETED",
            CanonicalStatus::Canceled => "CANCELED",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            CanonicalStatus::Open => "Open",
            CanonicalStatus::Assigned => "Assigned",
            CanonicalStatus::EnRoute => "En Route",
            CanonicalStatus::Working => "Working",
            CanonicalStatus::Completed => "Completed",
            CanonicalStatus::Canceled => "Canceled",
        }
    }

    /// Map an already collapsed, uppercased token to its canonical value
    fn from_token(token: &str) -> Option<Self> {
        match token {
            "PENDING" | "OPEN" | "SUBMITTED" | "IN_REVIEW" => Some(CanonicalStatus::Open),
            "ASSIGNED" | "ACCEPTED" => Some(CanonicalStatus::Assigned),
            "EN_ROUTE" => Some(CanonicalStatus::EnRoute),
            "WORKING" | "IN_PROGRESS" => Some(CanonicalStatus::Working),
            "COMPLETED" | "CLOSED" => Some(CanonicalStatus::Completed),
            "CANCELED" | "CANCELLED" => Some(CanonicalStatus::Canceled),
            _ => None,
        }
    }
}

impl fmt::Display for CanonicalStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of normalizing a raw status string
///
/// Unknown tokens are kept (uppercased, underscored) rather than coerced, so a
/// status introduced by another actor still shows up as something readable.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum NormalizedStatus {
    Canonical(CanonicalStatus),
    Unmapped(String),
}

impl NormalizedStatus {
    pub fn as_str(&self) -> &str {
        match self {
            NormalizedStatus::Canonical(status) => status.as_str(),
            NormalizedStatus::Unmapped(token) => token,
        }
    }

    pub fn canonical(&self) -> Option<CanonicalStatus> {
        match self {
            NormalizedStatus::Canonical(status) => Some(*status),
            NormalizedStatus::Unmapped(_) => None,
        }
    }
}

impl fmt::Display for NormalizedStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<CanonicalStatus> for NormalizedStatus {
    fn from(status: CanonicalStatus) -> Self {
        NormalizedStatus::Canonical(status)
    }
}

fn whitespace() -> &'static Regex {
    static WHITESPACE: OnceLock<Regex> = OnceLock::new();
    WHITESPACE.get_or_init(|| Regex::new(r"\s+").expect("static regex"))
}

/// Normalize a raw status string
///
/// Trims, uppercases and replaces whitespace runs with `_`, then looks the
/// token up in the mapping table. Empty or missing input is `OPEN`.
pub fn normalize_status(raw: Option<&str>) -> NormalizedStatus {
    let trimmed = raw.map(str::trim).unwrap_or_default();
    if trimmed.is_empty() {
        return NormalizedStatus::Canonical(CanonicalStatus::Open);
    }

    let token = whitespace()
        .replace_all(&trimmed.to_uppercase(), "_")
        .into_owned();

    match CanonicalStatus::from_token(&token) {
        Some(status) => NormalizedStatus::Canonical(status),
        None => NormalizedStatus::Unmapped(token),
    }
}

/// Human-readable label for a raw status
pub fn status_label(raw: Option<&str>) -> String {
    match normalize_status(raw) {
        NormalizedStatus::Canonical(status) => status.label().to_string(),
        NormalizedStatus::Unmapped(token) => title_case(&token),
    }
}

/// Presentation badge for a status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BadgeClass {
    Info,
    Neutral,
    Warning,
    Success,
    Error,
}

impl BadgeClass {
    pub fn as_str(&self) -> &'static str {
        match self {
            BadgeClass::Info => "badge-info",
            BadgeClass::Neutral => "badge-neutral",
            BadgeClass::Warning => "badge-warning",
            BadgeClass::Success => "badge-success",
            BadgeClass::Error => "badge-error",
        }
    }
}

/// Badge style for a raw status
pub fn status_badge_class(raw: Option<&str>) -> BadgeClass {
    match normalize_status(raw).canonical() {
        Some(CanonicalStatus::Open) => BadgeClass::Info,
        Some(CanonicalStatus::Assigned)
        | Some(CanonicalStatus::EnRoute)
        | Some(CanonicalStatus::Working) => BadgeClass::Warning,
        Some(CanonicalStatus::Completed) => BadgeClass::Success,
        Some(CanonicalStatus::Canceled) => BadgeClass::Error,
        None => BadgeClass::Neutral,
    }
}

/// Three-value status used by the simplified request history view
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SimpleStatus {
    Open,
    Assigned,
    Completed,
}

impl SimpleStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SimpleStatus::Open => "Open",
            SimpleStatus::Assigned => "Assigned",
            SimpleStatus::Completed => "Completed",
        }
    }
}

/// Fold a raw status into the simplified history view
pub fn simplified_status(raw: Option<&str>) -> SimpleStatus {
    match normalize_status(raw).canonical() {
        Some(CanonicalStatus::Assigned)
        | Some(CanonicalStatus::EnRoute)
        | Some(CanonicalStatus::Working) => SimpleStatus::Assigned,
        Some(CanonicalStatus::Completed) | Some(CanonicalStatus::Canceled) => {
            SimpleStatus::Completed
        }
        Some(CanonicalStatus::Open) | None => SimpleStatus::Open,
    }
}

fn title_case(token: &str) -> String {
    token
        .split('_')
        .filter(|word| !word.is_empty())
        .map(|word| {
            let lower = word.to_lowercase();
            let mut chars = lower.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<String>>()
        .join(" ")
}
