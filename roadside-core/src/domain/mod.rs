//! Core domain entities
//!
//! Pure data structures and the rules that apply to them - no I/O.

mod fees;
mod request;
mod session;
pub mod status;
mod user;
pub mod result;

pub use fees::{FeeSchedule, ServiceFee};
pub use request::{
    filter_and_sort, Contact, ListFilter, NewRequest, Request, Vehicle, REQUEST_SCHEMA_VERSION,
};
pub use session::{HostedSession, Session};
pub use status::{
    normalize_status, simplified_status, status_badge_class, status_label, BadgeClass,
    CanonicalStatus, NormalizedStatus, SimpleStatus,
};
pub use user::{normalize_email, Profile, Role, User};
