//! Service layer - orchestration over the ports
//!
//! The facade and boot sequencer only see port traits; the concrete
//! adapters are chosen once from configuration.

pub mod access;
pub mod boot;
pub mod bounded;
pub mod logging;
pub mod maps;

pub use access::DataAccess;
pub use boot::{
    resolve_route, AppState, BootHandle, BootOptions, BootSequencer, Route, RouteDecision,
};
pub use bounded::{bounded, Waited};
pub use logging::{redact, EntryPoint, LogEntry, LogEvent, LogFilter, LoggingService};
pub use maps::{map_preview, notifications_supported, MapPreview, MapTarget};
