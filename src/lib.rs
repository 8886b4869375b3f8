// Library interface for tridash
// The dashboard binary and the integration tests both build on these modules.

pub mod api;
pub mod auth;
pub mod chart;
pub mod config;
pub mod errors;
pub mod export;
pub mod feedback;
pub mod fetch;
pub mod filters;
pub mod i18n;
pub mod import;
pub mod model;
pub mod race;
pub mod timestamp;

// Re-export commonly used types
pub use api::{ApiClient, DataScope};
pub use auth::{AuthState, LogoutReason};
pub use chart::{ChartData, format_chart_data};
pub use errors::TridashError;
pub use model::{CompetitionRace, RaceRecord, SensorSample};
pub use race::{Segment, SegmentKind, TimeRange, derive_race_window};
