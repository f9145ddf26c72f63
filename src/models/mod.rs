pub mod response;
pub mod usage;

pub use response::{
    HealthResponse, ModelsResponse, RecentRecordResponse, SummaryResponse, TrackResponse,
};
pub use usage::{UsageRecord, UsageSummary};
