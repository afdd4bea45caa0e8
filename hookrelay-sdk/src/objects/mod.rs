//! Request and response objects exchanged with the relay.

pub mod channel;
pub mod ingest;
pub mod report;
pub mod status;

pub use channel::{ChannelTag, UnknownChannelTag};
pub use ingest::{IngestResponse, IngestStatus};
pub use report::{EmbedInfo, EventReport, ReportedEntity};
pub use status::{
    ChannelCounters, HealthResponse, ListRecentQuery, RecentDispatch, RecentDispatchList,
    StatusResponse, clamp_limit,
};
