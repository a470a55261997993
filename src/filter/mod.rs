/// Minimum-separation deduplication of detector flags
pub mod event_filter;

pub use event_filter::{filter_unique_events, EventFilter};
