/// Anomalous/normal context window extraction
pub mod extractor;
/// Per-class channel statistics
pub mod summary;

pub use extractor::{Extraction, Window, WindowExtractor};
pub use summary::{ChannelStats, ClassSummary};
