/// Bounded FIFO of live samples
pub mod sample_buffer;
/// Bounded history of scored MAE values
pub mod mae_history;

pub use mae_history::{MaeHistory, MaePoint};
pub use sample_buffer::SampleBuffer;
