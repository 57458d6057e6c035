//! Frame parsing and transcript accumulation shared by the bridge, the
//! direct worker client and the HTTP stream consumer.

mod accumulator;
mod frame;

pub use accumulator::Accumulator;
pub use frame::{FrameError, FrameParser, encode_frame, encode_report_frame};
