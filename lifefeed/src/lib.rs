pub mod core;
pub mod feed;
pub mod prelude;
pub mod runtime;

pub use feed::frame::{Frame, FrameStatus};
pub use runtime::controller::{Mode, PipelineController, PipelineTiming};
