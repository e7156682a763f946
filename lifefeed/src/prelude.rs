pub use crate::core::config::FeedConfig;
pub use crate::core::error::{ConfigError, DecodeError, FetchError};
pub use crate::core::logging::init_logger;
pub use crate::core::logging::{debug, error, info, trace, warn};
pub use crate::feed::decode::{FeedFormat, FrameDecoder};
pub use crate::feed::frame::{Frame, FrameStatus};
pub use crate::feed::queue::BoundedFrameQueue;
pub use crate::feed::source::{FrameSource, HttpFrameSource};
pub use crate::runtime::controller::{Mode, PipelineController, PipelineTiming};
pub use crate::runtime::events::{
    FeedCommand, FeedEvent, command_channel, event_channel,
};
pub use crate::runtime::renderer::{Renderer, TerminalRenderer};
pub use crate::runtime::storage::{self, SessionState};
