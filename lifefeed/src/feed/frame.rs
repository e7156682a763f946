use serde::Serialize;

#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize)]
pub enum FrameStatus {
    /// A regular generation; more will follow.
    Live,
    /// The server reported the end of the simulation.
    Finished,
    /// Transport, status or decode failure. The payload is a message.
    Failed,
}

/// One generation of the world as it will be handed to a renderer, or the
/// condition that ended the feed.
///
/// Frames can only be built through [`Frame::live`], [`Frame::finished`] and
/// [`Frame::failed`], so an error frame is always terminal and a live frame
/// always carries a sequence number.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Frame {
    sequence: Option<u64>,
    payload: String,
    status: FrameStatus,
}

impl Frame {
    pub fn live(sequence: u64, payload: impl Into<String>) -> Self {
        Self {
            sequence: Some(sequence),
            payload: payload.into(),
            status: FrameStatus::Live,
        }
    }

    pub fn finished(sequence: u64, payload: impl Into<String>) -> Self {
        Self {
            sequence: Some(sequence),
            payload: payload.into(),
            status: FrameStatus::Finished,
        }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            sequence: None,
            payload: message.into(),
            status: FrameStatus::Failed,
        }
    }

    /// `None` when the frame could not be decoded.
    pub fn sequence(&self) -> Option<u64> {
        self.sequence
    }

    pub fn payload(&self) -> &str {
        &self.payload
    }

    pub fn into_payload(self) -> String {
        self.payload
    }

    pub fn status(&self) -> FrameStatus {
        self.status
    }

    pub fn is_terminal(&self) -> bool {
        self.status != FrameStatus::Live
    }

    pub fn is_error(&self) -> bool {
        self.status == FrameStatus::Failed
    }
}
