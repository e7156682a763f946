use std::sync::mpsc;
use std::sync::mpsc::{Receiver, Sender};

use crate::feed::frame::FrameStatus;

/// Requests coming from whatever drives the feed (keyboard, UI toggle).
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum FeedCommand {
    Toggle,
    Start,
    Stop,
    Quit,
    /// The input source went away; finish the current run and exit.
    InputClosed,
}

/// Published by the controller so front ends can mirror its state.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum FeedEvent {
    ModeChanged {
        running: bool,
        last_shown: Option<u64>,
    },
    FrameShown {
        sequence: Option<u64>,
        status: FrameStatus,
    },
}

pub type FeedCommandSender = Sender<FeedCommand>;
pub type FeedCommandReceiver = Receiver<FeedCommand>;
pub type FeedEventSender = Sender<FeedEvent>;
pub type FeedEventReceiver = Receiver<FeedEvent>;

pub fn command_channel() -> (FeedCommandSender, FeedCommandReceiver) {
    mpsc::channel()
}

pub fn event_channel() -> (FeedEventSender, FeedEventReceiver) {
    mpsc::channel()
}
