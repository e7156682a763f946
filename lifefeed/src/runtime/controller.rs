use std::sync::Arc;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use log::{debug, error, info, warn};
use parking_lot::{Condvar, Mutex};

use super::events::{
    FeedEvent, FeedEventReceiver, FeedEventSender, event_channel,
};
use super::renderer::Renderer;
use super::{consumer, producer};
use crate::feed::frame::Frame;
use crate::feed::queue::{BoundedFrameQueue, DEFAULT_QUEUE_CAPACITY};
use crate::feed::source::FrameSource;

pub(crate) type SharedQueue = Arc<Mutex<BoundedFrameQueue>>;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct PipelineTiming {
    /// Target time between two rendered frames.
    pub period: Duration,
    pub queue_capacity: usize,
    /// Producer sleep while the queue is full.
    pub backoff: Duration,
    /// Consumer sleep while the queue is empty.
    pub poll_interval: Duration,
}

impl Default for PipelineTiming {
    fn default() -> Self {
        Self {
            period: Duration::from_millis(1000),
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
            backoff: Duration::from_millis(10),
            poll_interval: Duration::from_millis(10),
        }
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Mode {
    /// Nothing has run yet. The first start delays the consumer by one
    /// period so the queue can fill up.
    Unstarted,
    Running,
    Stopped,
}

struct State {
    mode: Mode,
    last_loaded: Option<u64>,
    last_shown: Option<u64>,
    renderer: Box<dyn Renderer>,
    subscribers: Vec<FeedEventSender>,
}

impl State {
    fn publish(&mut self, event: FeedEvent) {
        self.subscribers.retain(|tx| tx.send(event.clone()).is_ok());
    }
}

pub(crate) enum Shown {
    Rendered,
    /// The frame ended the feed and the controller has been stopped.
    Terminal,
    /// The generation was cancelled before the frame could be shown.
    Stale,
}

/// State shared between the controller and the loops of every run.
///
/// `generation` only changes while `state` is locked, so a loop holding the
/// lock sees a stable value.
pub(crate) struct Shared {
    generation: AtomicU64,
    live_loops: AtomicUsize,
    state: Mutex<State>,
    stopped: Condvar,
    source: Arc<dyn FrameSource>,
    timing: PipelineTiming,
}

impl Shared {
    pub(crate) fn is_current(&self, generation: u64) -> bool {
        self.generation.load(Ordering::Acquire) == generation
    }

    pub(crate) fn timing(&self) -> PipelineTiming {
        self.timing
    }

    pub(crate) fn source(&self) -> &dyn FrameSource {
        self.source.as_ref()
    }

    /// Sequence to ask for next, `None` to let the server choose. Fails
    /// with the last loaded sequence when no sequence can follow it.
    pub(crate) fn next_cursor(&self) -> Result<Option<u64>, u64> {
        match self.state.lock().last_loaded {
            None => Ok(None),
            Some(sequence) => sequence.checked_add(1).map(Some).ok_or(sequence),
        }
    }

    /// Advances the fetch cursor. Ignored for cancelled generations so a
    /// late fetch cannot move the cursor of the run that replaced it.
    pub(crate) fn record_loaded(&self, generation: u64, frame: &Frame) {
        let mut state = self.state.lock();
        if !self.is_current(generation) {
            return;
        }

        if let Some(sequence) = frame.sequence() {
            state.last_loaded = Some(sequence);
        }
    }

    /// Renders `frame` unless `generation` has been cancelled. Rendering
    /// happens under the state lock, so nothing from a cancelled run reaches
    /// the renderer once `stop()` has returned.
    pub(crate) fn show(&self, generation: u64, frame: &Frame) -> Shown {
        let mut state = self.state.lock();
        if !self.is_current(generation) {
            return Shown::Stale;
        }

        state.renderer.render(frame);
        state.last_shown = frame.sequence();
        state.publish(FeedEvent::FrameShown {
            sequence: frame.sequence(),
            status: frame.status(),
        });

        if !frame.is_terminal() {
            return Shown::Rendered;
        }

        if frame.is_error() {
            warn!("feed stopped on error: {}", frame.payload());
        } else {
            info!("simulation finished at generation {:?}", frame.sequence());
        }

        self.stop_locked(&mut state);
        Shown::Terminal
    }

    fn stop_locked(&self, state: &mut State) -> bool {
        if state.mode == Mode::Stopped {
            return false;
        }

        let previous = self.generation.fetch_add(1, Ordering::AcqRel);
        state.mode = Mode::Stopped;
        // Frames loaded but never shown are fetched again on the next start.
        state.last_loaded = state.last_shown;

        info!(
            "feed stopped (generation {} cancelled, last shown {:?})",
            previous, state.last_shown
        );

        let last_shown = state.last_shown;
        state.publish(FeedEvent::ModeChanged {
            running: false,
            last_shown,
        });
        self.stopped.notify_all();
        true
    }
}

/// Decrements the live-loop count when a loop thread exits, however it
/// exits. A loop that dies by panicking stops its run.
struct LoopGuard {
    shared: Arc<Shared>,
    generation: u64,
}

impl LoopGuard {
    fn new(shared: &Arc<Shared>, generation: u64) -> Self {
        shared.live_loops.fetch_add(1, Ordering::AcqRel);
        Self {
            shared: shared.clone(),
            generation,
        }
    }
}

impl Drop for LoopGuard {
    fn drop(&mut self) {
        if thread::panicking() {
            let mut state = self.shared.state.lock();
            if self.shared.is_current(self.generation) {
                error!("feed loop {} panicked", self.generation);
                self.shared.stop_locked(&mut state);
            }
        }

        self.shared.live_loops.fetch_sub(1, Ordering::AcqRel);
    }
}

/// Starts and stops the producer/consumer pair that feeds frames from a
/// [`FrameSource`] to a [`Renderer`].
///
/// Every stop-like transition bumps a generation id; loops remember the id
/// they were launched with and exit at the top of their next iteration once
/// it changes. The renderer is called with an internal lock held and must
/// not call back into the controller.
pub struct PipelineController {
    shared: Arc<Shared>,
    workers: Mutex<Vec<JoinHandle<()>>>,
}

impl PipelineController {
    pub fn new(
        source: Arc<dyn FrameSource>,
        renderer: impl Renderer + 'static,
        timing: PipelineTiming,
    ) -> Self {
        let shared = Shared {
            generation: AtomicU64::new(0),
            live_loops: AtomicUsize::new(0),
            state: Mutex::new(State {
                mode: Mode::Unstarted,
                last_loaded: None,
                last_shown: None,
                renderer: Box::new(renderer),
                subscribers: Vec::new(),
            }),
            stopped: Condvar::new(),
            source,
            timing,
        };

        Self {
            shared: Arc::new(shared),
            workers: Mutex::new(Vec::new()),
        }
    }

    pub fn subscribe(&self) -> FeedEventReceiver {
        let (tx, rx) = event_channel();
        self.shared.state.lock().subscribers.push(tx);
        rx
    }

    /// Launches a run. Returns `false` if one is already running.
    pub fn start(&self) -> bool {
        let mut state = self.shared.state.lock();

        let consumer_delay = match state.mode {
            Mode::Running => {
                debug!("start ignored: feed already running");
                return false;
            }
            Mode::Unstarted => self.shared.timing.period,
            Mode::Stopped => Duration::ZERO,
        };

        state.mode = Mode::Running;
        let generation = self.shared.generation.load(Ordering::Acquire);
        let last_shown = state.last_shown;

        info!(
            "feed started (generation {}, next cursor {:?})",
            generation,
            state.last_loaded.and_then(|sequence| sequence.checked_add(1))
        );
        state.publish(FeedEvent::ModeChanged {
            running: true,
            last_shown,
        });
        drop(state);

        let queue: SharedQueue = Arc::new(Mutex::new(BoundedFrameQueue::new(
            self.shared.timing.queue_capacity,
        )));

        let producer_handle = {
            let guard = LoopGuard::new(&self.shared, generation);
            let shared = self.shared.clone();
            let queue = queue.clone();
            thread::spawn(move || {
                let _guard = guard;
                producer::run(&shared, &queue, generation);
            })
        };

        let consumer_handle = {
            let guard = LoopGuard::new(&self.shared, generation);
            let shared = self.shared.clone();
            thread::spawn(move || {
                let _guard = guard;
                consumer::run(&shared, &queue, generation, consumer_delay);
            })
        };

        let mut workers = self.workers.lock();
        workers.retain(|handle| !handle.is_finished());
        workers.push(producer_handle);
        workers.push(consumer_handle);

        true
    }

    /// Cancels the current run. Returns `false` if already stopped.
    pub fn stop(&self) -> bool {
        let mut state = self.shared.state.lock();
        self.shared.stop_locked(&mut state)
    }

    /// Starts when stopped, stops when running. Returns the new running
    /// state.
    pub fn toggle(&self) -> bool {
        if self.is_running() {
            self.stop();
            false
        } else {
            self.start()
        }
    }

    /// Continues the feed after `sequence` on the next start instead of
    /// wherever the server currently is. Ignored while running.
    pub fn resume_after(&self, sequence: u64) -> bool {
        let mut state = self.shared.state.lock();
        if state.mode == Mode::Running {
            warn!("cannot move the resume cursor while the feed is running");
            return false;
        }

        state.last_shown = Some(sequence);
        state.last_loaded = Some(sequence);
        true
    }

    pub fn mode(&self) -> Mode {
        self.shared.state.lock().mode
    }

    pub fn is_running(&self) -> bool {
        self.mode() == Mode::Running
    }

    pub fn last_shown(&self) -> Option<u64> {
        self.shared.state.lock().last_shown
    }

    pub fn last_loaded(&self) -> Option<u64> {
        self.shared.state.lock().last_loaded
    }

    pub fn generation(&self) -> u64 {
        self.shared.generation.load(Ordering::Acquire)
    }

    /// Number of producer/consumer threads that have not exited yet,
    /// including loops of cancelled runs still finishing a fetch or sleep.
    pub fn active_loops(&self) -> usize {
        self.shared.live_loops.load(Ordering::Acquire)
    }

    /// Blocks until the feed is no longer running or `timeout` passes.
    /// Returns whether the feed has stopped.
    pub fn wait_until_stopped(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        let mut state = self.shared.state.lock();

        while state.mode == Mode::Running {
            if self
                .shared
                .stopped
                .wait_until(&mut state, deadline)
                .timed_out()
            {
                return state.mode != Mode::Running;
            }
        }

        true
    }

    /// Waits for every loop thread launched so far to exit. Call after
    /// `stop()`; a running feed never finishes on its own unless the source
    /// produces a terminal frame.
    pub fn join(&self) {
        let handles: Vec<_> = self.workers.lock().drain(..).collect();
        for handle in handles {
            if handle.join().is_err() {
                warn!("feed loop thread panicked");
            }
        }
    }
}

impl Drop for PipelineController {
    fn drop(&mut self) {
        if self.is_running() {
            self.stop();
        }
    }
}
