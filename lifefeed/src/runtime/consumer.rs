use std::thread;
use std::time::{Duration, Instant};

use log::debug;

use super::controller::{Shared, SharedQueue, Shown};
use super::pacer::Pacer;

/// Shows queued frames one per period until the generation is cancelled or
/// a terminal frame has been shown, which stops the controller.
pub(crate) fn run(
    shared: &Shared,
    queue: &SharedQueue,
    generation: u64,
    delay: Duration,
) {
    if !delay.is_zero() {
        // Gives the producer a head start on the very first run.
        thread::sleep(delay);
    }

    let timing = shared.timing();
    let mut pacer = Pacer::new(timing.period, Instant::now());
    debug!("consumer {} started", generation);

    while shared.is_current(generation) {
        let next = queue.lock().try_pop();
        let Some(frame) = next else {
            thread::sleep(timing.poll_interval);
            pacer.reanchor(Instant::now());
            continue;
        };

        match shared.show(generation, &frame) {
            Shown::Rendered => {}
            Shown::Terminal | Shown::Stale => break,
        }

        let wait = pacer.after_render(Instant::now());
        if wait.is_zero() {
            thread::yield_now();
        } else {
            thread::sleep(wait);
        }
    }

    match pacer.average_interval() {
        Some(average) => debug!(
            "consumer {} exited, average frame interval {:?}",
            generation, average
        ),
        None => debug!("consumer {} exited", generation),
    }
}
