use std::thread;

use log::{debug, trace, warn};

use super::controller::{Shared, SharedQueue};
use crate::feed::frame::Frame;

/// Fetches frames in order and queues them until the generation is
/// cancelled or a terminal frame has been queued.
///
/// There are no retries: a failure becomes a terminal frame and ends the
/// run. Stopping the feed never interrupts a fetch in flight; its frame
/// still lands in this run's queue, which nobody reads any more.
pub(crate) fn run(shared: &Shared, queue: &SharedQueue, generation: u64) {
    let backoff = shared.timing().backoff;
    debug!("producer {} started", generation);

    while shared.is_current(generation) {
        let full = queue.lock().is_full();
        if full {
            thread::sleep(backoff);
            continue;
        }

        let (cursor, frame) = match shared.next_cursor() {
            Ok(cursor) => (cursor, shared.source().fetch(cursor)),
            Err(last) => {
                warn!("no generation can follow {}", last);
                let message =
                    format!("Can't load world: no generation after {}", last);
                (None, Frame::failed(message))
            }
        };
        trace!(
            "producer {} fetched {:?} ({:?}) for cursor {:?}",
            generation,
            frame.sequence(),
            frame.status(),
            cursor
        );

        shared.record_loaded(generation, &frame);
        let terminal = frame.is_terminal();

        let pushed = queue.lock().try_push(frame);
        if let Err(frame) = pushed {
            // Only this thread pushes, and it saw room before fetching.
            warn!("frame queue full, dropping frame {:?}", frame.sequence());
            break;
        }

        if terminal {
            debug!("producer {} reached a terminal frame", generation);
            break;
        }
    }

    debug!("producer {} exited", generation);
}
