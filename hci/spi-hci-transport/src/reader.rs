//! The reader task
//!
//! The interrupt of the link only raises the [`ReaderSignal`], it never touches the link or the
//! queues. The reader task is what actually drains the link into packet buffers. It is woken by
//! the signal and then reads frames until the link has no more data or there are no free buffers
//! left. In the latter case it waits for the next signal, which is raised once buffers are
//! returned to the pool by [`process`] or by a synchronous request.
//!
//! [`process`]: crate::Transport::process

use crate::platform::{InterruptControl, Link, ReaderSignal};
use crate::verify::verify;
use crate::{Hex, Shared};
use alloc::sync::Arc;
use core::sync::atomic::Ordering;

pub(crate) struct ReaderTask<L, X, S, const N: usize> {
    shared: Arc<Shared<L, X, N>>,
    signal: Arc<S>,
    log_traffic: bool,
}

impl<L, X, S, const N: usize> ReaderTask<L, X, S, N>
where
    L: Link,
    X: InterruptControl,
    S: ReaderSignal,
{
    pub(crate) fn new(shared: Arc<Shared<L, X, N>>, signal: Arc<S>, log_traffic: bool) -> Self {
        ReaderTask {
            shared,
            signal,
            log_traffic,
        }
    }

    /// Run the reader task
    ///
    /// This only returns once the transport is dropped.
    pub(crate) fn run(self) {
        log::debug!("(HCI) reader task started");

        loop {
            self.signal.wait();

            if self.shared.closed.load(Ordering::Acquire) {
                break;
            }

            self.drain();
        }

        log::debug!("(HCI) reader task exiting");
    }

    /// Read frames until the link has no more data or the free pool is empty
    ///
    /// The return is the number of packets put into the ready queue.
    pub(crate) fn drain(&self) -> usize {
        let mut accepted = 0;

        while self.shared.link.data_present() {
            let mut packet = match self.shared.queues.with(|queues| queues.acquire()) {
                Ok(packet) => packet,
                Err(e) => {
                    log::debug!("(HCI) {}, reading stopped until buffers are freed", e);

                    break;
                }
            };

            let buffer = self.shared.slots.get_mut(&mut packet);

            let len = self.shared.link.read_frame(buffer.storage_mut());

            buffer.set_len(len);

            if buffer.is_empty() {
                self.shared.queues.with(|queues| queues.release(packet));

                continue;
            }

            match verify(buffer.as_slice()) {
                Ok(()) => {
                    if self.log_traffic {
                        log::trace!("HCI -> {}", Hex(buffer.as_slice()));
                    }

                    self.shared.queues.with(|queues| queues.enqueue_ready(packet));

                    accepted += 1;
                }
                Err(e) => {
                    log::debug!("(HCI) dropped packet: {}", e);

                    self.shared.queues.with(|queues| queues.release(packet));
                }
            }
        }

        accepted
    }
}
