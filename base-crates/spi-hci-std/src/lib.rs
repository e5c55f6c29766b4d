//! Platform implementation for hosted targets
//!
//! This provides implementations of the platform traits of `spi-hci-transport` that use the
//! threads and synchronization primitives of the standard library. The only thing that is not
//! provided is the [`Link`] itself, as that depends on how the controller is attached to the
//! system.
//!
//! There is no interrupt to suspend on a hosted target. Instead [`MutexInterruptControl`] makes the
//! exclusion region of the transport a mutex, and the "interrupt" is whatever thread calls
//! [`IsrHandle::on_interrupt`] when the link has data.
//!
//! ```no_run
//! use spi_hci_std::{new_transport, StdTransport, ThreadSpawner};
//! use spi_hci_transport::Link;
//!
//! fn start<L: Link + 'static>(link: L) -> StdTransport<L> {
//!     let mut transport = new_transport(link, Default::default());
//!
//!     transport.init(&ThreadSpawner::default()).expect("failed to create reader task");
//!
//!     // pass this to whatever watches the interrupt line of the controller
//!     let _isr = transport.isr_handle();
//!
//!     transport
//! }
//! ```
//!
//! [`IsrHandle::on_interrupt`]: spi_hci_transport::IsrHandle::on_interrupt

use parking_lot::lock_api::RawMutex as RawMutexApi;
use parking_lot::RawMutex;
use spi_hci_transport::platform::{InterruptControl, ReaderSignal, TaskSpawner, TaskSpec, Timer};
use spi_hci_transport::{Link, Transport, TransportConfig, DEFAULT_POOL_SIZE};
use std::fmt;
use std::sync::{Condvar, Mutex, PoisonError};
use std::time::{Duration, Instant};
use std::{io, thread};

#[cfg(feature = "tokio")]
mod tokio_spawner;

#[cfg(feature = "tokio")]
pub use tokio_spawner::TokioBlockingSpawner;

/// A transport using the platform types of this crate
pub type StdTransport<L, const N: usize = DEFAULT_POOL_SIZE> =
    Transport<L, MutexInterruptControl, CondvarSignal, InstantTimer, N>;

/// Create a new [`StdTransport`]
pub fn new_transport<L: Link, const N: usize>(link: L, config: TransportConfig) -> StdTransport<L, N> {
    Transport::new(
        link,
        MutexInterruptControl::new(),
        CondvarSignal::new(),
        InstantTimer::new(),
        config,
    )
}

/// Interrupt control for a target without a link interrupt
///
/// Suspending the interrupt locks a mutex and resuming unlocks it, so only one thread at a time
/// is within the exclusion region of the transport. Suspending twice from the same thread never
/// returns.
pub struct MutexInterruptControl {
    lock: RawMutex,
}

impl MutexInterruptControl {
    pub const fn new() -> Self {
        MutexInterruptControl {
            lock: <RawMutex as RawMutexApi>::INIT,
        }
    }
}

impl Default for MutexInterruptControl {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for MutexInterruptControl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MutexInterruptControl")
            .field("locked", &self.lock.is_locked())
            .finish()
    }
}

impl InterruptControl for MutexInterruptControl {
    fn suspend_interrupt(&self) {
        self.lock.lock()
    }

    fn resume_interrupt(&self) {
        // SAFETY: the exclusion region of the transport only resumes the interrupt after it was
        // suspended by the same region, so the lock is held by the current context
        unsafe { self.lock.unlock() }
    }
}

/// A reader signal using a condition variable
///
/// A signal raised while nobody waits is kept, so the next wait returns immediately. Any number
/// of signals raised before the wait are merged into one.
#[derive(Debug, Default)]
pub struct CondvarSignal {
    pending: Mutex<bool>,
    condvar: Condvar,
}

impl CondvarSignal {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ReaderSignal for CondvarSignal {
    fn wait(&self) {
        // a panic while holding this lock cannot leave the flag inconsistent
        let mut pending = self.pending.lock().unwrap_or_else(PoisonError::into_inner);

        while !*pending {
            pending = self.condvar.wait(pending).unwrap_or_else(PoisonError::into_inner);
        }

        *pending = false;
    }

    fn signal(&self) {
        *self.pending.lock().unwrap_or_else(PoisonError::into_inner) = true;

        self.condvar.notify_one();
    }
}

/// A timer using [`Instant`]
///
/// A timer that was never started is expired. A timeout too large to be represented by an
/// `Instant` never expires.
#[derive(Debug, Default)]
pub struct InstantTimer {
    deadline: Deadline,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
enum Deadline {
    #[default]
    Idle,
    At(Instant),
    Never,
}

impl InstantTimer {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Timer for InstantTimer {
    fn start(&mut self, timeout: Duration) {
        self.deadline = match Instant::now().checked_add(timeout) {
            Some(deadline) => Deadline::At(deadline),
            None => Deadline::Never,
        };
    }

    fn expired(&self) -> bool {
        match self.deadline {
            Deadline::Idle => true,
            Deadline::At(deadline) => Instant::now() >= deadline,
            Deadline::Never => false,
        }
    }
}

/// Spawner of reader tasks as threads
///
/// The stack size of the task is never made smaller than [`MIN_STACK_SIZE`]. Stack sizes that are
/// right for a microcontroller are far too small for a thread of a hosted target. Thread
/// priorities are not supported and the priority of the task is ignored.
///
/// [`MIN_STACK_SIZE`]: ThreadSpawner::MIN_STACK_SIZE
#[derive(Debug, Clone)]
pub struct ThreadSpawner {
    min_stack_size: usize,
}

impl ThreadSpawner {
    pub const MIN_STACK_SIZE: usize = 64 * 1024;

    /// Create a `ThreadSpawner` with a different minimum stack size
    pub fn with_min_stack_size(min_stack_size: usize) -> Self {
        ThreadSpawner { min_stack_size }
    }

    fn stack_size(&self, requested: usize) -> usize {
        core::cmp::max(requested, self.min_stack_size)
    }
}

impl Default for ThreadSpawner {
    fn default() -> Self {
        ThreadSpawner::with_min_stack_size(Self::MIN_STACK_SIZE)
    }
}

impl TaskSpawner for ThreadSpawner {
    type Error = io::Error;

    fn spawn<F>(&self, spec: TaskSpec<'_>, task: F) -> Result<(), Self::Error>
    where
        F: FnOnce() + Send + 'static,
    {
        let stack_size = self.stack_size(spec.stack_size);

        log::debug!(
            "spawning thread '{}' with a stack of {} bytes (priority {} ignored)",
            spec.name,
            stack_size,
            spec.priority
        );

        // the thread exits by itself once the transport is dropped
        thread::Builder::new()
            .name(spec.name.into())
            .stack_size(stack_size)
            .spawn(task)
            .map(|_| ())
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn signal_before_wait_is_kept() {
        let signal = CondvarSignal::new();

        signal.signal();
        signal.signal();

        // returns immediately
        signal.wait();

        assert!(!*signal.pending.lock().unwrap());
    }

    #[test]
    fn signal_wakes_waiting_thread() {
        let signal = Arc::new(CondvarSignal::new());
        let waiter_signal = signal.clone();

        let waiter = thread::spawn(move || waiter_signal.wait());

        signal.signal();

        waiter.join().unwrap();
    }

    #[test]
    fn mutex_excludes_threads() {
        let control = Arc::new(MutexInterruptControl::new());
        let count = Arc::new(Mutex::new(0usize));

        let threads = (0..4)
            .map(|_| {
                let control = control.clone();
                let count = count.clone();

                thread::spawn(move || {
                    for _ in 0..1000 {
                        control.suspend_interrupt();

                        let mut guard = count.try_lock().expect("two threads within the region");

                        *guard += 1;

                        drop(guard);

                        control.resume_interrupt();
                    }
                })
            })
            .collect::<Vec<_>>();

        for t in threads {
            t.join().unwrap();
        }

        assert_eq!(4000, *count.lock().unwrap());
    }

    #[test]
    fn timer_expires() {
        let mut timer = InstantTimer::new();

        assert!(timer.expired());

        timer.start(Duration::from_secs(60));

        assert!(!timer.expired());

        timer.start(Duration::ZERO);

        assert!(timer.expired());
    }

    #[test]
    fn unrepresentable_timeout_never_expires() {
        let mut timer = InstantTimer::new();

        timer.start(Duration::MAX);

        assert!(!timer.expired());

        // a later start replaces it
        timer.start(Duration::ZERO);

        assert!(timer.expired());
    }

    #[test]
    fn stack_size_has_floor() {
        let spawner = ThreadSpawner::default();

        assert_eq!(ThreadSpawner::MIN_STACK_SIZE, spawner.stack_size(2048));
        assert_eq!(1 << 20, spawner.stack_size(1 << 20));
    }

    #[test]
    fn spawned_thread_is_named() {
        let (sender, receiver) = std::sync::mpsc::channel();

        let spec = TaskSpec {
            name: "hci_reader_thread",
            stack_size: 2048,
            priority: 6,
        };

        ThreadSpawner::default()
            .spawn(spec, move || {
                sender.send(thread::current().name().map(String::from)).unwrap();
            })
            .unwrap();

        assert_eq!(Some("hci_reader_thread".to_string()), receiver.recv().unwrap());
    }
}
