//! Platform interfaces
//!
//! The transport does not drive the physical link, create tasks, or keep time by itself. These are
//! supplied by the platform through the traits of this module. The crate `spi-hci-std` has
//! implementations of them for targets with the standard library.

use core::cell::UnsafeCell;
use core::fmt::{Debug, Display};
use core::sync::atomic::{AtomicBool, Ordering};
use core::time::Duration;

/// The byte oriented link to the controller
///
/// The methods of `Link` are called from both the reader task and the application context, so an
/// implementation must serialize access to the bus itself.
pub trait Link: Send + Sync {
    type Error: Debug + Display;

    /// Check if the controller has data to be read
    fn data_present(&self) -> bool;

    /// Read one frame into `buffer`
    ///
    /// The return is the number of bytes read. Zero is returned when there was no data to read
    /// even though `data_present` returned true.
    fn read_frame(&self, buffer: &mut [u8]) -> usize;

    /// Write a packet
    ///
    /// The packet is the concatenation of `header` and `payload`.
    fn write(&self, header: &[u8], payload: &[u8]) -> Result<(), Self::Error>;
}

/// Control over the interrupt of the link
///
/// While the interrupt is suspended, no other context may enter the exclusion region that
/// protects the packet queues. On a microcontroller this is usually done by masking the interrupt
/// line of the link, a hosted platform may use a lock instead.
pub trait InterruptControl: Send + Sync {
    fn suspend_interrupt(&self);

    fn resume_interrupt(&self);
}

/// The signal used to wake the reader task
///
/// There is only ever one waiter (the reader task). `signal` may be called from an interrupt
/// context and must not block.
pub trait ReaderSignal: Send + Sync {
    /// Block until the signal is raised
    fn wait(&self);

    /// Raise the signal
    fn signal(&self);
}

/// A monotonic one-shot timer
pub trait Timer: Send {
    fn start(&mut self, timeout: Duration);

    fn expired(&self) -> bool;

    /// The shortest time the timer can measure
    fn tick(&self) -> Duration {
        Duration::from_millis(1)
    }
}

/// Parameters for creating the reader task
#[derive(Copy, Clone, Debug)]
pub struct TaskSpec<'a> {
    pub name: &'a str,
    pub stack_size: usize,
    pub priority: u8,
}

/// Creator of background tasks
pub trait TaskSpawner {
    type Error: Debug + Display;

    fn spawn<F>(&self, spec: TaskSpec<'_>, task: F) -> Result<(), Self::Error>
    where
        F: FnOnce() + Send + 'static;
}

/// Receiver of the events that are not consumed by a synchronous request
///
/// The input is the complete event packet, starting with the packet indicator.
pub trait EventHandler: Send {
    fn on_event(&mut self, packet: &[u8]);
}

impl<F> EventHandler for F
where
    F: FnMut(&[u8]) + Send,
{
    fn on_event(&mut self, packet: &[u8]) {
        (self)(packet)
    }
}

/// Data that is only accessible while the link interrupt is suspended
///
/// The region is not reentrant. Entering it while it is already entered is a bug, either of the
/// transport or of the `InterruptControl` implementation, and will panic instead of creating a
/// second mutable reference to the data.
pub struct Exclusion<X, T> {
    control: X,
    entered: AtomicBool,
    data: UnsafeCell<T>,
}

// SAFETY: the data is only accessed by the holder of `entered`.
unsafe impl<X: InterruptControl, T: Send> Sync for Exclusion<X, T> {}

impl<X: InterruptControl, T> Exclusion<X, T> {
    pub fn new(control: X, data: T) -> Self {
        Exclusion {
            control,
            entered: AtomicBool::new(false),
            data: UnsafeCell::new(data),
        }
    }

    /// Run `f` within the exclusion region
    ///
    /// `f` should do as little as possible as the link interrupt is suspended while it runs.
    pub fn with<F, R>(&self, f: F) -> R
    where
        F: FnOnce(&mut T) -> R,
    {
        let _region = Region::enter(&self.control, &self.entered);

        // SAFETY: `_region` is the only holder of `entered` until it is dropped
        f(unsafe { &mut *self.data.get() })
    }
}

struct Region<'a, X: InterruptControl> {
    control: &'a X,
    entered: &'a AtomicBool,
}

impl<'a, X: InterruptControl> Region<'a, X> {
    fn enter(control: &'a X, entered: &'a AtomicBool) -> Self {
        control.suspend_interrupt();

        if entered.swap(true, Ordering::Acquire) {
            control.resume_interrupt();

            panic!("exclusion region entered while already within it");
        }

        Region { control, entered }
    }
}

impl<X: InterruptControl> Drop for Region<'_, X> {
    fn drop(&mut self) {
        self.entered.store(false, Ordering::Release);

        self.control.resume_interrupt();
    }
}
