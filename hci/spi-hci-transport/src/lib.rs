//! Transport and command dispatch for a controller behind an interrupt driven link
//!
//! This is the layer between the host stack and a controller that is reachable through a byte
//! oriented link (such as SPI) with an interrupt line to signal that the controller has data.
//!
//! # Contexts
//! A [`Transport`] is used from three contexts.
//! * The interrupt context. The interrupt service routine of the link holds an [`IsrHandle`] and
//!   calls [`on_interrupt`](IsrHandle::on_interrupt) which does nothing more than wake the reader
//!   task.
//! * The reader task. This is created by [`init`](Transport::init) and is the only context that
//!   reads from the link. It reads frames into packet buffers taken from a fixed size pool,
//!   validates them, and puts the valid ones into the ready queue.
//! * The application context. This owns the `Transport`. It calls [`process`](Transport::process)
//!   to pass the events of the ready queue to the [`EventHandler`] and
//!   [`send_request`](Transport::send_request) to send a command and wait for its answer.
//!
//! The free pool and the ready queue are shared by the reader task and the application context.
//! They are only ever modified within an exclusion region that suspends the link interrupt (see
//! [`InterruptControl`]) and the region is never held while reading from the link or while the
//! event handler runs.
//!
//! # Packet buffers
//! There are `N` packet buffers of [`HCI_READ_PACKET_SIZE`] bytes each, allocated once when the
//! `Transport` is created. When the pool is empty the reader task stops reading until buffers are
//! returned to the pool. To keep commands from stalling because of this, a synchronous request
//! first discards the oldest undelivered events until at least half of the buffers are free.

#![cfg_attr(not(any(test, feature = "std")), no_std)]

extern crate alloc;

mod config;
pub mod platform;
mod pool;
mod reader;
mod request;
mod verify;

pub use config::TransportConfig;
pub use platform::{EventHandler, InterruptControl, Link, ReaderSignal, TaskSpawner, TaskSpec, Timer};
pub use pool::{PacketBuffer, PoolError, PoolStatus, DEFAULT_POOL_SIZE, HCI_READ_PACKET_SIZE};
pub use request::{Expected, Request, RequestError};
pub use verify::{verify, VerifyError};

use alloc::boxed::Box;
use alloc::sync::Arc;
use core::fmt;
use core::sync::atomic::{AtomicBool, Ordering};
use platform::Exclusion;
use pool::{Queues, Slots};
use reader::ReaderTask;
use spi_hci_util::opcodes::OpCodePair;
use spi_hci_util::packet::{CommandHeader, ParameterLengthError};

/// State shared between the reader task and the application context
pub(crate) struct Shared<L, X, const N: usize> {
    pub(crate) link: L,
    pub(crate) slots: Slots<N>,
    pub(crate) queues: Exclusion<X, Queues<N>>,
    pub(crate) closed: AtomicBool,
    reader_started: AtomicBool,
}

/// Formats bytes as space separated hex
pub(crate) struct Hex<'a>(pub &'a [u8]);

impl fmt::Display for Hex<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for byte in self.0 {
            write!(f, "{:02X} ", byte)?;
        }

        Ok(())
    }
}

/// The transport
///
/// See the [crate level documentation](crate) for details.
///
/// `N` is the number of packet buffers.
pub struct Transport<L, X, S, T, const N: usize = DEFAULT_POOL_SIZE>
where
    L: Link,
    X: InterruptControl,
    S: ReaderSignal,
    T: Timer,
{
    shared: Arc<Shared<L, X, N>>,
    signal: Arc<S>,
    timer: T,
    handler: Option<Box<dyn EventHandler>>,
    config: TransportConfig,
}

impl<L, X, S, T, const N: usize> Transport<L, X, S, T, N>
where
    L: Link,
    X: InterruptControl,
    S: ReaderSignal,
    T: Timer,
{
    /// Create a new `Transport`
    ///
    /// Every packet buffer starts out within the free pool. The reader task is not created until
    /// [`init`](Transport::init) is called.
    pub fn new(link: L, interrupt_control: X, signal: S, timer: T, config: TransportConfig) -> Self {
        let shared = Shared {
            link,
            slots: Slots::new(),
            queues: Exclusion::new(interrupt_control, Queues::new()),
            closed: AtomicBool::new(false),
            reader_started: AtomicBool::new(false),
        };

        Transport {
            shared: Arc::new(shared),
            signal: Arc::new(signal),
            timer,
            handler: None,
            config,
        }
    }

    /// Create the reader task
    ///
    /// Only the first successful call creates the reader task, further calls do nothing.
    pub fn init<P>(&mut self, spawner: &P) -> Result<(), InitError<P::Error>>
    where
        P: TaskSpawner,
        L: 'static,
        X: 'static,
        S: 'static,
    {
        if self.shared.reader_started.swap(true, Ordering::AcqRel) {
            log::debug!("(HCI) transport is already initialized");

            return Ok(());
        }

        let reader = ReaderTask::new(self.shared.clone(), self.signal.clone(), self.config.log_traffic);

        let spec = TaskSpec {
            name: &self.config.reader_task_name,
            stack_size: self.config.reader_stack_size,
            priority: self.config.reader_priority,
        };

        spawner.spawn(spec, move || reader.run()).map_err(|e| {
            log::error!("(HCI) failed to create the reader task: {}", e);

            self.shared.reader_started.store(false, Ordering::Release);

            InitError::Spawn(e)
        })
    }

    /// Check if the reader task was created
    pub fn is_initialized(&self) -> bool {
        self.shared.reader_started.load(Ordering::Acquire)
    }

    /// Get a handle for the interrupt service routine of the link
    pub fn isr_handle(&self) -> IsrHandle<S> {
        IsrHandle {
            signal: self.signal.clone(),
        }
    }

    /// Wake the reader task
    ///
    /// This is the same as calling [`IsrHandle::on_interrupt`].
    pub fn on_interrupt(&self) {
        self.signal.signal()
    }

    /// Set the handler for events
    ///
    /// This replaces the previous handler.
    pub fn attach_event_handler<H>(&mut self, handler: H)
    where
        H: EventHandler + 'static,
    {
        self.handler = Some(Box::new(handler))
    }

    /// Remove the handler for events
    ///
    /// Without a handler, `process` still empties the ready queue but the events are dropped.
    pub fn detach_event_handler(&mut self) {
        self.handler = None
    }

    /// Pass every event of the ready queue to the event handler
    ///
    /// Events are passed in the order they were received. The link interrupt is not suspended
    /// while the handler runs.
    ///
    /// Once the ready queue is empty the reader task is woken. An interrupt line that is held
    /// active by the controller will not produce another edge, so this makes sure data that is
    /// still waiting within the controller is read.
    pub fn process(&mut self) {
        while let Ok(packet) = self.shared.queues.with(|queues| queues.dequeue_ready()) {
            let event = self.shared.slots.get(&packet).as_slice();

            match self.handler.as_mut() {
                Some(handler) => handler.on_event(event),
                None => log::trace!("(HCI) no event handler, dropped event {}", Hex(event)),
            }

            self.shared.queues.with(|queues| queues.release(packet));
        }

        self.on_interrupt();
    }

    /// Check if the ready queue is empty
    pub fn queue_empty(&self) -> bool {
        self.shared.queues.with(|queues| queues.ready_is_empty())
    }

    /// Get the number of free and ready packet buffers
    pub fn pool_status(&self) -> PoolStatus {
        self.shared.queues.with(|queues| queues.status())
    }

    /// Send a command without waiting for a response
    ///
    /// Any response to the command is received as an event by the event handler.
    pub fn send_command(&self, opcode: OpCodePair, parameter: &[u8]) -> Result<(), CommandError<L::Error>> {
        let header = CommandHeader::new(opcode, parameter.len())
            .map_err(CommandError::ParameterTooLong)?
            .to_bytes();

        if self.config.log_traffic {
            log::trace!("HCI <- {}{}", Hex(&header), Hex(parameter));
        }

        self.shared.link.write(&header, parameter).map_err(CommandError::Link)
    }

    pub fn config(&self) -> &TransportConfig {
        &self.config
    }

    #[cfg(test)]
    pub(crate) fn reader(&self) -> ReaderTask<L, X, S, N> {
        ReaderTask::new(self.shared.clone(), self.signal.clone(), self.config.log_traffic)
    }
}

impl<L, X, S, T, const N: usize> Drop for Transport<L, X, S, T, N>
where
    L: Link,
    X: InterruptControl,
    S: ReaderSignal,
    T: Timer,
{
    fn drop(&mut self) {
        self.shared.closed.store(true, Ordering::Release);

        // wake the reader task so that it exits
        self.signal.signal();
    }
}

/// Handle for the interrupt service routine of the link
///
/// This only wakes the reader task. It does not touch the link or the packet queues so it is
/// safe to use from an interrupt context.
pub struct IsrHandle<S> {
    signal: Arc<S>,
}

impl<S: ReaderSignal> IsrHandle<S> {
    pub fn on_interrupt(&self) {
        self.signal.signal()
    }
}

impl<S> Clone for IsrHandle<S> {
    fn clone(&self) -> Self {
        IsrHandle {
            signal: self.signal.clone(),
        }
    }
}

/// Error for sending a command
#[derive(Debug)]
pub enum CommandError<E> {
    /// The command parameters do not fit within a command packet
    ParameterTooLong(ParameterLengthError),
    /// The link failed to write the command
    Link(E),
}

impl<E: fmt::Display> fmt::Display for CommandError<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CommandError::ParameterTooLong(e) => fmt::Display::fmt(e, f),
            CommandError::Link(e) => write!(f, "link error: {}", e),
        }
    }
}

#[cfg(feature = "std")]
impl<E: fmt::Debug + fmt::Display> std::error::Error for CommandError<E> {}

/// Error for [`Transport::init`]
#[derive(Debug)]
pub enum InitError<E> {
    /// The reader task could not be created
    Spawn(E),
}

impl<E: fmt::Display> fmt::Display for InitError<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InitError::Spawn(e) => write!(f, "failed to create the reader task: {}", e),
        }
    }
}

#[cfg(feature = "std")]
impl<E: fmt::Debug + fmt::Display> std::error::Error for InitError<E> {}
