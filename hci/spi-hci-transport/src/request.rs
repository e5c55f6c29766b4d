//! Synchronous requests
//!
//! A synchronous request sends a command and then waits for the event that answers it. While
//! waiting, every packet of the ready queue is looked at in order. Events that are not the answer
//! are put into a side queue that is local to the request so that they are not looked at twice,
//! and the side queue is put back in front of the ready queue once the request finishes. This way
//! the application still gets these events, and in the order they were received, on the next call
//! to [`process`].
//!
//! [`process`]: crate::Transport::process

use crate::platform::{InterruptControl, Link, ReaderSignal, Timer};
use crate::pool::List;
use crate::{CommandError, Transport};
use core::fmt;
use core::time::Duration;
use spi_hci_util::errors::Error;
use spi_hci_util::events::{EventPacket, Events, LeMeta};
use spi_hci_util::opcodes::OpCodePair;

/// The event that finishes a request
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum Expected {
    /// The request is answered by the Command Status event
    CommandStatus,
    /// The request is answered by the Command Complete event
    CommandComplete,
    /// The request is answered by an LE Meta event with this sub event
    ///
    /// A Command Status event with a successful status is expected before the sub event.
    LeMeta(LeMeta),
}

/// A request descriptor
///
/// ```
/// # use spi_hci_transport::{Request, Expected};
/// # use spi_hci_util::opcodes::{ogf, OpCodePair};
/// use core::time::Duration;
///
/// let read_bd_addr = OpCodePair::new(ogf::INFORMATION_PARAMETERS, 0x9);
///
/// let request = Request::new(read_bd_addr, &[], Expected::CommandComplete)
///     .with_timeout(Duration::from_millis(50));
///
/// assert_eq!(Some(Duration::from_millis(50)), request.get_timeout());
/// ```
#[derive(Copy, Clone, Debug)]
pub struct Request<'a> {
    opcode: OpCodePair,
    parameter: &'a [u8],
    expected: Expected,
    timeout: Option<Duration>,
    no_wait: bool,
}

impl<'a> Request<'a> {
    pub fn new(opcode: OpCodePair, parameter: &'a [u8], expected: Expected) -> Self {
        Request {
            opcode,
            parameter,
            expected,
            timeout: None,
            no_wait: false,
        }
    }

    /// Set the time to wait for the answer
    ///
    /// Without this the default timeout within the [`TransportConfig`] is used. A zero timeout
    /// still waits for one tick of the timer.
    ///
    /// [`TransportConfig`]: crate::TransportConfig
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Do not wait for the answer
    ///
    /// The request returns as soon as the command is written.
    pub fn no_wait(mut self) -> Self {
        self.no_wait = true;
        self
    }

    pub fn get_opcode(&self) -> OpCodePair {
        self.opcode
    }

    pub fn get_parameter(&self) -> &'a [u8] {
        self.parameter
    }

    pub fn get_expected(&self) -> Expected {
        self.expected
    }

    pub fn get_timeout(&self) -> Option<Duration> {
        self.timeout
    }

    pub fn is_no_wait(&self) -> bool {
        self.no_wait
    }
}

/// Reason a synchronous request failed
#[derive(Debug)]
pub enum RequestError<E> {
    /// No answer was received before the timeout
    Timeout,
    /// A Command Complete or Command Status event was for a different command
    OpcodeMismatch { expected: OpCodePair, received: OpCodePair },
    /// The controller sent a Hardware Error event. Contains the hardware code.
    HardwareError(u8),
    /// The Command Status event contained an error
    CommandStatus(Error),
    /// The command could not be sent
    Command(CommandError<E>),
}

impl<E> RequestError<E> {
    pub fn is_timeout(&self) -> bool {
        matches!(self, RequestError::Timeout)
    }
}

impl<E> From<CommandError<E>> for RequestError<E> {
    fn from(e: CommandError<E>) -> Self {
        RequestError::Command(e)
    }
}

impl<E: fmt::Display> fmt::Display for RequestError<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RequestError::Timeout => f.write_str("timed out waiting for the response"),
            RequestError::OpcodeMismatch { expected, received } => {
                write!(f, "response is for opcode {}, expected opcode {}", received, expected)
            }
            RequestError::HardwareError(code) => write!(f, "controller hardware error {:#04x}", code),
            RequestError::CommandStatus(e) => write!(f, "command status: {}", e),
            RequestError::Command(e) => fmt::Display::fmt(e, f),
        }
    }
}

#[cfg(feature = "std")]
impl<E: fmt::Debug + fmt::Display> std::error::Error for RequestError<E> {}

/// The outcome of looking at one event
#[derive(Debug)]
enum Verdict<E> {
    /// The event is the answer, the response contains this many bytes
    Done(usize),
    /// The request failed because of this event
    Failed(RequestError<E>),
    /// The event is not the answer but the request fails because of it. The event is kept for the
    /// application.
    Rejected(RequestError<E>),
    /// The event is not the answer
    Unrelated,
}

fn copy_response(response: &mut [u8], data: &[u8]) -> usize {
    let len = core::cmp::min(response.len(), data.len());

    response[..len].copy_from_slice(&data[..len]);

    len
}

/// Classify an event packet for a request
///
/// `response` is only written to when the verdict is `Done`.
fn classify<E>(packet: &[u8], opcode: OpCodePair, expected: Expected, response: &mut [u8]) -> Verdict<E> {
    let mismatch = |received| {
        Verdict::Rejected(RequestError::OpcodeMismatch {
            expected: opcode,
            received,
        })
    };

    let Ok(event) = EventPacket::try_from(packet) else {
        return Verdict::Unrelated;
    };

    match event.get_event() {
        Events::CommandStatus => {
            // without a complete opcode the event cannot be matched to any command
            let Ok(status) = event.as_command_status() else {
                return Verdict::Unrelated;
            };

            if status.command_opcode != opcode {
                mismatch(status.command_opcode)
            } else if expected == Expected::CommandStatus {
                Verdict::Done(copy_response(response, event.get_parameter()))
            } else if !status.status.is_success() {
                Verdict::Failed(RequestError::CommandStatus(status.status))
            } else {
                // the command was accepted, the answer is still to come
                Verdict::Unrelated
            }
        }
        Events::CommandComplete => {
            let Ok(complete) = event.as_command_complete() else {
                return Verdict::Unrelated;
            };

            if complete.command_opcode != opcode {
                mismatch(complete.command_opcode)
            } else {
                Verdict::Done(copy_response(response, complete.return_parameter))
            }
        }
        Events::LeMeta => match (event.as_le_meta(), expected) {
            (Ok(meta), Expected::LeMeta(sub_event))
                if meta.sub_event.get_sub_event_code() == sub_event.get_sub_event_code() =>
            {
                Verdict::Done(copy_response(response, meta.data))
            }
            _ => Verdict::Unrelated,
        },
        Events::HardwareError => Verdict::Failed(RequestError::HardwareError(event.as_hardware_error().unwrap_or(0))),
        _ => Verdict::Unrelated,
    }
}

impl<L, X, S, T, const N: usize> Transport<L, X, S, T, N>
where
    L: Link,
    X: InterruptControl,
    S: ReaderSignal,
    T: Timer,
{
    /// Send a command and wait for its answer
    ///
    /// The answer is the event described by the `Expected` of the request. The parameter of the
    /// answer is copied into `response` and the number of bytes copied is returned. What is
    /// copied depends on the event
    /// * Command Status: the entire event parameter
    /// * Command Complete: the return parameter (the event parameter after the number of command
    ///   packets and opcode fields)
    /// * LE Meta: the sub event parameter (the event parameter after the sub event code)
    ///
    /// If `response` is shorter than the answer, the answer is truncated.
    ///
    /// Before the command is sent, undelivered events are discarded until at least half of the
    /// packet buffers are free. This guarantees there is room to read the answer.
    ///
    /// Events received while waiting that are not the answer are kept and will be passed to the
    /// event handler by the next call to [`process`](Transport::process). When the request is
    /// answered by an event for a different command, the request fails but the event is also
    /// kept for the application, unless there is no other free buffer to read with.
    ///
    /// For a request that is [`no_wait`](Request::no_wait), zero is returned as soon as the
    /// command is written.
    pub fn send_request(&mut self, request: &Request<'_>, response: &mut [u8]) -> Result<usize, RequestError<L::Error>> {
        self.reclaim();

        self.send_command(request.opcode, request.parameter)?;

        if request.no_wait {
            return Ok(0);
        }

        let timeout = core::cmp::max(
            request.timeout.unwrap_or(self.config.default_timeout),
            self.timer.tick(),
        );

        self.timer.start(timeout);

        let mut side = List::new();

        let outcome = loop {
            let packet = loop {
                if self.timer.expired() {
                    break None;
                }

                if let Ok(packet) = self.shared.queues.with(|queues| queues.dequeue_ready()) {
                    break Some(packet);
                }

                core::hint::spin_loop();
            };

            let Some(packet) = packet else {
                break Err(RequestError::Timeout);
            };

            let event = self.shared.slots.get(&packet).as_slice();

            let rejection = match classify(event, request.opcode, request.expected, response) {
                Verdict::Done(len) => {
                    self.shared.queues.with(|queues| queues.release(packet));

                    break Ok(len);
                }
                Verdict::Failed(e) => {
                    self.shared.queues.with(|queues| queues.release(packet));

                    break Err(e);
                }
                Verdict::Rejected(e) => Some(e),
                Verdict::Unrelated => None,
            };

            self.shared.queues.with(|queues| {
                if queues.pool_is_empty() && queues.ready_is_empty() {
                    // keep a buffer available for reading the answer
                    queues.release(packet)
                } else {
                    queues.divert(&mut side, packet)
                }
            });

            self.signal.signal();

            if let Some(e) = rejection {
                break Err(e);
            }
        };

        self.shared.queues.with(|queues| queues.restore(&mut side));

        if let Err(e) = &outcome {
            log::warn!("(HCI) request for opcode {} failed: {}", request.opcode, e);
        }

        outcome
    }

    /// Make sure at least half of the packet buffers are free
    ///
    /// Events are taken from the head of the ready queue and discarded *without* being passed to
    /// the event handler. The return is the number of discarded events.
    pub(crate) fn reclaim(&self) -> usize {
        let signal = &self.signal;

        let reclaimed = self.shared.queues.with(|queues| {
            let mut reclaimed = 0;

            while queues.pool_len() < N / 2 {
                match queues.dequeue_ready() {
                    Ok(packet) => {
                        queues.release(packet);

                        reclaimed += 1;

                        signal.signal();
                    }
                    Err(_) => break,
                }
            }

            reclaimed
        });

        if reclaimed != 0 {
            log::warn!("(HCI) discarded {} undelivered event(s) to free packet buffers", reclaimed);
        }

        reclaimed
    }
}
