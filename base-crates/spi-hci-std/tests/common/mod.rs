//! A scripted controller for testing the transport over real threads
#![allow(dead_code)]

use spi_hci_std::{new_transport, CondvarSignal, StdTransport, ThreadSpawner};
use spi_hci_transport::{IsrHandle, Link, TransportConfig};
use spi_hci_util::opcodes::OpCodePair;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, Once};
use std::time::{Duration, Instant};

type Responder = Box<dyn FnMut(OpCodePair, &[u8]) -> Vec<Vec<u8>> + Send>;

#[derive(Default)]
struct ControllerState {
    outbound: Mutex<VecDeque<Vec<u8>>>,
    commands: Mutex<Vec<(OpCodePair, Vec<u8>)>>,
    responder: Mutex<Option<Responder>>,
    isr: Mutex<Option<IsrHandle<CondvarSignal>>>,
}

/// The controller side of a [`ControllerLink`]
///
/// Events sent by the controller are queued until they are read by the transport. Every event
/// raises the interrupt of the link.
#[derive(Clone, Default)]
pub struct Controller {
    state: Arc<ControllerState>,
}

impl Controller {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn link(&self) -> ControllerLink {
        ControllerLink(self.state.clone())
    }

    /// Set what the controller answers for a command
    pub fn respond_with<F>(&self, responder: F)
    where
        F: FnMut(OpCodePair, &[u8]) -> Vec<Vec<u8>> + Send + 'static,
    {
        *self.state.responder.lock().unwrap() = Some(Box::new(responder))
    }

    pub fn connect_interrupt(&self, isr: IsrHandle<CondvarSignal>) {
        *self.state.isr.lock().unwrap() = Some(isr)
    }

    pub fn send<I: IntoIterator<Item = Vec<u8>>>(&self, events: I) {
        self.state.outbound.lock().unwrap().extend(events);

        self.raise_interrupt();
    }

    pub fn commands(&self) -> Vec<(OpCodePair, Vec<u8>)> {
        self.state.commands.lock().unwrap().clone()
    }

    /// Number of events not yet read by the transport
    pub fn unread(&self) -> usize {
        self.state.outbound.lock().unwrap().len()
    }

    /// Check if the transport (and its reader task) still hold the link
    pub fn is_link_held(&self) -> bool {
        Arc::strong_count(&self.state) > 1
    }

    fn raise_interrupt(&self) {
        if let Some(isr) = self.state.isr.lock().unwrap().as_ref() {
            isr.on_interrupt()
        }
    }
}

pub struct ControllerLink(Arc<ControllerState>);

impl Link for ControllerLink {
    type Error = &'static str;

    fn data_present(&self) -> bool {
        !self.0.outbound.lock().unwrap().is_empty()
    }

    fn read_frame(&self, buffer: &mut [u8]) -> usize {
        match self.0.outbound.lock().unwrap().pop_front() {
            Some(frame) => {
                let len = frame.len().min(buffer.len());

                buffer[..len].copy_from_slice(&frame[..len]);

                len
            }
            None => 0,
        }
    }

    fn write(&self, header: &[u8], payload: &[u8]) -> Result<(), Self::Error> {
        if header.len() != 4 || header[0] != 0x01 || header[3] as usize != payload.len() {
            return Err("malformed command packet");
        }

        let opcode = OpCodePair::from_bytes([header[1], header[2]]);

        self.0.commands.lock().unwrap().push((opcode, payload.to_vec()));

        let events = match self.0.responder.lock().unwrap().as_mut() {
            Some(responder) => responder(opcode, payload),
            None => Vec::new(),
        };

        if !events.is_empty() {
            self.0.outbound.lock().unwrap().extend(events);

            if let Some(isr) = self.0.isr.lock().unwrap().as_ref() {
                isr.on_interrupt()
            }
        }

        Ok(())
    }
}

/// A transport with a running reader task that records every event passed to the application
pub struct Harness<const N: usize> {
    pub transport: StdTransport<ControllerLink, N>,
    pub controller: Controller,
    delivered: Arc<Mutex<Vec<Vec<u8>>>>,
}

impl<const N: usize> Harness<N> {
    pub fn new() -> Self {
        init_logging();

        let controller = Controller::new();

        let config = TransportConfig {
            default_timeout: Duration::from_secs(2),
            log_traffic: true,
            ..Default::default()
        };

        let mut transport = new_transport(controller.link(), config);

        controller.connect_interrupt(transport.isr_handle());

        let delivered = Arc::new(Mutex::new(Vec::new()));
        let sink = delivered.clone();

        transport.attach_event_handler(move |event: &[u8]| sink.lock().unwrap().push(event.to_vec()));

        transport
            .init(&ThreadSpawner::default())
            .expect("failed to create the reader task");

        Harness {
            transport,
            controller,
            delivered,
        }
    }

    pub fn delivered(&self) -> Vec<Vec<u8>> {
        self.delivered.lock().unwrap().clone()
    }

    /// Call `process` until `count` events were delivered
    pub fn process_until(&mut self, count: usize) -> bool {
        let delivered = self.delivered.clone();
        let transport = &mut self.transport;

        wait_until(Duration::from_secs(5), || {
            transport.process();

            delivered.lock().unwrap().len() >= count
        })
    }

    /// Wait until the reader task has read `count` events into the ready queue
    pub fn wait_ready(&self, count: usize) -> bool {
        wait_until(Duration::from_secs(5), || self.transport.pool_status().ready >= count)
    }
}

pub fn init_logging() {
    static LOGGER: Once = Once::new();

    LOGGER.call_once(|| {
        use simplelog::{Config, LevelFilter, TestLogger};

        // another test binary may have set the logger
        let _ = TestLogger::init(LevelFilter::Trace, Config::default());
    })
}

pub fn wait_until<F: FnMut() -> bool>(timeout: Duration, mut condition: F) -> bool {
    let deadline = Instant::now() + timeout;

    while Instant::now() < deadline {
        if condition() {
            return true;
        }

        std::thread::sleep(Duration::from_millis(1));
    }

    condition()
}

pub fn command_complete(opcode: OpCodePair, return_parameter: &[u8]) -> Vec<u8> {
    let [lo, hi] = opcode.to_bytes();

    let mut frame = vec![0x04, 0x0E, 3 + return_parameter.len() as u8, 0x01, lo, hi];

    frame.extend_from_slice(return_parameter);

    frame
}

pub fn command_status(status: u8, opcode: OpCodePair) -> Vec<u8> {
    let [lo, hi] = opcode.to_bytes();

    vec![0x04, 0x0F, 0x04, status, 0x01, lo, hi]
}

pub fn le_meta(sub_event: u8, data: &[u8]) -> Vec<u8> {
    let mut frame = vec![0x04, 0x3E, 1 + data.len() as u8, sub_event];

    frame.extend_from_slice(data);

    frame
}

/// A vendor event carrying a sequence number
pub fn numbered(number: u16) -> Vec<u8> {
    let [lo, hi] = number.to_le_bytes();

    vec![0x04, 0xFF, 0x03, 0x01, lo, hi]
}
