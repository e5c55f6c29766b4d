//! Transport with a simulated controller
//!
//! The simulated controller answers every command with a Command Complete event and sends an
//! advertising report every 100 milliseconds. The reports are printed by the event handler.

use spi_hci::platform::{new_transport, CondvarSignal, StdTransport, ThreadSpawner};
use spi_hci::transport::{IsrHandle, Link};
use spi_hci::util::events::{EventPacket, Events};
use spi_hci::util::opcodes::ogf;
use spi_hci::{Expected, OpCodePair, Request, TransportConfig};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

const RESET: OpCodePair = OpCodePair::new(ogf::CONTROLLER_AND_BASEBAND, 0x3);
const READ_BD_ADDR: OpCodePair = OpCodePair::new(ogf::INFORMATION_PARAMETERS, 0x9);
const LE_SET_SCAN_ENABLE: OpCodePair = OpCodePair::new(ogf::LE_CONTROLLER, 0xC);

#[derive(Default)]
struct Controller {
    events: Mutex<VecDeque<Vec<u8>>>,
    isr: Mutex<Option<IsrHandle<CondvarSignal>>>,
}

impl Controller {
    fn send(&self, event: Vec<u8>) {
        self.events.lock().unwrap().push_back(event);

        if let Some(isr) = self.isr.lock().unwrap().as_ref() {
            isr.on_interrupt();
        }
    }
}

struct SimulatedLink(Arc<Controller>);

impl Link for SimulatedLink {
    type Error = std::convert::Infallible;

    fn data_present(&self) -> bool {
        !self.0.events.lock().unwrap().is_empty()
    }

    fn read_frame(&self, buffer: &mut [u8]) -> usize {
        let Some(event) = self.0.events.lock().unwrap().pop_front() else {
            return 0;
        };

        let len = event.len().min(buffer.len());

        buffer[..len].copy_from_slice(&event[..len]);

        len
    }

    fn write(&self, header: &[u8], _: &[u8]) -> Result<(), Self::Error> {
        let mut event = vec![0x04, 0x0E, 0x04, 0x01, header[1], header[2], 0x00];

        if OpCodePair::from_bytes([header[1], header[2]]) == READ_BD_ADDR {
            event[2] += 6;
            event.extend_from_slice(&[0x0A, 0x0B, 0x0C, 0x0D, 0x0E, 0x0F]);
        }

        self.0.send(event);

        Ok(())
    }
}

fn main() {
    use simplelog::{ColorChoice, Config, LevelFilter, TermLogger, TerminalMode};

    TermLogger::init(
        LevelFilter::Debug,
        Config::default(),
        TerminalMode::Mixed,
        ColorChoice::Auto,
    )
    .unwrap();

    let controller = Arc::new(Controller::default());

    let mut transport: StdTransport<_> = new_transport(SimulatedLink(controller.clone()), TransportConfig::default());

    *controller.isr.lock().unwrap() = Some(transport.isr_handle());

    transport.attach_event_handler(|event: &[u8]| match EventPacket::try_from(event) {
        Ok(packet) if packet.get_event() == Events::LeMeta => {
            log::info!("LE meta event: {:x?}", packet.get_parameter())
        }
        Ok(packet) => log::info!("event {}", packet.get_event()),
        Err(e) => log::error!("{}", e),
    });

    transport.init(&ThreadSpawner::default()).unwrap();

    let mut response = [0u8; 16];

    transport
        .send_request(&Request::new(RESET, &[], Expected::CommandComplete), &mut response)
        .unwrap();

    let len = transport
        .send_request(&Request::new(READ_BD_ADDR, &[], Expected::CommandComplete), &mut response)
        .unwrap();

    log::info!("controller address: {:x?}", &response[1..len]);

    transport
        .send_request(
            &Request::new(LE_SET_SCAN_ENABLE, &[0x01, 0x00], Expected::CommandComplete),
            &mut response,
        )
        .unwrap();

    let advertiser = controller.clone();

    thread::spawn(move || {
        for count in 0..10u8 {
            advertiser.send(vec![0x04, 0x3E, 0x03, 0x02, 0x01, count]);

            thread::sleep(Duration::from_millis(100));
        }
    });

    for _ in 0..12 {
        thread::sleep(Duration::from_millis(100));

        transport.process();
    }

    log::info!("{:?}", transport.pool_status());
}
