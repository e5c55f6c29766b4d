//! Protocol vocabulary for an HCI transport
//!
//! This contains the parts of the Host Controller Interface that the transport needs to know
//! about to frame commands and to classify the events coming back from the controller. It is not a
//! catalog of HCI commands or events; higher layers are expected to build command parameters and
//! interpret event parameters themselves.

#![cfg_attr(not(any(test, feature = "std")), no_std)]

pub mod errors;
pub mod events;
pub mod opcodes;
pub mod packet;

pub use errors::Error;
pub use events::{EventPacket, Events, LeMeta};
pub use opcodes::OpCodePair;
pub use packet::{CommandHeader, HciPacketIndicator};
