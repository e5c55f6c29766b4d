//! Host controller interface over an interrupt driven link
//!
//! This is for a controller that is not attached through a UART or USB but through a byte
//! oriented link with an interrupt line, such as the SPI interface of a network coprocessor. The
//! host stack sends commands and receives events through a [`Transport`](transport::Transport).
//!
//! * [`util`] contains the packet formats (opcodes, events, and controller status codes).
//! * [`transport`] contains the transport and the platform traits it is built on.
//! * [`platform`] contains implementations of the platform traits for hosted targets (requires
//!   feature `std`).
//!
//! This crate only uses `core` and `alloc` unless feature `std` is enabled.

#![cfg_attr(docsrs, feature(doc_auto_cfg))]
#![cfg_attr(not(feature = "std"), no_std)]

#[doc(inline)]
pub use spi_hci_util as util;

#[doc(inline)]
pub use spi_hci_transport as transport;

#[cfg(feature = "std")]
#[doc(inline)]
pub use spi_hci_std as platform;

pub use spi_hci_transport::{Expected, Request, RequestError, Transport, TransportConfig};
pub use spi_hci_util::{Error, OpCodePair};
