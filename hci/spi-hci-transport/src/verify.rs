//! Validation of packets read from the link

use core::fmt;
use spi_hci_util::events::{EventError, EventPacket};

/// Reason a packet was rejected
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum VerifyError {
    /// The packet indicator is not for an event. Contains the indicator.
    MalformedType(u8),
    /// The parameter length field does not match the length of the packet
    LengthMismatch,
}

impl fmt::Display for VerifyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VerifyError::MalformedType(indicator) => write!(f, "unexpected packet indicator {:#04x}", indicator),
            VerifyError::LengthMismatch => f.write_str("event parameter length does not match the packet length"),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for VerifyError {}

/// Verify that a packet read from the link is a well formed event packet
///
/// A packet is well formed when the first byte is the event packet indicator and the parameter
/// length of the event header equals the number of bytes following the header.
pub fn verify(packet: &[u8]) -> Result<(), VerifyError> {
    match EventPacket::try_from(packet) {
        Ok(_) => Ok(()),
        Err(EventError::NotAnEvent(indicator)) => Err(VerifyError::MalformedType(indicator)),
        Err(_) => Err(VerifyError::LengthMismatch),
    }
}
