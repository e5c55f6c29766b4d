//! HCI packet framing
//!
//! Packets on the interface are prefixed with a packet indicator byte. This is the same framing
//! as used by the UART transport within the Bluetooth Specification. Event packets are
//! `[indicator][event code][parameter length][parameters...]` and command packets are
//! `[indicator][opcode:2][parameter length][parameters...]`.

use crate::opcodes::OpCodePair;
use core::fmt;

/// Size of the packet indicator
pub const HCI_HDR_SIZE: usize = 1;

/// Size of the header of an event packet (event code + parameter length)
pub const EVENT_HEADER_SIZE: usize = 2;

/// Size of the header of a command packet (opcode + parameter length)
pub const COMMAND_HEADER_SIZE: usize = 3;

/// Offset of the packet indicator within a packet
pub const PACKET_TYPE_OFFSET: usize = 0;

/// Offset of the event code within an event packet
pub const EVENT_CODE_OFFSET: usize = 1;

/// Offset of the total parameter length within an event packet
pub const EVENT_PARAMETER_LEN_OFFSET: usize = 2;

/// The maximum number of parameter bytes in a command packet
pub const MAX_COMMAND_PARAMETER_LEN: usize = u8::MAX as usize;

/// Packet Indicator
///
/// The packet indicator is the first byte of every packet sent or received on the interface and
/// labels the kind of HCI packet that follows it.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum HciPacketIndicator {
    Command,
    AclData,
    ScoData,
    Event,
    IsoData,
}

impl HciPacketIndicator {
    pub const fn val(&self) -> u8 {
        match self {
            HciPacketIndicator::Command => 0x01,
            HciPacketIndicator::AclData => 0x02,
            HciPacketIndicator::ScoData => 0x03,
            HciPacketIndicator::Event => 0x04,
            HciPacketIndicator::IsoData => 0x05,
        }
    }
}

impl TryFrom<u8> for HciPacketIndicator {
    type Error = u8;

    fn try_from(raw: u8) -> Result<Self, u8> {
        match raw {
            0x01 => Ok(HciPacketIndicator::Command),
            0x02 => Ok(HciPacketIndicator::AclData),
            0x03 => Ok(HciPacketIndicator::ScoData),
            0x04 => Ok(HciPacketIndicator::Event),
            0x05 => Ok(HciPacketIndicator::IsoData),
            _ => Err(raw),
        }
    }
}

impl fmt::Display for HciPacketIndicator {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            HciPacketIndicator::Command => f.write_str("Command"),
            HciPacketIndicator::AclData => f.write_str("ACL"),
            HciPacketIndicator::ScoData => f.write_str("SCO"),
            HciPacketIndicator::Event => f.write_str("Event"),
            HciPacketIndicator::IsoData => f.write_str("ISO"),
        }
    }
}

/// The header of a command packet
///
/// The header is everything before the command parameters, including the packet indicator. It is
/// written to the interface separately from the parameters so that the parameters never need to be
/// copied into a contiguous buffer.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub struct CommandHeader {
    opcode: OpCodePair,
    parameter_len: u8,
}

impl CommandHeader {
    /// The full size of the header on the interface
    pub const SIZE: usize = HCI_HDR_SIZE + COMMAND_HEADER_SIZE;

    /// Create a new `CommandHeader`
    ///
    /// An error is returned if `parameter_len` does not fit within the single byte length field.
    pub fn new(opcode: OpCodePair, parameter_len: usize) -> Result<Self, ParameterLengthError> {
        let parameter_len = u8::try_from(parameter_len).map_err(|_| ParameterLengthError(parameter_len))?;

        Ok(CommandHeader { opcode, parameter_len })
    }

    pub fn get_opcode(&self) -> OpCodePair {
        self.opcode
    }

    pub fn get_parameter_len(&self) -> usize {
        self.parameter_len.into()
    }

    /// Get the header as it is sent over the interface
    pub fn to_bytes(&self) -> [u8; Self::SIZE] {
        let [opcode_lo, opcode_hi] = self.opcode.to_bytes();

        [
            HciPacketIndicator::Command.val(),
            opcode_lo,
            opcode_hi,
            self.parameter_len,
        ]
    }
}

/// The command parameters are too long to fit in a single command packet
///
/// The contained value is the length of the rejected parameters.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub struct ParameterLengthError(pub usize);

impl fmt::Display for ParameterLengthError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "command parameters of {} bytes exceed the maximum of {} bytes",
            self.0, MAX_COMMAND_PARAMETER_LEN
        )
    }
}

#[cfg(feature = "std")]
impl std::error::Error for ParameterLengthError {}
