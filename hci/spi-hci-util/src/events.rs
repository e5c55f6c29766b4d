//! Host Controller Interface Events
//!
//! Only the events a transport needs to classify are named here. Every other event is passed
//! through as [`Events::Other`] with its raw code, it is up to the application to interpret it.
//!
//! The `*Data` types are views into the event parameter of an event packet. They borrow the packet
//! and do not copy the parameters.

use crate::errors::Error;
use crate::opcodes::OpCodePair;
use crate::packet::{HciPacketIndicator, EVENT_HEADER_SIZE, EVENT_PARAMETER_LEN_OFFSET, HCI_HDR_SIZE};
use core::fmt;

macro_rules! make_u16 {
    ( $packet:ident, $start:expr ) => {
        u16::from_le_bytes([$packet[$start], $packet[$start + 1]])
    };
}

/// HCI event codes
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum Events {
    DisconnectionComplete,
    EncryptionChange,
    CommandComplete,
    CommandStatus,
    HardwareError,
    NumberOfCompletedPackets,
    DataBufferOverflow,
    LeMeta,
    VendorSpecific,
    Other(u8),
}

impl Events {
    pub const fn get_event_code(&self) -> u8 {
        match self {
            Events::DisconnectionComplete => 0x05,
            Events::EncryptionChange => 0x08,
            Events::CommandComplete => 0x0E,
            Events::CommandStatus => 0x0F,
            Events::HardwareError => 0x10,
            Events::NumberOfCompletedPackets => 0x13,
            Events::DataBufferOverflow => 0x1A,
            Events::LeMeta => 0x3E,
            Events::VendorSpecific => 0xFF,
            Events::Other(code) => *code,
        }
    }
}

impl From<u8> for Events {
    fn from(code: u8) -> Self {
        match code {
            0x05 => Events::DisconnectionComplete,
            0x08 => Events::EncryptionChange,
            0x0E => Events::CommandComplete,
            0x0F => Events::CommandStatus,
            0x10 => Events::HardwareError,
            0x13 => Events::NumberOfCompletedPackets,
            0x1A => Events::DataBufferOverflow,
            0x3E => Events::LeMeta,
            0xFF => Events::VendorSpecific,
            other => Events::Other(other),
        }
    }
}

impl fmt::Display for Events {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Events::DisconnectionComplete => f.write_str("Disconnection Complete"),
            Events::EncryptionChange => f.write_str("Encryption Change"),
            Events::CommandComplete => f.write_str("Command Complete"),
            Events::CommandStatus => f.write_str("Command Status"),
            Events::HardwareError => f.write_str("Hardware Error"),
            Events::NumberOfCompletedPackets => f.write_str("Number Of Completed Packets"),
            Events::DataBufferOverflow => f.write_str("Data Buffer Overflow"),
            Events::LeMeta => f.write_str("LE Meta"),
            Events::VendorSpecific => f.write_str("Vendor Specific"),
            Events::Other(code) => write!(f, "event {:#04x}", code),
        }
    }
}

/// LE Meta sub-event codes
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum LeMeta {
    ConnectionComplete,
    AdvertisingReport,
    ConnectionUpdateComplete,
    ReadRemoteFeaturesComplete,
    LongTermKeyRequest,
    Other(u8),
}

impl LeMeta {
    pub const fn get_sub_event_code(&self) -> u8 {
        match self {
            LeMeta::ConnectionComplete => 0x01,
            LeMeta::AdvertisingReport => 0x02,
            LeMeta::ConnectionUpdateComplete => 0x03,
            LeMeta::ReadRemoteFeaturesComplete => 0x04,
            LeMeta::LongTermKeyRequest => 0x05,
            LeMeta::Other(code) => *code,
        }
    }
}

impl From<u8> for LeMeta {
    fn from(code: u8) -> Self {
        match code {
            0x01 => LeMeta::ConnectionComplete,
            0x02 => LeMeta::AdvertisingReport,
            0x03 => LeMeta::ConnectionUpdateComplete,
            0x04 => LeMeta::ReadRemoteFeaturesComplete,
            0x05 => LeMeta::LongTermKeyRequest,
            other => LeMeta::Other(other),
        }
    }
}

/// Error for an event that cannot be interpreted
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum EventError {
    /// The packet indicator is not for an event
    NotAnEvent(u8),
    /// The packet is shorter than the event header
    MissingHeader,
    /// The parameter length field does not match the bytes in the packet
    ParameterLength { declared: usize, actual: usize },
    /// The event parameter is too short for the event
    Truncated(Events),
}

impl fmt::Display for EventError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            EventError::NotAnEvent(indicator) => write!(f, "packet indicator {:#04x} is not an event", indicator),
            EventError::MissingHeader => f.write_str("packet is too short to contain an event header"),
            EventError::ParameterLength { declared, actual } => write!(
                f,
                "event parameter length is {} but the packet contains {} parameter bytes",
                declared, actual
            ),
            EventError::Truncated(event) => write!(f, "event parameter of {} is truncated", event),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for EventError {}

/// A borrowed event packet
///
/// This is created from the bytes of a packet *including* the packet indicator.
#[derive(Copy, Clone, Debug)]
pub struct EventPacket<'a> {
    event: Events,
    parameter: &'a [u8],
}

impl<'a> EventPacket<'a> {
    pub fn get_event(&self) -> Events {
        self.event
    }

    /// Get the event parameter
    ///
    /// This is everything after the event header.
    pub fn get_parameter(&self) -> &'a [u8] {
        self.parameter
    }

    pub fn as_command_complete(&self) -> Result<CommandCompleteData<'a>, EventError> {
        CommandCompleteData::try_from_parameter(self.parameter)
    }

    pub fn as_command_status(&self) -> Result<CommandStatusData, EventError> {
        CommandStatusData::try_from_parameter(self.parameter)
    }

    pub fn as_le_meta(&self) -> Result<LeMetaData<'a>, EventError> {
        LeMetaData::try_from_parameter(self.parameter)
    }

    pub fn as_hardware_error(&self) -> Result<u8, EventError> {
        self.parameter
            .first()
            .copied()
            .ok_or(EventError::Truncated(Events::HardwareError))
    }
}

impl<'a> TryFrom<&'a [u8]> for EventPacket<'a> {
    type Error = EventError;

    fn try_from(packet: &'a [u8]) -> Result<Self, Self::Error> {
        match packet.first() {
            Some(indicator) if *indicator == HciPacketIndicator::Event.val() => (),
            Some(indicator) => return Err(EventError::NotAnEvent(*indicator)),
            None => return Err(EventError::MissingHeader),
        }

        if packet.len() < HCI_HDR_SIZE + EVENT_HEADER_SIZE {
            return Err(EventError::MissingHeader);
        }

        let declared: usize = packet[EVENT_PARAMETER_LEN_OFFSET].into();

        let parameter = &packet[(HCI_HDR_SIZE + EVENT_HEADER_SIZE)..];

        if declared != parameter.len() {
            return Err(EventError::ParameterLength {
                declared,
                actual: parameter.len(),
            });
        }

        Ok(EventPacket {
            event: Events::from(packet[HCI_HDR_SIZE]),
            parameter,
        })
    }
}

/// Command Complete event parameter
#[derive(Copy, Clone, Debug)]
pub struct CommandCompleteData<'a> {
    pub number_of_hci_command_packets: u8,
    pub command_opcode: OpCodePair,
    /// The return parameter of the command. The first byte of this is usually the status.
    pub return_parameter: &'a [u8],
}

impl<'a> CommandCompleteData<'a> {
    /// Size of the fixed part of the event parameter
    pub const PREFIX_SIZE: usize = 3;

    pub fn try_from_parameter(parameter: &'a [u8]) -> Result<Self, EventError> {
        if parameter.len() < Self::PREFIX_SIZE {
            return Err(EventError::Truncated(Events::CommandComplete));
        }

        Ok(CommandCompleteData {
            number_of_hci_command_packets: parameter[0],
            command_opcode: OpCodePair::from_opcode(make_u16!(parameter, 1)),
            return_parameter: &parameter[Self::PREFIX_SIZE..],
        })
    }
}

/// Command Status event parameter
#[derive(Copy, Clone, Debug)]
pub struct CommandStatusData {
    pub status: Error,
    pub number_of_hci_command_packets: u8,
    pub command_opcode: OpCodePair,
}

impl CommandStatusData {
    /// Size of the event parameter
    pub const SIZE: usize = 4;

    pub fn try_from_parameter(parameter: &[u8]) -> Result<Self, EventError> {
        if parameter.len() < Self::SIZE {
            return Err(EventError::Truncated(Events::CommandStatus));
        }

        Ok(CommandStatusData {
            status: Error::from(parameter[0]),
            number_of_hci_command_packets: parameter[1],
            command_opcode: OpCodePair::from_opcode(make_u16!(parameter, 2)),
        })
    }
}

/// LE Meta event parameter
#[derive(Copy, Clone, Debug)]
pub struct LeMetaData<'a> {
    pub sub_event: LeMeta,
    /// The sub event parameter (everything after the sub event code)
    pub data: &'a [u8],
}

impl<'a> LeMetaData<'a> {
    pub fn try_from_parameter(parameter: &'a [u8]) -> Result<Self, EventError> {
        let (code, data) = parameter
            .split_first()
            .ok_or(EventError::Truncated(Events::LeMeta))?;

        Ok(LeMetaData {
            sub_event: LeMeta::from(*code),
            data,
        })
    }
}
