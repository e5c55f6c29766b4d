//! HCI Command Opcodes
//!
//! Opcodes are composed of a group identifier (OGF) and an individual command identifier (OCF)
//! specific to the group. The two are packed together to form the raw opcode value that is put
//! into the header of a command packet.
//!
//! ```
//! # use spi_hci_util::opcodes::{ogf, OpCodePair};
//! let reset = OpCodePair::new(ogf::CONTROLLER_AND_BASEBAND, 0x3);
//!
//! assert_eq!(0xC03, reset.into_opcode());
//! ```

/// OpCode Group Field values
pub mod ogf {
    pub const LINK_CONTROL: u16 = 0x01;
    pub const LINK_POLICY: u16 = 0x02;
    pub const CONTROLLER_AND_BASEBAND: u16 = 0x03;
    pub const INFORMATION_PARAMETERS: u16 = 0x04;
    pub const STATUS_PARAMETERS: u16 = 0x05;
    pub const TESTING: u16 = 0x06;
    pub const LE_CONTROLLER: u16 = 0x08;
    pub const VENDOR_SPECIFIC: u16 = 0x3F;
}

/// An type for the pair of OGF (OpCode Group Field) and OCF (OpCode Command Field)
///
/// The main use for this is converting a command group and command code into the numerical opcode
/// passed over the interface to the controller.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub struct OpCodePair {
    pub ogf: u16,
    pub ocf: u16,
}

impl OpCodePair {
    /// Create a new `OpCodePair`
    pub const fn new(ogf: u16, ocf: u16) -> Self {
        OpCodePair { ogf, ocf }
    }

    /// Get the OpCode Group Field value
    pub fn get_ogf(&self) -> u16 {
        self.ogf
    }

    /// Get the OpCode Command Field value
    pub fn get_ocf(&self) -> u16 {
        self.ocf
    }

    /// Convert the OpCodePair into the opcode
    ///
    /// The returned value is the opcode as a native integer. Use [`to_bytes`] to get the opcode
    /// as it appears within a HCI packet.
    ///
    /// [`to_bytes`]: OpCodePair::to_bytes
    pub const fn into_opcode(self) -> u16 {
        // The first 10 bits of the OpCode is the OCF field and the last 6 bits is the OGF field.
        (self.ocf & 0x3FFu16) | (self.ogf << 10)
    }

    /// Convert an opcode into an `OpCodePair`
    pub const fn from_opcode(val: u16) -> Self {
        OpCodePair {
            ogf: val >> 10,
            ocf: val & 0x3FFu16,
        }
    }

    /// Get the opcode in the byte order used by the HCI packets
    pub const fn to_bytes(self) -> [u8; 2] {
        self.into_opcode().to_le_bytes()
    }

    /// Read an opcode from the byte order used by HCI packets
    pub const fn from_bytes(bytes: [u8; 2]) -> Self {
        Self::from_opcode(u16::from_le_bytes(bytes))
    }
}

impl core::fmt::Display for OpCodePair {
    fn fmt(&self, f: &mut core::fmt::Formatter) -> core::fmt::Result {
        write!(f, "{:#x} ({:#x}:{:#x})", self.into_opcode(), self.ogf, self.ocf)
    }
}

impl From<OpCodePair> for u16 {
    fn from(pair: OpCodePair) -> u16 {
        pair.into_opcode()
    }
}

impl From<u16> for OpCodePair {
    fn from(opcode: u16) -> Self {
        OpCodePair::from_opcode(opcode)
    }
}
