//! Controller status codes
//!
//! Command Status, Command Complete, and Hardware Error events carry a one byte code from the
//! controller. `Error` gives names to the codes a transport is most likely to see so that they can
//! be logged as something more useful than a number. Codes without a name are kept as
//! [`Unknown`](Error::Unknown).

use core::fmt::{self, Display, Formatter};

macro_rules! status_codes {
    ( $( $code:literal => $name:ident, $desc:literal; )* ) => {
        /// A Controller Error
        ///
        /// `NoError` is created from the status code zero. There is no official error for zero, but
        /// it is used by HCI events to signify success.
        #[derive(Clone, Copy, PartialEq, Eq, Debug)]
        pub enum Error {
            NoError,
            $( $name, )*
            Unknown(u8),
        }

        impl From<u8> for Error {
            fn from(raw: u8) -> Self {
                match raw {
                    0x00 => Error::NoError,
                    $( $code => Error::$name, )*
                    _ => Error::Unknown(raw),
                }
            }
        }

        impl From<Error> for u8 {
            fn from(error: Error) -> u8 {
                match error {
                    Error::NoError => 0x00,
                    $( Error::$name => $code, )*
                    Error::Unknown(raw) => raw,
                }
            }
        }

        impl Display for Error {
            fn fmt(&self, f: &mut Formatter) -> fmt::Result {
                match self {
                    Error::NoError => f.write_str("no error"),
                    $( Error::$name => write!(f, "controller error: {} ({:#04x})", $desc, $code), )*
                    Error::Unknown(raw) => write!(f, "unknown error code ({:#04x})", raw),
                }
            }
        }
    };
}

status_codes! {
    0x01 => UnknownHciCommand, "unknown HCI command";
    0x02 => UnknownConnectionIdentifier, "unknown connection identifier";
    0x03 => HardwareFailure, "hardware failure";
    0x07 => MemoryCapacityExceeded, "memory capacity exceeded";
    0x08 => ConnectionTimeout, "connection timeout";
    0x0C => CommandDisallowed, "command disallowed";
    0x11 => UnsupportedFeatureOrParameterValue, "unsupported feature or parameter value";
    0x12 => InvalidHciCommandParameters, "invalid HCI command parameters";
    0x1F => UnspecifiedError, "unspecified error";
    0x3A => ControllerBusy, "controller busy";
    0x3C => AdvertisingTimeout, "advertising timeout";
    0x3E => ConnectionFailedToBeEstablished, "connection failed to be established";
    0x45 => PacketTooLong, "packet too long";
}

impl Error {
    /// Check that a status is `NoError`
    pub fn ok_or_else<F, E>(self, err: F) -> Result<(), E>
    where
        F: FnOnce(Self) -> E,
    {
        if let Error::NoError = self {
            Ok(())
        } else {
            Err(err(self))
        }
    }

    pub fn is_success(&self) -> bool {
        *self == Error::NoError
    }
}

#[cfg(feature = "std")]
impl std::error::Error for Error {}
