//! Transport configuration

use alloc::string::String;
use core::time::Duration;

/// Configuration of a [`Transport`](crate::Transport)
///
/// The number of packet buffers and their size are not part of the configuration, they are fixed
/// at compile time by the `N` parameter of `Transport` and [`HCI_READ_PACKET_SIZE`].
///
/// [`HCI_READ_PACKET_SIZE`]: crate::HCI_READ_PACKET_SIZE
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct TransportConfig {
    /// Name given to the reader task
    pub reader_task_name: String,
    /// Stack size of the reader task in bytes
    pub reader_stack_size: usize,
    /// Priority of the reader task
    ///
    /// The meaning of this is up to the platform's [`TaskSpawner`](crate::platform::TaskSpawner).
    pub reader_priority: u8,
    /// Timeout used for a request that does not have its own timeout
    pub default_timeout: Duration,
    /// Log every command written and every event read at the `trace` level
    pub log_traffic: bool,
}

impl TransportConfig {
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_millis(100);
}

impl Default for TransportConfig {
    fn default() -> Self {
        TransportConfig {
            reader_task_name: String::from("hci_reader_thread"),
            reader_stack_size: 2048,
            reader_priority: 6,
            default_timeout: Self::DEFAULT_TIMEOUT,
            log_traffic: false,
        }
    }
}
