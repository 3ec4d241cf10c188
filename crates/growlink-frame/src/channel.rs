//! Channel numbers, connection descriptors and header class bytes.
//!
//! The co-processor multiplexes up to eight TCP connections over the UART.
//! A connection descriptor is the channel number handed back when replying.

/// Highest channel number the co-processor assigns.
pub const MAX_CHANNEL: u8 = 0x07;

/// Descriptor meaning "no network channel": output goes to the console.
pub const CONSOLE: u8 = 0xFF;

/// Header class: a TCP client connected.
pub const HEADER_CONNECTED: u8 = 0x80;

/// Header class: a TCP client disconnected.
pub const HEADER_DISCONNECTED: u8 = 0x81;

/// Header class: the co-processor failed to receive data.
pub const HEADER_RECEIVE_FAILED: u8 = 0xFF;

/// Returns true if `value` is a valid channel number.
pub fn is_channel(value: u8) -> bool {
    value <= MAX_CHANNEL
}

/// Returns a human-readable name for a descriptor.
pub fn descriptor_name(descriptor: u8) -> &'static str {
    match descriptor {
        0 => "CH0",
        1 => "CH1",
        2 => "CH2",
        3 => "CH3",
        4 => "CH4",
        5 => "CH5",
        6 => "CH6",
        7 => "CH7",
        CONSOLE => "CONSOLE",
        _ => "INVALID",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn channel_range() {
        assert!(is_channel(0));
        assert!(is_channel(7));
        assert!(!is_channel(8));
        assert!(!is_channel(CONSOLE));
    }

    #[test]
    fn names() {
        assert_eq!(descriptor_name(2), "CH2");
        assert_eq!(descriptor_name(CONSOLE), "CONSOLE");
        assert_eq!(descriptor_name(0x42), "INVALID");
    }
}
