use std::fmt;

/// One classified unit of co-processor traffic.
///
/// Exactly one event is produced per [`crate::Classifier::classify`] call.
/// Channel numbers carried by the variants are always 0-7.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IncomingEvent {
    /// Nothing usable arrived (timeout, banner, or a framing error that was
    /// recovered by resynchronizing).
    None,
    /// Operator input typed on the fallback console.
    SerialConsoleLine(String),
    /// A TCP client sent data; `payload_budget` bytes of payload follow.
    DataReceived { channel: u8, payload_budget: u16 },
    /// A TCP client connected.
    Connected(u8),
    /// A TCP client disconnected.
    Disconnected(u8),
    /// The co-processor reported a failed receive.
    ReceiveFailed,
}

impl IncomingEvent {
    /// Short stable name of the variant.
    pub fn kind(&self) -> &'static str {
        match self {
            IncomingEvent::None => "none",
            IncomingEvent::SerialConsoleLine(_) => "console",
            IncomingEvent::DataReceived { .. } => "data",
            IncomingEvent::Connected(_) => "connected",
            IncomingEvent::Disconnected(_) => "disconnected",
            IncomingEvent::ReceiveFailed => "receive-failed",
        }
    }

    /// The channel this event belongs to, if any.
    pub fn channel(&self) -> Option<u8> {
        match self {
            IncomingEvent::DataReceived { channel, .. }
            | IncomingEvent::Connected(channel)
            | IncomingEvent::Disconnected(channel) => Some(*channel),
            _ => None,
        }
    }
}

impl fmt::Display for IncomingEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IncomingEvent::None => f.write_str("none"),
            IncomingEvent::SerialConsoleLine(text) => write!(f, "console {text:?}"),
            IncomingEvent::DataReceived {
                channel,
                payload_budget,
            } => write!(f, "data channel={channel} budget={payload_budget}"),
            IncomingEvent::Connected(channel) => write!(f, "connected channel={channel}"),
            IncomingEvent::Disconnected(channel) => write!(f, "disconnected channel={channel}"),
            IncomingEvent::ReceiveFailed => f.write_str("receive-failed"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn channel_accessor() {
        let data = IncomingEvent::DataReceived {
            channel: 3,
            payload_budget: 10,
        };
        assert_eq!(data.channel(), Some(3));
        assert_eq!(IncomingEvent::Connected(1).channel(), Some(1));
        assert_eq!(IncomingEvent::ReceiveFailed.channel(), None);
    }

    #[test]
    fn display_is_compact() {
        let data = IncomingEvent::DataReceived {
            channel: 2,
            payload_budget: 19,
        };
        assert_eq!(data.to_string(), "data channel=2 budget=19");
        assert_eq!(
            IncomingEvent::SerialConsoleLine("/log".into()).to_string(),
            "console \"/log\""
        );
    }
}
