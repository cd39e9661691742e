use heapless::String;

pub use error::ModemError;
pub use sim800::Sim800;

mod error;
pub mod sim800;

/// Longest phone identifier we keep (E.164 is at most 15 digits plus `+`).
pub const SENDER_CAPACITY: usize = 24;

/// One GSM 7-bit text message.
pub const PAYLOAD_CAPACITY: usize = 160;

pub type PhoneNumber = String<SENDER_CAPACITY>;
pub type Payload = String<PAYLOAD_CAPACITY>;

/// An inbound text, alive for one dispatch cycle only.
#[derive(Debug, Clone, PartialEq)]
pub struct PendingMessage {
    pub sender: PhoneNumber,
    pub payload: Payload,
}

/// Text-message transport. Every call blocks until the modem answers.
pub trait Modem {
    /// One-time bring-up, deferred until the first fix.
    fn begin(&mut self) -> Result<(), ModemError>;

    fn send(&mut self, destination: &str, text: &str) -> Result<(), ModemError>;

    /// Number of messages currently held in the modem's store.
    fn message_count(&mut self) -> Result<u16, ModemError>;

    /// Reads the message at `index` (1-based store slot).
    fn fetch_message(&mut self, index: u16) -> Result<PendingMessage, ModemError>;
}

/// Last observed size of the modem's message store.
///
/// New messages are detected by growth of the count. When several arrive between two
/// polls only the newest is reported; the others are skipped. Messages are never deleted,
/// so once the SIM store is full the count stops growing and nothing new is detected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MessageBaseline {
    count: u16,
}

impl MessageBaseline {
    pub fn new(count: u16) -> Self {
        Self { count }
    }

    pub fn count(&self) -> u16 {
        self.count
    }

    /// Compares `current` with the baseline and moves the baseline to it.
    ///
    /// Returns the store index of the newest message when the count grew. A shrinking
    /// count (store cleared or evicted) re-synchronises without reporting anything.
    pub fn detect(&mut self, current: u16) -> Option<u16> {
        let previous = self.count;
        self.count = current;

        if current > previous {
            if current - previous > 1 {
                crate::log_warn!(
                    "{} messages arrived since last poll, only the newest is handled",
                    current - previous
                );
            }
            Some(current)
        } else {
            if current < previous {
                crate::log_info!("message store shrank {} -> {}", previous, current);
            }
            None
        }
    }
}
