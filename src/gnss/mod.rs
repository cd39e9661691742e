use nmea::parse_str;

use crate::fix::Fix;
use crate::ring::ByteConsumer;

pub use error::GnssError;
pub use sentence::SentenceBuffer;

mod error;
pub mod positioning;
mod sentence;

pub const GNSS_BAUD_RATE: u32 = 9600;

/// Position source as seen by the control loop.
pub trait Sensor {
    /// Next captured byte, if any.
    fn read(&mut self) -> Option<u8>;

    /// Hands a byte to the sentence assembler; true once a whole sentence is ready.
    fn feed(&mut self, byte: u8) -> bool;

    /// Decodes the ready sentence and discards it, whatever the outcome.
    fn parse(&mut self) -> Result<Fix, GnssError>;
}

/// NMEA receiver fed by the interrupt-filled byte ring.
pub struct NmeaSensor<'a> {
    rx: ByteConsumer<'a>,
    nmea_buffer: SentenceBuffer,
}

impl<'a> NmeaSensor<'a> {
    pub fn new(rx: ByteConsumer<'a>) -> Self {
        Self {
            rx,
            nmea_buffer: SentenceBuffer::new(),
        }
    }

    fn decode(sentence: &str) -> Result<Fix, GnssError> {
        parse_str(sentence)
            .map_err(|_| {
                crate::log_debug!("NMEA parse error: {}", sentence);

                GnssError::ParseError
            })
            .and_then(Fix::try_from)
    }
}

impl Sensor for NmeaSensor<'_> {
    fn read(&mut self) -> Option<u8> {
        self.rx.dequeue()
    }

    fn feed(&mut self, byte: u8) -> bool {
        self.nmea_buffer.feed(byte)
    }

    fn parse(&mut self) -> Result<Fix, GnssError> {
        if !self.nmea_buffer.is_complete() {
            return Err(GnssError::ParseError);
        }

        let result = match self.nmea_buffer.as_str() {
            Ok(sentence) => Self::decode(sentence),
            Err(_) => Err(GnssError::InvalidUtf8),
        };

        self.nmea_buffer.reset("Sentence consumed");
        result
    }
}
