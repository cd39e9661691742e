use core::str;
use core::str::Utf8Error;

const MAX_NMEA_SENTENCE_SIZE: usize = 128;

type Buffer = [u8; MAX_NMEA_SENTENCE_SIZE];

/// Assembles one NMEA sentence at a time from a raw byte stream.
#[derive(Debug)]
pub struct SentenceBuffer {
    cursor: usize,
    buffer: Buffer,

    state: ParseState,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum ParseState {
    /// Waiting for a start-of-sentence marker
    Waiting,

    /// Collecting characters of the sentence (everything after `'$'`)
    Collecting,

    /// After encountering `'*'` in the sentence, we expect exactly two hex characters for the checksum
    InChecksum { count: usize },

    /// After reading the two checksum digits, we wait for the final terminator (CR or LF)
    Terminating,

    /// Sentence is complete and ready to be consumed
    Complete,
}

impl SentenceBuffer {
    pub fn new() -> Self {
        Self {
            cursor: 0,
            buffer: [0; MAX_NMEA_SENTENCE_SIZE],

            state: ParseState::Waiting,
        }
    }

    /// Appends a byte, resetting the whole sentence on overflow.
    fn push_byte(&mut self, byte: u8) -> bool {
        if self.cursor >= self.buffer.len() {
            self.reset("Buffer overflow");
            return false;
        }

        self.buffer[self.cursor] = byte;
        self.cursor += 1;
        true
    }

    fn start(&mut self) {
        self.reset("Start-of-sentence marker ($) found");
        self.push_byte(b'$');
        self.state = ParseState::Collecting;
    }

    pub fn as_str(&self) -> Result<&str, Utf8Error> {
        str::from_utf8(&self.buffer[..self.cursor])
    }

    pub fn is_complete(&self) -> bool {
        self.state == ParseState::Complete
    }

    /// Feeds one byte; returns true once a full sentence (`$...*hh`) is buffered.
    ///
    /// A completed sentence stays available through [`as_str`](Self::as_str) until the
    /// next byte arrives or [`reset`](Self::reset) is called.
    pub fn feed(&mut self, byte: u8) -> bool {
        if self.state == ParseState::Complete {
            self.reset("Completed sentence superseded");
        }

        match self.state {
            ParseState::Waiting => {
                // In this state we're only looking for the start-of-sentence marker
                if byte == b'$' {
                    self.start();
                }
            }

            ParseState::Collecting => {
                match byte {
                    b'*' => {
                        // Transition to checksum state
                        if self.push_byte(byte) {
                            self.state = ParseState::InChecksum { count: 0 };
                        }
                    }

                    // A new marker mid-sentence means we lost the tail of the previous one
                    b'$' => self.start(),

                    b'\r' | b'\n' => self.reset("Sentence terminated without checksum"),

                    _ => {
                        self.push_byte(byte);
                    }
                }
            }

            ParseState::InChecksum { count } => {
                if !byte.is_ascii_hexdigit() {
                    self.reset("Non-hex byte in checksum");
                    return false;
                }

                if !self.push_byte(byte) {
                    return false;
                }

                // After two hex digits, transition to termination state
                self.state = if count + 1 == 2 {
                    ParseState::Terminating
                } else {
                    ParseState::InChecksum { count: count + 1 }
                };
            }

            ParseState::Terminating => match byte {
                // NL finishes the sentence
                b'\n' => self.state = ParseState::Complete,

                // Ignore CR
                b'\r' => {}

                b'$' => self.start(),

                // Any other byte in the termination phase is unexpected and resets the parser
                _ => self.reset("Unexpected byte in Terminating phase"),
            },

            // Completed sentences were reset above
            ParseState::Complete => {}
        }

        self.is_complete()
    }

    pub fn reset(&mut self, reason: &str) {
        self.cursor = 0;
        self.buffer.fill(0);

        self.state = ParseState::Waiting;

        crate::log_trace!("Resetting sentence buffer -- {}", reason);
    }
}

impl Default for SentenceBuffer {
    fn default() -> Self {
        Self::new()
    }
}
