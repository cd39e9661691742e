//! SIM800 text-mode SMS driver
//!
//! Speaks the Hayes AT dialect over any `embedded_io` byte transport. The modem must be
//! the device currently routed onto that transport; the driver itself knows nothing about
//! channel sharing.

use core::fmt::Write as _;

use embedded_hal::delay::DelayNs;
use embedded_io::{Read, ReadReady, Write};
use heapless::String;

use super::{Modem, ModemError, Payload, PendingMessage, PhoneNumber};

pub const MODEM_BAUD_RATE: u32 = 9600;

const LINE_CAPACITY: usize = 192;
const COMMAND_CAPACITY: usize = 48;

/// Silence tolerated while waiting for an ordinary command's response
const COMMAND_TIMEOUT_MS: u32 = 2_000;
/// Silence tolerated while waiting for the `>` prompt after `AT+CMGS`
const PROMPT_TIMEOUT_MS: u32 = 5_000;
/// Network submission can take a long time on a weak signal
const SUBMIT_TIMEOUT_MS: u32 = 60_000;

const BEGIN_ATTEMPTS: u8 = 5;
const BEGIN_RETRY_MS: u32 = 500;

const CTRL_Z: u8 = 0x1a;

type Line = String<LINE_CAPACITY>;

pub struct Sim800<U, D> {
    uart: U,
    delay: D,
}

impl<U, D> Sim800<U, D>
where
    U: Read + Write + ReadReady,
    D: DelayNs,
{
    pub fn new(uart: U, delay: D) -> Self {
        Self { uart, delay }
    }

    pub fn release(self) -> (U, D) {
        (self.uart, self.delay)
    }

    fn write_all(&mut self, bytes: &[u8]) -> Result<(), ModemError> {
        self.uart.write_all(bytes).map_err(ModemError::io)?;
        self.uart.flush().map_err(ModemError::io)
    }

    /// Waits for one byte, giving up after `timeout_ms` of silence.
    fn read_byte(&mut self, timeout_ms: u32) -> Result<u8, ModemError> {
        let mut waited_ms = 0;

        loop {
            if self.uart.read_ready().map_err(ModemError::io)? {
                let mut byte = [0u8; 1];
                if self.uart.read(&mut byte).map_err(ModemError::io)? == 1 {
                    return Ok(byte[0]);
                }
            }

            if waited_ms >= timeout_ms {
                return Err(ModemError::Timeout);
            }

            self.delay.delay_ms(1);
            waited_ms += 1;
        }
    }

    /// Reads up to the next LF, dropping CRs.
    fn read_line(&mut self, timeout_ms: u32) -> Result<Line, ModemError> {
        let mut line = Line::new();

        loop {
            match self.read_byte(timeout_ms)? {
                b'\n' => return Ok(line),
                b'\r' => {}
                byte => line
                    .push(char::from(byte))
                    .map_err(|_| ModemError::Overflow)?,
            }
        }
    }

    /// Consumes lines until the final result code.
    ///
    /// Returns the first line starting with `prefix`, if one was requested and seen.
    /// Anything else (echo, `+CMTI`, `RING`) is skipped.
    fn read_response(
        &mut self,
        prefix: Option<&str>,
        timeout_ms: u32,
    ) -> Result<Option<Line>, ModemError> {
        let mut found = None;

        loop {
            let line = self.read_line(timeout_ms)?;
            let text = line.trim();

            if text.is_empty() {
                continue;
            }

            if text == "OK" {
                return Ok(found);
            }

            if is_error(text) {
                crate::log_warn!("modem rejected command: {}", text);
                return Err(ModemError::Rejected);
            }

            match prefix {
                Some(prefix) if found.is_none() && text.starts_with(prefix) => {
                    found = Some(line);
                }
                _ => crate::log_trace!("modem: skipping '{}'", text),
            }
        }
    }

    fn command(
        &mut self,
        command: &str,
        prefix: Option<&str>,
        timeout_ms: u32,
    ) -> Result<Option<Line>, ModemError> {
        crate::log_trace!("modem <- {}", command);

        self.write_all(command.as_bytes())?;
        self.write_all(b"\r")?;
        self.read_response(prefix, timeout_ms)
    }

    fn wait_for_prompt(&mut self) -> Result<(), ModemError> {
        let mut line = Line::new();

        loop {
            match self.read_byte(PROMPT_TIMEOUT_MS)? {
                b'>' => return Ok(()),
                b'\n' => {
                    if is_error(line.trim()) {
                        return Err(ModemError::Rejected);
                    }
                    line.clear();
                }
                b'\r' => {}
                byte => {
                    // Only the error check cares about the content
                    let _ = line.push(char::from(byte));
                }
            }
        }
    }
}

impl<U, D> Modem for Sim800<U, D>
where
    U: Read + Write + ReadReady,
    D: DelayNs,
{
    fn begin(&mut self) -> Result<(), ModemError> {
        crate::log_info!("modem: bringing up SIM800");

        let mut attempt = 1;
        while let Err(e) = self.command("AT", None, COMMAND_TIMEOUT_MS) {
            if attempt == BEGIN_ATTEMPTS {
                crate::log_error!("modem: no answer after {} attempts", attempt);
                return Err(e);
            }

            attempt += 1;
            self.delay.delay_ms(BEGIN_RETRY_MS);
        }

        // Echo off, then text mode
        self.command("ATE0", None, COMMAND_TIMEOUT_MS)?;
        self.command("AT+CMGF=1", None, COMMAND_TIMEOUT_MS)?;

        crate::log_info!("modem: ready");
        Ok(())
    }

    fn send(&mut self, destination: &str, text: &str) -> Result<(), ModemError> {
        let mut command: String<COMMAND_CAPACITY> = String::new();
        write!(command, "AT+CMGS=\"{}\"", destination).map_err(|_| ModemError::Overflow)?;

        crate::log_trace!("modem <- {}", command.as_str());
        self.write_all(command.as_bytes())?;
        self.write_all(b"\r")?;
        self.wait_for_prompt()?;

        self.write_all(text.as_bytes())?;
        self.write_all(&[CTRL_Z])?;

        match self.read_response(Some("+CMGS:"), SUBMIT_TIMEOUT_MS)? {
            Some(_) => Ok(()),
            None => Err(ModemError::Malformed),
        }
    }

    fn message_count(&mut self) -> Result<u16, ModemError> {
        let line = self
            .command("AT+CPMS?", Some("+CPMS:"), COMMAND_TIMEOUT_MS)?
            .ok_or(ModemError::Malformed)?;

        parse_used_count(&line).ok_or(ModemError::Malformed)
    }

    fn fetch_message(&mut self, index: u16) -> Result<PendingMessage, ModemError> {
        let mut command: String<COMMAND_CAPACITY> = String::new();
        write!(command, "AT+CMGR={}", index).map_err(|_| ModemError::Overflow)?;

        crate::log_trace!("modem <- {}", command.as_str());
        self.write_all(command.as_bytes())?;
        self.write_all(b"\r")?;

        // Header first; a bare OK here means the slot is empty
        let header = loop {
            let line = self.read_line(COMMAND_TIMEOUT_MS)?;
            let text = line.trim();

            if text.starts_with("+CMGR:") {
                break line;
            }
            if text == "OK" {
                return Err(ModemError::Malformed);
            }
            if is_error(text) {
                return Err(ModemError::Rejected);
            }
        };

        // The body is the very next line, whatever it contains
        let body = self.read_line(COMMAND_TIMEOUT_MS)?;
        self.read_response(None, COMMAND_TIMEOUT_MS)?;

        let sender = parse_sender(&header).ok_or(ModemError::Malformed)?;

        let mut message = PendingMessage {
            sender: PhoneNumber::new(),
            payload: Payload::new(),
        };
        message
            .sender
            .push_str(sender)
            .map_err(|_| ModemError::Overflow)?;
        message
            .payload
            .push_str(body.as_str())
            .map_err(|_| ModemError::Overflow)?;

        Ok(message)
    }
}

fn is_error(text: &str) -> bool {
    text == "ERROR" || text.starts_with("+CMS ERROR") || text.starts_with("+CME ERROR")
}

/// `+CPMS: "SM",3,30,"SM",3,30,"SM",3,30` -> 3
fn parse_used_count(line: &str) -> Option<u16> {
    line.split(',').nth(1)?.trim().parse().ok()
}

/// `+CMGR: "REC UNREAD","+15551234567","","24/10/16,12:00:00+08"` -> +15551234567
fn parse_sender(line: &str) -> Option<&str> {
    line.split('"').nth(3).filter(|sender| !sender.is_empty())
}
