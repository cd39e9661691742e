//! Test doubles for every hardware seam.
//!
//! Devices built from the same [`Journal`] share one event log and one notion of which
//! device the transport is routed to, so tests can check ordering and that nothing
//! touched the line without owning it.

use core::cell::RefCell;
use core::convert::Infallible;
use std::collections::VecDeque;
use std::rc::Rc;
use std::string::{String, ToString};
use std::vec::Vec;

use embedded_hal::delay::DelayNs;

use crate::alarm::Buzzer;
use crate::channel::{ChannelOwner, ChannelSelect, LineControl};
use crate::clock::{Clock, Instant};
use crate::fix::Fix;
use crate::gnss::{GnssError, Sensor};
use crate::sms::{Modem, ModemError, Payload, PendingMessage, PhoneNumber};

#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    Select(ChannelOwner),
    Begin,
    Send { to: String, text: String },
    Count,
    Fetch(u16),
    Emit(u32, u32),
    Silence,
    /// A device was used while the transport was routed elsewhere
    OffChannel(&'static str),
}

struct Bench {
    events: Vec<Event>,
    owner: ChannelOwner,
    now: u32,
    sentences: VecDeque<Result<Fix, GnssError>>,
    inbox: Vec<PendingMessage>,
    fail_begin: bool,
    failing_sends: u32,
}

#[derive(Clone)]
pub struct Journal(Rc<RefCell<Bench>>);

impl Default for Journal {
    fn default() -> Self {
        Self(Rc::new(RefCell::new(Bench {
            events: Vec::new(),
            owner: ChannelOwner::Sensor,
            now: 0,
            sentences: VecDeque::new(),
            inbox: Vec::new(),
            fail_begin: false,
            failing_sends: 0,
        })))
    }
}

impl Journal {
    pub fn events(&self) -> Vec<Event> {
        self.0.borrow().events.clone()
    }

    pub fn clear(&self) {
        self.0.borrow_mut().events.clear();
    }

    pub fn owner(&self) -> ChannelOwner {
        self.0.borrow().owner
    }

    pub fn sends(&self) -> Vec<(String, String)> {
        self.events()
            .into_iter()
            .filter_map(|event| match event {
                Event::Send { to, text } => Some((to, text)),
                _ => None,
            })
            .collect()
    }

    pub fn off_channel(&self) -> Vec<Event> {
        self.events()
            .into_iter()
            .filter(|event| matches!(event, Event::OffChannel(_)))
            .collect()
    }

    pub fn set_now(&self, millis: u32) {
        self.0.borrow_mut().now = millis;
    }

    pub fn script_fix(&self, fix: Fix) {
        self.0.borrow_mut().sentences.push_back(Ok(fix));
    }

    pub fn script_failure(&self, error: GnssError) {
        self.0.borrow_mut().sentences.push_back(Err(error));
    }

    /// Puts a message into the modem's store.
    pub fn deliver(&self, sender: &str, payload: &str) {
        let mut message = PendingMessage {
            sender: PhoneNumber::new(),
            payload: Payload::new(),
        };
        message.sender.push_str(sender).unwrap();
        message.payload.push_str(payload).unwrap();
        self.0.borrow_mut().inbox.push(message);
    }

    pub fn fail_begin(&self) {
        self.0.borrow_mut().fail_begin = true;
    }

    pub fn fail_next_sends(&self, count: u32) {
        self.0.borrow_mut().failing_sends = count;
    }

    fn record(&self, event: Event) {
        self.0.borrow_mut().events.push(event);
    }

    fn require(&self, owner: ChannelOwner, device: &'static str) {
        if self.owner() != owner {
            self.record(Event::OffChannel(device));
        }
    }
}

pub struct MockSelect(Journal);

impl MockSelect {
    pub fn new(journal: &Journal) -> Self {
        Self(journal.clone())
    }
}

impl ChannelSelect for MockSelect {
    fn select(&mut self, owner: ChannelOwner) {
        self.0 .0.borrow_mut().owner = owner;
        self.0.record(Event::Select(owner));
    }
}

/// Yields one scripted parse outcome per sentence.
pub struct MockSensor(Journal);

impl MockSensor {
    pub fn new(journal: &Journal) -> Self {
        Self(journal.clone())
    }
}

impl Sensor for MockSensor {
    fn read(&mut self) -> Option<u8> {
        if self.0 .0.borrow().sentences.is_empty() {
            return None;
        }
        self.0.require(ChannelOwner::Sensor, "sensor");
        Some(b'\n')
    }

    fn feed(&mut self, _byte: u8) -> bool {
        true
    }

    fn parse(&mut self) -> Result<Fix, GnssError> {
        let mut bench = self.0 .0.borrow_mut();
        bench.sentences.pop_front().unwrap_or(Err(GnssError::ParseError))
    }
}

pub struct MockModem(Journal);

impl MockModem {
    pub fn new(journal: &Journal) -> Self {
        Self(journal.clone())
    }
}

impl Modem for MockModem {
    fn begin(&mut self) -> Result<(), ModemError> {
        self.0.require(ChannelOwner::Modem, "modem");
        self.0.record(Event::Begin);

        if self.0 .0.borrow().fail_begin {
            Err(ModemError::Timeout)
        } else {
            Ok(())
        }
    }

    fn send(&mut self, destination: &str, text: &str) -> Result<(), ModemError> {
        self.0.require(ChannelOwner::Modem, "modem");
        self.0.record(Event::Send {
            to: destination.to_string(),
            text: text.to_string(),
        });

        let mut bench = self.0 .0.borrow_mut();
        if bench.failing_sends > 0 {
            bench.failing_sends -= 1;
            return Err(ModemError::Rejected);
        }
        Ok(())
    }

    fn message_count(&mut self) -> Result<u16, ModemError> {
        self.0.require(ChannelOwner::Modem, "modem");
        self.0.record(Event::Count);

        Ok(self.0 .0.borrow().inbox.len() as u16)
    }

    fn fetch_message(&mut self, index: u16) -> Result<PendingMessage, ModemError> {
        self.0.require(ChannelOwner::Modem, "modem");
        self.0.record(Event::Fetch(index));

        let bench = self.0 .0.borrow();
        index
            .checked_sub(1)
            .and_then(|slot| bench.inbox.get(slot as usize))
            .cloned()
            .ok_or(ModemError::Malformed)
    }
}

pub struct MockClock(Journal);

impl MockClock {
    pub fn new(journal: &Journal) -> Self {
        Self(journal.clone())
    }
}

impl Clock for MockClock {
    fn now(&self) -> Instant {
        Instant::from_millis(self.0 .0.borrow().now)
    }
}

pub struct MockBuzzer(Journal);

impl MockBuzzer {
    pub fn new(journal: &Journal) -> Self {
        Self(journal.clone())
    }
}

impl Buzzer for MockBuzzer {
    fn emit(&mut self, frequency_hz: u32, duration_ms: u32) {
        self.0.record(Event::Emit(frequency_hz, duration_ms));
    }

    fn silence(&mut self) {
        self.0.record(Event::Silence);
    }
}

/// Accumulates requested delays instead of sleeping.
#[derive(Debug, Default)]
pub struct MockDelay {
    elapsed_ns: u64,
}

impl MockDelay {
    pub fn elapsed_ms(&self) -> u32 {
        (self.elapsed_ns / 1_000_000) as u32
    }

    pub fn elapsed_us(&self) -> u64 {
        self.elapsed_ns / 1_000
    }
}

impl DelayNs for MockDelay {
    fn delay_ns(&mut self, ns: u32) {
        self.elapsed_ns += ns as u64;
    }
}

#[derive(Debug, Default)]
pub struct MockPin {
    high: bool,
    rising_edges: u32,
}

impl MockPin {
    pub fn is_high(&self) -> bool {
        self.high
    }

    pub fn rising_edges(&self) -> u32 {
        self.rising_edges
    }
}

impl embedded_hal::digital::ErrorType for MockPin {
    type Error = Infallible;
}

impl embedded_hal::digital::OutputPin for MockPin {
    fn set_high(&mut self) -> Result<(), Self::Error> {
        if !self.high {
            self.rising_edges += 1;
        }
        self.high = true;
        Ok(())
    }

    fn set_low(&mut self) -> Result<(), Self::Error> {
        self.high = false;
        Ok(())
    }
}

/// Byte transport that replays a canned response stream and records what was written.
pub struct ScriptedUart {
    rx: VecDeque<u8>,
    tx: Vec<u8>,
}

impl ScriptedUart {
    pub fn new(script: &[u8]) -> Self {
        Self {
            rx: script.iter().copied().collect(),
            tx: Vec::new(),
        }
    }

    pub fn written(&self) -> Vec<u8> {
        self.tx.clone()
    }
}

impl embedded_io::ErrorType for ScriptedUart {
    type Error = Infallible;
}

impl embedded_io::Read for ScriptedUart {
    fn read(&mut self, buf: &mut [u8]) -> Result<usize, Self::Error> {
        let mut count = 0;
        while count < buf.len() {
            match self.rx.pop_front() {
                Some(byte) => {
                    buf[count] = byte;
                    count += 1;
                }
                None => break,
            }
        }
        Ok(count)
    }
}

impl embedded_io::ReadReady for ScriptedUart {
    fn read_ready(&mut self) -> Result<bool, Self::Error> {
        Ok(!self.rx.is_empty())
    }
}

impl embedded_io::Write for ScriptedUart {
    fn write(&mut self, buf: &[u8]) -> Result<usize, Self::Error> {
        self.tx.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }
}

/// A muxed UART: bytes land in a receive buffer and move to `captured` when the
/// interrupt runs while capture is enabled.
#[derive(Debug, Default)]
pub struct MockLine {
    routed: Option<ChannelOwner>,
    routes: u32,
    capturing: bool,
    pending: Vec<u8>,
    captured: Vec<u8>,
    discarded: usize,
}

impl MockLine {
    pub fn receive(&mut self, bytes: &[u8]) {
        self.pending.extend_from_slice(bytes);
    }

    pub fn interrupt(&mut self) {
        if self.capturing {
            self.captured.append(&mut self.pending);
        }
    }

    pub fn captured(&self) -> &[u8] {
        &self.captured
    }

    pub fn discarded(&self) -> usize {
        self.discarded
    }

    pub fn capturing(&self) -> bool {
        self.capturing
    }

    pub fn routed(&self) -> Option<ChannelOwner> {
        self.routed
    }

    pub fn routes(&self) -> u32 {
        self.routes
    }
}

impl LineControl for MockLine {
    fn route(&mut self, owner: ChannelOwner) {
        self.routed = Some(owner);
        self.routes += 1;
    }

    fn discard_pending(&mut self) {
        self.discarded += self.pending.len();
        self.pending.clear();
    }

    fn capture(&mut self, enabled: bool) {
        self.capturing = enabled;
    }
}
