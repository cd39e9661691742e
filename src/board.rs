//! ESP32-S3 wiring
//!
//! UART1 is shared by the GNSS receiver and the SIM800 behind a 2:1 mux on one GPIO.
//! While the sensor owns the line, the RX interrupt drains the FIFO into the sensor ring
//! and does nothing else. While the modem owns it, the interrupt is off and the modem
//! driver reads the UART directly through [`SharedUart`]. Re-selecting the current owner
//! leaves the FIFO alone.

use core::cell::RefCell;
use core::sync::atomic::{AtomicU32, Ordering};

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::blocking_mutex::Mutex;
use esp_hal::gpio::Output;
use esp_hal::handler;
use esp_hal::uart::{Uart, UartInterrupt};
use esp_hal::Blocking;

use crate::channel::{ChannelOwner, LineControl};
use crate::clock::{Clock, Instant};
use crate::ring::RxCapture;

/// GNSS and SIM800 both talk 9600 8N1.
pub const SHARED_BAUD_RATE: u32 = 9600;

/// Interrupt as soon as a byte lands; the FIFO is never left holding a partial sentence.
pub const RX_FIFO_THRESHOLD: u16 = 1;

type SharedCell<T> = Mutex<CriticalSectionRawMutex, RefCell<Option<T>>>;

static UART: SharedCell<Uart<'static, Blocking>> = Mutex::new(RefCell::new(None));
static CAPTURE: SharedCell<RxCapture<'static>> = Mutex::new(RefCell::new(None));

/// Bytes the interrupt had to throw away because the ring was full.
pub static RX_OVERRUNS: AtomicU32 = AtomicU32::new(0);

/// Hands the UART and the ring's producer half to the interrupt handler.
pub fn install(mut uart: Uart<'static, Blocking>, capture: RxCapture<'static>) {
    uart.set_interrupt_handler(uart_rx);

    CAPTURE.lock(|cell| cell.replace(Some(capture)));
    UART.lock(|cell| cell.replace(Some(uart)));
}

#[handler]
fn uart_rx() {
    UART.lock(|uart| {
        let mut uart = uart.borrow_mut();
        let Some(uart) = uart.as_mut() else {
            return;
        };

        CAPTURE.lock(|capture| {
            let mut capture = capture.borrow_mut();
            let mut buffer = [0u8; 32];

            loop {
                match uart.read_buffered(&mut buffer) {
                    Ok(0) | Err(_) => break,
                    Ok(read) => {
                        if let Some(capture) = capture.as_mut() {
                            let dropped = capture.push(&buffer[..read]);
                            RX_OVERRUNS.fetch_add(dropped as u32, Ordering::Relaxed);
                        }
                    }
                }
            }
        });

        uart.clear_interrupts(UartInterrupt::RxFifoFull.into());
    });
}

fn drain(uart: &mut Uart<'static, Blocking>) {
    let mut scratch = [0u8; 32];
    while let Ok(read) = uart.read_buffered(&mut scratch) {
        if read == 0 {
            break;
        }
    }
}

/// Mux control line plus the RX interrupt gate of UART1.
///
/// Low routes UART1 to the GNSS receiver, high to the modem. Wrap it in
/// [`Mux`](crate::channel::Mux) so the line is only touched when the route changes.
pub struct UartLine {
    pin: Output<'static>,
}

impl UartLine {
    pub fn new(pin: Output<'static>) -> Self {
        Self { pin }
    }
}

fn with_uart(op: impl FnOnce(&mut Uart<'static, Blocking>)) {
    UART.lock(|uart| {
        if let Some(uart) = uart.borrow_mut().as_mut() {
            op(uart);
        }
    });
}

impl LineControl for UartLine {
    fn route(&mut self, owner: ChannelOwner) {
        match owner {
            ChannelOwner::Sensor => self.pin.set_low(),
            ChannelOwner::Modem => self.pin.set_high(),
        }
    }

    fn discard_pending(&mut self) {
        with_uart(|uart| {
            drain(uart);
            uart.clear_interrupts(UartInterrupt::RxFifoFull.into());
        });
    }

    fn capture(&mut self, enabled: bool) {
        with_uart(|uart| {
            if enabled {
                uart.listen(UartInterrupt::RxFifoFull);
            } else {
                uart.unlisten(UartInterrupt::RxFifoFull);
            }
        });
    }
}

/// The shared UART as a byte stream for the modem driver.
///
/// Only meaningful while the modem owns the channel; the arbiter guarantees that.
pub struct SharedUart;

impl SharedUart {
    fn with<R>(
        op: impl FnOnce(&mut Uart<'static, Blocking>) -> Result<R, embedded_io::ErrorKind>,
    ) -> Result<R, embedded_io::ErrorKind> {
        UART.lock(|uart| match uart.borrow_mut().as_mut() {
            Some(uart) => op(uart),
            None => Err(embedded_io::ErrorKind::NotConnected),
        })
    }
}

impl embedded_io::ErrorType for SharedUart {
    type Error = embedded_io::ErrorKind;
}

impl embedded_io::Read for SharedUart {
    fn read(&mut self, buf: &mut [u8]) -> Result<usize, Self::Error> {
        Self::with(|uart| {
            embedded_io::Read::read(uart, buf).map_err(|e| embedded_io::Error::kind(&e))
        })
    }
}

impl embedded_io::ReadReady for SharedUart {
    fn read_ready(&mut self) -> Result<bool, Self::Error> {
        Self::with(|uart| {
            embedded_io::ReadReady::read_ready(uart).map_err(|e| embedded_io::Error::kind(&e))
        })
    }
}

impl embedded_io::Write for SharedUart {
    fn write(&mut self, buf: &[u8]) -> Result<usize, Self::Error> {
        Self::with(|uart| {
            embedded_io::Write::write(uart, buf).map_err(|e| embedded_io::Error::kind(&e))
        })
    }

    fn flush(&mut self) -> Result<(), Self::Error> {
        Self::with(|uart| embedded_io::Write::flush(uart).map_err(|e| embedded_io::Error::kind(&e)))
    }
}

/// Embassy time base truncated to the loop's 32-bit millisecond clock.
pub struct EmbassyClock;

impl Clock for EmbassyClock {
    fn now(&self) -> Instant {
        Instant::from_millis(embassy_time::Instant::now().as_millis() as u32)
    }
}
