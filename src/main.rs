#![cfg_attr(feature = "esp32", no_std)]
#![cfg_attr(feature = "esp32", no_main)]

#[cfg(feature = "esp32")]
mod firmware {
    use core::sync::atomic::Ordering;

    use defmt::{error, info, warn};
    use esp_backtrace as _;
    use esp_hal::clock::CpuClock;
    use esp_hal::delay::Delay;
    use esp_hal::gpio::{Level, Output, OutputConfig};
    use esp_hal::timer::timg::TimerGroup;
    use esp_hal::uart::{self, RxConfig, Uart};
    use esp_println as _;
    use static_cell::StaticCell;

    use locator::alarm::{AlarmDriver, GpioBuzzer};
    use locator::board::{
        self, EmbassyClock, SharedUart, UartLine, RX_FIFO_THRESHOLD, RX_OVERRUNS,
        SHARED_BAUD_RATE,
    };
    use locator::channel::Mux;
    use locator::gnss::NmeaSensor;
    use locator::ring::{RxCapture, SensorRing};
    use locator::sms::Sim800;
    use locator::{Config, Tracker};

    static SENSOR_RING: StaticCell<SensorRing> = StaticCell::new();

    pub async fn run() {
        let peripherals = esp_hal::init(esp_hal::Config::default().with_cpu_clock(CpuClock::max()));

        let timg0 = TimerGroup::new(peripherals.TIMG0);
        esp_hal_embassy::init(timg0.timer0);

        info!("locator starting");

        let uart_config = uart::Config::default()
            .with_baudrate(SHARED_BAUD_RATE)
            .with_rx(RxConfig::default().with_fifo_full_threshold(RX_FIFO_THRESHOLD));

        let uart = match Uart::new(peripherals.UART1, uart_config) {
            Ok(uart) => uart.with_rx(peripherals.GPIO45).with_tx(peripherals.GPIO46),
            Err(e) => {
                error!("UART1 configuration rejected: {:?}", e);
                return;
            }
        };

        let (producer, consumer) = SENSOR_RING.init(SensorRing::new()).split();
        board::install(uart, RxCapture::new(producer));

        let mux = Output::new(peripherals.GPIO4, Level::Low, OutputConfig::default());
        let buzzer_pin = Output::new(peripherals.GPIO5, Level::Low, OutputConfig::default());

        let mut tracker = Tracker::new(
            Config::default(),
            NmeaSensor::new(consumer),
            Sim800::new(SharedUart, Delay::new()),
            Mux::new(UartLine::new(mux)),
            EmbassyClock,
            AlarmDriver::new(GpioBuzzer::new(buzzer_pin, Delay::new()), Delay::new()),
        );

        let mut overruns = 0;

        loop {
            match tracker.tick() {
                Ok(summary) => {
                    if summary != Default::default() {
                        info!("tick: {}", summary);
                    }
                }
                Err(e) => {
                    error!("halting: {}", e);
                    break;
                }
            }

            let total = RX_OVERRUNS.load(Ordering::Relaxed);
            if total != overruns {
                warn!("sensor ring overrun, {} bytes lost so far", total);
                overruns = total;
            }

            embassy_futures::yield_now().await;
        }

        // Fatal: the modem is unusable and there is nothing left to do
        loop {
            embassy_futures::yield_now().await;
        }
    }
}

#[cfg(feature = "esp32")]
#[esp_hal_embassy::main]
async fn main(_spawner: embassy_executor::Spawner) {
    firmware::run().await;
}

#[cfg(not(feature = "esp32"))]
fn main() {
    println!("locator is firmware for the ESP32-S3; run the test suite on the host instead");
}
