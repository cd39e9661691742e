use defmt::Format;
use embedded_hal::delay::DelayNs;
use embedded_hal::digital::OutputPin;

/// Silence before each burst, so bursts from consecutive ticks stay distinguishable
pub const BURST_PAUSE_MS: u32 = 250;
pub const BURST_PULSES: u8 = 3;
pub const BURST_FREQUENCY_HZ: u32 = 2_000;
pub const BURST_PULSE_MS: u32 = 100;
pub const BURST_GAP_MS: u32 = 100;

/// How long one burst holds up the loop.
pub const BURST_BLOCKING_MS: u32 =
    BURST_PAUSE_MS + BURST_PULSES as u32 * (BURST_PULSE_MS + BURST_GAP_MS);

/// Fatal error pattern: low and long, clearly different from the locator burst
pub const ERROR_PULSES: u8 = 5;
pub const ERROR_FREQUENCY_HZ: u32 = 400;
pub const ERROR_PULSE_MS: u32 = 500;
pub const ERROR_GAP_MS: u32 = 250;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Format)]
pub enum AlarmState {
    #[default]
    Inactive,
    Active,
}

impl AlarmState {
    pub fn toggled(self) -> Self {
        match self {
            AlarmState::Inactive => AlarmState::Active,
            AlarmState::Active => AlarmState::Inactive,
        }
    }

    pub fn is_active(self) -> bool {
        self == AlarmState::Active
    }
}

/// Audible output.
pub trait Buzzer {
    /// Sounds `frequency_hz` for `duration_ms`, returning when the tone is over.
    fn emit(&mut self, frequency_hz: u32, duration_ms: u32);

    fn silence(&mut self);
}

/// Plays the locator burst once per tick while the alarm is active.
pub struct AlarmDriver<B, D> {
    buzzer: B,
    delay: D,
}

impl<B: Buzzer, D: DelayNs> AlarmDriver<B, D> {
    pub fn new(buzzer: B, delay: D) -> Self {
        Self { buzzer, delay }
    }

    /// Runs one tick's worth of alarm output. Returns whether a burst was played.
    pub fn run(&mut self, state: AlarmState) -> bool {
        if !state.is_active() {
            return false;
        }

        self.delay.delay_ms(BURST_PAUSE_MS);
        self.pulses(BURST_PULSES, BURST_FREQUENCY_HZ, BURST_PULSE_MS, BURST_GAP_MS);
        true
    }

    /// Signals a fatal start-up failure.
    pub fn error_pattern(&mut self) {
        self.pulses(ERROR_PULSES, ERROR_FREQUENCY_HZ, ERROR_PULSE_MS, ERROR_GAP_MS);
    }

    fn pulses(&mut self, count: u8, frequency_hz: u32, pulse_ms: u32, gap_ms: u32) {
        for _ in 0..count {
            self.buzzer.emit(frequency_hz, pulse_ms);
            self.buzzer.silence();
            self.delay.delay_ms(gap_ms);
        }
    }

    pub fn release(self) -> (B, D) {
        (self.buzzer, self.delay)
    }
}

/// Square-wave buzzer bit-banged on a plain output pin.
pub struct GpioBuzzer<P, D> {
    pin: P,
    delay: D,
}

impl<P: OutputPin, D: DelayNs> GpioBuzzer<P, D> {
    pub fn new(pin: P, delay: D) -> Self {
        Self { pin, delay }
    }
}

impl<P: OutputPin, D: DelayNs> Buzzer for GpioBuzzer<P, D> {
    fn emit(&mut self, frequency_hz: u32, duration_ms: u32) {
        if frequency_hz == 0 {
            self.silence();
            self.delay.delay_ms(duration_ms);
            return;
        }

        let half_period_us = 500_000 / frequency_hz;
        let cycles = frequency_hz.saturating_mul(duration_ms) / 1_000;

        for _ in 0..cycles {
            // A GPIO write on this target cannot fail
            let _ = self.pin.set_high();
            self.delay.delay_us(half_period_us);
            let _ = self.pin.set_low();
            self.delay.delay_us(half_period_us);
        }
    }

    fn silence(&mut self) {
        let _ = self.pin.set_low();
    }
}
