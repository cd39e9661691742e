use defmt::Format;
use embedded_hal::delay::DelayNs;

use crate::alarm::{AlarmDriver, AlarmState, Buzzer};
use crate::channel::{Arbiter, ChannelOwner, ChannelSelect};
use crate::clock::{Clock, Instant, IntervalTimer};
use crate::command::{interpret, location_text, Action};
use crate::config::{Config, STALE_AFTER};
use crate::fix::FixStore;
use crate::gnss::Sensor;
use crate::sms::{MessageBaseline, Modem, ModemError};

#[derive(Debug, Clone, PartialEq, Format)]
pub enum TrackerError {
    /// The modem never answered during bring-up. Nothing else can be done.
    ModemBringup(ModemError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Format)]
pub enum ModemState {
    /// Not started; waits for the first valid fix
    Dormant,
    Ready,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Format)]
pub enum Delivery {
    Sent,
    Failed,
}

/// Outcome of each step of one tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Format)]
pub struct TickSummary {
    pub fixes: u8,
    pub dropped_sentences: u8,
    pub modem_started: bool,
    pub report: Option<Delivery>,
    pub command: Option<Action>,
    pub reply: Option<Delivery>,
    pub alarm_burst: bool,
}

/// State shared by every step of the loop.
pub struct Context {
    pub fix: FixStore,
    pub alarm: AlarmState,
    pub report_timer: IntervalTimer,
    pub poll_timer: IntervalTimer,
    pub baseline: MessageBaseline,
    pub modem: ModemState,
    stale: bool,
}

impl Context {
    pub fn new(config: &Config, now: Instant) -> Self {
        Self {
            fix: FixStore::new(),
            alarm: AlarmState::Inactive,
            report_timer: IntervalTimer::new("report", config.report_interval, now),
            poll_timer: IntervalTimer::new("poll", config.poll_interval, now),
            baseline: MessageBaseline::new(0),
            modem: ModemState::Dormant,
            stale: false,
        }
    }
}

/// The control loop. One call to [`Tracker::tick`] runs one cycle:
///
/// 1. drain captured sensor bytes and apply every decoded fix
/// 2. on the first valid fix, bring the modem up and seed the message baseline
/// 3. send the periodic location report when due
/// 4. poll the inbox when due, execute a new command and reply to its sender
/// 5. hand the channel back to the sensor and play the alarm burst if active
///
/// Steps 3 and 4 only run once the modem is up.
pub struct Tracker<S, M, X: ChannelSelect, C, B, D> {
    config: Config,
    context: Context,
    sensor: S,
    modem: M,
    arbiter: Arbiter<X>,
    clock: C,
    alarm: AlarmDriver<B, D>,
}

impl<S, M, X, C, B, D> Tracker<S, M, X, C, B, D>
where
    S: Sensor,
    M: Modem,
    X: ChannelSelect,
    C: Clock,
    B: Buzzer,
    D: DelayNs,
{
    pub fn new(
        config: Config,
        sensor: S,
        modem: M,
        select: X,
        clock: C,
        alarm: AlarmDriver<B, D>,
    ) -> Self {
        let context = Context::new(&config, clock.now());

        Self {
            config,
            context,
            sensor,
            modem,
            arbiter: Arbiter::new(select),
            clock,
            alarm,
        }
    }

    pub fn context(&self) -> &Context {
        &self.context
    }

    pub fn arbiter(&self) -> &Arbiter<X> {
        &self.arbiter
    }

    pub fn tick(&mut self) -> Result<TickSummary, TrackerError> {
        let mut summary = TickSummary::default();
        let now = self.clock.now();

        self.pump_sensor(now, &mut summary);
        self.check_staleness(now);

        if self.context.modem == ModemState::Dormant && self.context.fix.snapshot().valid {
            self.bring_up_modem()?;
            summary.modem_started = true;
        }

        if self.context.modem == ModemState::Ready {
            if self.context.report_timer.due_and_reset(now) {
                summary.report = Some(self.send_report());
            }

            if self.context.poll_timer.due_and_reset(now) {
                self.poll_inbox(&mut summary);
            }
        }

        if self.arbiter.owner() != ChannelOwner::Sensor {
            self.arbiter.acquire(ChannelOwner::Sensor);
        }

        summary.alarm_burst = self.alarm.run(self.context.alarm);
        Ok(summary)
    }

    fn pump_sensor(&mut self, now: Instant, summary: &mut TickSummary) {
        self.arbiter.acquire(ChannelOwner::Sensor);

        for _ in 0..self.config.max_sensor_bytes_per_tick {
            let Some(byte) = self.sensor.read() else {
                break;
            };

            if !self.sensor.feed(byte) {
                continue;
            }

            match self.sensor.parse() {
                Ok(fix) => {
                    if fix.valid && !self.context.fix.snapshot().valid {
                        crate::log_info!(
                            "fix acquired: {:?}, {:?} at UTC {:?}",
                            fix.latitude,
                            fix.longitude,
                            fix.utc_hms()
                        );
                    }
                    self.context.fix.update(fix, now);
                    summary.fixes = summary.fixes.saturating_add(1);
                }
                Err(e) => {
                    crate::log_debug!("sentence dropped: {:?}", e);
                    summary.dropped_sentences = summary.dropped_sentences.saturating_add(1);
                }
            }
        }
    }

    fn check_staleness(&mut self, now: Instant) {
        let age = self.context.fix.age(now);
        let stale = self.context.fix.snapshot().valid && age.is_some_and(|age| age > STALE_AFTER);

        if stale && !self.context.stale {
            crate::log_warn!("no fresh fix for {:?}, reporting last known position", age);
        }
        self.context.stale = stale;
    }

    fn bring_up_modem(&mut self) -> Result<(), TrackerError> {
        crate::log_info!("starting modem");

        if let Err(e) = on_modem(&mut self.arbiter, &mut self.modem, |modem| modem.begin()) {
            crate::log_error!("modem bring-up failed: {:?}", e);
            self.arbiter.acquire(ChannelOwner::Sensor);
            self.alarm.error_pattern();
            return Err(TrackerError::ModemBringup(e));
        }

        // Messages already in the store are never executed
        let count = on_modem(&mut self.arbiter, &mut self.modem, |modem| {
            modem.message_count()
        })
        .unwrap_or_else(|e| {
            crate::log_warn!("message count at bring-up failed: {:?}", e);
            0
        });
        self.context.baseline = MessageBaseline::new(count);
        self.context.modem = ModemState::Ready;

        crate::log_info!("modem ready, {} stored messages", count);
        Ok(())
    }

    fn send_report(&mut self) -> Delivery {
        let text = location_text(&self.context.fix.snapshot());
        let destination = &self.config.destination;

        crate::log_info!("report to {}: {}", destination.as_str(), text.as_str());
        let result = on_modem(&mut self.arbiter, &mut self.modem, |modem| {
            modem.send(destination, &text)
        });
        delivery("report", result)
    }

    fn poll_inbox(&mut self, summary: &mut TickSummary) {
        let count = match on_modem(&mut self.arbiter, &mut self.modem, |modem| {
            modem.message_count()
        }) {
            Ok(count) => count,
            Err(e) => {
                crate::log_warn!("message count failed: {:?}", e);
                return;
            }
        };

        let Some(index) = self.context.baseline.detect(count) else {
            return;
        };

        let message = match on_modem(&mut self.arbiter, &mut self.modem, |modem| {
            modem.fetch_message(index)
        }) {
            Ok(message) => message,
            Err(e) => {
                crate::log_warn!("reading message {} failed: {:?}", index, e);
                return;
            }
        };

        crate::log_info!(
            "command from {}: {}",
            message.sender.as_str(),
            message.payload.as_str()
        );

        let fix = self.context.fix.snapshot();
        let (action, reply) = interpret(&message.payload, &fix, &mut self.context.alarm);
        summary.command = Some(action);

        let result = on_modem(&mut self.arbiter, &mut self.modem, |modem| {
            modem.send(&message.sender, &reply)
        });
        summary.reply = Some(delivery("reply", result));
    }
}

/// Routes the channel to the modem, then runs `op` on it.
fn on_modem<X, M, T>(arbiter: &mut Arbiter<X>, modem: &mut M, op: impl FnOnce(&mut M) -> T) -> T
where
    X: ChannelSelect,
    M: Modem,
{
    arbiter.acquire(ChannelOwner::Modem);
    op(modem)
}

fn delivery(what: &str, result: Result<(), ModemError>) -> Delivery {
    match result {
        Ok(()) => Delivery::Sent,
        Err(e) => {
            crate::log_warn!("SMS failed ({}): {:?}", what, e);
            Delivery::Failed
        }
    }
}
