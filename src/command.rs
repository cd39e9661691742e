use core::fmt::Write as _;

use defmt::Format;
use heapless::String;

use crate::alarm::AlarmState;
use crate::fix::Fix;
use crate::sms::PAYLOAD_CAPACITY;

pub const NO_FIX_REPLY: &str = "ERROR: NO GPS FIX";
pub const ALARM_ON_REPLY: &str = "BEEPING ON";
pub const ALARM_OFF_REPLY: &str = "BEEPING OFF";
pub const INVALID_COMMAND_REPLY: &str = "INVALID COMMAND";

pub type Reply = String<PAYLOAD_CAPACITY>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Format)]
pub enum Action {
    ReportLocation,
    ToggleAlarm,
    Unrecognized,
}

/// Recognised keywords, matched whole and case-insensitively.
pub const KEYWORDS: [(&str, Action); 2] = [
    ("gps", Action::ReportLocation),
    ("beep", Action::ToggleAlarm),
];

impl Action {
    pub fn parse(payload: &str) -> Self {
        KEYWORDS
            .iter()
            .find(|(keyword, _)| payload.eq_ignore_ascii_case(keyword))
            .map(|&(_, action)| action)
            .unwrap_or(Action::Unrecognized)
    }
}

/// Maps an inbound payload to its action, applies it, and builds the reply text.
///
/// Only `ToggleAlarm` has a side effect (it flips `alarm`).
pub fn interpret(payload: &str, fix: &Fix, alarm: &mut AlarmState) -> (Action, Reply) {
    let action = Action::parse(payload);

    let reply = match action {
        Action::ReportLocation => location_text(fix),
        Action::ToggleAlarm => {
            *alarm = alarm.toggled();
            crate::log_info!("alarm toggled: {:?}", *alarm);

            fixed(match alarm {
                AlarmState::Active => ALARM_ON_REPLY,
                AlarmState::Inactive => ALARM_OFF_REPLY,
            })
        }
        Action::Unrecognized => fixed(INVALID_COMMAND_REPLY),
    };

    (action, reply)
}

/// `"<lat>, <lon>, <alt>"` for a valid fix, the no-fix error text otherwise.
pub fn location_text(fix: &Fix) -> Reply {
    if !fix.valid {
        return fixed(NO_FIX_REPLY);
    }

    let mut text = Reply::new();
    // Three bounded floats always fit in one message
    let _ = write!(
        text,
        "{:.4}, {:.4}, {:.2}",
        fix.latitude, fix.longitude, fix.altitude
    );
    text
}

fn fixed(text: &str) -> Reply {
    let mut reply = Reply::new();
    let _ = reply.push_str(text);
    reply
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_york() -> Fix {
        Fix {
            valid: true,
            latitude: 40.7128,
            longitude: -74.0060,
            altitude: 10.0,
            time: None,
        }
    }

    #[test]
    fn keywords_ignore_case() {
        for payload in ["GPS", "Gps", "gps", "gPs"] {
            assert_eq!(Action::parse(payload), Action::ReportLocation);
        }
        assert_eq!(Action::parse("BEEP"), Action::ToggleAlarm);
    }

    #[test]
    fn no_partial_matches() {
        for payload in ["gps?", " gps", "gp", "beeps", "", "gps beep"] {
            assert_eq!(Action::parse(payload), Action::Unrecognized);
        }
    }

    #[test]
    fn location_without_fix() {
        let mut alarm = AlarmState::Inactive;

        let (action, reply) = interpret("gps", &Fix::default(), &mut alarm);

        assert_eq!(action, Action::ReportLocation);
        assert_eq!(reply.as_str(), "ERROR: NO GPS FIX");
    }

    #[test]
    fn location_with_fix() {
        let mut alarm = AlarmState::Inactive;

        let (action, reply) = interpret("gps", &new_york(), &mut alarm);

        assert_eq!(action, Action::ReportLocation);
        assert_eq!(reply.as_str(), "40.7128, -74.0060, 10.00");
    }

    #[test]
    fn location_is_idempotent() {
        let mut alarm = AlarmState::Active;

        let first = interpret("Gps", &new_york(), &mut alarm);
        let second = interpret("Gps", &new_york(), &mut alarm);

        assert_eq!(first, second);
        assert_eq!(alarm, AlarmState::Active);
    }

    #[test]
    fn beep_alternates() {
        let mut alarm = AlarmState::Inactive;

        let (action, reply) = interpret("beep", &Fix::default(), &mut alarm);
        assert_eq!(action, Action::ToggleAlarm);
        assert_eq!(reply.as_str(), "BEEPING ON");
        assert_eq!(alarm, AlarmState::Active);

        let (_, reply) = interpret("beep", &Fix::default(), &mut alarm);
        assert_eq!(reply.as_str(), "BEEPING OFF");
        assert_eq!(alarm, AlarmState::Inactive);
    }

    #[test]
    fn unknown_command_leaves_alarm_alone() {
        let mut alarm = AlarmState::Active;

        let (action, reply) = interpret("foo", &new_york(), &mut alarm);

        assert_eq!(action, Action::Unrecognized);
        assert_eq!(reply.as_str(), "INVALID COMMAND");
        assert_eq!(alarm, AlarmState::Active);
    }

    #[test]
    fn southern_and_eastern_hemispheres() {
        let fix = Fix {
            valid: true,
            latitude: -33.8568,
            longitude: 151.2153,
            altitude: 4.25,
            time: None,
        };

        assert_eq!(location_text(&fix).as_str(), "-33.8568, 151.2153, 4.25");
    }
}
