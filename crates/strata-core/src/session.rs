//! Exchange session lifecycle types.
//!
//! A session is the exchange-defined trading-day container. Its state and
//! the state of its nested intermediate clearing are reported by the
//! exchange as integer codes; this module decodes them into closed enums
//! and builds the immutable `SessionContent` from a raw `SessionRecord`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{CoreError, Result};
use crate::ids::SessionId;

/// Session lifecycle stage as reported by the exchange.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SessionState {
    Assigned,
    Online,
    Suspended,
    /// Terminal.
    Canceled,
    /// Terminal.
    Completed,
}

impl SessionState {
    pub const ALL: [SessionState; 5] = [
        Self::Assigned,
        Self::Online,
        Self::Suspended,
        Self::Canceled,
        Self::Completed,
    ];

    /// Decode the exchange state code (0..=4).
    pub fn from_code(code: i32) -> Result<Self> {
        match code {
            0 => Ok(Self::Assigned),
            1 => Ok(Self::Online),
            2 => Ok(Self::Suspended),
            3 => Ok(Self::Canceled),
            4 => Ok(Self::Completed),
            other => Err(CoreError::InvalidSessionState(other)),
        }
    }

    /// Canceled and Completed accept no further session-state changes.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Canceled | Self::Completed)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Assigned => "assigned",
            Self::Online => "online",
            Self::Suspended => "suspended",
            Self::Canceled => "canceled",
            Self::Completed => "completed",
        }
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Intermediate clearing stage as reported by the exchange.
///
/// Every stage accepts every event; the exchange is the source of truth.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum IntClearingState {
    Undefined,
    Oncoming,
    Canceled,
    Running,
    Finalizing,
    Completed,
}

impl IntClearingState {
    pub const ALL: [IntClearingState; 6] = [
        Self::Undefined,
        Self::Oncoming,
        Self::Canceled,
        Self::Running,
        Self::Finalizing,
        Self::Completed,
    ];

    /// Decode the exchange clearing-state flag.
    pub fn from_code(code: i32) -> Result<Self> {
        match code {
            0x00 => Ok(Self::Undefined),
            0x01 => Ok(Self::Oncoming),
            0x02 => Ok(Self::Canceled),
            0x04 => Ok(Self::Running),
            0x08 => Ok(Self::Finalizing),
            0x10 => Ok(Self::Completed),
            other => Err(CoreError::InvalidClearingState(other)),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Undefined => "undefined",
            Self::Oncoming => "oncoming",
            Self::Canceled => "canceled",
            Self::Running => "running",
            Self::Finalizing => "finalizing",
            Self::Completed => "completed",
        }
    }
}

impl fmt::Display for IntClearingState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An observed state change, emitted on every accepted event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transition<S> {
    pub from: S,
    pub to: S,
}

impl<S: PartialEq> Transition<S> {
    pub fn new(from: S, to: S) -> Self {
        Self { from, to }
    }

    /// False for self-transitions.
    pub fn is_change(&self) -> bool {
        self.from != self.to
    }
}

/// Closed time interval `[start, end]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TradingInterval {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl TradingInterval {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Result<Self> {
        if end < start {
            return Err(CoreError::InvalidInterval(format!(
                "end {end} precedes start {start}"
            )));
        }
        Ok(Self { start, end })
    }

    pub fn contains(&self, at: DateTime<Utc>) -> bool {
        self.start <= at && at <= self.end
    }
}

/// Raw session record as delivered by the protocol decoder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionRecord {
    pub session_id: i32,
    pub options_session_id: i32,
    /// Session state code, see [`SessionState::from_code`].
    pub state: i32,
    /// Clearing state flag, see [`IntClearingState::from_code`].
    pub clearing_state: i32,
    pub begin: DateTime<Utc>,
    pub end: DateTime<Utc>,
    #[serde(default)]
    pub evening_enabled: bool,
    pub evening_begin: DateTime<Utc>,
    pub evening_end: DateTime<Utc>,
    #[serde(default)]
    pub morning_enabled: bool,
    pub morning_begin: DateTime<Utc>,
    pub morning_end: DateTime<Utc>,
    pub position_transfer_begin: DateTime<Utc>,
    pub position_transfer_end: DateTime<Utc>,
}

impl SessionRecord {
    pub fn session_state(&self) -> Result<SessionState> {
        SessionState::from_code(self.state)
    }

    pub fn clearing_state(&self) -> Result<IntClearingState> {
        IntClearingState::from_code(self.clearing_state)
    }
}

/// Immutable description of a session, built once from its record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionContent {
    pub id: SessionId,
    pub options_session_id: SessionId,
    pub primary: TradingInterval,
    /// Present only when the record enables the evening session.
    pub evening: Option<TradingInterval>,
    /// Present only when the record enables the morning session.
    pub morning: Option<TradingInterval>,
    pub position_transfer: TradingInterval,
}

impl SessionContent {
    pub fn from_record(record: &SessionRecord) -> Result<Self> {
        let evening = if record.evening_enabled {
            Some(TradingInterval::new(record.evening_begin, record.evening_end)?)
        } else {
            None
        };
        let morning = if record.morning_enabled {
            Some(TradingInterval::new(record.morning_begin, record.morning_end)?)
        } else {
            None
        };

        Ok(Self {
            id: SessionId::new(record.session_id),
            options_session_id: SessionId::new(record.options_session_id),
            primary: TradingInterval::new(record.begin, record.end)?,
            evening,
            morning,
            position_transfer: TradingInterval::new(
                record.position_transfer_begin,
                record.position_transfer_end,
            )?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn utc(day: u32, hour: u32, min: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, day, hour, min, 0).unwrap()
    }

    fn sample_record() -> SessionRecord {
        SessionRecord {
            session_id: 4021,
            options_session_id: 3021,
            state: 1,
            clearing_state: 0x04,
            begin: utc(10, 7, 0),
            end: utc(10, 15, 45),
            evening_enabled: true,
            evening_begin: utc(10, 16, 5),
            evening_end: utc(10, 20, 50),
            morning_enabled: false,
            morning_begin: utc(10, 0, 0),
            morning_end: utc(10, 0, 0),
            position_transfer_begin: utc(10, 15, 45),
            position_transfer_end: utc(10, 16, 0),
        }
    }

    #[test]
    fn test_session_state_codes() {
        for (code, state) in SessionState::ALL.iter().enumerate() {
            assert_eq!(SessionState::from_code(code as i32).unwrap(), *state);
        }
        assert!(matches!(
            SessionState::from_code(5),
            Err(CoreError::InvalidSessionState(5))
        ));
    }

    #[test]
    fn test_terminal_states() {
        assert!(SessionState::Canceled.is_terminal());
        assert!(SessionState::Completed.is_terminal());
        assert!(!SessionState::Assigned.is_terminal());
        assert!(!SessionState::Online.is_terminal());
        assert!(!SessionState::Suspended.is_terminal());
    }

    #[test]
    fn test_clearing_state_codes() {
        assert_eq!(IntClearingState::from_code(0).unwrap(), IntClearingState::Undefined);
        assert_eq!(IntClearingState::from_code(0x01).unwrap(), IntClearingState::Oncoming);
        assert_eq!(IntClearingState::from_code(0x02).unwrap(), IntClearingState::Canceled);
        assert_eq!(IntClearingState::from_code(0x04).unwrap(), IntClearingState::Running);
        assert_eq!(IntClearingState::from_code(0x08).unwrap(), IntClearingState::Finalizing);
        assert_eq!(IntClearingState::from_code(0x10).unwrap(), IntClearingState::Completed);
        assert!(IntClearingState::from_code(0x03).is_err());
    }

    #[test]
    fn test_transition_is_change() {
        assert!(Transition::new(SessionState::Assigned, SessionState::Online).is_change());
        assert!(!Transition::new(SessionState::Online, SessionState::Online).is_change());
    }

    #[test]
    fn test_interval_rejects_reversed_bounds() {
        assert!(TradingInterval::new(utc(10, 8, 0), utc(10, 7, 0)).is_err());
        let interval = TradingInterval::new(utc(10, 7, 0), utc(10, 8, 0)).unwrap();
        assert!(interval.contains(utc(10, 7, 30)));
        assert!(!interval.contains(utc(10, 9, 0)));
    }

    #[test]
    fn test_content_from_record() {
        let record = sample_record();
        let content = SessionContent::from_record(&record).unwrap();

        assert_eq!(content.id, SessionId::new(4021));
        assert_eq!(content.options_session_id, SessionId::new(3021));
        assert_eq!(content.primary.start, utc(10, 7, 0));
        assert!(content.evening.is_some());
        assert!(content.morning.is_none());
        assert_eq!(content.position_transfer.end, utc(10, 16, 0));

        assert_eq!(record.session_state().unwrap(), SessionState::Online);
        assert_eq!(record.clearing_state().unwrap(), IntClearingState::Running);
    }

    #[test]
    fn test_disabled_interval_is_not_validated() {
        let mut record = sample_record();
        record.morning_begin = utc(10, 5, 0);
        record.morning_end = utc(10, 4, 0);
        assert!(SessionContent::from_record(&record).is_ok());

        record.morning_enabled = true;
        assert!(SessionContent::from_record(&record).is_err());
    }
}
