//! Recency window parsing and filtering.
//!
//! A window token is a non-negative integer followed by a unit: `m`
//! (minutes), `h` (hours), or `d` (days), e.g. `15m`, `24h`, `7d`. Units are
//! case-insensitive and surrounding whitespace is ignored.

use chrono::{DateTime, Duration, Utc};
use event_map_source_models::RawEvent;

/// Why a window token was rejected.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum WindowError {
    /// The token was empty or whitespace.
    #[error("empty window token")]
    Empty,

    /// No digits precede the unit.
    #[error("window token {token:?} has no number")]
    MissingNumber {
        /// The offending token.
        token: String,
    },

    /// The number part is not a plain non-negative integer.
    #[error("window token {token:?} has an invalid number")]
    InvalidNumber {
        /// The offending token.
        token: String,
    },

    /// The unit is not one of `m`, `h`, `d`.
    #[error("window token {token:?} has unknown unit (expected m, h, or d)")]
    UnknownUnit {
        /// The offending token.
        token: String,
    },

    /// The duration does not fit in a timestamp range.
    #[error("window token {token:?} is too large")]
    Overflow {
        /// The offending token.
        token: String,
    },
}

/// A parsed window token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WindowSpec {
    token: String,
    duration: Duration,
}

/// Parses a window token.
///
/// # Errors
///
/// Returns [`WindowError`] for empty tokens, missing or non-integer
/// numbers, unknown units, and durations too large to represent.
pub fn parse_window(token: &str) -> Result<WindowSpec, WindowError> {
    let trimmed = token.trim();
    let Some(unit) = trimmed.chars().last() else {
        return Err(WindowError::Empty);
    };
    let digits = &trimmed[..trimmed.len() - unit.len_utf8()];
    let owned = || trimmed.to_string();

    let seconds_per_unit: i64 = match unit.to_ascii_lowercase() {
        'm' => 60,
        'h' => 3_600,
        'd' => 86_400,
        _ => return Err(WindowError::UnknownUnit { token: owned() }),
    };

    if digits.is_empty() {
        return Err(WindowError::MissingNumber { token: owned() });
    }
    if !digits.bytes().all(|b| b.is_ascii_digit()) {
        return Err(WindowError::InvalidNumber { token: owned() });
    }

    let amount = digits
        .parse::<i64>()
        .map_err(|_| WindowError::Overflow { token: owned() })?;
    let duration = amount
        .checked_mul(seconds_per_unit)
        .and_then(Duration::try_seconds)
        .ok_or_else(|| WindowError::Overflow { token: owned() })?;

    Ok(WindowSpec {
        token: trimmed.to_ascii_lowercase(),
        duration,
    })
}

impl WindowSpec {
    /// The normalized token (trimmed, lowercase unit).
    #[must_use]
    pub fn token(&self) -> &str {
        &self.token
    }

    /// The window length.
    #[must_use]
    pub const fn duration(&self) -> Duration {
        self.duration
    }

    /// Oldest retained timestamp, or `None` if `now - duration` is not
    /// representable.
    #[must_use]
    pub fn cutoff(&self, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        now.checked_sub_signed(self.duration)
    }

    /// Returns `true` if `cutoff <= timestamp <= now`.
    #[must_use]
    pub fn contains(&self, timestamp: DateTime<Utc>, now: DateTime<Utc>) -> bool {
        self.cutoff(now)
            .is_some_and(|cutoff| cutoff <= timestamp && timestamp <= now)
    }

    /// Retains the events inside the window. Fails closed (empty result)
    /// if the cutoff cannot be computed.
    #[must_use]
    pub fn filter(&self, events: Vec<RawEvent>, now: DateTime<Utc>) -> Vec<RawEvent> {
        let Some(cutoff) = self.cutoff(now) else {
            log::warn!("Window {} overflows at {now}, dropping all events", self.token);
            return Vec::new();
        };
        events
            .into_iter()
            .filter(|event| cutoff <= event.timestamp && event.timestamp <= now)
            .collect()
    }
}

impl std::fmt::Display for WindowSpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.token)
    }
}

impl std::str::FromStr for WindowSpec {
    type Err = WindowError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_window(s)
    }
}

/// Retains events whose timestamp falls in `[now - window, now]`.
///
/// A malformed token yields an empty result and a logged warning.
#[must_use]
pub fn filter(events: Vec<RawEvent>, token: &str, now: DateTime<Utc>) -> Vec<RawEvent> {
    match parse_window(token) {
        Ok(spec) => spec.filter(events, now),
        Err(e) => {
            log::warn!("Rejecting all {} events: {e}", events.len());
            Vec::new()
        }
    }
}
