//! Rumble state: per-band waveform selection and one-shot expiry.
//!
//! The firmware offers no reply for rumble updates, so the driver only
//! tracks what it last asked for. Expiry is polled by the streaming loop
//! once per processed report; its resolution is therefore bounded by the
//! controller's report cadence, not wall-clock precision.

use std::time::{Duration, Instant};

use crate::protocol::{RUMBLE_ACTIVE, RUMBLE_NEUTRAL};

#[derive(Debug, Clone)]
pub struct RumbleState {
    low: [u8; 4],
    high: [u8; 4],
    expire_at: Option<Instant>,
}

impl Default for RumbleState {
    fn default() -> Self {
        Self {
            low: RUMBLE_NEUTRAL,
            high: RUMBLE_NEUTRAL,
            expire_at: None,
        }
    }
}

impl RumbleState {
    /// Select waveforms per band. A nonzero duration with at least one
    /// active band arms a one-shot expiry; anything else holds the
    /// selection until explicitly changed.
    pub fn set(&mut self, low: bool, high: bool, duration_ms: u64) {
        self.low = if low { RUMBLE_ACTIVE } else { RUMBLE_NEUTRAL };
        self.high = if high { RUMBLE_ACTIVE } else { RUMBLE_NEUTRAL };
        self.expire_at = if (low || high) && duration_ms > 0 {
            Some(Instant::now() + Duration::from_millis(duration_ms))
        } else {
            None
        };
    }

    /// Waveform bytes embedded in every outbound subcommand or rumble frame.
    pub fn waveforms(&self) -> ([u8; 4], [u8; 4]) {
        (self.low, self.high)
    }

    /// True once an armed expiry has been reached.
    pub fn expired(&self, now: Instant) -> bool {
        self.expire_at.is_some_and(|at| now >= at)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_neutral_and_unarmed() {
        let rumble = RumbleState::default();
        assert_eq!(rumble.waveforms(), (RUMBLE_NEUTRAL, RUMBLE_NEUTRAL));
        assert!(!rumble.expired(Instant::now()));
    }

    #[test]
    fn test_set_selects_waveforms() {
        let mut rumble = RumbleState::default();
        rumble.set(true, false, 0);
        assert_eq!(rumble.waveforms(), (RUMBLE_ACTIVE, RUMBLE_NEUTRAL));
        rumble.set(false, true, 0);
        assert_eq!(rumble.waveforms(), (RUMBLE_NEUTRAL, RUMBLE_ACTIVE));
    }

    #[test]
    fn test_zero_duration_never_expires() {
        let mut rumble = RumbleState::default();
        rumble.set(true, true, 0);
        assert!(!rumble.expired(Instant::now() + Duration::from_secs(60)));
    }

    #[test]
    fn test_neutral_set_clears_expiry() {
        let mut rumble = RumbleState::default();
        rumble.set(true, false, 5);
        rumble.set(false, false, 100);
        assert!(!rumble.expired(Instant::now() + Duration::from_secs(60)));
    }

    #[test]
    fn test_expiry_reached() {
        let mut rumble = RumbleState::default();
        rumble.set(true, false, 50);
        assert!(!rumble.expired(Instant::now()));
        assert!(rumble.expired(Instant::now() + Duration::from_millis(60)));
    }
}
