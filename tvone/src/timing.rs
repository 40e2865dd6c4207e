//! Inter-command pacing, acknowledgment deadlines, and escalation state.
//!
//! The unit's manual puts a typical operation at ~30 ms and suggests
//! throttling commands to one per 100 ms; receipt of an acknowledgment does
//! not guarantee readiness for the next command. The policy here holds the
//! two session-scoped periods that encode that reality, plus the escalation
//! step retry wrappers use to loosen both after an observed failure.

use std::time::Duration;

/// Default minimum spacing between exchange completions and the next
/// transmission.
pub const DEFAULT_MINIMUM_PERIOD: Duration = Duration::from_millis(100);

/// Default acknowledgment deadline, measured from transmission completion.
pub const DEFAULT_TIMEOUT_PERIOD: Duration = Duration::from_millis(100);

/// Escalation step applied to both periods after a failed retry attempt.
pub const DEFAULT_ESCALATION: Duration = Duration::from_millis(500);

/// Conservative profile imposed for the duration of a bulk upload.
pub const UPLOAD_PROFILE: TimingProfile = TimingProfile {
    minimum_period: Duration::from_millis(250),
    timeout_period: Duration::from_millis(1000),
};

/// Idle span after which the reference stamp is refreshed.
///
/// Hygiene for long-idle sessions; keeps elapsed arithmetic bounded with no
/// protocol-visible effect.
pub const IDLE_RESET_THRESHOLD: Duration = Duration::from_secs(25 * 60);

/// Snapshot of the two mutable periods, for save/restore around retry
/// escalation and upload profiles.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TimingProfile {
    /// Minimum spacing between exchanges.
    pub minimum_period: Duration,
    /// Acknowledgment deadline.
    pub timeout_period: Duration,
}

/// Session-scoped timing state.
#[derive(Debug, Clone)]
pub struct TimingPolicy {
    minimum_period: Duration,
    timeout_period: Duration,
    escalation: Duration,
    last_exchange_ms: Option<u64>,
}

impl Default for TimingPolicy {
    fn default() -> Self {
        Self::new()
    }
}

impl TimingPolicy {
    /// Create a policy with the default periods.
    pub fn new() -> Self {
        Self {
            minimum_period: DEFAULT_MINIMUM_PERIOD,
            timeout_period: DEFAULT_TIMEOUT_PERIOD,
            escalation: DEFAULT_ESCALATION,
            last_exchange_ms: None,
        }
    }

    /// Current minimum spacing between exchanges.
    pub fn minimum_period(&self) -> Duration {
        self.minimum_period
    }

    /// Current acknowledgment deadline.
    pub fn timeout_period(&self) -> Duration {
        self.timeout_period
    }

    /// The escalation step.
    pub fn escalation(&self) -> Duration {
        self.escalation
    }

    /// Set the minimum spacing between exchanges.
    pub fn set_minimum_period(&mut self, period: Duration) {
        self.minimum_period = period;
    }

    /// Set the acknowledgment deadline.
    pub fn set_timeout_period(&mut self, period: Duration) {
        self.timeout_period = period;
    }

    /// Bump both periods by `step` at once.
    pub fn increase(&mut self, step: Duration) {
        self.minimum_period += step;
        self.timeout_period += step;
    }

    /// Restore both periods to their defaults.
    pub fn reset(&mut self) {
        self.minimum_period = DEFAULT_MINIMUM_PERIOD;
        self.timeout_period = DEFAULT_TIMEOUT_PERIOD;
    }

    /// Snapshot the current periods.
    pub fn profile(&self) -> TimingProfile {
        TimingProfile {
            minimum_period: self.minimum_period,
            timeout_period: self.timeout_period,
        }
    }

    /// Apply a previously captured (or fixed) profile.
    pub fn apply(&mut self, profile: TimingProfile) {
        self.minimum_period = profile.minimum_period;
        self.timeout_period = profile.timeout_period;
    }

    /// Record that an exchange just completed.
    pub fn mark_exchange(&mut self, now_ms: u64) {
        self.last_exchange_ms = Some(now_ms);
    }

    /// Milliseconds since the last exchange completed, if any has.
    pub fn idle_ms(&self, now_ms: u64) -> Option<u64> {
        self.last_exchange_ms
            .map(|stamp| now_ms.saturating_sub(stamp))
    }

    /// Whether enough time has passed since the last exchange to transmit.
    #[allow(clippy::cast_possible_truncation)] // periods are far below u64::MAX ms
    pub fn pacing_cleared(&self, now_ms: u64) -> bool {
        match self.idle_ms(now_ms) {
            Some(idle) => idle >= self.minimum_period.as_millis() as u64,
            None => true,
        }
    }

    /// Refresh the reference stamp after a long-idle span.
    ///
    /// Re-stamps so the recorded idle time equals exactly one minimum
    /// period: the pacing gate stays clear and elapsed values stay small.
    #[allow(clippy::cast_possible_truncation)]
    pub fn maintain(&mut self, now_ms: u64) {
        let threshold = IDLE_RESET_THRESHOLD.as_millis() as u64;
        if self.idle_ms(now_ms).is_some_and(|idle| idle > threshold) {
            let period = self.minimum_period.as_millis() as u64;
            self.last_exchange_ms = Some(now_ms.saturating_sub(period));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let policy = TimingPolicy::new();
        assert_eq!(policy.minimum_period(), DEFAULT_MINIMUM_PERIOD);
        assert_eq!(policy.timeout_period(), DEFAULT_TIMEOUT_PERIOD);
        assert_eq!(policy.escalation(), DEFAULT_ESCALATION);
        assert_eq!(policy.idle_ms(1234), None);
    }

    #[test]
    fn test_increase_bumps_both_periods() {
        let mut policy = TimingPolicy::new();
        policy.increase(Duration::from_millis(500));
        assert_eq!(
            policy.minimum_period(),
            DEFAULT_MINIMUM_PERIOD + Duration::from_millis(500)
        );
        assert_eq!(
            policy.timeout_period(),
            DEFAULT_TIMEOUT_PERIOD + Duration::from_millis(500)
        );
    }

    #[test]
    fn test_profile_round_trip() {
        let mut policy = TimingPolicy::new();
        let baseline = policy.profile();

        policy.apply(UPLOAD_PROFILE);
        assert_eq!(policy.profile(), UPLOAD_PROFILE);

        policy.apply(baseline);
        assert_eq!(policy.profile(), baseline);
    }

    #[test]
    fn test_pacing_gate() {
        let mut policy = TimingPolicy::new();
        // No exchange yet: gate is open
        assert!(policy.pacing_cleared(0));

        policy.mark_exchange(1000);
        assert!(!policy.pacing_cleared(1050));
        assert!(policy.pacing_cleared(1100));
    }

    #[test]
    fn test_maintain_restamps_after_long_idle() {
        let mut policy = TimingPolicy::new();
        policy.mark_exchange(0);

        let much_later = 26 * 60 * 1000;
        policy.maintain(much_later);
        assert_eq!(policy.idle_ms(much_later), Some(100));
        assert!(policy.pacing_cleared(much_later));
    }

    #[test]
    fn test_maintain_is_a_no_op_when_active() {
        let mut policy = TimingPolicy::new();
        policy.mark_exchange(5000);
        policy.maintain(6000);
        assert_eq!(policy.idle_ms(6000), Some(1000));
    }
}
