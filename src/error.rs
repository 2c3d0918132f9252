/*
 * Configuration errors.
 *
 * Once running, the controller never fails: every anomaly is a state machine
 * guard that degrades to "stop" or "hold". The only thing that can be refused
 * is a configuration that would break those guards.
 */

use core::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ConfigError {
    /// The far threshold must sit strictly below the near threshold.
    NoHysteresisBand { far: u16, near: u16 },
    /// Ranging would never trigger.
    ZeroTriggerCadence,
    /// Braking would cut the motor on the very tick it starts.
    ZeroBrakeCutoff,
    /// Compliance would hand back control without any hold.
    ZeroSuppression,
    /// An echo timeout must be non-zero and shorter than the trigger cadence.
    EchoTimeoutOutOfRange { timeout: u16, cadence: u16 },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::NoHysteresisBand { far, near } => write!(
                f,
                "far threshold {far} must be below near threshold {near}"
            ),
            ConfigError::ZeroTriggerCadence => write!(f, "trigger cadence is zero"),
            ConfigError::ZeroBrakeCutoff => write!(f, "brake cutoff is zero"),
            ConfigError::ZeroSuppression => write!(f, "suppression hold is zero"),
            ConfigError::EchoTimeoutOutOfRange { timeout, cadence } => write!(
                f,
                "echo timeout {timeout} must be in 1..{cadence} control ticks"
            ),
        }
    }
}
