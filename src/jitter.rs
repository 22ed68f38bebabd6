//! Random delay before issuance.
//!
//! Unattended renewals (e.g. from cron) tend to fire at the same wall-clock time across many
//! hosts. A short random sleep spreads their load on the CA. Interactive runs skip it.

use std::{io::IsTerminal as _, time::Duration};

use rand::Rng;

/// Upper bound (exclusive) of the random delay.
pub const MAX_JITTER: Duration = Duration::from_secs(8 * 60);

/// Whether to sleep for a random duration before issuance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Jitter {
    enabled: bool,
}

impl Jitter {
    pub fn new(enabled: bool) -> Self {
        Jitter { enabled }
    }

    /// Enables jitter unless `disabled` or standard output is a terminal.
    pub fn detect(disabled: bool) -> Self {
        Jitter::for_terminal(disabled, std::io::stdout().is_terminal())
    }

    pub(crate) fn for_terminal(disabled: bool, is_terminal: bool) -> Self {
        Jitter::new(!disabled && !is_terminal)
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Draws a delay in `[0, MAX_JITTER)`, or zero when disabled.
    pub fn delay(&self) -> Duration {
        self.draw(&mut rand::thread_rng())
    }

    pub(crate) fn draw<R: Rng + ?Sized>(&self, rng: &mut R) -> Duration {
        if !self.enabled {
            return Duration::ZERO;
        }

        let max = u64::try_from(MAX_JITTER.as_millis()).unwrap_or(u64::MAX);
        Duration::from_millis(rng.gen_range(0..max))
    }
}

impl Default for Jitter {
    fn default() -> Self {
        Jitter::detect(false)
    }
}

#[cfg(test)]
mod tests {
    use rand::{rngs::StdRng, SeedableRng as _};

    use super::*;

    #[test]
    fn test_disabled() {
        let jitter = Jitter::new(false);
        assert!(!jitter.is_enabled());
        assert_eq!(jitter.delay(), Duration::ZERO);
    }

    #[test]
    fn test_explicitly_disabled_never_sleeps() {
        assert!(!Jitter::detect(true).is_enabled());
        assert!(!Jitter::for_terminal(true, false).is_enabled());
    }

    #[test]
    fn test_terminal_never_sleeps() {
        let jitter = Jitter::for_terminal(false, true);
        assert!(!jitter.is_enabled());
        assert_eq!(jitter.delay(), Duration::ZERO);

        assert!(Jitter::for_terminal(false, false).is_enabled());
    }

    #[test]
    fn test_bounds() {
        let jitter = Jitter::new(true);
        let mut rng = StdRng::seed_from_u64(8);

        for _ in 0..1_000 {
            let delay = jitter.draw(&mut rng);
            assert!(delay < MAX_JITTER);
        }
    }
}
