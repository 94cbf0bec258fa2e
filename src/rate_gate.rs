//! Wires the CLI's `--requests-per-second` / `--requests-per-minute` flags
//! onto `loadbench-resilience`'s rate limiters (C7). When neither is set the
//! gate is a no-op, per §4.7.

use loadbench_resilience::{DualRateLimiter, RateLimiter, ResilienceError};

#[derive(Clone)]
pub enum RateGate {
    None,
    Single(RateLimiter),
    Dual(DualRateLimiter),
}

impl RateGate {
    pub fn from_ceilings(
        requests_per_second: Option<u32>,
        requests_per_minute: Option<u32>,
    ) -> Result<Self, ResilienceError> {
        match (requests_per_second, requests_per_minute) {
            (None, None) => Ok(RateGate::None),
            (Some(rps), None) => Ok(RateGate::Single(RateLimiter::per_second(rps)?)),
            (None, Some(rpm)) => Ok(RateGate::Single(RateLimiter::per_minute(rpm)?)),
            (Some(rps), Some(rpm)) => Ok(RateGate::Dual(DualRateLimiter::new(rps, rpm)?)),
        }
    }

    pub async fn acquire(&self) {
        match self {
            RateGate::None => {}
            RateGate::Single(limiter) => limiter.acquire().await,
            RateGate::Dual(limiter) => limiter.acquire().await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_no_ceilings_is_a_no_op() {
        let gate = RateGate::from_ceilings(None, None).unwrap();
        assert!(matches!(gate, RateGate::None));
        gate.acquire().await; // must not hang
    }

    #[test]
    fn test_single_ceiling_picks_the_configured_window() {
        let gate = RateGate::from_ceilings(Some(10), None).unwrap();
        assert!(matches!(gate, RateGate::Single(_)));
    }

    #[test]
    fn test_both_ceilings_uses_the_dual_limiter() {
        let gate = RateGate::from_ceilings(Some(10), Some(100)).unwrap();
        assert!(matches!(gate, RateGate::Dual(_)));
    }
}
