use tokio::sync::Mutex;
use tokio::time::{sleep, Duration, Instant};

/// Process-wide pacing gate for outbound judge requests.
///
/// Leaky-bucket-of-one: a single mutex-guarded "last granted" instant
/// enforces a hard minimum spacing between successive grants across all
/// callers. Bursts are not permitted; fairness is whatever order the lock
/// hands out. The sleep happens while holding the lock so grants are
/// strictly serialized.
#[derive(Debug)]
pub struct RateLimiter {
    min_gap: Duration,
    last_granted: Mutex<Option<Instant>>,
}

impl RateLimiter {
    /// Limiter allowing at most `requests_per_minute` grants per minute,
    /// i.e. one grant every `60 / requests_per_minute` seconds.
    pub fn per_minute(requests_per_minute: u32) -> Self {
        let rpm = requests_per_minute.max(1);
        Self {
            min_gap: Duration::from_secs_f64(60.0 / f64::from(rpm)),
            last_granted: Mutex::new(None),
        }
    }

    /// Wait until the next request may be issued.
    pub async fn acquire(&self) {
        let mut last = self.last_granted.lock().await;
        if let Some(prev) = *last {
            let ready_at = prev + self.min_gap;
            let now = Instant::now();
            if ready_at > now {
                sleep(ready_at - now).await;
            }
        }
        *last = Some(Instant::now());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn enforces_minimum_spacing_between_grants() {
        // 60/min => 1s between grants; N acquires take >= (N-1)s.
        let limiter = RateLimiter::per_minute(60);
        let start = Instant::now();
        for _ in 0..4 {
            limiter.acquire().await;
        }
        assert!(start.elapsed() >= Duration::from_secs(3));
    }

    #[tokio::test(start_paused = true)]
    async fn first_acquire_is_immediate() {
        let limiter = RateLimiter::per_minute(60);
        let start = Instant::now();
        limiter.acquire().await;
        assert!(start.elapsed() < Duration::from_millis(10));
    }

    #[tokio::test(start_paused = true)]
    async fn concurrent_acquirers_are_serialized() {
        use std::sync::Arc;

        let limiter = Arc::new(RateLimiter::per_minute(60));
        let start = Instant::now();
        let mut handles = Vec::new();
        for _ in 0..3 {
            let limiter = Arc::clone(&limiter);
            handles.push(tokio::spawn(async move { limiter.acquire().await }));
        }
        for h in handles {
            h.await.unwrap();
        }
        assert!(start.elapsed() >= Duration::from_secs(2));
    }
}
