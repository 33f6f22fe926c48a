//! Rate limiter for relay frames.
//!
//! Keeps one socket from flooding a room by limiting the number of frames
//! it can send within a sliding window. Frames over the limit are held
//! back, not dropped.

use std::collections::VecDeque;
use std::time::{Duration, Instant};

/// Rate limiter using a sliding window algorithm
#[derive(Debug)]
pub struct RateLimiter {
    /// Timestamps of recent frames
    timestamps: VecDeque<Instant>,
    max_frames: usize,
    window: Duration,
}

impl RateLimiter {
    /// Create a new rate limiter
    ///
    /// # Example
    ///
    /// ```
    /// use pu_relay::api::rate_limiter::RateLimiter;
    /// use std::time::Duration;
    ///
    /// // Allow 10 frames per second
    /// let limiter = RateLimiter::new(10, Duration::from_secs(1));
    /// ```
    pub fn new(max_frames: usize, window: Duration) -> Self {
        Self {
            timestamps: VecDeque::with_capacity(max_frames),
            max_frames,
            window,
        }
    }

    pub fn per_second(max_frames: usize) -> Self {
        Self::new(max_frames, Duration::from_secs(1))
    }

    /// Admits a frame now, or says how long until the window has room.
    pub fn try_admit(&mut self) -> Result<(), Duration> {
        self.try_admit_at(Instant::now())
    }

    /// Waits until the window has room, then admits the frame.
    pub async fn admit(&mut self) {
        while let Err(wait) = self.try_admit() {
            tokio::time::sleep(wait).await;
        }
    }

    fn try_admit_at(&mut self, now: Instant) -> Result<(), Duration> {
        while let Some(ts) = self.timestamps.front() {
            if now.duration_since(*ts) >= self.window {
                self.timestamps.pop_front();
            } else {
                break;
            }
        }

        if self.timestamps.len() >= self.max_frames {
            let oldest_age = self
                .timestamps
                .front()
                .map_or(Duration::ZERO, |ts| now.duration_since(*ts));
            return Err(self.window - oldest_age);
        }

        self.timestamps.push_back(now);
        Ok(())
    }
}
