use std::collections::VecDeque;
use std::time::{Duration, Instant};

const FPS_SAMPLES: usize = 10;

/// Measures frame times and a running frame rate.
#[derive(Debug)]
pub struct FrameClock {
    last: Instant,
    samples: VecDeque<Duration>,
}

impl Default for FrameClock {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameClock {
    pub fn new() -> Self {
        Self {
            last: Instant::now(),
            samples: VecDeque::with_capacity(FPS_SAMPLES),
        }
    }

    /// Seconds since the previous tick.
    pub fn tick(&mut self) -> f32 {
        let now = Instant::now();
        let elapsed = now - self.last;
        self.last = now;
        self.record(elapsed);
        elapsed.as_secs_f32()
    }

    fn record(&mut self, elapsed: Duration) {
        if self.samples.len() == FPS_SAMPLES {
            self.samples.pop_front();
        }
        self.samples.push_back(elapsed);
    }

    /// Average over the last ten frames, 0 before any frame was timed.
    pub fn fps(&self) -> f32 {
        let total: Duration = self.samples.iter().sum();
        if total.is_zero() {
            return 0.0;
        }
        self.samples.len() as f32 / total.as_secs_f32()
    }
}
