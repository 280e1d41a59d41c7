//! Wall-clock timing for limit checks.

use std::time::Instant;

/// Solve clock: started once per solving process.
#[derive(Debug, Default, Clone, Copy)]
pub struct Clock {
    start: Option<Instant>,
}

impl Clock {
    /// Create an unstarted clock.
    pub fn new() -> Self {
        Clock::default()
    }

    /// Start (or restart) the clock.
    pub fn start(&mut self) {
        self.start = Some(Instant::now());
    }

    /// Elapsed seconds since the start; 0 if never started.
    pub fn elapsed(&self) -> f64 {
        self.start.map_or(0.0, |s| s.elapsed().as_secs_f64())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unstarted_clock_reads_zero() {
        let clock = Clock::new();
        assert_eq!(clock.elapsed(), 0.0);
    }

    #[test]
    fn test_started_clock_advances() {
        let mut clock = Clock::new();
        clock.start();
        std::thread::sleep(std::time::Duration::from_millis(2));
        assert!(clock.elapsed() > 0.0);
    }
}
