use std::time::{Duration, Instant};

#[derive(Clone, Copy, Debug)]
pub struct Color {
    r: u8,
    g: u8,
    b: u8,
}

impl Color {
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    pub fn as_wgpu(&self) -> wgpu::Color {
        wgpu::Color {
            r: self.r as f64 / 255.0,
            g: self.g as f64 / 255.0,
            b: self.b as f64 / 255.0,
            a: 1.0,
        }
    }
}

/// Fixed-period tick driver. The redraw loop asks it whether a simulation
/// step is due; frames in between re-render the current state.
pub struct TickTimer {
    interval: Duration,
    last: Instant,
}

impl TickTimer {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            last: Instant::now(),
        }
    }

    pub fn tick_due(&mut self) -> bool {
        if self.last.elapsed() >= self.interval {
            self.last = Instant::now();
            true
        } else {
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_interval_is_always_due() {
        let mut timer = TickTimer::new(Duration::ZERO);
        assert!(timer.tick_due());
        assert!(timer.tick_due());
    }

    #[test]
    fn long_interval_is_not_due_immediately() {
        let mut timer = TickTimer::new(Duration::from_secs(3600));
        assert!(!timer.tick_due());
    }

    #[test]
    fn color_converts_to_unit_range() {
        let c = Color::rgb(255, 0, 51).as_wgpu();
        assert_eq!(c.r, 1.0);
        assert_eq!(c.g, 0.0);
        assert!((c.b - 0.2).abs() < 0.005);
        assert_eq!(c.a, 1.0);
    }
}
