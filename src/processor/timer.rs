/// Countdown that expires every `interval` cycles
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Timer {
    interval: u32,
    remaining: u32,
}

impl Timer {
    pub fn new(interval: u32) -> Self {
        Self {
            interval,
            remaining: interval,
        }
    }

    pub fn remaining(&self) -> u32 {
        self.remaining
    }

    /// Counts one cycle down. Returns true while the timer sits at zero.
    pub fn tick(&mut self) -> bool {
        self.remaining = self.remaining.saturating_sub(1);
        self.expired()
    }

    pub fn expired(&self) -> bool {
        self.remaining == 0
    }

    pub fn reload(&mut self) {
        self.remaining = self.interval;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_expires_after_interval() {
        let mut timer = Timer::new(3);

        assert!(!timer.tick());
        assert!(!timer.tick());
        assert!(timer.tick());
        assert_eq!(timer.remaining(), 0);

        timer.reload();
        assert_eq!(timer.remaining(), 3);
    }

    #[test]
    fn test_interval_of_one_expires_every_cycle() {
        let mut timer = Timer::new(1);

        for _ in 0..4 {
            assert!(timer.tick());
            timer.reload();
        }
    }
}
