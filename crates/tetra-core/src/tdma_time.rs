use core::fmt;

/// TDMA timebase counter recovered from the downlink.
///
/// Initialized from the first decoded synchronization burst and advanced
/// once per received downlink burst. Each component rolls over to 1 and
/// carries into the next.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct TdmaTime {
    /// Timeslot, from 1 to 4
    pub t: u8,
    /// Frame number, from 1 to 18
    pub f: u8,
    /// Multiframe number, from 1 to 60
    pub m: u8,
}

/// Number of timeslots in a full multiframe cycle (4 * 18 * 60).
pub const SLOTS_PER_CYCLE: u32 = 4 * 18 * 60;

impl Default for TdmaTime {
    fn default() -> TdmaTime {
        TdmaTime { t: 1, f: 1, m: 1 }
    }
}

impl TdmaTime {
    pub fn new(t: u8, f: u8, m: u8) -> Self {
        TdmaTime { t, f, m }
    }

    pub fn is_valid(self) -> bool {
        (1..=4).contains(&self.t) && (1..=18).contains(&self.f) && (1..=60).contains(&self.m)
    }

    /// Scalar slot count since the start of the multiframe cycle.
    pub fn count(self) -> u32 {
        (self.t as u32 - 1) + 4 * (self.f as u32 - 1) + 4 * 18 * (self.m as u32 - 1)
    }

    /// Advance by one timeslot, carrying into frame and multiframe.
    pub fn increment(&mut self) {
        self.t += 1;
        if self.t > 4 {
            self.t = 1;
            self.f += 1;
        }
        if self.f > 18 {
            self.f = 1;
            self.m += 1;
        }
        if self.m > 60 {
            self.m = 1;
        }
    }
}

impl fmt::Display for TdmaTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}/{:02}/{}", self.m, self.f, self.t)
    }
}

impl fmt::Debug for TdmaTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}/{:02}/{}", self.m, self.f, self.t)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn increment_carries_into_frame_and_multiframe() {
        let mut ts = TdmaTime::new(4, 18, 60);
        ts.increment();
        assert_eq!(ts, TdmaTime::new(1, 1, 1));

        let mut ts = TdmaTime::new(4, 1, 1);
        ts.increment();
        assert_eq!(ts, TdmaTime::new(1, 2, 1));
    }

    #[test]
    fn count_is_monotonic_over_increments() {
        let mut ts = TdmaTime::default();
        let initial = ts.count();
        for n in 1..=1000u32 {
            ts.increment();
            assert!(ts.is_valid());
            assert_eq!(ts.count(), (initial + n) % SLOTS_PER_CYCLE);
        }
    }
}
