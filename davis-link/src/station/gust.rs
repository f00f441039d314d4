use std::collections::BTreeMap;

pub const WINDOW_SECS: i64 = 300;

/// Trailing record of instantaneous wind speeds, keyed by capture second.
#[derive(Debug, Default)]
pub struct GustWindow {
    samples: BTreeMap<i64, u8>,
}

impl GustWindow {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a sample and return the gust over the window ending at `second`.
    pub fn record(&mut self, second: i64, wind_speed: u8) -> u8 {
        self.samples.insert(second, wind_speed);
        self.evict(second);
        self.gust().unwrap_or(wind_speed)
    }

    /// Drop samples older than the window ending at `now`.
    pub fn evict(&mut self, now: i64) {
        self.samples = self.samples.split_off(&(now - WINDOW_SECS));
    }

    pub fn gust(&self) -> Option<u8> {
        self.samples.values().copied().max()
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
}
