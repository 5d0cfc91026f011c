// Path: crates/telemetry/src/time.rs
use crate::sinks::ElectionMetricsSink;
use std::time::Instant;

pub struct Timer<'a> {
    sink: &'a dyn ElectionMetricsSink,
    start: Instant,
}

impl<'a> Timer<'a> {
    pub fn new(sink: &'a dyn ElectionMetricsSink) -> Self {
        Self {
            sink,
            start: Instant::now(),
        }
    }
}

impl Drop for Timer<'_> {
    fn drop(&mut self) {
        self.sink
            .observe_tick_duration(self.start.elapsed().as_secs_f64());
    }
}