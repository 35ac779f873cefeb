use std::time::{Duration, Instant};

use dmg_emu_core::gameboy::{FRAME_RATE, Pacer};

/// Sleeps so frames come out no faster than the DMG refresh rate.
pub struct RealTimePacer {
    frame_time: Duration,
    next_frame: Option<Instant>,
}

impl RealTimePacer {
    pub fn new() -> Self {
        Self {
            frame_time: Duration::from_nanos((1e9_f64 / FRAME_RATE) as u64),
            next_frame: None,
        }
    }

    pub fn frame_time(&self) -> Duration {
        self.frame_time
    }
}

impl Default for RealTimePacer {
    fn default() -> Self {
        Self::new()
    }
}

impl Pacer for RealTimePacer {
    fn frame_done(&mut self) {
        let now = Instant::now();
        let target = *self.next_frame.get_or_insert(now + self.frame_time);
        if now < target {
            std::thread::sleep(target - now);
            self.next_frame = Some(target + self.frame_time);
        } else {
            // behind schedule, restart the cadence from now
            self.next_frame = Some(now + self.frame_time);
        }
    }
}
