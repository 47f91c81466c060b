/// Frame timing and loop bookkeeping shared by the hosts.
use crate::constants::MAX_FRAME_DT;

/// Turns successive wall-clock timestamps (seconds) into frame deltas.
#[derive(Debug, Clone, Copy, Default)]
pub struct FrameClock {
    last: Option<f64>,
}

impl FrameClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seconds since the previous tick. The first tick after construction or
    /// [`FrameClock::reset`] returns 0; backwards jumps return 0 and long
    /// stalls are clamped to [`MAX_FRAME_DT`].
    pub fn tick(&mut self, now: f64) -> f64 {
        let dt = match self.last {
            Some(last) => (now - last).clamp(0.0, MAX_FRAME_DT),
            None => 0.0,
        };
        self.last = Some(now);
        dt
    }

    pub fn reset(&mut self) {
        self.last = None;
    }
}

/// Tracks whether a host loop is running and which tick is scheduled.
///
/// `H` is the host's handle for a scheduled callback (an animation-frame id
/// in the browser, for example).
#[derive(Debug)]
pub struct AnimationLoop<H> {
    running: bool,
    pending: Option<H>,
    clock: FrameClock,
}

impl<H> AnimationLoop<H> {
    pub fn new() -> Self {
        Self {
            running: false,
            pending: None,
            clock: FrameClock::new(),
        }
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    /// Returns false if the loop was already running.
    pub fn start(&mut self) -> bool {
        if self.running {
            return false;
        }
        self.running = true;
        self.clock.reset();
        true
    }

    /// Record the handle of the tick just scheduled. Ignored once stopped.
    pub fn scheduled(&mut self, handle: H) -> bool {
        if !self.running {
            return false;
        }
        self.pending = Some(handle);
        true
    }

    /// Called at the top of a tick: clears the pending handle and returns the
    /// frame delta, or `None` if the loop was stopped and the tick is stale.
    pub fn begin_frame(&mut self, now: f64) -> Option<f64> {
        self.pending = None;
        if !self.running {
            return None;
        }
        Some(self.clock.tick(now))
    }

    /// Stop the loop, cancelling the pending tick if there is one. Safe to
    /// call any number of times.
    pub fn stop(&mut self, cancel: impl FnOnce(H)) {
        self.running = false;
        if let Some(handle) = self.pending.take() {
            cancel(handle);
        }
    }
}

impl<H> Default for AnimationLoop<H> {
    fn default() -> Self {
        Self::new()
    }
}
