use std::time::Instant;

/// Time source for the frame step.
///
/// Real-time clocks read wall time since creation; simulated clocks only move
/// when [`FrameClock::advance`] is called, which keeps offline rendering and
/// tests reproducible.
#[derive(Debug, Clone)]
pub struct FrameClock {
    origin: Option<Instant>,
    simulated_seconds: f32,
}

impl FrameClock {
    pub fn realtime() -> Self {
        Self {
            origin: Some(Instant::now()),
            simulated_seconds: 0.0,
        }
    }

    pub fn simulated() -> Self {
        Self {
            origin: None,
            simulated_seconds: 0.0,
        }
    }

    /// Seconds since the clock's epoch.
    pub fn seconds(&self) -> f32 {
        match self.origin {
            Some(origin) => origin.elapsed().as_secs_f32(),
            None => self.simulated_seconds,
        }
    }

    /// Moves a simulated clock forward. Real-time clocks ignore this.
    pub fn advance(&mut self, delta: f32) {
        if self.origin.is_none() {
            self.simulated_seconds = (self.simulated_seconds + delta).max(0.0);
        }
    }

    pub fn reset(&mut self) {
        match self.origin {
            Some(_) => self.origin = Some(Instant::now()),
            None => self.simulated_seconds = 0.0,
        }
    }
}

/// Token for a scheduled frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FrameRequest(u64);

/// Holds at most one pending frame, like a display refresh callback that the
/// frame step re-registers at the end of every run.
#[derive(Debug, Default)]
pub struct AnimationLoop {
    next_id: u64,
    pending: Option<FrameRequest>,
}

impl AnimationLoop {
    pub fn new() -> Self {
        Self::default()
    }

    /// Schedules the next frame, replacing any pending request.
    pub fn request(&mut self) -> FrameRequest {
        self.next_id += 1;
        let request = FrameRequest(self.next_id);
        self.pending = Some(request);
        request
    }

    /// Cancels `request` if it is still pending. Safe to call repeatedly.
    pub fn cancel(&mut self, request: FrameRequest) -> bool {
        if self.pending == Some(request) {
            self.pending = None;
            true
        } else {
            false
        }
    }

    /// Cancels whatever is pending.
    pub fn cancel_all(&mut self) -> bool {
        self.pending.take().is_some()
    }

    /// Consumes the pending request when the display is ready for a frame.
    pub fn take_due(&mut self) -> Option<FrameRequest> {
        self.pending.take()
    }

    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn simulated_clock_only_moves_when_advanced() {
        let mut clock = FrameClock::simulated();
        assert_eq!(clock.seconds(), 0.0);
        clock.advance(0.5);
        clock.advance(-2.0);
        assert_eq!(clock.seconds(), 0.0);
        clock.advance(1.25);
        assert_eq!(clock.seconds(), 1.25);
        clock.reset();
        assert_eq!(clock.seconds(), 0.0);
    }

    #[test]
    fn realtime_clock_is_monotonic() {
        let clock = FrameClock::realtime();
        let first = clock.seconds();
        assert!(clock.seconds() >= first);
    }

    #[test]
    fn only_the_latest_request_is_pending() {
        let mut animation = AnimationLoop::new();
        let first = animation.request();
        let second = animation.request();

        assert!(!animation.cancel(first));
        assert!(animation.is_pending());
        assert_eq!(animation.take_due(), Some(second));
        assert_eq!(animation.take_due(), None);
    }

    #[test]
    fn cancel_is_idempotent() {
        let mut animation = AnimationLoop::new();
        let request = animation.request();
        assert!(animation.cancel(request));
        assert!(!animation.cancel(request));
        assert!(!animation.cancel_all());
        assert!(!animation.is_pending());
    }
}
