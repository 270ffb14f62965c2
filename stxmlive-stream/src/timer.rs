//! Single-shot reconnect timer polled by the owner's event loop.

use std::time::Instant;

/// At most one armed deadline, identified by its token.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReconnectTimer {
    armed: Option<(Instant, u64)>,
}

impl ReconnectTimer {
    /// Arm the timer, replacing any previous deadline.
    pub fn schedule(&mut self, deadline: Instant, token: u64) {
        self.armed = Some((deadline, token));
    }

    /// Disarm the timer if it still carries `token`.
    pub fn cancel(&mut self, token: u64) {
        if self.armed.is_some_and(|(_, armed)| armed == token) {
            self.armed = None;
        }
    }

    /// Token of an expired deadline, disarming the timer.
    pub fn due(&mut self, now: Instant) -> Option<u64> {
        match self.armed {
            Some((deadline, token)) if now >= deadline => {
                self.armed = None;
                Some(token)
            }
            _ => None,
        }
    }

    #[must_use]
    pub fn deadline(&self) -> Option<Instant> {
        self.armed.map(|(deadline, _)| deadline)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_fires_once_after_deadline() {
        let start = Instant::now();
        let mut timer = ReconnectTimer::default();
        timer.schedule(start + Duration::from_secs(2), 4);
        assert_eq!(timer.due(start + Duration::from_secs(1)), None);
        assert_eq!(timer.due(start + Duration::from_secs(2)), Some(4));
        assert_eq!(timer.due(start + Duration::from_secs(3)), None);
    }

    #[test]
    fn test_cancel_only_matching_token() {
        let start = Instant::now();
        let mut timer = ReconnectTimer::default();
        timer.schedule(start, 1);
        timer.cancel(0);
        assert_eq!(timer.deadline(), Some(start));
        timer.cancel(1);
        assert_eq!(timer.deadline(), None);
    }

    #[test]
    fn test_reschedule_replaces_deadline() {
        let start = Instant::now();
        let mut timer = ReconnectTimer::default();
        timer.schedule(start, 1);
        timer.schedule(start + Duration::from_secs(5), 2);
        assert_eq!(timer.due(start), None);
        assert_eq!(timer.due(start + Duration::from_secs(5)), Some(2));
    }
}
