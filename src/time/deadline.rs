use std::time::{Duration, Instant};

/// An absolute point in time a wait is allowed to reach.
///
/// A deadline is either a concrete [`Instant`] or *unreachable*, meaning
/// the wait is unbounded. The default deadline is unreachable, so a
/// plain `Deadline::default()` turns any timed operation into an
/// untimed one.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
pub struct Deadline {
    when: Option<Instant>,
}

impl Deadline {
    /// A deadline that is never reached.
    pub const fn unreachable() -> Self {
        Self { when: None }
    }

    /// A deadline at the given instant.
    pub const fn at(when: Instant) -> Self {
        Self { when: Some(when) }
    }

    /// A deadline `duration` from now.
    pub fn after(duration: Duration) -> Self {
        Self::at(Instant::now() + duration)
    }

    /// A deadline that has already passed.
    ///
    /// Turns a suspending acquisition into a single attempt that fails
    /// without waiting.
    pub fn passed() -> Self {
        Self::at(Instant::now())
    }

    /// Whether this deadline can ever be reached.
    pub const fn is_reachable(&self) -> bool {
        self.when.is_some()
    }

    /// Whether the deadline lies in the past.
    ///
    /// An unreachable deadline is never reached.
    pub fn is_reached(&self) -> bool {
        match self.when {
            Some(when) => Instant::now() >= when,
            None => false,
        }
    }

    /// Time remaining until the deadline.
    ///
    /// Returns `None` for an unreachable deadline and a zero duration
    /// for one that is already reached.
    pub fn time_left(&self) -> Option<Duration> {
        self.when
            .map(|when| when.saturating_duration_since(Instant::now()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_unreachable() {
        let deadline = Deadline::default();
        assert!(!deadline.is_reachable());
        assert!(!deadline.is_reached());
        assert_eq!(deadline.time_left(), None);
    }

    #[test]
    fn passed_deadline_is_reached_immediately() {
        let deadline = Deadline::passed();
        assert!(deadline.is_reachable());
        assert!(deadline.is_reached());
        assert_eq!(deadline.time_left(), Some(Duration::ZERO));
    }

    #[test]
    fn future_deadline_reports_time_left() {
        let deadline = Deadline::after(Duration::from_secs(60));
        assert!(deadline.is_reachable());
        assert!(!deadline.is_reached());

        let left = deadline.time_left().unwrap();
        assert!(left > Duration::from_secs(59));
        assert!(left <= Duration::from_secs(60));
    }

    #[test]
    fn at_round_trips_the_instant() {
        let when = Instant::now() + Duration::from_secs(5);
        assert_eq!(Deadline::at(when), Deadline::at(when));
        assert_ne!(Deadline::at(when), Deadline::unreachable());
    }
}
