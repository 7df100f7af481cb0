use std::time::{Duration, Instant};

/// Visible state of one overlay.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OverlayState {
    Hidden,
    Visible { timer_armed: bool },
}

/// Lifecycle of a single overlay kind.
///
/// `Hidden → Visible(no timer) → Visible(armed) → Hidden`. The machine holds
/// at most one widget; time is passed in explicitly so the transitions can
/// be driven deterministically.
#[derive(Debug)]
pub struct OverlayMachine<W> {
    widget: Option<W>,
    deadline: Option<Instant>,
    close_after: Duration,
}

impl<W> OverlayMachine<W> {
    pub fn new(close_after: Duration) -> Self {
        Self {
            widget: None,
            deadline: None,
            close_after,
        }
    }

    pub fn state(&self) -> OverlayState {
        match &self.widget {
            None => OverlayState::Hidden,
            Some(_) => OverlayState::Visible {
                timer_armed: self.deadline.is_some(),
            },
        }
    }

    pub fn is_visible(&self) -> bool {
        self.widget.is_some()
    }

    pub fn widget(&self) -> Option<&W> {
        self.widget.as_ref()
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Installs a new widget and returns the one it replaces.
    ///
    /// Any pending close deadline belongs to the old widget and is dropped.
    pub fn show(&mut self, widget: W) -> Option<W> {
        self.deadline = None;
        self.widget.replace(widget)
    }

    /// Mutates the visible widget in place. Returns `false` while hidden.
    pub fn update(&mut self, f: impl FnOnce(&mut W)) -> bool {
        match self.widget.as_mut() {
            Some(widget) => {
                f(widget);
                true
            }
            None => false,
        }
    }

    /// Arms (or re-arms) the close countdown from `now`.
    ///
    /// The previous deadline, if any, is replaced; it can no longer fire.
    /// Ignored while hidden.
    pub fn arm(&mut self, now: Instant) -> bool {
        if self.widget.is_none() {
            return false;
        }
        self.deadline = Some(now + self.close_after);
        true
    }

    pub fn close(&mut self) -> Option<W> {
        self.deadline = None;
        self.widget.take()
    }

    /// Closes the overlay if its deadline has passed at `now`.
    pub fn expire(&mut self, now: Instant) -> Option<W> {
        match self.deadline {
            Some(deadline) if now >= deadline => self.close(),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CLOSE: Duration = Duration::from_secs(5);

    #[test]
    fn show_then_arm_then_expire() {
        let t0 = Instant::now();
        let mut m = OverlayMachine::new(CLOSE);
        assert_eq!(m.state(), OverlayState::Hidden);

        assert!(m.show("a").is_none());
        assert_eq!(m.state(), OverlayState::Visible { timer_armed: false });

        assert!(m.arm(t0));
        assert_eq!(m.state(), OverlayState::Visible { timer_armed: true });

        assert!(m.expire(t0 + Duration::from_secs(4)).is_none());
        assert_eq!(m.expire(t0 + CLOSE), Some("a"));
        assert_eq!(m.state(), OverlayState::Hidden);
    }

    #[test]
    fn second_show_replaces_first() {
        let mut m = OverlayMachine::new(CLOSE);
        m.show("first");
        assert_eq!(m.show("second"), Some("first"));
        assert_eq!(m.widget(), Some(&"second"));
    }

    #[test]
    fn show_drops_pending_deadline() {
        let t0 = Instant::now();
        let mut m = OverlayMachine::new(CLOSE);
        m.show("first");
        m.arm(t0);
        m.show("second");
        assert_eq!(m.state(), OverlayState::Visible { timer_armed: false });
        assert!(m.expire(t0 + CLOSE * 2).is_none());
    }

    #[test]
    fn rearm_replaces_deadline() {
        let t0 = Instant::now();
        let mut m = OverlayMachine::new(CLOSE);
        m.show("w");
        m.arm(t0);
        m.arm(t0 + Duration::from_secs(3));

        // The first deadline (t0 + 5s) no longer fires
        assert!(m.expire(t0 + CLOSE).is_none());
        assert!(m.is_visible());
        assert_eq!(m.expire(t0 + Duration::from_secs(8)), Some("w"));
        // and nothing fires twice
        assert!(m.expire(t0 + Duration::from_secs(20)).is_none());
    }

    #[test]
    fn update_and_arm_ignored_while_hidden() {
        let mut m: OverlayMachine<u32> = OverlayMachine::new(CLOSE);
        assert!(!m.update(|w| *w += 1));
        assert!(!m.arm(Instant::now()));
        assert_eq!(m.state(), OverlayState::Hidden);
    }
}
