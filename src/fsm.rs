/// Small mode container used by the skate body.
///
/// `S` is the mode type (an enum). The machine remembers the active mode, the
/// mode it replaced, and how long the active mode has been running. It never
/// decides *when* to switch; the owning system does that and reports the
/// switch through [`go`](Self::go).
///
/// # Usage
/// ```
/// use grindline::fsm::StateMachine;
///
/// #[derive(Clone, Copy, PartialEq, Debug)]
/// enum Mode { Rolling, Sliding }
///
/// let mut fsm = StateMachine::new(Mode::Rolling);
/// fsm.tick(0.5);
/// assert!(fsm.go(Mode::Sliding));
/// assert!(fsm.just_entered());
/// assert_eq!(fsm.previous, Mode::Rolling);
/// assert_eq!(fsm.elapsed, 0.0);
/// ```
pub struct StateMachine<S: Clone> {
    pub state: S,
    pub previous: S,
    /// Seconds spent in the current state. Reset to 0.0 on each transition.
    pub elapsed: f32,
    entered_this_frame: bool,
}

impl<S: Clone> StateMachine<S> {
    /// Start in `initial`. `just_entered()` is `false` until the first real
    /// transition: the starting mode is not an event anyone reacts to.
    pub fn new(initial: S) -> Self {
        Self {
            previous: initial.clone(),
            state: initial,
            elapsed: 0.0,
            entered_this_frame: false,
        }
    }

    /// Switch to `next` if it is a different variant (compared by
    /// discriminant). Returns whether a transition happened.
    pub fn go(&mut self, next: S) -> bool {
        if std::mem::discriminant(&self.state) == std::mem::discriminant(&next) {
            return false;
        }
        self.previous = std::mem::replace(&mut self.state, next);
        self.elapsed = 0.0;
        self.entered_this_frame = true;
        true
    }

    /// Advance the time-in-state counter and clear the `just_entered` flag.
    pub fn tick(&mut self, dt: f32) {
        self.elapsed += dt;
        self.entered_this_frame = false;
    }

    /// `true` between a transition and the next [`tick`](Self::tick).
    pub fn just_entered(&self) -> bool {
        self.entered_this_frame
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Clone, Copy, PartialEq, Debug)]
    enum Mode {
        A,
        B,
    }

    #[test]
    fn same_variant_is_not_a_transition() {
        let mut fsm = StateMachine::new(Mode::A);
        fsm.tick(1.0);
        assert!(!fsm.go(Mode::A));
        assert_eq!(fsm.elapsed, 1.0);
        assert!(!fsm.just_entered());
    }

    #[test]
    fn transition_resets_elapsed_until_next_tick() {
        let mut fsm = StateMachine::new(Mode::A);
        fsm.tick(0.25);
        assert!(fsm.go(Mode::B));
        assert!(fsm.just_entered());
        assert_eq!(fsm.previous, Mode::A);
        fsm.tick(0.1);
        assert!(!fsm.just_entered());
    }
}
