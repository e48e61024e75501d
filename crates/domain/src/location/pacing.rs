use crate::ids::Wid;

/// `process()` calls that make one out-of-combat turn.
pub const OUT_OF_COMBAT_LATCH: u32 = 20;

/// Outcome of advancing the pacing counters once.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pace {
    /// Nothing completed.
    Continue,
    /// An out-of-combat turn completed silently.
    Reset,
    /// An in-turns round completed; carries the new round number.
    Round(u64),
}

/// Turn accounting for one location.
///
/// Out of combat every call to [`advance`](Self::advance) counts towards
/// [`OUT_OF_COMBAT_LATCH`]. In turns the latch is the number of player
/// characters present and each of them acts at most once per round.
#[derive(Debug, Clone, Default)]
pub struct TurnPacing {
    in_turns: bool,
    ticks: u32,
    latch: usize,
    acted: Vec<Wid>,
    round: u64,
}

impl TurnPacing {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn join(&mut self) {
        self.latch += 1;
    }

    pub fn leave(&mut self, wid: Wid) {
        self.latch = self.latch.saturating_sub(1);
        self.acted.retain(|w| *w != wid);
    }

    pub fn latch(&self) -> usize {
        self.latch
    }

    pub fn round(&self) -> u64 {
        self.round
    }

    pub fn in_turns(&self) -> bool {
        self.in_turns
    }

    pub fn start_turns(&mut self) {
        self.in_turns = true;
        self.ticks = 0;
        self.acted.clear();
    }

    pub fn stop_turns(&mut self) {
        self.in_turns = false;
        self.ticks = 0;
        self.acted.clear();
    }

    /// Whether `wid` may resolve a desire now.
    pub fn can_act(&self, wid: Wid) -> bool {
        !self.in_turns || !self.acted.contains(&wid)
    }

    pub fn record_action(&mut self, wid: Wid) {
        if self.in_turns && !self.acted.contains(&wid) {
            self.acted.push(wid);
        }
    }

    pub fn advance(&mut self) -> Pace {
        if self.in_turns {
            if self.latch > 0 && self.acted.len() >= self.latch {
                self.acted.clear();
                self.round += 1;
                return Pace::Round(self.round);
            }
            return Pace::Continue;
        }

        self.ticks += 1;
        if self.ticks >= OUT_OF_COMBAT_LATCH {
            self.ticks = 0;
            return Pace::Reset;
        }
        Pace::Continue
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_out_of_combat_resets_every_twenty_calls() {
        let mut pacing = TurnPacing::new();
        for _ in 0..19 {
            assert_eq!(pacing.advance(), Pace::Continue);
        }
        assert_eq!(pacing.advance(), Pace::Reset);
        assert_eq!(pacing.round(), 0);
        assert_eq!(pacing.advance(), Pace::Continue);
    }

    #[test]
    fn test_round_needs_every_player_to_act() {
        let mut pacing = TurnPacing::new();
        pacing.join();
        pacing.join();
        pacing.start_turns();

        pacing.record_action(Wid::new(1));
        assert!(!pacing.can_act(Wid::new(1)));
        assert!(pacing.can_act(Wid::new(2)));
        assert_eq!(pacing.advance(), Pace::Continue);

        pacing.record_action(Wid::new(2));
        assert_eq!(pacing.advance(), Pace::Round(1));
        assert!(pacing.can_act(Wid::new(1)));
    }

    #[test]
    fn test_leaving_player_lowers_the_latch() {
        let mut pacing = TurnPacing::new();
        pacing.join();
        pacing.join();
        pacing.start_turns();
        pacing.record_action(Wid::new(1));
        pacing.leave(Wid::new(2));

        assert_eq!(pacing.latch(), 1);
        assert_eq!(pacing.advance(), Pace::Round(1));
    }

    #[test]
    fn test_empty_location_never_completes_a_round() {
        let mut pacing = TurnPacing::new();
        pacing.start_turns();
        assert_eq!(pacing.advance(), Pace::Continue);
    }
}
