use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

const FIRST_STAR_DATE: u32 = 2300;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TurnClock {
    turn: u32,
}

impl TurnClock {
    pub fn new() -> Self {
        Self { turn: 0 }
    }

    pub fn starting_at(turn: u32) -> Self {
        Self { turn }
    }

    pub fn turn(&self) -> u32 {
        self.turn
    }

    pub fn advance(&mut self) -> u32 {
        self.turn = self.turn.saturating_add(1);
        self.turn
    }

    pub fn star_date(&self) -> StarDate {
        StarDate::from_turn(self.turn)
    }
}

impl Default for TurnClock {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StarDate {
    pub year: u32,
}

impl StarDate {
    pub fn from_turn(turn: u32) -> Self {
        Self {
            year: FIRST_STAR_DATE + turn,
        }
    }
}

/// Due turn of a scheduled task. Ordered in reverse so that `BinaryHeap`
/// pops the earliest turn first.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScheduledTurn {
    pub turn: u32,
}

impl ScheduledTurn {
    pub fn new(turn: u32) -> Self {
        Self { turn }
    }
}

impl Ord for ScheduledTurn {
    fn cmp(&self, other: &Self) -> Ordering {
        other.turn.cmp(&self.turn)
    }
}

impl PartialOrd for ScheduledTurn {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn star_date_tracks_turns() {
        let mut clock = TurnClock::new();
        assert_eq!(clock.star_date().year, 2300);
        clock.advance();
        clock.advance();
        assert_eq!(clock.turn(), 2);
        assert_eq!(clock.star_date().year, 2302);
    }

    #[test]
    fn earlier_turn_orders_higher() {
        assert!(ScheduledTurn::new(3) > ScheduledTurn::new(7));
    }
}
