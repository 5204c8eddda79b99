//! Trial phases and turn structure
//!
//! A goldfish trial is a small state machine: one mulligan decision, then
//! draw / main / end steps repeated every turn until the trial finishes.

use serde::{Deserialize, Serialize};

/// Steps of a simulated trial
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TrialPhase {
    /// Draw opening hands until one is kept (happens once)
    MulliganDecision,
    /// Untap and draw
    DrawStep,
    /// Land drop and casting
    MainPhase,
    /// Screw check, discard to hand size, mana empties
    EndStep,
}

impl TrialPhase {
    /// Next phase within the same turn, `None` at the end of a turn
    pub fn next(&self) -> Option<TrialPhase> {
        match self {
            TrialPhase::MulliganDecision => Some(TrialPhase::DrawStep),
            TrialPhase::DrawStep => Some(TrialPhase::MainPhase),
            TrialPhase::MainPhase => Some(TrialPhase::EndStep),
            TrialPhase::EndStep => None,
        }
    }

    /// Can a land be played in this phase?
    pub fn can_play_lands(&self) -> bool {
        matches!(self, TrialPhase::MainPhase)
    }
}

/// Current position in the trial
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TurnStructure {
    /// Current turn number (starts at 1)
    pub turn_number: u32,

    pub current_phase: TrialPhase,
}

impl TurnStructure {
    pub fn new() -> Self {
        TurnStructure {
            turn_number: 1,
            current_phase: TrialPhase::MulliganDecision,
        }
    }

    /// Advance to the next phase, rolling over to the next turn's draw step
    pub fn advance(&mut self) {
        match self.current_phase.next() {
            Some(phase) => self.current_phase = phase,
            None => {
                self.turn_number += 1;
                self.current_phase = TrialPhase::DrawStep;
            }
        }
    }
}

impl Default for TurnStructure {
    fn default() -> Self {
        Self::new()
    }
}
