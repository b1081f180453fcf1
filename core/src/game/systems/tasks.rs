use crate::game::state::GameState;
use crate::{ScheduledTask, TurnPhase};

pub(crate) fn execute(task: &ScheduledTask, game: &mut GameState) -> Vec<String> {
    match task.phase {
        TurnPhase::RandomEvents => game.process_random_events(),
        TurnPhase::DiplomaticPulse => game.process_diplomatic_pulse(),
        TurnPhase::Research => game.process_research(),
        TurnPhase::Espionage => game.process_espionage(),
        TurnPhase::SecurityReview => game.process_security_review(),
    }
}
