//! Pre-game readiness evaluation.
//!
//! A game's pre-game data is finalized exactly when neither side is missing
//! a prior state. This is a total function over loaded prior states; a
//! malformed input (a side without a flag) is unrepresentable because
//! [`SideFlags`] carries both sides by construction.

use crate::models::{GameId, PriorStates};
use std::collections::HashMap;

/// True when both sides' prior states are present.
pub fn pre_game_ready(states: &PriorStates) -> bool {
    !states.missing.home && !states.missing.away
}

/// Evaluate readiness for every loaded game and produce the flag batch for
/// the transaction writer. Sorted by game id so batches are deterministic.
pub fn evaluate_readiness(prior_states: &HashMap<GameId, PriorStates>) -> Vec<(bool, GameId)> {
    let mut updates: Vec<(bool, GameId)> = prior_states
        .iter()
        .map(|(game_id, states)| (pre_game_ready(states), game_id.clone()))
        .collect();
    updates.sort_by(|a, b| a.1.cmp(&b.1));
    updates
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::SideFlags;

    fn states(missing_home: bool, missing_away: bool) -> PriorStates {
        PriorStates {
            missing: SideFlags {
                home: missing_home,
                away: missing_away,
            },
            ..Default::default()
        }
    }

    #[test]
    fn test_readiness_truth_table() {
        assert!(pre_game_ready(&states(false, false)));
        assert!(!pre_game_ready(&states(true, false)));
        assert!(!pre_game_ready(&states(false, true)));
        assert!(!pre_game_ready(&states(true, true)));
    }

    #[test]
    fn test_evaluate_readiness_produces_sorted_batch() {
        let mut prior_states = HashMap::new();
        prior_states.insert("g2".to_string(), states(true, false));
        prior_states.insert("g1".to_string(), states(false, false));
        prior_states.insert("g3".to_string(), states(false, false));

        let updates = evaluate_readiness(&prior_states);
        assert_eq!(
            updates,
            vec![
                (true, "g1".to_string()),
                (false, "g2".to_string()),
                (true, "g3".to_string()),
            ]
        );
    }

    #[test]
    fn test_evaluate_readiness_empty_input() {
        assert!(evaluate_readiness(&HashMap::new()).is_empty());
    }
}
