//! Worker selection strategy (spec.md §4.2). Selection is deterministic
//! given the round-robin index and the candidate set's insertion
//! ordering, which is why `registry::WorkerRegistry` keeps worker ids in
//! an ordered `Vec` rather than only a `HashSet`.

use crate::config::SelectionStrategyKind;
use rand::Rng;

/// Picks one worker id out of `candidates` (non-empty, ordered by
/// insertion). Never returns a `Vec`/list: spec.md §9 Open Questions
/// flags the source's `_select_worker` returning a list when the
/// candidate set has size 1 as a bug; this always returns a scalar id.
pub fn select_worker<'a>(
    strategy: SelectionStrategyKind,
    candidates: &'a [String],
    round_robin_index: &mut usize,
) -> Option<&'a str> {
    if candidates.is_empty() {
        return None;
    }
    if candidates.len() == 1 {
        return Some(candidates[0].as_str());
    }
    match strategy {
        SelectionStrategyKind::RoundRobin => {
            let idx = *round_robin_index % candidates.len();
            *round_robin_index = round_robin_index.wrapping_add(1);
            Some(candidates[idx].as_str())
        }
        SelectionStrategyKind::Random => {
            let idx = rand::thread_rng().gen_range(0..candidates.len());
            Some(candidates[idx].as_str())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_candidate_always_returns_scalar_id() {
        let mut idx = 0;
        let candidates = vec!["worker-1".to_string()];
        assert_eq!(
            select_worker(SelectionStrategyKind::RoundRobin, &candidates, &mut idx),
            Some("worker-1")
        );
    }

    #[test]
    fn round_robin_cycles_deterministically() {
        let mut idx = 0;
        let candidates = vec!["w1".to_string(), "w2".to_string(), "w3".to_string()];
        let picks: Vec<&str> = (0..4)
            .map(|_| select_worker(SelectionStrategyKind::RoundRobin, &candidates, &mut idx).unwrap())
            .collect();
        assert_eq!(picks, vec!["w1", "w2", "w3", "w1"]);
    }

    #[test]
    fn empty_candidates_yields_none() {
        let mut idx = 0;
        let candidates: Vec<String> = vec![];
        assert_eq!(select_worker(SelectionStrategyKind::RoundRobin, &candidates, &mut idx), None);
    }
}
