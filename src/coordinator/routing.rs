//! Keyword routing: relevance and best-agent selection.
//!
//! Relevance is substring matching over each agent's keyword table. When
//! the task text matches no table at all, every ACTIVE agent is relevant -
//! a fail-open default, chosen so a task never comes back empty just
//! because it used unfamiliar words. Keyword hits on deactivated agents do
//! NOT fail open: they mean the task had a proper destination that is
//! currently switched off.

use chrono::{DateTime, Duration, Utc};

const SCORE_PER_HIT: i64 = 10;
const RECENCY_BONUS: i64 = 5;

/// How recently an agent must have run to earn the recency bonus.
fn recency_window() -> Duration {
    Duration::hours(1)
}

/// Routing-relevant view of one registry entry.
pub struct RoutingCandidate {
    pub keywords: Vec<String>,
    pub is_active: bool,
    pub last_used: Option<DateTime<Utc>>,
}

/// Number of keyword substring hits in the lower-cased task text.
fn keyword_hits(task_lower: &str, keywords: &[String]) -> usize {
    keywords
        .iter()
        .filter(|k| task_lower.contains(k.as_str()))
        .count()
}

/// Indices of candidates relevant to the task.
///
/// An active candidate with at least one keyword hit is relevant. If no
/// candidate (active or not) has a hit, all active candidates are
/// relevant instead.
pub fn relevant_indices(task: &str, candidates: &[RoutingCandidate]) -> Vec<usize> {
    let task_lower = task.to_lowercase();
    let hits: Vec<usize> = candidates
        .iter()
        .enumerate()
        .filter(|(_, c)| keyword_hits(&task_lower, &c.keywords) > 0)
        .map(|(i, _)| i)
        .collect();

    if hits.is_empty() {
        return candidates
            .iter()
            .enumerate()
            .filter(|(_, c)| c.is_active)
            .map(|(i, _)| i)
            .collect();
    }

    hits.into_iter()
        .filter(|&i| candidates[i].is_active)
        .collect()
}

/// Pick the single best candidate among `relevant` for smart routing.
///
/// Scoring: `+10` per keyword hit, `+5` if the candidate ran within the
/// last hour. Ties and all-zero scores resolve to the earliest relevant
/// index, so selection is deterministic. Returns `None` only when
/// `relevant` is empty.
pub fn select_best(
    task: &str,
    candidates: &[RoutingCandidate],
    relevant: &[usize],
    now: DateTime<Utc>,
) -> Option<usize> {
    if relevant.is_empty() {
        return None;
    }
    if relevant.len() == 1 {
        return Some(relevant[0]);
    }

    let task_lower = task.to_lowercase();
    let mut best = relevant[0];
    let mut best_score = i64::MIN;
    for &i in relevant {
        let candidate = &candidates[i];
        let mut score = keyword_hits(&task_lower, &candidate.keywords) as i64 * SCORE_PER_HIT;
        if let Some(last_used) = candidate.last_used {
            if now - last_used <= recency_window() {
                score += RECENCY_BONUS;
            }
        }
        if score > best_score {
            best_score = score;
            best = i;
        }
    }
    Some(best)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidate(keywords: &[&str], is_active: bool) -> RoutingCandidate {
        RoutingCandidate {
            keywords: keywords.iter().map(|k| k.to_string()).collect(),
            is_active,
            last_used: None,
        }
    }

    #[test]
    fn test_keyword_hit_selects_matching_candidates() {
        let candidates = vec![
            candidate(&["mortgage", "loan"], true),
            candidate(&["project", "email"], true),
            candidate(&["market", "rental"], true),
        ];
        assert_eq!(relevant_indices("mortgage rates today", &candidates), vec![0]);
        assert_eq!(
            relevant_indices("email about the rental market", &candidates),
            vec![1, 2]
        );
    }

    #[test]
    fn test_no_hit_fails_open_to_all_active() {
        let candidates = vec![
            candidate(&["mortgage"], true),
            candidate(&["project"], false),
            candidate(&["market"], true),
        ];
        assert_eq!(relevant_indices("hello there", &candidates), vec![0, 2]);
    }

    #[test]
    fn test_hits_on_deactivated_agents_do_not_fail_open() {
        let candidates = vec![
            candidate(&["mortgage", "qualification"], false),
            candidate(&["project"], true),
        ];
        // The task had a proper destination; it is just switched off.
        assert!(relevant_indices("mortgage qualification", &candidates).is_empty());
    }

    #[test]
    fn test_select_best_scores_by_hits() {
        let candidates = vec![
            candidate(&["mortgage", "qualification"], true),
            candidate(&["client"], true),
        ];
        let relevant = vec![0, 1];
        let best = select_best(
            "mortgage qualification for a client",
            &candidates,
            &relevant,
            Utc::now(),
        );
        assert_eq!(best, Some(0));
    }

    #[test]
    fn test_recency_bonus_breaks_hit_ties() {
        let now = Utc::now();
        let mut warm = candidate(&["market"], true);
        warm.last_used = Some(now - Duration::minutes(10));
        let candidates = vec![candidate(&["rental"], true), warm];
        let relevant = vec![0, 1];
        // One hit each; the recently-used candidate wins.
        assert_eq!(
            select_best("rental market report", &candidates, &relevant, now),
            Some(1)
        );
    }

    #[test]
    fn test_stale_usage_earns_no_bonus_and_first_wins_tie() {
        let now = Utc::now();
        let mut stale = candidate(&["market"], true);
        stale.last_used = Some(now - Duration::hours(3));
        let candidates = vec![candidate(&["rental"], true), stale];
        let relevant = vec![0, 1];
        assert_eq!(
            select_best("rental market report", &candidates, &relevant, now),
            Some(0)
        );
    }

    #[test]
    fn test_zero_scores_fall_back_to_first_relevant() {
        let candidates = vec![candidate(&["alpha"], true), candidate(&["beta"], true)];
        let relevant = vec![0, 1];
        assert_eq!(
            select_best("no keywords here", &candidates, &relevant, Utc::now()),
            Some(0)
        );
    }

    #[test]
    fn test_empty_relevant_set_selects_nothing() {
        let candidates = vec![candidate(&["alpha"], true)];
        assert_eq!(select_best("task", &candidates, &[], Utc::now()), None);
    }
}
