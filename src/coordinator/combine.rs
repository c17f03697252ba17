//! Response combination.
//!
//! Merges zero, one, or many agent responses into one. Combining a single
//! response is the identity; combining none produces a fixed "no
//! response" result that asks for human review.

use std::collections::HashSet;

use crate::agents::AgentResponse;

/// Message used when no agent produced a response.
pub const NO_RESPONSE_MESSAGE: &str =
    "No agent was able to produce a response for this task.";

/// Follow-up suggestion attached to the "no response" result.
pub const NO_RESPONSE_NEXT_STEP: &str = "Review the task and try again";

/// Combine agent responses in invocation order.
pub fn combine_responses(mut responses: Vec<AgentResponse>) -> AgentResponse {
    match responses.len() {
        0 => {
            let mut response = AgentResponse::new(NO_RESPONSE_MESSAGE, 0.0);
            response.needs_human_intervention = true;
            response.next_steps = vec![NO_RESPONSE_NEXT_STEP.to_string()];
            response
        }
        1 => responses.remove(0),
        _ => {
            let message = responses
                .iter()
                .enumerate()
                .map(|(i, r)| format!("Agent {}: {}", i + 1, r.message))
                .collect::<Vec<_>>()
                .join("\n\n");

            // Actions are events: order preserved, duplicates meaningful.
            let actions = responses
                .iter()
                .flat_map(|r| r.actions.iter().cloned())
                .collect();

            let tools_used =
                dedup_first_occurrence(responses.iter().flat_map(|r| r.tools_used.iter()));
            let next_steps =
                dedup_first_occurrence(responses.iter().flat_map(|r| r.next_steps.iter()));

            let confidence =
                responses.iter().map(|r| r.confidence).sum::<f64>() / responses.len() as f64;
            let needs_human_intervention =
                responses.iter().any(|r| r.needs_human_intervention);

            AgentResponse {
                message,
                actions,
                tools_used,
                next_steps,
                confidence,
                needs_human_intervention,
                data: None,
                visualizations: None,
            }
        }
    }
}

/// De-duplicated union in order of first occurrence.
fn dedup_first_occurrence<'a>(items: impl Iterator<Item = &'a String>) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut out = Vec::new();
    for item in items {
        if seen.insert(item.clone()) {
            out.push(item.clone());
        }
    }
    out
}
