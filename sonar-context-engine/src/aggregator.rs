//! Builds the response envelope.

use crate::model::{EnrichedIssue, PrReference, ResolutionMethod, ResultEnvelope};

/// Pure and order-preserving: `issues` must already be in listing order.
pub fn aggregate(pr: &PrReference, issues: Vec<EnrichedIssue>) -> ResultEnvelope {
    ResultEnvelope {
        project: pr.project_key.clone(),
        pr: pr.identifier.clone(),
        pr_resolution: match pr.resolution_method {
            ResolutionMethod::Explicit => None,
            other => Some(other),
        },
        issues,
    }
}
