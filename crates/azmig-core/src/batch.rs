//! Batch input parsing
//!
//! One resource identifier per line. Empty lines and lines starting with `#`
//! are ignored. Lines that do not parse, or repeat an earlier identifier, are
//! reported and left out of the batch.

use azmig_resource::ResourceIdentifier;
use serde::{Deserialize, Serialize};

/// Stage at which an input line was rejected
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RejectionStage {
    /// Not a resource identifier
    Parse,
    /// Provider read failed during classification
    Classification,
    /// Identifier already listed on an earlier line
    Duplicate,
}

/// Input line left out of the plan
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RejectedInput {
    /// 1-based line number
    pub line: usize,
    /// Line content, trimmed
    pub input: String,
    /// Where it was rejected
    pub stage: RejectionStage,
    /// Why
    pub reason: String,
}

/// Parsed batch
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchInput {
    /// Accepted identifiers with their 1-based line numbers, in input order
    pub resources: Vec<(usize, ResourceIdentifier)>,
    /// Rejected lines
    pub rejected: Vec<RejectedInput>,
}

impl BatchInput {
    /// Parse newline-delimited input
    #[must_use]
    pub fn parse(input: &str) -> Self {
        let mut batch = Self::default();

        for (i, raw) in input.lines().enumerate() {
            let line = i + 1;
            let text = raw.trim();
            if text.is_empty() || text.starts_with('#') {
                continue;
            }

            match text.parse::<ResourceIdentifier>() {
                Ok(id) => {
                    if let Some(first) = batch.first_line_of(&id) {
                        let reason = format!("duplicate of line {first}");
                        batch.reject(line, text, RejectionStage::Duplicate, reason);
                    } else {
                        batch.resources.push((line, id));
                    }
                }
                Err(e) => batch.reject(line, text, RejectionStage::Parse, e.to_string()),
            }
        }

        tracing::debug!(
            accepted = batch.resources.len(),
            rejected = batch.rejected.len(),
            "Batch input parsed"
        );
        batch
    }

    /// Single-resource batch
    #[must_use]
    pub fn single(id: ResourceIdentifier) -> Self {
        Self {
            resources: vec![(1, id)],
            rejected: Vec::new(),
        }
    }

    fn first_line_of(&self, id: &ResourceIdentifier) -> Option<usize> {
        self.resources
            .iter()
            .find_map(|(line, seen)| (seen == id).then_some(*line))
    }

    fn reject(&mut self, line: usize, input: &str, stage: RejectionStage, reason: String) {
        tracing::warn!(line, input = %input, reason = %reason, "Input line rejected");
        self.rejected.push(RejectedInput {
            line,
            input: input.to_string(),
            stage,
            reason,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const VM: &str = "/subscriptions/s/resourceGroups/rg/providers/Microsoft.Compute/virtualMachines/vm1";
    const LB: &str = "/subscriptions/s/resourceGroups/rg/providers/Microsoft.Network/loadBalancers/lb1";

    #[test]
    fn skips_comments_and_blank_lines() {
        let input = format!("# batch\n\n{VM}\n   \n  {LB}  \n");
        let batch = BatchInput::parse(&input);
        assert_eq!(batch.resources.len(), 2);
        assert_eq!(batch.resources[0].0, 3);
        assert_eq!(batch.resources[1].0, 5);
        assert!(batch.rejected.is_empty());
    }

    #[test]
    fn malformed_lines_are_reported_not_fatal() {
        let input = format!("{VM}\n/subscriptions/s/resourceGroups/rg\n{LB}\n");
        let batch = BatchInput::parse(&input);
        assert_eq!(batch.resources.len(), 2);
        assert_eq!(batch.rejected.len(), 1);
        let rejected = &batch.rejected[0];
        assert_eq!(rejected.line, 2);
        assert_eq!(rejected.stage, RejectionStage::Parse);
        assert_eq!(rejected.input, "/subscriptions/s/resourceGroups/rg");
    }

    #[test]
    fn duplicates_keep_first_occurrence() {
        let lower = VM.replace("resourceGroups", "resourcegroups");
        let input = format!("{VM}\n{lower}\n");
        let batch = BatchInput::parse(&input);
        assert_eq!(batch.resources.len(), 1);
        assert_eq!(batch.rejected[0].stage, RejectionStage::Duplicate);
        assert_eq!(batch.rejected[0].reason, "duplicate of line 1");
    }

    #[test]
    fn single() {
        let batch = BatchInput::single(VM.parse().unwrap());
        assert_eq!(batch.resources.len(), 1);
    }
}
