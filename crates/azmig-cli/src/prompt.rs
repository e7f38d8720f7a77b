//! Interactive confirmation

use azmig_core::{Confirmation, ConfirmationRequest};
use std::io::{BufRead, Write};

/// Asks on stderr, reads the answer from stdin
#[derive(Debug, Default, Clone, Copy)]
pub struct StdinConfirmation;

impl Confirmation for StdinConfirmation {
    fn confirm(&self, request: &ConfirmationRequest) -> bool {
        let mut stderr = std::io::stderr().lock();
        if write!(stderr, "{request}Proceed? [y/N] ").and_then(|()| stderr.flush()).is_err() {
            return false;
        }

        let mut answer = String::new();
        match std::io::stdin().lock().read_line(&mut answer) {
            Ok(_) => is_yes(&answer),
            Err(e) => {
                tracing::warn!(error = %e, "Could not read confirmation");
                false
            }
        }
    }
}

fn is_yes(answer: &str) -> bool {
    matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes")
}
