//! Confirmation gate between reconciliation and deletion

use crate::reconcile::OrphanSet;

/// Asks whether the listed orphans may be dropped
///
/// The pipeline never calls this with an empty deletable set.
pub trait ConfirmationGate {
    fn confirm(&mut self, orphans: &OrphanSet) -> bool;
}

/// True only for `yes`, ignoring surrounding whitespace and case
pub fn is_affirmative(input: &str) -> bool {
    input.trim().eq_ignore_ascii_case("yes")
}

/// Approves every request without asking
#[derive(Debug, Clone, Copy, Default)]
pub struct AutoApprove;

impl ConfirmationGate for AutoApprove {
    fn confirm(&mut self, orphans: &OrphanSet) -> bool {
        tracing::info!(orphans = orphans.len(), "confirmation skipped");
        true
    }
}

/// Answers with a fixed reply and remembers what it was shown
#[derive(Debug, Clone, Default)]
pub struct ScriptedConfirmation {
    reply: String,
    asked: Vec<usize>,
}

impl ScriptedConfirmation {
    pub fn new(reply: impl Into<String>) -> Self {
        Self {
            reply: reply.into(),
            asked: Vec::new(),
        }
    }

    /// Number of times the gate was consulted
    pub fn times_asked(&self) -> usize {
        self.asked.len()
    }

    /// Orphan counts shown on each consultation
    pub fn shown(&self) -> &[usize] {
        &self.asked
    }
}

impl ConfirmationGate for ScriptedConfirmation {
    fn confirm(&mut self, orphans: &OrphanSet) -> bool {
        self.asked.push(orphans.len());
        is_affirmative(&self.reply)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_yes_is_affirmative() {
        for input in ["yes", "YES", " Yes\n", "yEs\r\n"] {
            assert!(is_affirmative(input), "{:?}", input);
        }
        for input in ["", "y", "no", "yes please", "ye s", "\n"] {
            assert!(!is_affirmative(input), "{:?}", input);
        }
    }

    #[test]
    fn scripted_records_requests() {
        let mut gate = ScriptedConfirmation::new("no");
        assert!(!gate.confirm(&OrphanSet::default()));
        assert_eq!(gate.times_asked(), 1);

        let mut gate = ScriptedConfirmation::new("yes");
        assert!(gate.confirm(&OrphanSet::default()));
        assert_eq!(gate.shown(), &[0]);
    }

    #[test]
    fn auto_approve() {
        assert!(AutoApprove.confirm(&OrphanSet::default()));
    }
}
