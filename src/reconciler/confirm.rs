//! Operator confirmation.
//!
//! Every mutating step asks through a [`Confirmer`], which pairs the run's
//! [`ConfirmPolicy`] with a [`Prompter`] that talks to the operator.

use crate::error::Result;
use crate::model::ResourceKind;

/// Whether the operator is asked before each mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConfirmPolicy {
    /// Ask before every mutation.
    #[default]
    AlwaysAsk,
    /// Assume yes everywhere; diffs overwrite the remote copy.
    AutoYes,
}

impl ConfirmPolicy {
    /// Builds the policy from a `--yes` flag.
    #[must_use]
    pub const fn from_flag(yes: bool) -> Self {
        if yes { Self::AutoYes } else { Self::AlwaysAsk }
    }
}

/// The operator's answer when local and remote copies differ.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiffResolution {
    /// Take the remote copy into the local state.
    AcceptRemote,
    /// Push the local copy to the engine.
    OverwriteRemote,
    /// Leave both sides as they are.
    Skip,
}

/// Channel to the operator.
#[cfg_attr(test, mockall::automock)]
pub trait Prompter: Send + Sync {
    /// Shows informational text, such as a resource body or a diff.
    fn show(&self, message: &str);

    /// Asks a yes/no question.
    ///
    /// # Errors
    ///
    /// Returns an error if the answer cannot be read.
    fn confirm(&self, question: &str) -> Result<bool>;

    /// Asks how to settle a diff between local and remote copies.
    ///
    /// # Errors
    ///
    /// Returns an error if the answer cannot be read.
    fn resolve_diff(&self, kind: ResourceKind, name: &str) -> Result<DiffResolution>;
}

/// A policy bound to a prompter, handed to every executor.
#[derive(Clone, Copy)]
pub struct Confirmer<'a> {
    policy: ConfirmPolicy,
    prompter: &'a dyn Prompter,
}

impl<'a> Confirmer<'a> {
    /// Creates a confirmer.
    #[must_use]
    pub fn new(policy: ConfirmPolicy, prompter: &'a dyn Prompter) -> Self {
        Self { policy, prompter }
    }

    /// The policy in effect.
    #[must_use]
    pub const fn policy(&self) -> ConfirmPolicy {
        self.policy
    }

    /// Shows text to the operator regardless of policy.
    pub fn show(&self, message: &str) {
        self.prompter.show(message);
    }

    /// Asks a yes/no question, or answers yes under [`ConfirmPolicy::AutoYes`].
    ///
    /// # Errors
    ///
    /// Returns an error if the prompter fails.
    pub fn confirm(&self, question: &str) -> Result<bool> {
        match self.policy {
            ConfirmPolicy::AutoYes => Ok(true),
            ConfirmPolicy::AlwaysAsk => self.prompter.confirm(question),
        }
    }

    /// Settles a diff, or overwrites the remote under [`ConfirmPolicy::AutoYes`].
    ///
    /// # Errors
    ///
    /// Returns an error if the prompter fails.
    pub fn resolve_diff(&self, kind: ResourceKind, name: &str) -> Result<DiffResolution> {
        match self.policy {
            ConfirmPolicy::AutoYes => Ok(DiffResolution::OverwriteRemote),
            ConfirmPolicy::AlwaysAsk => self.prompter.resolve_diff(kind, name),
        }
    }
}

impl std::fmt::Debug for Confirmer<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Confirmer").field("policy", &self.policy).finish_non_exhaustive()
    }
}
