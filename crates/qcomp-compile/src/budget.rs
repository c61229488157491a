//! Cooperative wall-clock budget for a single compilation.

use std::time::{Duration, Instant};

use crate::error::{CompileError, CompileResult};

/// Deadline checked by the pass manager between passes.
///
/// The budget is cooperative: a pass that runs long is only interrupted at
/// the next check.
#[derive(Debug, Clone, Copy)]
pub struct CompileBudget {
    started: Instant,
    limit: Option<Duration>,
}

impl CompileBudget {
    /// A budget that never expires.
    pub fn unlimited() -> Self {
        Self {
            started: Instant::now(),
            limit: None,
        }
    }

    /// A budget that expires `limit` from now.
    pub fn with_timeout(limit: Duration) -> Self {
        Self {
            started: Instant::now(),
            limit: Some(limit),
        }
    }

    /// Time spent so far.
    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    /// Whether the deadline has passed.
    pub fn is_expired(&self) -> bool {
        self.limit.is_some_and(|limit| self.elapsed() >= limit)
    }

    /// Fail with [`CompileError::Timeout`] if the deadline has passed.
    pub fn check(&self) -> CompileResult<()> {
        match self.limit {
            Some(budget) if self.elapsed() >= budget => Err(CompileError::Timeout { budget }),
            _ => Ok(()),
        }
    }
}

impl Default for CompileBudget {
    fn default() -> Self {
        Self::unlimited()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unlimited_never_expires() {
        let budget = CompileBudget::unlimited();
        assert!(!budget.is_expired());
        assert!(budget.check().is_ok());
    }

    #[test]
    fn test_zero_budget_expires_immediately() {
        let budget = CompileBudget::with_timeout(Duration::ZERO);
        assert!(budget.is_expired());
        assert!(matches!(budget.check(), Err(CompileError::Timeout { .. })));
    }
}
