use bytes::BytesMut;
use growlink_transport::ByteSource;
use tracing::trace;

use crate::error::{FrameError, Result};

/// Remaining length of a data frame's payload.
///
/// Seeded from the length the co-processor declared. Every read against the
/// payload is charged here; the counter never goes below zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PayloadBudget {
    declared: u16,
    remaining: u16,
}

impl PayloadBudget {
    /// Budget for a payload of `declared` bytes.
    pub fn new(declared: u16) -> Self {
        Self {
            declared,
            remaining: declared,
        }
    }

    /// Length the frame declared.
    pub fn declared(&self) -> usize {
        usize::from(self.declared)
    }

    /// Bytes still owed by the payload.
    pub fn remaining(&self) -> usize {
        usize::from(self.remaining)
    }

    /// Bytes charged so far.
    pub fn consumed(&self) -> usize {
        self.declared() - self.remaining()
    }

    pub fn is_exhausted(&self) -> bool {
        self.remaining == 0
    }

    /// Charge `n` consumed bytes.
    ///
    /// Charging more than remains is a protocol violation: the budget is
    /// zeroed (those bytes are gone from the stream) and `BudgetOverrun` is
    /// returned.
    pub fn consume(&mut self, n: usize) -> Result<()> {
        let remaining = self.remaining();
        if n > remaining {
            self.remaining = 0;
            return Err(FrameError::BudgetOverrun {
                requested: n,
                remaining,
            });
        }
        // n <= remaining <= u16::MAX
        self.remaining -= n as u16;
        Ok(())
    }
}

/// Budget-tracking reader over a payload.
///
/// Owns its cursor state: every operation is capped at the remaining budget
/// and charges exactly what the source reports consumed.
pub struct PayloadReader<'a, S: ?Sized> {
    source: &'a mut S,
    budget: PayloadBudget,
}

impl<'a, S: ByteSource + ?Sized> PayloadReader<'a, S> {
    pub fn new(source: &'a mut S, budget: PayloadBudget) -> Self {
        Self { source, budget }
    }

    /// Current budget.
    pub fn budget(&self) -> PayloadBudget {
        self.budget
    }

    /// Append bytes to `dst` up to and including `delimiter`, saturating at
    /// the remaining budget.
    pub fn read_until(&mut self, delimiter: &[u8], dst: &mut BytesMut) -> Result<usize> {
        let n = self
            .source
            .read_until(delimiter, self.budget.remaining(), dst)?;
        self.charge(n)
    }

    /// Discard bytes up to and including `delimiter`, saturating at the
    /// remaining budget.
    pub fn skip_until(&mut self, delimiter: &[u8]) -> Result<usize> {
        let n = self.source.skip_until(delimiter, self.budget.remaining())?;
        self.charge(n)
    }

    /// Discard whatever the payload still owes.
    pub fn skip_rest(&mut self) -> Result<usize> {
        let n = self.source.skip(self.budget.remaining())?;
        self.charge(n)
    }

    /// Release the source, e.g. to read the trailer after the payload.
    pub fn into_source(self) -> &'a mut S {
        self.source
    }

    fn charge(&mut self, n: usize) -> Result<usize> {
        self.budget.consume(n)?;
        trace!(
            consumed = n,
            remaining = self.budget.remaining(),
            "payload read"
        );
        Ok(n)
    }
}
