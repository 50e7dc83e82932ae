//! Splitting of block ranges into bounded chunks.

use thiserror::Error;

/// Inclusive range of block heights.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockRange {
    /// First block of the range.
    pub from: u64,
    /// Last block of the range.
    pub to: u64,
}

impl BlockRange {
    /// Creates a new range.
    pub const fn new(from: u64, to: u64) -> Self {
        Self { from, to }
    }
}

/// Errors returned by [`split_range`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum SplitError {
    /// The range is reversed or the step is zero.
    #[error("invalid range {from}..={to} with step {step}")]
    InvalidRange {
        /// First block of the offending range.
        from: u64,
        /// Last block of the offending range.
        to: u64,
        /// Requested step.
        step: u64,
    },
}

/// Splits `range` into chunks spanning at most `step` blocks.
///
/// Adjacent chunks share their boundary block, so every chunk can be passed as is to a node that
/// treats both ends as inclusive. `{5, 10}` with a step of 2 yields `(5,7), (7,9), (9,10)`. A
/// degenerate range yields itself.
pub fn split_range(range: BlockRange, step: u64) -> Result<Vec<BlockRange>, SplitError> {
    let BlockRange { from, to } = range;
    if from > to || step == 0 {
        return Err(SplitError::InvalidRange { from, to, step });
    }

    if from == to {
        return Ok(vec![range]);
    }

    let mut chunks = Vec::with_capacity(((to - from) / step + 1) as usize);
    let mut start = from;
    while start < to {
        let end = start.saturating_add(step).min(to);
        chunks.push(BlockRange::new(start, end));
        start = end;
    }

    Ok(chunks)
}
