//! Next-range resolution
//!
//! Resolution order at the start of each fetch cycle:
//! 1. pending directive (jump or skip-to-end)
//! 2. forward growth from the buffered end, overlapping one byte
//! 3. trailing window of the file when nothing is buffered

use crate::range::RangeRequest;
use crate::state::TailState;

/// Pending instruction overriding forward growth for one fetch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Directive {
    /// Read from an offset (load previous, restored URL offset, log pointer);
    /// when the buffer starts later, only the gap up to it is requested
    Jump(u64),
    /// Read the live end of the file regardless of the buffer; the
    /// request covers the last chunk plus one chunk of growth
    SkipToEnd(u64),
}

impl Directive {
    /// Jump target of "load previous" for the current buffer
    ///
    /// `None` when nothing is buffered or the buffer already starts at 0.
    #[inline]
    #[must_use]
    pub fn load_previous(state: &TailState, chunk_size: u64) -> Option<Self> {
        state
            .byte_offset
            .filter(|start| *start > 0)
            .map(|start| Self::Jump(start.saturating_sub(chunk_size)))
    }

    /// Skip-to-end target for the last known file length
    #[inline]
    #[must_use]
    pub fn skip_to_end(total: u64, chunk_size: u64) -> Self {
        Self::SkipToEnd(total.saturating_sub(chunk_size))
    }

    /// Target offset
    #[inline]
    #[must_use]
    pub fn offset(&self) -> u64 {
        match self {
            Self::Jump(offset) | Self::SkipToEnd(offset) => *offset,
        }
    }
}

/// Compute the next range to request
#[must_use]
pub fn next_range(state: &TailState, directive: Option<Directive>, chunk_size: u64) -> RangeRequest {
    match (directive, state.byte_offset) {
        (Some(Directive::Jump(offset)), Some(start)) if start > offset => {
            RangeRequest::span(offset, (start - 1).min(offset.saturating_add(chunk_size)))
        }
        (Some(Directive::Jump(offset)), _) => {
            RangeRequest::span(offset, offset.saturating_add(chunk_size))
        }
        (Some(Directive::SkipToEnd(offset)), _) => {
            RangeRequest::span(offset, offset.saturating_add(chunk_size.saturating_mul(2)))
        }
        (None, Some(_)) => {
            let end = state.end().unwrap_or(0);
            RangeRequest::span(end.saturating_sub(1), end.saturating_add(chunk_size))
        }
        (None, None) => RangeRequest::suffix(chunk_size),
    }
}
