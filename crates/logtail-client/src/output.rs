//! Incremental text output
//!
//! Turns successive snapshots into the text not yet written, the way
//! `tail -f` prints only what is new.

use logtail_core::TailState;

/// Tracks the absolute offset up to which text was emitted
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TextCursor {
    end: Option<u64>,
}

impl TextCursor {
    /// Create cursor with nothing emitted
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Absolute offset one past the last emitted byte
    #[inline]
    #[must_use]
    pub fn end(&self) -> Option<u64> {
        self.end
    }

    /// Text of `state` past the cursor, advancing it
    ///
    /// When the buffer no longer covers the cursor (jump, truncation)
    /// the whole text is returned again.
    pub fn advance<'a>(&mut self, state: &'a TailState) -> &'a str {
        let (Some(start), Some(text)) = (state.str_offset, state.string.as_deref()) else {
            return "";
        };
        let end = start + text.len() as u64;
        let from = match self.end {
            Some(printed) if (start..=end).contains(&printed) => (printed - start) as usize,
            _ => 0,
        };
        self.end = Some(end);
        text.get(from..).unwrap_or("")
    }
}
