//! Chunk merging
//!
//! Joins a freshly fetched chunk onto the buffered window when the two
//! spans touch or overlap, and otherwise replaces the window with the
//! chunk alone. Adjacency is never assumed when offsets don't meet.
//!
//! Overlap precedence:
//! - chunk before the buffer: buffered bytes win
//! - chunk at or after the buffer start: chunk bytes win

use crate::fetch::Chunk;
use crate::state::TailState;
use tracing::debug;

/// Merge `chunk` into `old`, producing the next state
///
/// The follow flag is carried over; the error annotation is cleared.
#[must_use]
pub fn merge(old: &TailState, chunk: &Chunk) -> TailState {
    let (offset, bytes) = splice(old, chunk);
    let text = TextView::decode(offset, &bytes);

    TailState {
        byte_offset: Some(offset),
        str_offset: Some(text.str_offset),
        bytes,
        string: text.string,
        total: chunk.total,
        loading: false,
        follow: old.follow,
        error: None,
        decode_error: text.decode_error,
    }
}

fn splice(old: &TailState, chunk: &Chunk) -> (u64, Vec<u8>) {
    let adopt = || (chunk.offset, chunk.bytes.clone());

    let Some((old_start, old_end)) = old.byte_offset.zip(old.end()) else {
        return adopt();
    };

    if chunk.total < old_end {
        debug!(
            old_end,
            total = chunk.total,
            "file shrank below buffer, discarding buffer"
        );
        return adopt();
    }

    let new_start = chunk.offset;
    let new_end = chunk.end();

    if new_start < old_start {
        if new_end < old_start {
            debug!(new_end, old_start, "gap before buffer, replacing");
            return adopt();
        }
        let mut buf = vec![0u8; (old_end.max(new_end) - new_start) as usize];
        buf[..chunk.len()].copy_from_slice(&chunk.bytes);
        let at = (old_start - new_start) as usize;
        buf[at..at + old.bytes.len()].copy_from_slice(&old.bytes);
        (new_start, buf)
    } else {
        if new_start > old_end {
            debug!(new_start, old_end, "gap after buffer, replacing");
            return adopt();
        }
        let mut buf = vec![0u8; (old_end.max(new_end) - old_start) as usize];
        buf[..old.bytes.len()].copy_from_slice(&old.bytes);
        let at = (new_start - old_start) as usize;
        buf[at..at + chunk.len()].copy_from_slice(&chunk.bytes);
        (old_start, buf)
    }
}

/// Index of the first byte after the first line feed
///
/// A buffer starting at file offset 0 begins on a line boundary. When no
/// line feed exists the whole buffer is shown.
#[must_use]
pub fn line_start(offset: u64, bytes: &[u8]) -> usize {
    if offset == 0 {
        return 0;
    }
    bytes
        .iter()
        .position(|&b| b == b'\n')
        .map_or(0, |idx| idx + 1)
}

/// Decoded, line-aligned view of a buffer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextView {
    /// Absolute offset where the text begins
    pub str_offset: u64,
    /// Decoded text, `None` on invalid UTF-8
    pub string: Option<String>,
    /// Invalid UTF-8 was found
    pub decode_error: bool,
}

impl TextView {
    /// Decode `bytes` (at absolute `offset`) from the first full line
    #[must_use]
    pub fn decode(offset: u64, bytes: &[u8]) -> Self {
        let mut skip = line_start(offset, bytes);
        if skip == 0 && offset != 0 {
            skip = leading_continuation(bytes);
        }
        let str_offset = offset + skip as u64;
        match decode_utf8(&bytes[skip..]) {
            Some(string) => Self {
                str_offset,
                string: Some(string),
                decode_error: false,
            },
            None => {
                debug!(str_offset, "buffer is not valid utf-8");
                Self {
                    str_offset,
                    string: None,
                    decode_error: true,
                }
            }
        }
    }
}

/// Continuation bytes of a sequence cut off by the buffer start
fn leading_continuation(bytes: &[u8]) -> usize {
    bytes
        .iter()
        .take(3)
        .take_while(|b| *b & 0b1100_0000 == 0b1000_0000)
        .count()
}

/// Strict UTF-8 decode that tolerates a sequence cut off by the buffer end
fn decode_utf8(bytes: &[u8]) -> Option<String> {
    match std::str::from_utf8(bytes) {
        Ok(text) => Some(text.to_owned()),
        Err(err) if err.error_len().is_none() => std::str::from_utf8(&bytes[..err.valid_up_to()])
            .ok()
            .map(str::to_owned),
        Err(_) => None,
    }
}
