// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright © 2024 RemasteredArch
//
// This file is part of smtp_broker.
//
// smtp_broker is free software: you can redistribute it and/or modify it under the terms of the
// GNU Affero General Public License as published by the Free Software Foundation, either version
// 3 of the License, or (at your option) any later version.
//
// smtp_broker is distributed in the hope that it will be useful, but WITHOUT ANY WARRANTY;
// without even the implied warranty of MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See
// the GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License along with
// smtp_broker. If not, see <https://www.gnu.org/licenses/>.

//! Splits the bytes received from a client into command lines and mail data blocks.
//!
//! See [`FrameDecoder`].


use crate::{config::DEFAULT_MESSAGE_LIMIT, max_lengths, session::Mode};

const CR: u8 = b'\r';
const LF: u8 = b'\n';
const DOT: u8 = b'.';

/// How many already scanned bytes to look at again, so that a terminator split between two
/// chunks is still found. One less than the longest terminator, `CRLF . CRLF`.
const TERMINATOR_OVERLAP: usize = 4;

/// One complete unit of client input.
#[derive(PartialEq, Eq, Debug, Clone)]
pub enum Frame {
    /// A command line, without its line ending. Never empty.
    Line(String),
    /// The raw contents of a `DATA` transaction, without the terminating `CRLF . CRLF`.
    ///
    /// Dot-stuffing has not been reversed yet.
    Block(String),
    /// A command line longer than [`max_lengths::COMMAND_LINE`]. Its contents were discarded.
    LineTooLong,
    /// Mail data longer than the message limit. Its contents were discarded.
    BlockTooLarge,
}

/// Accumulates client input and cuts it into [`Frame`]s.
///
/// Input is buffered until a complete frame is available. What counts as a complete frame
/// depends on the [`Mode`] passed to [`Self::next_frame`]:
///
/// - [`Mode::Command`]: a line ending in `LF` or `CRLF`. Empty lines are skipped.
/// - [`Mode::Data`]: everything up to a line consisting of a single dot, `CRLF . CRLF`. Bare
///   `LF`s are tolerated in the terminator.
///
/// Partial input is never an error, it is kept until more bytes are [fed](Self::feed). Input
/// that has already been searched for a frame boundary is not searched again, and an overlong
/// line or block is dropped as it arrives instead of being buffered, so that the decoder stays
/// linear in time and bounded in memory.
#[derive(PartialEq, Eq, Debug, Clone)]
pub struct FrameDecoder {
    buffer: Vec<u8>,
    /// How much of `buffer` has been searched without finding a boundary.
    scanned: usize,
    /// The mode `scanned` applies to.
    scan_mode: Mode,
    /// Set while the rest of an overlong frame is being discarded.
    overflowed: bool,
    message_limit: usize,
}

impl FrameDecoder {
    /// Create a decoder that accepts mail data of up to [`DEFAULT_MESSAGE_LIMIT`] bytes.
    #[must_use]
    pub const fn new() -> Self {
        Self::with_message_limit(DEFAULT_MESSAGE_LIMIT)
    }

    /// Create a decoder that accepts mail data of up to `message_limit` bytes, not counting the
    /// terminator.
    #[must_use]
    pub const fn with_message_limit(message_limit: usize) -> Self {
        Self {
            buffer: Vec::new(),
            scanned: 0,
            scan_mode: Mode::Command,
            overflowed: false,
            message_limit,
        }
    }

    /// Append a chunk of input to the internal buffer.
    pub fn feed(&mut self, chunk: &[u8]) {
        self.buffer.extend_from_slice(chunk);
    }

    /// Get the bytes that have been fed but not yet consumed as a frame.
    #[must_use]
    pub fn buffered(&self) -> &[u8] {
        &self.buffer
    }

    /// Discard all buffered input.
    pub fn clear(&mut self) {
        self.buffer.clear();
        self.scanned = 0;
        self.overflowed = false;
    }

    /// Cut the next complete frame off the front of the buffer, if there is one.
    ///
    /// Returns `None` if more input is needed.
    pub fn next_frame(&mut self, mode: Mode) -> Option<Frame> {
        if mode != self.scan_mode {
            self.scan_mode = mode;
            self.scanned = 0;
            self.overflowed = false;
        }

        match mode {
            Mode::Command => self.next_line(),
            Mode::Data => self.next_block(),
        }
    }

    /// Remove the first `len` bytes, which start the next frame over.
    fn consume(&mut self, len: usize) -> std::vec::Drain<'_, u8> {
        self.scanned = 0;
        self.buffer.drain(..len)
    }

    fn next_line(&mut self) -> Option<Frame> {
        loop {
            let Some(end) = self.buffer[self.scanned..]
                .iter()
                .position(|&byte| byte == LF)
                .map(|offset| self.scanned + offset)
            else {
                if self.buffer.len() >= max_lengths::COMMAND_LINE {
                    self.overflowed = true;
                    self.buffer.clear();
                }
                self.scanned = self.buffer.len();

                return None;
            };

            let mut line: Vec<u8> = self.consume(end + 1).collect();
            if std::mem::take(&mut self.overflowed) || line.len() > max_lengths::COMMAND_LINE {
                return Some(Frame::LineTooLong);
            }

            line.pop(); // `LF`
            if line.last() == Some(&CR) {
                line.pop();
            }

            if !line.is_empty() {
                return Some(Frame::Line(decode(&line)));
            }
        }
    }

    fn next_block(&mut self) -> Option<Frame> {
        // A message that is empty: the terminator follows the `354` reply immediately, so the
        // leading line ending was already consumed with the `DATA` command.
        if !self.overflowed {
            if let Some(len) = dot_line_len(&self.buffer) {
                self.consume(len);

                return Some(Frame::Block(String::new()));
            }
        }

        let from = self.scanned.saturating_sub(TERMINATOR_OVERLAP);
        let Some((start, end)) = find_terminator(&self.buffer, from) else {
            if self.buffer.len() > self.message_limit {
                self.overflowed = true;
                // Only the tail can still be the start of a terminator.
                let len = self.buffer.len().saturating_sub(TERMINATOR_OVERLAP);
                self.buffer.drain(..len);
            }
            self.scanned = self.buffer.len();

            return None;
        };

        let frame = if std::mem::take(&mut self.overflowed) || start > self.message_limit {
            Frame::BlockTooLarge
        } else {
            Frame::Block(decode(&self.buffer[..start]))
        };
        self.consume(end);

        Some(frame)
    }
}

impl Default for FrameDecoder {
    fn default() -> Self {
        Self::new()
    }
}

/// Find the first `\r?\n.\r?\n` sequence whose `LF` is at or after `from`, returning the range
/// it occupies.
fn find_terminator(buffer: &[u8], from: usize) -> Option<(usize, usize)> {
    buffer
        .iter()
        .enumerate()
        .skip(from)
        .filter(|&(_, &byte)| byte == LF)
        .find_map(|(index, _)| {
            let len = dot_line_len(&buffer[index + 1..])?;
            let start = if index > 0 && buffer[index - 1] == CR {
                index - 1
            } else {
                index
            };

            Some((start, index + 1 + len))
        })
}

/// If `bytes` starts with `.\r?\n`, get the length of that sequence.
fn dot_line_len(bytes: &[u8]) -> Option<usize> {
    match bytes {
        [DOT, LF, ..] => Some(2),
        [DOT, CR, LF, ..] => Some(3),
        _ => None,
    }
}

fn decode(bytes: &[u8]) -> String {
    String::from_utf8_lossy(bytes).into_owned()
}
