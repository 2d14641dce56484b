// Copyright (C) 2026 Brian Johnson
//
// This program is free software; you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation; either version 2 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License along
// with this program; if not, write to the Free Software Foundation, Inc.,
// 51 Franklin Street, Fifth Floor, Boston, MA 02110-1301 USA.

//! Line-editing prompt that collects the path of the file to send

use std::ffi::OsString;
use std::io::Write;
use std::os::unix::ffi::OsStringExt;
use std::path::PathBuf;
use crate::console::LocalInput;
use crate::protocol::{ABORT, BACKSPACE, CR, ERASE, PROMPT};

/// Longest path accepted from the operator
pub const DEFAULT_LIMIT: usize = 255;

/// Characters refused in a file name, in addition to control bytes
const DENIED: &[u8] = b" !\"#$%&'()*[]{}|;^<=>@";

fn is_filename_byte(byte: u8) -> bool {
    !byte.is_ascii_control() && !DENIED.contains(&byte)
}

/// Number of continuation bytes a UTF-8 lead byte announces
fn continuation_len(lead: u8) -> usize {
    match lead {
        0xC0..=0xDF => 1,
        0xE0..=0xEF => 2,
        0xF0..=0xF7 => 3,
        _ => 0,
    }
}

/// Bounded buffer the prompt edits in place.
///
/// The limit counts characters: a UTF-8 sequence typed as several bytes is
/// one character, any other byte (e.g. Latin-1) is a character on its own.
#[derive(Debug)]
pub struct FilenameBuffer {
    bytes: Vec<u8>,
    // Byte offset where each character starts
    starts: Vec<usize>,
    // Continuation bytes still owed to the last character
    pending: usize,
    limit: usize,
}

impl FilenameBuffer {
    pub fn new(limit: usize) -> Self {
        FilenameBuffer { bytes: Vec::with_capacity(limit), starts: Vec::with_capacity(limit), pending: 0, limit }
    }

    /// Length in characters
    pub fn len(&self) -> usize {
        self.starts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.starts.is_empty()
    }

    /// Returns false, leaving the buffer untouched, once the limit is reached.
    ///
    /// Bytes completing a character already started are always accepted, so a
    /// character is never cut in half at the limit.
    pub fn push(&mut self, byte: u8) -> bool {
        if self.pending > 0 && byte & 0xC0 == 0x80 {
            self.pending -= 1;
            self.bytes.push(byte);
            return true;
        }
        if self.starts.len() >= self.limit {
            return false;
        }
        self.starts.push(self.bytes.len());
        self.bytes.push(byte);
        self.pending = continuation_len(byte);
        true
    }

    /// Remove the last character with all of its bytes
    pub fn pop(&mut self) -> bool {
        let Some(start) = self.starts.pop() else {
            return false;
        };
        self.bytes.truncate(start);
        self.pending = 0;
        true
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn into_path(self) -> PathBuf {
        PathBuf::from(OsString::from_vec(self.bytes))
    }
}

/// Ask the operator for a file name.
///
/// Returns `Ok(None)` when the prompt is cancelled with Escape or confirmed
/// with nothing typed.
pub fn prompt_filename(
    input: &mut dyn LocalInput,
    display: &mut dyn Write,
    limit: usize,
) -> std::io::Result<Option<PathBuf>> {
    write!(display, "\r\n{}", PROMPT)?;
    display.flush()?;

    let mut buffer = FilenameBuffer::new(limit);
    loop {
        let key = input.read_key()?;
        match key {
            CR => break,
            ABORT => {
                tracing::debug!("Filename prompt cancelled");
                return Ok(None);
            }
            BACKSPACE => {
                if buffer.pop() {
                    display.write_all(ERASE)?;
                }
            }
            byte if is_filename_byte(byte) => {
                if buffer.push(byte) {
                    display.write_all(&[byte])?;
                } else {
                    tracing::trace!("Filename limit of {} reached, dropping 0x{:02X}", limit, byte);
                }
            }
            byte => tracing::trace!("Refused filename byte 0x{:02X}", byte),
        }
        display.flush()?;
    }

    if buffer.is_empty() {
        return Ok(None);
    }
    Ok(Some(buffer.into_path()))
}

// ============================================================================
// Tests
// ============================================================================
