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

use crate::protocol::{CR, LF};

/// Output line-ending translation applied to each file byte before it is sent
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OutputMapping {
    /// Map NL to CR-NL on output (only the CR is emitted)
    pub nl_to_crnl: bool,
    /// Map CR to NL on output
    pub cr_to_nl: bool,
}

impl OutputMapping {
    pub fn apply(&self, byte: u8) -> u8 {
        let mut byte = byte;
        if byte == LF && self.nl_to_crnl {
            byte = CR;
        }
        // Applied to the result of the first rule, so with both enabled LF stays LF
        if byte == CR && self.cr_to_nl {
            byte = LF;
        }
        byte
    }
}
