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

//! Sentinel bytes and operator notices used by the send-file session

/// Escape - aborts the filename prompt or a running transfer
pub const ABORT: u8 = 0x1B;

/// Transmit on - device grants clearance under software flow control
pub const XON: u8 = 0x11;

/// Transmit off - device withdraws clearance under software flow control
pub const XOFF: u8 = 0x13;

/// Delete - erases the previous character in the filename prompt
pub const BACKSPACE: u8 = 0x7F;

/// Carriage return - ends the filename prompt
pub const CR: u8 = b'\r';

/// Line feed
pub const LF: u8 = b'\n';

/// Visual erase of one character: back, blank, back
pub const ERASE: &[u8] = b"\x08 \x08";

pub const PROMPT: &str = "Enter file name to send: ";
pub const NOTICE_ABORTED: &str = "Send file aborted by user!";
pub const NOTICE_CONCLUDED: &str = "File send concluded!";
pub const NOTICE_NOT_FOUND: &str = "Operation aborted: file not found!";
