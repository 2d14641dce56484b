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

//! Flow-control regime selection and transmit clearance

use crate::protocol::{XOFF, XON};

/// Flow-control bits of the active line configuration
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LineSettings {
    /// Hardware RTS/CTS handshaking
    pub rts_cts: bool,
    /// Software flow control on output (device may pause us)
    pub ixon: bool,
    /// Software flow control on input (we may pause the device)
    pub ixoff: bool,
}

/// Mechanism governing when the next byte may be transmitted.
///
/// Chosen once when a session starts and never re-derived; only the
/// clearance it governs changes while the transfer runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlowRegime {
    None,
    Hardware,
    Software,
}

impl FlowRegime {
    /// Hardware handshaking wins when both bit groups are set.
    pub fn classify(line: &LineSettings) -> Self {
        match line {
            LineSettings { rts_cts: true, .. } => FlowRegime::Hardware,
            LineSettings { ixon: true, .. } | LineSettings { ixoff: true, .. } => FlowRegime::Software,
            _ => FlowRegime::None,
        }
    }
}

/// Transmit permission tracked across loop iterations
#[derive(Debug)]
pub struct Clearance {
    regime: FlowRegime,
    clear: bool,
}

impl Clearance {
    pub fn new(regime: FlowRegime) -> Self {
        Clearance { regime, clear: true }
    }

    pub fn is_clear(&self) -> bool {
        self.clear
    }

    /// Scan bytes just received from the device for XON/XOFF.
    ///
    /// Only the software regime reacts; within one chunk the last sentinel wins.
    pub fn observe(&mut self, received: &[u8]) {
        if self.regime != FlowRegime::Software {
            return;
        }
        for &byte in received {
            match byte {
                XOFF if self.clear => {
                    tracing::debug!("XOFF received, pausing transmission");
                    self.clear = false;
                }
                XON if !self.clear => {
                    tracing::debug!("XON received, resuming transmission");
                    self.clear = true;
                }
                _ => {}
            }
        }
    }

    /// Re-derive clearance for this iteration.
    ///
    /// `cts` is only consulted under the hardware regime; its error is
    /// returned untouched so the caller can fail the session.
    pub fn refresh<F>(&mut self, cts: F) -> std::io::Result<bool>
    where
        F: FnOnce() -> std::io::Result<bool>,
    {
        match self.regime {
            FlowRegime::None => self.clear = true,
            FlowRegime::Hardware => self.clear = cts()?,
            FlowRegime::Software => {}
        }
        Ok(self.clear)
    }
}

// ============================================================================
// Tests
// ============================================================================
