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

use std::sync::atomic::{AtomicU64, Ordering};

/// Running byte totals shared with the rest of the terminal session.
///
/// The send-file engine only ever adds to these.
#[derive(Debug, Default)]
pub struct Statistics {
    rx_total: AtomicU64,
    tx_total: AtomicU64,
}

impl Statistics {
    pub fn add_received(&self, count: usize) {
        self.rx_total.fetch_add(count as u64, Ordering::Relaxed);
    }

    pub fn add_transmitted(&self, count: usize) {
        self.tx_total.fetch_add(count as u64, Ordering::Relaxed);
    }

    pub fn received(&self) -> u64 {
        self.rx_total.load(Ordering::Relaxed)
    }

    pub fn transmitted(&self) -> u64 {
        self.tx_total.load(Ordering::Relaxed)
    }
}
