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

//! Operator keyboard access for the send-file session

use std::io;
use std::os::unix::io::{AsRawFd, RawFd};
use std::time::Duration;

#[derive(Debug, thiserror::Error)]
pub enum ConsoleError {
    #[error("stdin is not a terminal")]
    NotATerminal,

    #[error("could not change terminal mode: {0}")]
    Termios(#[source] io::Error),
}

// ============================================================================
// LocalInput Trait
// ============================================================================

/// Trait for the local keystroke stream
pub trait LocalInput: Send {
    /// Block until one keystroke arrives
    fn read_key(&mut self) -> io::Result<u8>;

    /// Wait at most `timeout` for a keystroke and read exactly one if ready
    fn poll_key(&mut self, timeout: Duration) -> io::Result<Option<u8>>;
}

// ============================================================================
// Stdin Implementation
// ============================================================================

pub struct Stdin {
    fd: RawFd,
    // Set once read(2) reports end of file; the descriptor is not polled again
    closed: bool,
}

impl Stdin {
    pub fn new() -> Self {
        Stdin::from_fd(io::stdin().as_raw_fd())
    }

    fn from_fd(fd: RawFd) -> Self {
        Stdin { fd, closed: false }
    }

    fn read_byte(&mut self) -> io::Result<Option<u8>> {
        let mut byte = 0u8;
        loop {
            let n = unsafe { libc::read(self.fd, (&mut byte as *mut u8).cast(), 1) };
            match n {
                1 => return Ok(Some(byte)),
                0 => return Err(io::Error::new(io::ErrorKind::UnexpectedEof, "stdin closed")),
                _ => {
                    let err = io::Error::last_os_error();
                    match err.kind() {
                        io::ErrorKind::Interrupted => continue,
                        io::ErrorKind::WouldBlock => return Ok(None),
                        _ => return Err(err),
                    }
                }
            }
        }
    }

    fn wait_readable(&self, timeout: Duration) -> io::Result<bool> {
        let mut pollfd = libc::pollfd { fd: self.fd, events: libc::POLLIN, revents: 0 };
        let millis = timeout.as_millis().min(libc::c_int::MAX as u128) as libc::c_int;
        let ready = unsafe { libc::poll(&mut pollfd, 1, millis) };
        if ready < 0 {
            let err = io::Error::last_os_error();
            if err.kind() == io::ErrorKind::Interrupted {
                return Ok(false);
            }
            return Err(err);
        }
        Ok(ready > 0 && pollfd.revents & (libc::POLLIN | libc::POLLHUP | libc::POLLERR) != 0)
    }
}

impl Default for Stdin {
    fn default() -> Self {
        Stdin::new()
    }
}

impl LocalInput for Stdin {
    fn read_key(&mut self) -> io::Result<u8> {
        loop {
            if let Some(byte) = self.read_byte()? {
                return Ok(byte);
            }
            self.wait_readable(Duration::from_secs(1))?;
        }
    }

    /// End of file is not an error here: the transfer keeps going without a keyboard
    fn poll_key(&mut self, timeout: Duration) -> io::Result<Option<u8>> {
        if self.closed {
            if !timeout.is_zero() {
                std::thread::sleep(timeout);
            }
            return Ok(None);
        }
        if !self.wait_readable(timeout)? {
            return Ok(None);
        }
        match self.read_byte() {
            Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => {
                tracing::debug!("stdin reached end of file, abort key unavailable");
                self.closed = true;
                Ok(None)
            }
            result => result,
        }
    }
}

// ============================================================================
// Raw Mode Guard
// ============================================================================

/// Puts the controlling terminal in raw mode until dropped
pub struct RawMode {
    fd: RawFd,
    original: libc::termios,
}

impl RawMode {
    pub fn enter() -> Result<Self, ConsoleError> {
        let fd = io::stdin().as_raw_fd();
        if unsafe { libc::isatty(fd) } != 1 {
            return Err(ConsoleError::NotATerminal);
        }

        let mut termios = std::mem::MaybeUninit::<libc::termios>::uninit();
        if unsafe { libc::tcgetattr(fd, termios.as_mut_ptr()) } != 0 {
            return Err(ConsoleError::Termios(io::Error::last_os_error()));
        }
        let original = unsafe { termios.assume_init() };

        let mut raw = original;
        unsafe { libc::cfmakeraw(&mut raw) };
        // Keystrokes one at a time, no read timeout
        raw.c_cc[libc::VMIN] = 1;
        raw.c_cc[libc::VTIME] = 0;

        if unsafe { libc::tcsetattr(fd, libc::TCSAFLUSH, &raw) } != 0 {
            return Err(ConsoleError::Termios(io::Error::last_os_error()));
        }
        tracing::debug!("Entered raw terminal mode");

        Ok(RawMode { fd, original })
    }
}

impl Drop for RawMode {
    fn drop(&mut self) {
        if unsafe { libc::tcsetattr(self.fd, libc::TCSAFLUSH, &self.original) } != 0 {
            tracing::warn!("Failed to restore terminal settings");
        } else {
            tracing::debug!("Restored terminal settings");
        }
    }
}

// ============================================================================
// Tests
// ============================================================================


// ============================================================================
// Test Doubles
// ============================================================================

/// Scripted keyboard; `None` entries are polls where no key is ready
#[cfg(test)]
pub struct MockKeyboard {
    keys: std::collections::VecDeque<Option<u8>>,
}

#[cfg(test)]
impl MockKeyboard {
    pub fn new(keys: Vec<Option<u8>>) -> Self {
        MockKeyboard { keys: keys.into() }
    }

    pub fn typing(text: &[u8]) -> Self {
        MockKeyboard::new(text.iter().copied().map(Some).collect())
    }
}

#[cfg(test)]
impl LocalInput for MockKeyboard {
    fn read_key(&mut self) -> io::Result<u8> {
        while let Some(key) = self.keys.pop_front() {
            if let Some(byte) = key {
                return Ok(byte);
            }
        }
        Err(io::Error::new(io::ErrorKind::UnexpectedEof, "Mock keyboard exhausted"))
    }

    fn poll_key(&mut self, _timeout: Duration) -> io::Result<Option<u8>> {
        Ok(self.keys.pop_front().flatten())
    }
}

/// Keyboard whose every read fails
#[cfg(test)]
pub struct BrokenKeyboard;

#[cfg(test)]
impl LocalInput for BrokenKeyboard {
    fn read_key(&mut self) -> io::Result<u8> {
        Err(io::Error::new(io::ErrorKind::Other, "Mock stdin failure"))
    }

    fn poll_key(&mut self, _timeout: Duration) -> io::Result<Option<u8>> {
        Err(io::Error::new(io::ErrorKind::Other, "Mock stdin failure"))
    }
}

/// Display sink that can be inspected after the writer has been moved away
#[cfg(test)]
#[derive(Clone, Default)]
pub struct SharedDisplay(std::sync::Arc<std::sync::Mutex<Vec<u8>>>);

#[cfg(test)]
impl SharedDisplay {
    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
    }
}

#[cfg(test)]
impl io::Write for SharedDisplay {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
