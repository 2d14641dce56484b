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

use std::io::{Read, Write};
use std::time::Duration;
use serialport::{SerialPort as SerialPortTrait, DataBits, FlowControl, Parity, StopBits};
use crate::flow::LineSettings;

// ============================================================================
// SerialPort Trait
// ============================================================================

/// Trait for serial port operations needed by the send-file session
pub trait SerialPort: Send {
    /// Write and force the bytes out to the device before returning
    fn write_all(&mut self, buf: &[u8]) -> std::io::Result<()>;

    /// Read whatever the device has already delivered without waiting.
    ///
    /// `Ok(None)` means nothing is pending, `Ok(Some(0))` means the device hung up.
    fn read_available(&mut self, buf: &mut [u8]) -> std::io::Result<Option<usize>>;

    /// Current state of the CTS modem line
    fn clear_to_send(&mut self) -> std::io::Result<bool>;

    fn line_settings(&self) -> std::io::Result<LineSettings>;
}

// ============================================================================
// Real Serial Port Implementation
// ============================================================================

/// Real serial port implementation that wraps the serialport crate
pub struct RealSerialPort {
    port: Box<dyn SerialPortTrait>,
}

impl RealSerialPort {
    pub fn open(
        port_name: &str,
        baud_rate: u32,
        data_bits: DataBits,
        parity: Parity,
        stop_bits: StopBits,
        flow_control: FlowControl,
    ) -> Result<Self, serialport::Error> {
        let port = serialport::new(port_name, baud_rate)
            .data_bits(data_bits)
            .parity(parity)
            .stop_bits(stop_bits)
            .flow_control(flow_control)
            .timeout(Duration::from_millis(100))
            .open()?;

        Ok(RealSerialPort { port })
    }
}

impl SerialPort for RealSerialPort {
    fn write_all(&mut self, buf: &[u8]) -> std::io::Result<()> {
        self.port.write_all(buf)?;
        self.port.flush()?;
        Ok(())
    }

    fn read_available(&mut self, buf: &mut [u8]) -> std::io::Result<Option<usize>> {
        let pending = self.port.bytes_to_read()? as usize;
        if pending == 0 {
            return Ok(None);
        }
        let len = pending.min(buf.len());
        match self.port.read(&mut buf[..len]) {
            Ok(n) => Ok(Some(n)),
            Err(e) if e.kind() == std::io::ErrorKind::TimedOut => Ok(None),
            Err(e) => Err(e),
        }
    }

    fn clear_to_send(&mut self) -> std::io::Result<bool> {
        Ok(self.port.read_clear_to_send()?)
    }

    fn line_settings(&self) -> std::io::Result<LineSettings> {
        let settings = match self.port.flow_control()? {
            FlowControl::None => LineSettings::default(),
            FlowControl::Hardware => LineSettings { rts_cts: true, ..Default::default() },
            FlowControl::Software => LineSettings { ixon: true, ixoff: true, ..Default::default() },
        };
        Ok(settings)
    }
}

// ============================================================================
// Mock Serial Port for Testing
// ============================================================================

/// One scripted answer to `read_available`
#[cfg(test)]
#[derive(Debug, Clone, Copy)]
pub enum MockRead {
    /// Delivered together with any directly following bytes
    Byte(u8),
    /// Nothing pending on this poll
    Quiet,
    /// Device returned EOF
    Hangup,
    /// Read failed
    Fail,
}

#[cfg(test)]
pub struct MockSerialPort {
    // Answers to successive polls; exhausted = nothing pending
    read_script: Vec<MockRead>,
    read_pos: usize,
    // CTS answers to successive queries (None = query fails); exhausted = asserted
    cts_script: Vec<Option<bool>>,
    cts_pos: usize,
    line: LineSettings,
    // Number of writes that succeed before every write fails
    write_limit: Option<usize>,
    // Track what was written
    write_log: Vec<u8>,
    // Expected writes for verification
    expected_writes: Vec<u8>,
}

#[cfg(test)]
impl MockSerialPort {
    pub fn new(read_script: Vec<MockRead>, expected_writes: Vec<u8>) -> Self {
        MockSerialPort {
            read_script,
            read_pos: 0,
            cts_script: Vec::new(),
            cts_pos: 0,
            line: LineSettings::default(),
            write_limit: None,
            write_log: Vec::new(),
            expected_writes,
        }
    }

    pub fn with_line(mut self, line: LineSettings) -> Self {
        self.line = line;
        self
    }

    pub fn with_cts(mut self, cts_script: Vec<Option<bool>>) -> Self {
        self.cts_script = cts_script;
        self
    }

    pub fn with_write_limit(mut self, limit: usize) -> Self {
        self.write_limit = Some(limit);
        self
    }
}

#[cfg(test)]
impl SerialPort for MockSerialPort {
    fn write_all(&mut self, buf: &[u8]) -> std::io::Result<()> {
        if let Some(limit) = self.write_limit {
            if self.write_log.len() + buf.len() > limit {
                return Err(std::io::Error::new(std::io::ErrorKind::BrokenPipe, "Mock write failure"));
            }
        }
        self.write_log.extend_from_slice(buf);
        Ok(())
    }

    fn read_available(&mut self, buf: &mut [u8]) -> std::io::Result<Option<usize>> {
        let Some(next) = self.read_script.get(self.read_pos).copied() else {
            return Ok(None);
        };

        match next {
            MockRead::Quiet => {
                self.read_pos += 1;
                Ok(None)
            }
            MockRead::Hangup => {
                self.read_pos += 1;
                Ok(Some(0))
            }
            MockRead::Fail => {
                self.read_pos += 1;
                Err(std::io::Error::new(std::io::ErrorKind::Other, "Mock read failure"))
            }
            MockRead::Byte(_) => {
                let mut bytes_read = 0;
                while bytes_read < buf.len() {
                    match self.read_script.get(self.read_pos) {
                        Some(MockRead::Byte(byte)) => {
                            buf[bytes_read] = *byte;
                            bytes_read += 1;
                            self.read_pos += 1;
                        }
                        _ => break,
                    }
                }
                Ok(Some(bytes_read))
            }
        }
    }

    fn clear_to_send(&mut self) -> std::io::Result<bool> {
        let answer = self.cts_script.get(self.cts_pos).copied().unwrap_or(Some(true));
        self.cts_pos += 1;
        answer.ok_or_else(|| std::io::Error::new(std::io::ErrorKind::Other, "Mock TIOCMGET failure"))
    }

    fn line_settings(&self) -> std::io::Result<LineSettings> {
        Ok(self.line)
    }
}

#[cfg(test)]
impl Drop for MockSerialPort {
    fn drop(&mut self) {
        if std::thread::panicking() {
            return;
        }

        assert_eq!(
            self.read_pos,
            self.read_script.len(),
            "MockSerialPort dropped with {} unconsumed responses (read {} of {})",
            self.read_script.len() - self.read_pos,
            self.read_pos,
            self.read_script.len()
        );

        assert_eq!(
            &self.write_log,
            &self.expected_writes,
            "MockSerialPort write log mismatch!\nExpected {} bytes:\n{:02X?}\nGot {} bytes:\n{:02X?}",
            self.expected_writes.len(),
            self.expected_writes,
            self.write_log.len(),
            self.write_log
        );
    }
}
