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

use std::marker::PhantomData;
use std::fs::File;
use std::io::{BufReader, Read, Write};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use crate::console::LocalInput;
use crate::flow::{Clearance, FlowRegime};
use crate::mapping::OutputMapping;
use crate::prompt::prompt_filename;
use crate::protocol::*;
use crate::serial::SerialPort;
use crate::stats::Statistics;

/// Largest chunk taken from the device per iteration
const RX_CHUNK: usize = 1024;

/// Keyboard wait while transmission is paused, so a blocked transfer does not spin
const IDLE_POLL: Duration = Duration::from_millis(10);

// ============================================================================
// Error Types
// ============================================================================

/// Fatal conditions; each one ends the whole terminal session, not just the transfer
#[derive(Debug, thiserror::Error)]
pub enum TransferError {
    #[error("Could not read from tty device: {0}")]
    DeviceRead(#[source] std::io::Error),

    #[error("Could not read from tty device: device disconnected")]
    DeviceHangup,

    #[error("Could not write to tty device: {0}")]
    DeviceWrite(#[source] std::io::Error),

    #[error("Could not get line state: {0}")]
    LineStatus(#[source] std::io::Error),

    #[error("Could not get line settings: {0}")]
    LineSettings(#[source] std::io::Error),

    #[error("Could not read from stdin: {0}")]
    LocalInput(#[source] std::io::Error),

    #[error("Could not read from file: {0}")]
    File(#[source] std::io::Error),

    #[error("Could not write to console: {0}")]
    Display(#[source] std::io::Error),
}

/// How a session ended when no fatal error occurred
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Completed { bytes_sent: u64 },
    AbortedByUser { bytes_sent: u64 },
    /// The filename prompt was cancelled or left empty
    Cancelled,
    FileNotFound,
}

// ============================================================================
// Session Configuration
// ============================================================================

/// Everything the session talks to; dropped together when the session ends
pub struct Link {
    pub serial: Box<dyn SerialPort>,
    pub input: Box<dyn LocalInput>,
    pub display: Box<dyn Write + Send>,
    pub stats: Arc<Statistics>,
}

#[derive(Debug, Clone, Copy)]
pub struct TransferConfig {
    pub mapping: OutputMapping,
    /// Pause after every transmitted byte
    pub byte_delay: Duration,
    pub filename_limit: usize,
}

// ============================================================================
// States
// ============================================================================

pub struct PromptFilename;
pub struct OpenFile;
pub struct Running;

// ============================================================================
// FSM Structure
// ============================================================================

pub struct TransferFsm<State> {
    state: PhantomData<State>,
    link: Link,
    config: TransferConfig,
    path: PathBuf,
    file: Option<BufReader<File>>,
    file_len: u64,
    bytes_sent: u64,
    clearance: Clearance,
    rx_buffer: [u8; RX_CHUNK],
}

// ============================================================================
// Trait
// ============================================================================

pub enum Transition {
    Next(Box<dyn TransferState>),
    Done(Outcome),
}

pub trait TransferState: Send {
    fn step(self: Box<Self>) -> Result<Transition, TransferError>;
}

// ============================================================================
// Helpers shared by all states
// ============================================================================

impl<S> TransferFsm<S> {
    fn transition<T>(self) -> Box<TransferFsm<T>> {
        Box::new(TransferFsm {
            state: PhantomData,
            link: self.link,
            config: self.config,
            path: self.path,
            file: self.file,
            file_len: self.file_len,
            bytes_sent: self.bytes_sent,
            clearance: self.clearance,
            rx_buffer: self.rx_buffer,
        })
    }

    fn state_name() -> &'static str {
        let type_name = std::any::type_name::<S>();
        type_name.split("::").last().unwrap_or(type_name)
    }

    fn notice(&mut self, text: &str) -> Result<(), TransferError> {
        write!(self.link.display, "\r\n{}\r\n", text)
            .and_then(|_| self.link.display.flush())
            .map_err(TransferError::Display)
    }

    /// Report a fatal error and tear the session down with it
    fn fail(mut self, err: TransferError) -> TransferError {
        tracing::error!(state = Self::state_name(), bytes_sent = self.bytes_sent, "{}", err);
        let _ = write!(self.link.display, "\r\n{}\r\n", err);
        let _ = self.link.display.flush();
        err
    }

    fn conclude(&mut self) -> Result<Outcome, TransferError> {
        self.file = None;
        self.notice(NOTICE_CONCLUDED)?;
        tracing::debug!(path = %self.path.display(), bytes_sent = self.bytes_sent, "Transfer completed");
        Ok(Outcome::Completed { bytes_sent: self.bytes_sent })
    }
}

// ============================================================================
// State Implementations
// ============================================================================

impl TransferState for TransferFsm<PromptFilename> {
    fn step(self: Box<Self>) -> Result<Transition, TransferError> {
        let mut fsm = *self;
        let limit = fsm.config.filename_limit;
        let answer = prompt_filename(fsm.link.input.as_mut(), fsm.link.display.as_mut(), limit);

        match answer {
            Ok(Some(path)) => {
                tracing::debug!(path = %path.display(), "Filename accepted");
                fsm.path = path;
                let next = fsm.transition::<OpenFile>();
                Ok(Transition::Next(next))
            }
            Ok(None) => {
                fsm.notice(NOTICE_ABORTED)?;
                Ok(Transition::Done(Outcome::Cancelled))
            }
            Err(e) => Err(fsm.fail(TransferError::LocalInput(e))),
        }
    }
}

impl TransferState for TransferFsm<OpenFile> {
    fn step(self: Box<Self>) -> Result<Transition, TransferError> {
        let mut fsm = *self;

        let opened = File::open(&fsm.path).and_then(|file| {
            let metadata = file.metadata()?;
            Ok((file, metadata))
        });
        let (file, metadata) = match opened {
            Ok((file, metadata)) if metadata.is_file() => (file, metadata),
            Ok(_) => {
                tracing::debug!(path = %fsm.path.display(), "Not a regular file");
                fsm.notice(NOTICE_NOT_FOUND)?;
                return Ok(Transition::Done(Outcome::FileNotFound));
            }
            Err(e) => {
                tracing::debug!(path = %fsm.path.display(), "Open failed: {}", e);
                fsm.notice(NOTICE_NOT_FOUND)?;
                return Ok(Transition::Done(Outcome::FileNotFound));
            }
        };

        let line = match fsm.link.serial.line_settings() {
            Ok(line) => line,
            Err(e) => return Err(fsm.fail(TransferError::LineSettings(e))),
        };
        let regime = FlowRegime::classify(&line);
        fsm.clearance = Clearance::new(regime);

        fsm.file = Some(BufReader::new(file));
        fsm.file_len = metadata.len();
        fsm.bytes_sent = 0;
        tracing::debug!(path = %fsm.path.display(), len = fsm.file_len, ?regime, "Opened file");

        if fsm.file_len == 0 {
            return fsm.conclude().map(Transition::Done);
        }
        let next = fsm.transition::<Running>();
        Ok(Transition::Next(next))
    }
}

impl TransferFsm<Running> {
    fn echo(&mut self, received: usize) -> std::io::Result<()> {
        self.link.display.write_all(&self.rx_buffer[..received])?;
        self.link.display.flush()
    }

    fn next_file_byte(&mut self) -> Result<Option<u8>, TransferError> {
        let Some(file) = self.file.as_mut() else {
            return Ok(None);
        };
        file.by_ref().bytes().next().transpose().map_err(TransferError::File)
    }
}

impl TransferFsm<Running> {
    /// One pass of the loop; `Some` once the session has reached an outcome
    fn iterate(&mut self) -> Result<Option<Outcome>, TransferError> {
        // Device output first, so fresh XON/XOFF count for this iteration
        match self.link.serial.read_available(&mut self.rx_buffer) {
            Ok(None) => {}
            Ok(Some(0)) => return Err(TransferError::DeviceHangup),
            Ok(Some(n)) => {
                self.link.stats.add_received(n);
                self.echo(n).map_err(TransferError::Display)?;
                self.clearance.observe(&self.rx_buffer[..n]);
            }
            Err(e) => return Err(TransferError::DeviceRead(e)),
        }

        // Abort key is seen before the next byte goes out
        let wait = if self.clearance.is_clear() { Duration::ZERO } else { IDLE_POLL };
        match self.link.input.poll_key(wait).map_err(TransferError::LocalInput)? {
            Some(ABORT) => {
                tracing::debug!(bytes_sent = self.bytes_sent, len = self.file_len, "Transfer aborted by user");
                self.notice(NOTICE_ABORTED)?;
                return Ok(Some(Outcome::AbortedByUser { bytes_sent: self.bytes_sent }));
            }
            Some(key) => tracing::trace!("Ignoring key 0x{:02X} during transfer", key),
            None => {}
        }

        let clear = self
            .clearance
            .refresh(|| self.link.serial.clear_to_send())
            .map_err(TransferError::LineStatus)?;
        if !clear {
            return Ok(None);
        }

        let Some(byte) = self.next_file_byte()? else {
            tracing::warn!(
                bytes_sent = self.bytes_sent,
                len = self.file_len,
                "File ended before its reported size"
            );
            return self.conclude().map(Some);
        };

        let out = self.config.mapping.apply(byte);
        self.link.serial.write_all(&[out]).map_err(TransferError::DeviceWrite)?;
        self.bytes_sent += 1;
        self.link.stats.add_transmitted(1);
        tracing::trace!("Sent: 0x{:02X} ({}/{})", out, self.bytes_sent, self.file_len);

        if !self.config.byte_delay.is_zero() {
            std::thread::sleep(self.config.byte_delay);
        }

        if self.bytes_sent >= self.file_len {
            return self.conclude().map(Some);
        }
        Ok(None)
    }
}

impl TransferState for TransferFsm<Running> {
    // Stays in the same box for the whole transfer
    fn step(mut self: Box<Self>) -> Result<Transition, TransferError> {
        match self.iterate() {
            Ok(None) => Ok(Transition::Next(self)),
            Ok(Some(outcome)) => Ok(Transition::Done(outcome)),
            Err(e) => Err((*self).fail(e)),
        }
    }
}

// ============================================================================
// Constructors & Runner
// ============================================================================

impl<S> TransferFsm<S> {
    fn build(link: Link, config: TransferConfig, path: PathBuf) -> Box<Self> {
        Box::new(TransferFsm {
            state: PhantomData,
            link,
            config,
            path,
            file: None,
            file_len: 0,
            bytes_sent: 0,
            clearance: Clearance::new(FlowRegime::None),
            rx_buffer: [0; RX_CHUNK],
        })
    }
}

impl TransferFsm<PromptFilename> {
    /// Session that starts by asking the operator for the file name
    pub fn new(link: Link, config: TransferConfig) -> Box<dyn TransferState> {
        TransferFsm::<PromptFilename>::build(link, config, PathBuf::new())
    }
}

impl TransferFsm<OpenFile> {
    /// Session for a file name that is already known
    pub fn with_filename(link: Link, config: TransferConfig, path: PathBuf) -> Box<dyn TransferState> {
        TransferFsm::<OpenFile>::build(link, config, path)
    }
}

/// Drive a session to its end.
///
/// On error the session has already reported it on the display and released
/// the serial port; the caller should disconnect.
pub fn send_file(mut state: Box<dyn TransferState>) -> Result<Outcome, TransferError> {
    loop {
        match state.step()? {
            Transition::Next(next) => state = next,
            Transition::Done(outcome) => return Ok(outcome),
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::console::{BrokenKeyboard, MockKeyboard, SharedDisplay};
    use crate::flow::LineSettings;
    use crate::prompt::DEFAULT_LIMIT;
    use crate::serial::{MockRead, MockSerialPort};
    use std::time::Instant;

    struct Harness {
        display: SharedDisplay,
        stats: Arc<Statistics>,
    }

    fn link(serial: MockSerialPort, input: Box<dyn LocalInput>) -> (Link, Harness) {
        let display = SharedDisplay::default();
        let stats = Arc::new(Statistics::default());
        let link = Link {
            serial: Box::new(serial),
            input,
            display: Box::new(display.clone()),
            stats: stats.clone(),
        };
        (link, Harness { display, stats })
    }

    fn config() -> TransferConfig {
        TransferConfig {
            mapping: OutputMapping::default(),
            byte_delay: Duration::ZERO,
            filename_limit: DEFAULT_LIMIT,
        }
    }

    fn temp_file(name: &str, contents: &[u8]) -> PathBuf {
        let path = std::env::temp_dir().join(name);
        std::fs::write(&path, contents).unwrap();
        path
    }

    fn run_sender(mut fsm: Box<dyn TransferState>) -> (Result<Outcome, TransferError>, usize) {
        let mut steps = 0;
        loop {
            steps += 1;
            match fsm.step() {
                Ok(Transition::Next(next)) => fsm = next,
                Ok(Transition::Done(outcome)) => return (Ok(outcome), steps),
                Err(e) => return (Err(e), steps),
            }
        }
    }

    #[test]
    fn test_hello_through_prompt() {
        let path = temp_file("ttysend_hello.txt", b"HELLO");
        let mut keys = path.to_str().unwrap().as_bytes().to_vec();
        keys.push(CR);

        let serial = MockSerialPort::new(vec![], b"HELLO".to_vec());
        let (link, harness) = link(serial, Box::new(MockKeyboard::typing(&keys)));

        let outcome = send_file(TransferFsm::new(link, config())).unwrap();
        assert_eq!(outcome, Outcome::Completed { bytes_sent: 5 });
        assert_eq!(harness.stats.transmitted(), 5);

        let display = harness.display.contents();
        assert!(display.starts_with("\r\nEnter file name to send: "));
        assert!(display.ends_with("\r\nFile send concluded!\r\n"));

        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn test_prompt_escape_cancels() {
        let serial = MockSerialPort::new(vec![], vec![]);
        let (link, harness) = link(serial, Box::new(MockKeyboard::typing(b"abort\x1b")));

        let outcome = send_file(TransferFsm::new(link, config())).unwrap();
        assert_eq!(outcome, Outcome::Cancelled);
        assert!(harness.display.contents().ends_with("\r\nSend file aborted by user!\r\n"));
    }

    #[test]
    fn test_prompt_read_failure() {
        let serial = MockSerialPort::new(vec![], vec![]);
        let (link, harness) = link(serial, Box::new(BrokenKeyboard));

        let err = send_file(TransferFsm::new(link, config())).unwrap_err();
        assert!(matches!(err, TransferError::LocalInput(_)));
        assert!(harness.display.contents().contains("Could not read from stdin"));
    }

    #[test]
    fn test_file_not_found() {
        let path = std::env::temp_dir().join("ttysend_does_not_exist.txt");
        let serial = MockSerialPort::new(vec![], vec![]);
        let (link, harness) = link(serial, Box::new(MockKeyboard::new(vec![])));

        let outcome = send_file(TransferFsm::with_filename(link, config(), path)).unwrap();
        assert_eq!(outcome, Outcome::FileNotFound);
        assert!(harness.display.contents().contains("Operation aborted: file not found!"));
        assert_eq!(harness.stats.transmitted(), 0);
    }

    #[test]
    fn test_directory_is_not_sent() {
        let serial = MockSerialPort::new(vec![], vec![]);
        let (link, _harness) = link(serial, Box::new(MockKeyboard::new(vec![])));

        let outcome = send_file(TransferFsm::with_filename(link, config(), std::env::temp_dir())).unwrap();
        assert_eq!(outcome, Outcome::FileNotFound);
    }

    #[test]
    fn test_empty_file_completes_without_transmitting() {
        let path = temp_file("ttysend_empty.txt", b"");
        let serial = MockSerialPort::new(vec![], vec![]);
        let (link, harness) = link(serial, Box::new(MockKeyboard::new(vec![])));

        let (outcome, steps) = run_sender(TransferFsm::with_filename(link, config(), path.clone()));
        assert_eq!(outcome.unwrap(), Outcome::Completed { bytes_sent: 0 });
        assert_eq!(steps, 1);
        assert!(harness.display.contents().contains("File send concluded!"));

        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn test_one_byte_per_iteration_without_flow_control() {
        let contents: Vec<u8> = (0..200u32).map(|i| (i % 256) as u8).collect();
        let path = temp_file("ttysend_plain.bin", &contents);
        let serial = MockSerialPort::new(vec![], contents.clone());
        let (link, harness) = link(serial, Box::new(MockKeyboard::new(vec![])));

        let (outcome, steps) = run_sender(TransferFsm::with_filename(link, config(), path.clone()));
        assert_eq!(outcome.unwrap(), Outcome::Completed { bytes_sent: 200 });
        // One open step, then one step per byte
        assert_eq!(steps, 201);
        assert_eq!(harness.stats.transmitted(), 200);

        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn test_device_output_is_echoed_and_counted() {
        let path = temp_file("ttysend_echo.txt", b"ab");
        let script = vec![MockRead::Byte(b'o'), MockRead::Byte(b'k')];
        let serial = MockSerialPort::new(script, b"ab".to_vec());
        let (link, harness) = link(serial, Box::new(MockKeyboard::new(vec![])));
        harness.stats.add_received(100);

        let outcome = send_file(TransferFsm::with_filename(link, config(), path.clone())).unwrap();
        assert_eq!(outcome, Outcome::Completed { bytes_sent: 2 });
        assert_eq!(harness.stats.received(), 102);
        assert!(harness.display.contents().starts_with("ok"));

        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn test_software_flow_pauses_and_resumes() {
        let path = temp_file("ttysend_xonxoff.txt", b"ABC");
        let script = vec![
            MockRead::Quiet,
            MockRead::Byte(XOFF),
            MockRead::Quiet,
            MockRead::Quiet,
            MockRead::Byte(XON),
        ];
        let line = LineSettings { ixon: true, ixoff: true, ..Default::default() };
        let serial = MockSerialPort::new(script, b"ABC".to_vec()).with_line(line);
        let (link, harness) = link(serial, Box::new(MockKeyboard::new(vec![])));

        let (outcome, steps) = run_sender(TransferFsm::with_filename(link, config(), path.clone()));
        assert_eq!(outcome.unwrap(), Outcome::Completed { bytes_sent: 3 });
        // Open, send A, XOFF, two paused polls, XON + send B, send C
        assert_eq!(steps, 7);
        assert_eq!(harness.stats.received(), 2);

        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn test_hardware_flow_follows_cts() {
        let path = temp_file("ttysend_ctsgate.txt", b"AB");
        let line = LineSettings { rts_cts: true, ixon: true, ixoff: false };
        let serial = MockSerialPort::new(vec![], b"AB".to_vec())
            .with_line(line)
            .with_cts(vec![Some(false), Some(true), Some(false), Some(true)]);
        let (link, _harness) = link(serial, Box::new(MockKeyboard::new(vec![])));

        let (outcome, steps) = run_sender(TransferFsm::with_filename(link, config(), path.clone()));
        assert_eq!(outcome.unwrap(), Outcome::Completed { bytes_sent: 2 });
        assert_eq!(steps, 5);

        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn test_hardware_status_failure_is_fatal() {
        let path = temp_file("ttysend_ctsfail.txt", b"ABC");
        let line = LineSettings { rts_cts: true, ..Default::default() };
        let serial = MockSerialPort::new(vec![], b"A".to_vec())
            .with_line(line)
            .with_cts(vec![Some(true), None]);
        let (link, harness) = link(serial, Box::new(MockKeyboard::new(vec![])));

        let err = send_file(TransferFsm::with_filename(link, config(), path.clone())).unwrap_err();
        assert!(matches!(err, TransferError::LineStatus(_)));
        assert!(harness.display.contents().contains("Could not get line state: Mock TIOCMGET failure"));
        assert_eq!(harness.stats.transmitted(), 1);

        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn test_abort_key_stops_transfer() {
        let path = temp_file("ttysend_abort.txt", b"ABCDEF");
        let serial = MockSerialPort::new(vec![], b"AB".to_vec());
        let keys = vec![None, Some(b'q'), Some(ABORT)];
        let (link, harness) = link(serial, Box::new(MockKeyboard::new(keys)));

        let outcome = send_file(TransferFsm::with_filename(link, config(), path.clone())).unwrap();
        assert_eq!(outcome, Outcome::AbortedByUser { bytes_sent: 2 });

        let display = harness.display.contents();
        assert!(display.contains("Send file aborted by user!"));
        assert!(!display.contains("File send concluded!"));

        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn test_abort_key_while_paused_by_xoff() {
        let path = temp_file("ttysend_abort_xoff.txt", b"ABC");
        let line = LineSettings { ixon: true, ..Default::default() };
        let serial = MockSerialPort::new(vec![MockRead::Byte(XOFF)], vec![]).with_line(line);
        let keys = vec![None, Some(ABORT)];
        let (link, harness) = link(serial, Box::new(MockKeyboard::new(keys)));

        let (outcome, steps) = run_sender(TransferFsm::with_filename(link, config(), path.clone()));
        assert_eq!(outcome.unwrap(), Outcome::AbortedByUser { bytes_sent: 0 });
        assert_eq!(steps, 3);
        assert_eq!(harness.stats.transmitted(), 0);
        assert!(harness.display.contents().contains("Send file aborted by user!"));

        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn test_abort_key_while_cts_low() {
        let path = temp_file("ttysend_abort_cts.txt", b"ABC");
        let line = LineSettings { rts_cts: true, ..Default::default() };
        let serial = MockSerialPort::new(vec![], b"A".to_vec())
            .with_line(line)
            .with_cts(vec![Some(true), Some(false)]);
        let keys = vec![None, None, Some(ABORT)];
        let (link, _harness) = link(serial, Box::new(MockKeyboard::new(keys)));

        let outcome = send_file(TransferFsm::with_filename(link, config(), path.clone())).unwrap();
        assert_eq!(outcome, Outcome::AbortedByUser { bytes_sent: 1 });

        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn test_byte_delay_paces_each_byte() {
        let path = temp_file("ttysend_paced.txt", b"PACED");
        let serial = MockSerialPort::new(vec![], b"PACED".to_vec());
        let (link, _harness) = link(serial, Box::new(MockKeyboard::new(vec![])));
        let config = TransferConfig { byte_delay: Duration::from_millis(20), ..config() };

        let start = Instant::now();
        let outcome = send_file(TransferFsm::with_filename(link, config, path.clone())).unwrap();
        assert_eq!(outcome, Outcome::Completed { bytes_sent: 5 });
        assert!(start.elapsed() >= Duration::from_millis(100));

        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn test_paused_iterations_do_not_sleep() {
        let path = temp_file("ttysend_paused_delay.txt", b"Z");
        let line = LineSettings { rts_cts: true, ..Default::default() };
        let serial = MockSerialPort::new(vec![], b"Z".to_vec())
            .with_line(line)
            .with_cts(vec![Some(false), Some(false), Some(false), Some(true)]);
        let (link, _harness) = link(serial, Box::new(MockKeyboard::new(vec![])));
        let delay = Duration::from_millis(150);
        let config = TransferConfig { byte_delay: delay, ..config() };

        let start = Instant::now();
        let (outcome, steps) = run_sender(TransferFsm::with_filename(link, config, path.clone()));
        let elapsed = start.elapsed();
        assert_eq!(outcome.unwrap(), Outcome::Completed { bytes_sent: 1 });
        assert_eq!(steps, 5);
        // One delay for the single byte; three paused passes would add three more
        assert!(elapsed >= delay);
        assert!(elapsed < delay * 3);

        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn test_device_read_failure_is_fatal() {
        let path = temp_file("ttysend_readfail.txt", b"ABC");
        let script = vec![MockRead::Byte(b'z'), MockRead::Fail];
        let serial = MockSerialPort::new(script, b"A".to_vec());
        let (link, harness) = link(serial, Box::new(MockKeyboard::new(vec![])));

        let err = send_file(TransferFsm::with_filename(link, config(), path.clone())).unwrap_err();
        assert!(matches!(err, TransferError::DeviceRead(_)));
        assert!(harness.display.contents().contains("Could not read from tty device"));

        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn test_device_hangup_is_fatal() {
        let path = temp_file("ttysend_hangup.txt", b"ABC");
        let script = vec![MockRead::Quiet, MockRead::Hangup];
        let serial = MockSerialPort::new(script, b"A".to_vec());
        let (link, _harness) = link(serial, Box::new(MockKeyboard::new(vec![])));

        let err = send_file(TransferFsm::with_filename(link, config(), path.clone())).unwrap_err();
        assert!(matches!(err, TransferError::DeviceHangup));

        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn test_device_write_failure_is_fatal() {
        let path = temp_file("ttysend_writefail.txt", b"AB");
        let serial = MockSerialPort::new(vec![], b"A".to_vec()).with_write_limit(1);
        let (link, _harness) = link(serial, Box::new(MockKeyboard::new(vec![])));

        let err = send_file(TransferFsm::with_filename(link, config(), path.clone())).unwrap_err();
        assert!(matches!(err, TransferError::DeviceWrite(_)));

        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn test_local_input_failure_is_fatal() {
        let path = temp_file("ttysend_stdinfail.txt", b"AB");
        let serial = MockSerialPort::new(vec![], vec![]);
        let (link, _harness) = link(serial, Box::new(BrokenKeyboard));

        let err = send_file(TransferFsm::with_filename(link, config(), path.clone())).unwrap_err();
        assert!(matches!(err, TransferError::LocalInput(_)));

        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn test_output_mapping_applied() {
        let path = temp_file("ttysend_mapping.txt", b"a\nb\r");
        let serial = MockSerialPort::new(vec![], b"a\rb\r".to_vec());
        let (link, _harness) = link(serial, Box::new(MockKeyboard::new(vec![])));
        let config = TransferConfig {
            mapping: OutputMapping { nl_to_crnl: true, cr_to_nl: false },
            ..config()
        };

        let outcome = send_file(TransferFsm::with_filename(link, config, path.clone())).unwrap();
        assert_eq!(outcome, Outcome::Completed { bytes_sent: 4 });

        std::fs::remove_file(&path).ok();
    }
}
