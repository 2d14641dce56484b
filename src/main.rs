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

// Send-file session for a serial terminal
mod console;
mod flow;
mod logging;
mod mapping;
mod prompt;
mod protocol;
mod sender;
mod serial;
mod stats;

use clap::{Parser, ValueEnum};
use serialport::{DataBits, FlowControl, Parity, StopBits};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use console::{RawMode, Stdin};
use logging::LogLevel;
use mapping::OutputMapping;
use sender::{Link, Outcome, TransferConfig, TransferFsm};
use serial::RealSerialPort;
use stats::Statistics;

#[derive(Parser)]
#[command(name = "ttysend")]
#[command(about = "Send a file over a serial line with flow control, echoing device output", long_about = None)]
struct Cli {
    /// Serial port to use (e.g., /dev/ttyUSB0)
    #[arg(short, long)]
    port: String,

    /// Baud rate
    #[arg(short, long, default_value = "9600")]
    baud: u32,

    /// Data bits (5, 6, 7, or 8)
    #[arg(long, default_value = "8", value_name = "BITS")]
    data_bits: u8,

    /// Parity (none, odd, or even)
    #[arg(long, default_value = "none")]
    parity: String,

    /// Stop bits (1 or 2)
    #[arg(long, default_value = "1", value_name = "BITS")]
    stop_bits: u8,

    /// Flow control
    #[arg(long, value_enum, default_value = "none")]
    flow: Flow,

    /// Delay in milliseconds after each transmitted byte
    #[arg(long, default_value = "0", value_name = "MS")]
    output_delay: u64,

    /// Output line-ending mapping (comma separated)
    #[arg(long, value_enum, value_delimiter = ',')]
    map: Vec<MapFlag>,

    /// Longest file name accepted at the prompt
    #[arg(long, default_value_t = prompt::DEFAULT_LIMIT, value_name = "CHARS")]
    limit: usize,

    /// Log level for diagnostics written to stderr
    #[arg(long, value_enum, default_value = "warn")]
    log_level: LogLevel,

    /// Enable debug output (same as --log-level debug)
    #[arg(long)]
    debug: bool,

    /// File to send; prompts for a name when omitted
    file: Option<PathBuf>,
}

#[derive(Copy, Clone, Debug, ValueEnum)]
enum Flow {
    None,
    Hard,
    Soft,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
enum MapFlag {
    /// Map NL to CR-NL on output
    Onlcrnl,
    /// Map CR to NL on output
    Ocrnl,
}

fn parse_data_bits(bits: u8) -> Result<DataBits, String> {
    match bits {
        5 => Ok(DataBits::Five),
        6 => Ok(DataBits::Six),
        7 => Ok(DataBits::Seven),
        8 => Ok(DataBits::Eight),
        _ => Err(format!("Invalid data bits: {}. Must be 5, 6, 7, or 8", bits)),
    }
}

fn parse_parity(parity: &str) -> Result<Parity, String> {
    match parity.to_lowercase().as_str() {
        "none" => Ok(Parity::None),
        "odd" => Ok(Parity::Odd),
        "even" => Ok(Parity::Even),
        _ => Err(format!("Invalid parity: {}. Must be 'none', 'odd', or 'even'", parity)),
    }
}

fn parse_stop_bits(bits: u8) -> Result<StopBits, String> {
    match bits {
        1 => Ok(StopBits::One),
        2 => Ok(StopBits::Two),
        _ => Err(format!("Invalid stop bits: {}. Must be 1 or 2", bits)),
    }
}

fn flow_control(flow: Flow) -> FlowControl {
    match flow {
        Flow::None => FlowControl::None,
        Flow::Hard => FlowControl::Hardware,
        Flow::Soft => FlowControl::Software,
    }
}

fn output_mapping(flags: &[MapFlag]) -> OutputMapping {
    OutputMapping {
        nl_to_crnl: flags.contains(&MapFlag::Onlcrnl),
        cr_to_nl: flags.contains(&MapFlag::Ocrnl),
    }
}

fn exit_with(message: String) -> ! {
    eprintln!("Error: {}", message);
    std::process::exit(1);
}

fn main() {
    let cli = Cli::parse();

    let level = if cli.debug { LogLevel::Debug } else { cli.log_level };
    logging::init_logging(level);

    let data_bits = parse_data_bits(cli.data_bits).unwrap_or_else(|e| exit_with(e));
    let parity = parse_parity(&cli.parity).unwrap_or_else(|e| exit_with(e));
    let stop_bits = parse_stop_bits(cli.stop_bits).unwrap_or_else(|e| exit_with(e));
    let flow = flow_control(cli.flow);

    println!("Opening serial port: {}", cli.port);
    println!("Settings: {} baud, {:?}, {:?}, {:?}, flow {:?}", cli.baud, data_bits, parity, stop_bits, flow);

    let serial_port = match RealSerialPort::open(&cli.port, cli.baud, data_bits, parity, stop_bits, flow) {
        Ok(port) => port,
        Err(e) => {
            eprintln!("Failed to open serial port: {}", e);
            std::process::exit(1);
        }
    };

    let raw_mode = match RawMode::enter() {
        Ok(guard) => Some(guard),
        Err(e) => {
            tracing::warn!("Keystrokes will be line buffered: {}", e);
            None
        }
    };

    let stats = Arc::new(Statistics::default());
    let link = Link {
        serial: Box::new(serial_port),
        input: Box::new(Stdin::new()),
        display: Box::new(std::io::stdout()),
        stats: stats.clone(),
    };
    let config = TransferConfig {
        mapping: output_mapping(&cli.map),
        byte_delay: Duration::from_millis(cli.output_delay),
        filename_limit: cli.limit,
    };

    let session = match cli.file {
        Some(file) => TransferFsm::with_filename(link, config, file),
        None => TransferFsm::new(link, config),
    };
    let result = sender::send_file(session);
    drop(raw_mode);

    match result {
        Ok(outcome) => {
            tracing::info!(?outcome, "Session finished");
            if let Outcome::Completed { bytes_sent } | Outcome::AbortedByUser { bytes_sent } = outcome {
                tracing::debug!("{} bytes of file data transmitted", bytes_sent);
            }
            println!("Sent {} bytes, received {} bytes", stats.transmitted(), stats.received());
        }
        Err(e) => {
            eprintln!("Disconnected: {}", e);
            println!("Sent {} bytes, received {} bytes", stats.transmitted(), stats.received());
            std::process::exit(1);
        }
    }
}
