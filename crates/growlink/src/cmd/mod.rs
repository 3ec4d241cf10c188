use clap::{Args, Subcommand};
use std::io::Write;
use std::path::{Path, PathBuf};

use growlink_transport::{ReplayStream, UartLink};

use crate::config::ConfigFile;
use crate::exit::{io_error, CliResult};
use crate::output::OutputFormat;

pub mod decode;
pub mod replay;
pub mod serve;
pub mod version;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Answer web requests arriving through a serial bridge.
    Serve(ServeArgs),
    /// Run the dispatcher over a captured byte stream.
    Replay(ReplayArgs),
    /// Classify a captured byte stream and print the events.
    Decode(DecodeArgs),
    /// Show version information.
    Version(VersionArgs),
}

pub fn run(command: Command, format: OutputFormat, config: &ConfigFile) -> CliResult<i32> {
    match command {
        Command::Serve(args) => serve::run(args, format, config),
        Command::Replay(args) => replay::run(args, format, config),
        Command::Decode(args) => decode::run(args, format, config),
        Command::Version(args) => version::run(args),
    }
}

#[derive(Args, Debug)]
pub struct ServeArgs {
    /// Serial bridge socket to connect to.
    pub path: PathBuf,
    /// Exit after handling N events.
    #[arg(long)]
    pub count: Option<usize>,
    /// Read timeout override (e.g. 250ms, 1s).
    #[arg(long)]
    pub read_timeout: Option<String>,
}

#[derive(Args, Debug)]
pub struct ReplayArgs {
    /// Capture file holding bytes received from the co-processor.
    pub capture: PathBuf,
    /// Include the escaped outbound bytes of every dispatch.
    #[arg(long)]
    pub show_output: bool,
    /// Report idle cycles too.
    #[arg(long)]
    pub all: bool,
}

#[derive(Args, Debug)]
pub struct DecodeArgs {
    /// Capture file holding bytes received from the co-processor.
    pub capture: PathBuf,
    /// Report idle cycles too.
    #[arg(long)]
    pub all: bool,
}

#[derive(Args, Debug)]
pub struct VersionArgs {
    /// Show extended build provenance.
    #[arg(long)]
    pub extended: bool,
}

/// Link over a capture file. Captures hold no acknowledgements, so none are
/// awaited whatever the config says.
fn replay_link<C: Write>(
    capture: &Path,
    console: C,
    config: &ConfigFile,
) -> CliResult<UartLink<ReplayStream, C>> {
    let bytes = std::fs::read(capture)
        .map_err(|err| io_error(&format!("read capture {}", capture.display()), err))?;
    let mut link_config = config.link_config()?;
    link_config.await_ack = false;
    Ok(UartLink::with_console(
        ReplayStream::new(bytes),
        console,
        link_config,
    ))
}

/// True once a replayed capture has nothing left to classify.
fn capture_drained<C: Write>(link: &UartLink<ReplayStream, C>) -> bool {
    link.is_closed() && link.buffered() == 0
}
