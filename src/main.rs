mod cli;
mod core;
mod utils;

use anyhow::Result;
use clap::Parser;
use cli::{Cli, Cmd};
use log::LevelFilter;

#[cfg(windows)]
fn enable_utf8_output() {
    use windows_sys::Win32::System::Console::SetConsoleOutputCP;
    unsafe {
        SetConsoleOutputCP(65001);
    }
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    };
    env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .init();
}

fn main() -> Result<()> {
    #[cfg(windows)]
    enable_utf8_output();
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match &cli.cmd {
        Some(Cmd::Tree { .. }) => core::tree::run_tree(&cli),
        Some(Cmd::Sqlite { database }) => core::sqlite::run_sqlite(database),
        None => {
            let code = core::probe::run_probe(&cli)?;
            std::process::exit(code);
        }
    }
}
