use std::collections::BTreeMap;
use std::env;
use std::ffi::OsString;
use std::io::{self, Write};
use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::{Local, NaiveTime};
use log::debug;
use rand::Rng;
use termcolor::StandardStream;

use crate::cli::{Cli, ColorMode, Format, Section};
use crate::core::marker::{self, MarkerState};
use crate::core::tree::{write_json, write_plain, TreeLines, TreeOptions};
use crate::utils::color_choice;

/// Everything the host probe needs, resolved from the command line.
#[derive(Debug, Clone)]
pub struct ProbeConfig {
    pub args: Vec<String>,
    pub root: PathBuf,
    pub tree: TreeOptions,
    pub format: Format,
    pub color: ColorMode,
    pub marker: PathBuf,
    pub exit_code: i32,
    pub skip: Vec<Section>,
}

impl ProbeConfig {
    pub fn from_cli(cli: &Cli) -> Self {
        Self {
            args: env::args_os()
                .map(|a| a.to_string_lossy().into_owned())
                .collect(),
            root: cli.tree_root(),
            tree: TreeOptions::from_cli(cli),
            format: cli.format,
            color: cli.color,
            marker: cli.marker.clone(),
            exit_code: cli.exit_code,
            skip: cli.skip.clone(),
        }
    }

    fn wants(&self, section: Section) -> bool {
        !self.skip.contains(&section)
    }
}

pub fn greeting() -> String {
    format!(
        "Hello from rust on {} {}",
        env::consts::OS,
        env::consts::FAMILY
    )
}

pub fn write_host<W: Write + ?Sized, R: Rng>(
    out: &mut W,
    rng: &mut R,
    now: NaiveTime,
) -> io::Result<()> {
    writeln!(out, "{}", greeting())?;
    writeln!(out, "random: {}", rng.gen_range(0..=999u32))?;
    writeln!(out, "time: {}", now.format("%H:%M:%S%.6f"))
}

pub fn write_args<W: Write + ?Sized>(out: &mut W, args: &[String]) -> io::Result<()> {
    writeln!(out)?;
    writeln!(out, "### Arguments ###")?;
    writeln!(out, "{args:?}")
}

/// Environment variables as `KEY: VALUE`, sorted by key.
pub fn write_env<W: Write + ?Sized>(
    out: &mut W,
    vars: impl IntoIterator<Item = (OsString, OsString)>,
) -> io::Result<()> {
    let sorted: BTreeMap<String, String> = vars
        .into_iter()
        .map(|(k, v)| {
            (
                k.to_string_lossy().into_owned(),
                v.to_string_lossy().into_owned(),
            )
        })
        .collect();

    writeln!(out)?;
    writeln!(out, "### Env Vars ###")?;
    for (k, v) in &sorted {
        writeln!(out, "{k}: {v}")?;
    }
    Ok(())
}

pub fn write_touch<W: Write + ?Sized>(out: &mut W, state: MarkerState) -> io::Result<()> {
    writeln!(out)?;
    writeln!(out, "### Touch")?;
    if state == MarkerState::SecondRun {
        writeln!(out, "second run")?;
    }
    Ok(())
}

/// Run the full report and return the exit status for the process.
pub fn run_probe(cli: &Cli) -> Result<i32> {
    let cfg = ProbeConfig::from_cli(cli);
    debug!("probe config: {:?}", cfg);
    let mut out = StandardStream::stdout(color_choice(cfg.color));

    if cfg.wants(Section::Host) {
        write_host(&mut out, &mut rand::thread_rng(), Local::now().time())?;
    }
    if cfg.wants(Section::Args) {
        write_args(&mut out, &cfg.args)?;
    }
    if cfg.wants(Section::Env) {
        write_env(&mut out, env::vars_os())?;
    }

    if cfg.wants(Section::Tree) {
        writeln!(out)?;
        writeln!(out, "### Recursive Files")?;
        let lines = TreeLines::new(&cfg.root, cfg.tree.clone());
        let count = match cfg.format {
            Format::Plain => write_plain(&mut out, &cfg.root, lines),
            Format::Json => write_json(&mut out, &cfg.root, lines),
        }
        .with_context(|| format!("rendering tree below {}", cfg.root.display()))?;
        debug!("rendered {count} entries");
    }

    if cfg.wants(Section::Touch) {
        let state = marker::check_and_touch(&cfg.marker)
            .with_context(|| format!("touching marker {}", cfg.marker.display()))?;
        write_touch(&mut out, state)?;
    }

    out.flush()?;
    Ok(cfg.exit_code)
}
