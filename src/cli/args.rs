use clap::{ArgAction, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "probetree")]
#[command(
    version,
    about = "Print host diagnostics and a directory tree, then exit with a fixed status"
)]
pub struct Cli {
    #[command(subcommand)]
    pub cmd: Option<Cmd>,

    /// Root directory to render
    #[arg(long, global = true, default_value = "/")]
    pub root: PathBuf,

    /// Entry ordering inside each directory
    #[arg(long, global = true, value_enum, default_value_t = SortMode::Name)]
    pub sort: SortMode,

    /// Directories before other entries
    #[arg(long, global = true, action = ArgAction::SetTrue)]
    pub dirs_first: bool,

    /// List symlinked directories without descending into them
    #[arg(long, global = true, action = ArgAction::SetTrue)]
    pub no_follow_symlinks: bool,

    /// Do not descend below this many levels (1 = only the root's children)
    #[arg(long, global = true)]
    pub max_depth: Option<usize>,

    /// Tree output format
    #[arg(long, global = true, value_enum, default_value_t = Format::Plain)]
    pub format: Format,

    /// Color output
    #[arg(long, global = true, value_enum, default_value_t = ColorMode::Never)]
    pub color: ColorMode,

    /// Enable debug logging (repeat for trace)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,

    /// Marker file used to detect a repeated run
    #[arg(long, default_value = "indicator")]
    pub marker: PathBuf,

    /// Exit status of a completed probe
    #[arg(long, default_value_t = 17)]
    pub exit_code: i32,

    /// Report section to omit (repeatable)
    #[arg(long = "skip", value_enum)]
    pub skip: Vec<Section>,
}

#[derive(Subcommand, Debug)]
pub enum Cmd {
    /// Render only the directory tree
    Tree {
        /// Root path, overrides --root
        path: Option<PathBuf>,
    },
    /// Run the SQLite smoke test: integrity check, create a table, insert a row
    Sqlite {
        /// Database to open; ":memory:" keeps it in memory
        #[arg(long, default_value = ":memory:")]
        database: String,
    },
}

#[derive(Copy, Clone, Debug, Default, ValueEnum, PartialEq, Eq)]
pub enum SortMode {
    /// Keep the order returned by the directory listing
    None,
    /// Lexicographic by file name
    #[default]
    Name,
}

#[derive(Copy, Clone, Debug, ValueEnum, PartialEq, Eq)]
pub enum Section {
    Host,
    Args,
    Env,
    Tree,
    Touch,
}

#[derive(Copy, Clone, Debug, ValueEnum)]
pub enum ColorMode {
    Auto,
    Always,
    Never,
}

#[derive(Copy, Clone, Debug, ValueEnum, PartialEq, Eq)]
pub enum Format {
    Plain,
    Json,
}

impl Cli {
    /// Root for the tree, honoring the `tree` subcommand's positional path.
    pub fn tree_root(&self) -> PathBuf {
        match &self.cmd {
            Some(Cmd::Tree { path: Some(path) }) => path.clone(),
            _ => self.root.clone(),
        }
    }
}
