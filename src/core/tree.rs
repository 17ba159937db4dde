use std::fs;
use std::io::{self, BufWriter, Write};
use std::iter::FusedIterator;
use std::path::{Path, PathBuf};

use anyhow::Result;
use log::{debug, trace};
use serde::Serialize;
use termcolor::{Color, ColorSpec, StandardStream, WriteColor};

use crate::cli::{Cli, Format, SortMode};
use crate::core::error::TreeError;
use crate::utils::{color_choice, dir_identity, order_entries, EntryKind, EntryMeta, Frame};

pub const BRANCH: &str = "├── ";
pub const CORNER: &str = "└── ";
pub const CONTINUATION: &str = "│   ";
pub const BLANK: &str = "    ";

/// Traversal knobs, translated from the command line.
#[derive(Clone, Debug)]
pub struct TreeOptions {
    pub sort: SortMode,
    pub dirs_first: bool,
    pub follow_symlinks: bool,
    pub max_depth: Option<usize>,
}

impl Default for TreeOptions {
    fn default() -> Self {
        Self {
            sort: SortMode::default(),
            dirs_first: false,
            follow_symlinks: true,
            max_depth: None,
        }
    }
}

impl TreeOptions {
    pub fn from_cli(cli: &Cli) -> Self {
        Self {
            sort: cli.sort,
            dirs_first: cli.dirs_first,
            follow_symlinks: !cli.no_follow_symlinks,
            max_depth: cli.max_depth,
        }
    }
}

/// A single rendered row of the tree.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TreeLine {
    pub prefix: String,
    pub connector: &'static str,
    pub name: String,
    pub path: PathBuf,
    pub depth: usize,
    pub kind: EntryKind,
    pub is_last: bool,
}

impl TreeLine {
    pub fn render(&self) -> String {
        format!("{}{}{}", self.prefix, self.connector, self.name)
    }
}

struct Descent {
    path: PathBuf,
    prefix: String,
    depth: usize,
}

/// Depth-first, pre-order stream of tree lines below a root directory.
///
/// Nothing is read until the first call to `next`. A child directory is
/// listed only after its own line has been handed out. The first error ends
/// the stream.
pub struct TreeLines {
    opts: TreeOptions,
    root: Option<PathBuf>,
    stack: Vec<Frame>,
    descend: Option<Descent>,
    done: bool,
}

impl TreeLines {
    pub fn new(root: impl Into<PathBuf>, opts: TreeOptions) -> Self {
        Self {
            opts,
            root: Some(root.into()),
            stack: Vec::new(),
            descend: None,
            done: false,
        }
    }

    fn open_root(&mut self, root: &Path) -> Result<(), TreeError> {
        let md = fs::metadata(root).map_err(|e| TreeError::from_io(root, e))?;
        if !md.is_dir() {
            return Err(TreeError::NotADirectory {
                path: root.to_path_buf(),
            });
        }
        if self.opts.max_depth == Some(0) {
            return Ok(());
        }
        let frame = self.read_frame(root, String::new(), 1)?;
        self.stack.push(frame);
        Ok(())
    }

    fn read_frame(&self, path: &Path, prefix: String, depth: usize) -> Result<Frame, TreeError> {
        let md = fs::metadata(path).map_err(|e| TreeError::from_io(path, e))?;
        if !md.is_dir() {
            return Err(TreeError::NotADirectory {
                path: path.to_path_buf(),
            });
        }
        let id = dir_identity(path).map_err(|e| TreeError::from_io(path, e))?;
        if self.stack.iter().any(|f| f.id == id) {
            debug!("refusing to re-enter {}", path.display());
            return Err(TreeError::LinkCycle {
                path: path.to_path_buf(),
            });
        }

        trace!("listing {}", path.display());
        let rd = fs::read_dir(path).map_err(|e| TreeError::from_io(path, e))?;
        let mut entries = Vec::new();
        for de in rd {
            let de = de.map_err(|e| TreeError::from_io(path, e))?;
            let meta = EntryMeta::build(&de).map_err(|e| TreeError::from_io(&de.path(), e))?;
            entries.push(meta);
        }
        order_entries(&mut entries, self.opts.sort, self.opts.dirs_first);

        Ok(Frame {
            entries,
            idx: 0,
            prefix,
            depth,
            id,
        })
    }

    fn should_descend(&self, entry: &EntryMeta, depth: usize) -> bool {
        let descend = match entry.kind {
            EntryKind::Dir => true,
            EntryKind::Symlink => self.opts.follow_symlinks && entry.target_is_dir,
            _ => false,
        };
        descend && self.opts.max_depth.map_or(true, |max| depth < max)
    }

    fn fail(&mut self, err: TreeError) -> Option<<Self as Iterator>::Item> {
        debug!("walk aborted at {}", err.path().display());
        self.done = true;
        self.stack.clear();
        self.descend = None;
        Some(Err(err))
    }
}

impl Iterator for TreeLines {
    type Item = Result<TreeLine, TreeError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        if let Some(root) = self.root.take() {
            if let Err(err) = self.open_root(&root) {
                return self.fail(err);
            }
        }

        if let Some(Descent {
            path,
            prefix,
            depth,
        }) = self.descend.take()
        {
            match self.read_frame(&path, prefix, depth) {
                Ok(frame) => self.stack.push(frame),
                Err(err) => return self.fail(err),
            }
        }

        while let Some(frame) = self.stack.last_mut() {
            if frame.is_exhausted() {
                self.stack.pop();
                continue;
            }

            let idx = frame.idx;
            frame.idx += 1;
            let is_last = idx + 1 == frame.entries.len();
            let depth = frame.depth;
            let prefix = frame.prefix.clone();
            let entry = frame.entries[idx].clone();

            let (connector, continuation) = if is_last {
                (CORNER, BLANK)
            } else {
                (BRANCH, CONTINUATION)
            };

            if self.should_descend(&entry, depth) {
                self.descend = Some(Descent {
                    path: entry.path.clone(),
                    prefix: format!("{prefix}{continuation}"),
                    depth: depth + 1,
                });
            }

            return Some(Ok(TreeLine {
                prefix,
                connector,
                name: entry.display_name(),
                path: entry.path,
                depth,
                kind: entry.kind,
                is_last,
            }));
        }

        self.done = true;
        None
    }
}

impl FusedIterator for TreeLines {}

/// Render the whole tree below `root` into strings.
#[cfg(test)]
pub fn render_lines(root: &Path, opts: &TreeOptions) -> Result<Vec<String>, TreeError> {
    TreeLines::new(root, opts.clone())
        .map(|line| line.map(|l| l.render()))
        .collect()
}

/// Entry point of the `tree` subcommand.
pub fn run_tree(cli: &Cli) -> Result<()> {
    let root = cli.tree_root();
    let opts = TreeOptions::from_cli(cli);
    debug!("rendering {} with {:?}", root.display(), opts);

    match cli.format {
        Format::Plain => {
            let mut out = StandardStream::stdout(color_choice(cli.color));
            write_plain(&mut out, &root, TreeLines::new(&root, opts))?;
        }
        Format::Json => {
            let mut out = BufWriter::new(io::stdout().lock());
            write_json(&mut out, &root, TreeLines::new(&root, opts))?;
        }
    }
    Ok(())
}

// ---------------------------------------------------------------------
// PLAIN
// ---------------------------------------------------------------------
/// Write the root header and every line, stopping at the first error.
///
/// Lines written before a failure stay written; the error is returned.
pub fn write_plain<W: WriteColor + ?Sized>(
    out: &mut W,
    root: &Path,
    lines: impl Iterator<Item = Result<TreeLine, TreeError>>,
) -> Result<usize> {
    let mut bold = ColorSpec::new();
    bold.set_bold(true);
    out.set_color(&bold)?;
    writeln!(out, "{}", root.display())?;
    out.reset()?;

    let mut count = 0;
    for line in lines {
        let line = line?;
        write_plain_line(out, &line)?;
        count += 1;
    }
    out.flush()?;
    Ok(count)
}

fn write_plain_line<W: WriteColor + ?Sized>(out: &mut W, line: &TreeLine) -> io::Result<()> {
    write!(out, "{}{}", line.prefix, line.connector)?;

    match line.kind {
        EntryKind::Dir => {
            out.set_color(ColorSpec::new().set_fg(Some(Color::Blue)))?;
        }
        EntryKind::Symlink => {
            out.set_color(ColorSpec::new().set_fg(Some(Color::Cyan)))?;
        }
        _ => {}
    }
    write!(out, "{}", line.name)?;
    out.reset()?;
    writeln!(out)
}

// ---------------------------------------------------------------------
// JSON
// ---------------------------------------------------------------------
#[derive(Serialize)]
struct JsonLine<'a> {
    name: &'a str,
    path: &'a str,
    depth: usize,
    kind: EntryKind,
    is_last: bool,
}

/// One JSON object per line, the root first at depth 0.
pub fn write_json<W: Write + ?Sized>(
    out: &mut W,
    root: &Path,
    lines: impl Iterator<Item = Result<TreeLine, TreeError>>,
) -> Result<usize> {
    let root_s = root.display().to_string();
    serde_json::to_writer(
        &mut *out,
        &JsonLine {
            name: &root_s,
            path: &root_s,
            depth: 0,
            kind: EntryKind::Dir,
            is_last: true,
        },
    )?;
    writeln!(out)?;

    let mut count = 0;
    for line in lines {
        let line = line?;
        let path_s = line.path.display().to_string();
        serde_json::to_writer(
            &mut *out,
            &JsonLine {
                name: &line.name,
                path: &path_s,
                depth: line.depth,
                kind: line.kind,
                is_last: line.is_last,
            },
        )?;
        writeln!(out)?;
        count += 1;
    }
    out.flush()?;
    Ok(count)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::{create_dir_all, File};
    use tempfile::{tempdir, TempDir};
    use termcolor::NoColor;

    fn sample() -> TempDir {
        let tmp = tempdir().unwrap();
        let root = tmp.path();
        File::create(root.join("a.txt")).unwrap();
        create_dir_all(root.join("b")).unwrap();
        File::create(root.join("b/c.txt")).unwrap();
        tmp
    }

    fn by_name() -> TreeOptions {
        TreeOptions {
            sort: SortMode::Name,
            ..TreeOptions::default()
        }
    }

    #[test]
    fn nested_directory_scenario() {
        let tmp = sample();
        let lines = render_lines(tmp.path(), &by_name()).unwrap();
        assert_eq!(lines, ["├── a.txt", "└── b", "    └── c.txt"]);
    }

    #[test]
    fn single_entry_gets_corner() {
        let tmp = tempdir().unwrap();
        File::create(tmp.path().join("x.txt")).unwrap();
        let lines = render_lines(tmp.path(), &by_name()).unwrap();
        assert_eq!(lines, ["└── x.txt"]);
    }

    #[test]
    fn empty_directory_renders_nothing() {
        let tmp = tempdir().unwrap();
        assert!(render_lines(tmp.path(), &by_name()).unwrap().is_empty());
    }

    #[test]
    fn non_last_parent_continues_vertical_line() {
        let tmp = tempdir().unwrap();
        let root = tmp.path();
        create_dir_all(root.join("a/inner")).unwrap();
        File::create(root.join("a/inner/deep.txt")).unwrap();
        File::create(root.join("a/leaf.txt")).unwrap();
        File::create(root.join("z.txt")).unwrap();

        let lines = render_lines(root, &by_name()).unwrap();
        assert_eq!(
            lines,
            [
                "├── a",
                "│   ├── inner",
                "│   │   └── deep.txt",
                "│   └── leaf.txt",
                "└── z.txt",
            ]
        );
    }

    #[test]
    fn one_line_per_entry_and_children_follow_parent() {
        let tmp = tempdir().unwrap();
        let root = tmp.path();
        for dir in ["p/q/r", "p/s", "t"] {
            create_dir_all(root.join(dir)).unwrap();
        }
        for file in ["p/q/r/1", "p/q/2", "p/3", "t/4", "5"] {
            File::create(root.join(file)).unwrap();
        }

        let lines: Vec<TreeLine> = TreeLines::new(root, by_name())
            .collect::<Result<_, _>>()
            .unwrap();
        let expected = walkdir::WalkDir::new(root).min_depth(1).into_iter().count();
        assert_eq!(lines.len(), expected);

        for (i, line) in lines.iter().enumerate() {
            let parent = line.path.parent().unwrap();
            if parent != root {
                let parent_idx = lines.iter().position(|l| l.path == parent).unwrap();
                assert!(parent_idx < i);
                let unit = if lines[parent_idx].is_last { BLANK } else { CONTINUATION };
                assert_eq!(line.prefix, format!("{}{}", lines[parent_idx].prefix, unit));
            }
        }
    }

    #[test]
    fn rendering_is_idempotent() {
        let tmp = sample();
        let opts = TreeOptions {
            sort: SortMode::None,
            ..TreeOptions::default()
        };
        let first = render_lines(tmp.path(), &opts).unwrap();
        let second = render_lines(tmp.path(), &opts).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn max_depth_stops_descent() {
        let tmp = sample();
        let opts = TreeOptions {
            max_depth: Some(1),
            ..by_name()
        };
        assert_eq!(render_lines(tmp.path(), &opts).unwrap(), ["├── a.txt", "└── b"]);

        let opts = TreeOptions {
            max_depth: Some(0),
            ..by_name()
        };
        assert!(render_lines(tmp.path(), &opts).unwrap().is_empty());
    }

    #[test]
    fn dirs_first_reorders_connectors() {
        let tmp = sample();
        let opts = TreeOptions {
            dirs_first: true,
            ..by_name()
        };
        assert_eq!(
            render_lines(tmp.path(), &opts).unwrap(),
            ["├── b", "│   └── c.txt", "└── a.txt"]
        );
    }

    #[test]
    fn missing_root_is_not_found() {
        let tmp = tempdir().unwrap();
        let err = render_lines(&tmp.path().join("gone"), &by_name()).unwrap_err();
        assert!(matches!(err, TreeError::NotFound { .. }));
    }

    #[test]
    fn file_root_is_not_a_directory() {
        let tmp = sample();
        let err = render_lines(&tmp.path().join("a.txt"), &by_name()).unwrap_err();
        assert!(matches!(err, TreeError::NotADirectory { .. }));
    }

    #[test]
    fn lines_are_produced_before_descendants_are_listed() {
        let tmp = sample();
        let mut it = TreeLines::new(tmp.path(), by_name());
        assert_eq!(it.next().unwrap().unwrap().render(), "├── a.txt");
        assert_eq!(it.next().unwrap().unwrap().render(), "└── b");

        // b is only listed on the following call
        std::fs::remove_dir_all(tmp.path().join("b")).unwrap();
        let err = it.next().unwrap().unwrap_err();
        assert!(matches!(err, TreeError::NotFound { .. }));
        assert!(it.next().is_none());
    }

    #[cfg(unix)]
    #[test]
    fn unreadable_subdirectory_aborts_the_walk() {
        use std::os::unix::fs::PermissionsExt;

        let tmp = tempdir().unwrap();
        let root = tmp.path();
        let locked = root.join("a_locked");
        create_dir_all(&locked).unwrap();
        File::create(locked.join("secret")).unwrap();
        File::create(root.join("b.txt")).unwrap();
        std::fs::set_permissions(&locked, std::fs::Permissions::from_mode(0o000)).unwrap();

        // privileged users read through mode bits
        let readable = std::fs::read_dir(&locked).is_ok();
        let result: Vec<_> = TreeLines::new(root, by_name()).collect();
        std::fs::set_permissions(&locked, std::fs::Permissions::from_mode(0o755)).unwrap();
        if readable {
            return;
        }

        assert_eq!(result.len(), 2);
        assert_eq!(result[0].as_ref().unwrap().render(), "├── a_locked");
        assert!(matches!(
            result[1],
            Err(TreeError::PermissionDenied { ref path }) if path == &locked
        ));
    }

    #[test]
    fn directory_replaced_by_file_before_descent() {
        let tmp = sample();
        let mut it = TreeLines::new(tmp.path(), by_name());
        assert_eq!(it.next().unwrap().unwrap().render(), "├── a.txt");
        assert_eq!(it.next().unwrap().unwrap().render(), "└── b");

        let b = tmp.path().join("b");
        std::fs::remove_dir_all(&b).unwrap();
        File::create(&b).unwrap();
        let err = it.next().unwrap().unwrap_err();
        assert!(matches!(err, TreeError::NotADirectory { ref path } if path == &b));
        assert!(it.next().is_none());
    }

    #[cfg(unix)]
    #[test]
    fn symlinked_directories_are_expanded_by_default() {
        let tmp = tempdir().unwrap();
        let root = tmp.path();
        create_dir_all(root.join("real")).unwrap();
        File::create(root.join("real/f.txt")).unwrap();
        std::os::unix::fs::symlink(root.join("real"), root.join("link")).unwrap();

        let lines = render_lines(root, &TreeOptions::default()).unwrap();
        assert_eq!(
            lines,
            ["├── link", "│   └── f.txt", "└── real", "    └── f.txt"]
        );

        let no_follow = TreeOptions {
            follow_symlinks: false,
            ..TreeOptions::default()
        };
        let lines = render_lines(root, &no_follow).unwrap();
        assert_eq!(lines, ["├── link", "└── real", "    └── f.txt"]);
    }

    #[test]
    fn cli_flag_turns_following_off() {
        let cli = <Cli as clap::Parser>::try_parse_from(["probetree", "--no-follow-symlinks"])
            .unwrap();
        assert!(!TreeOptions::from_cli(&cli).follow_symlinks);
        let cli = <Cli as clap::Parser>::try_parse_from(["probetree"]).unwrap();
        assert!(TreeOptions::from_cli(&cli).follow_symlinks);
    }

    #[cfg(unix)]
    #[test]
    fn followed_link_cycle_is_reported() {
        let tmp = tempdir().unwrap();
        let root = tmp.path();
        create_dir_all(root.join("loop")).unwrap();
        std::os::unix::fs::symlink(root, root.join("loop/back")).unwrap();

        let opts = TreeOptions {
            follow_symlinks: true,
            ..by_name()
        };
        let result: Vec<_> = TreeLines::new(root, opts).collect();
        let rendered: Vec<String> = result
            .iter()
            .filter_map(|r| r.as_ref().ok().map(TreeLine::render))
            .collect();
        assert_eq!(rendered, ["└── loop", "    └── back"]);
        assert!(matches!(
            result.last(),
            Some(Err(TreeError::LinkCycle { .. }))
        ));
    }

    #[test]
    fn plain_writer_prints_root_then_lines() {
        let tmp = sample();
        let mut out = NoColor::new(Vec::new());
        let count = write_plain(&mut out, Path::new("/"), TreeLines::new(tmp.path(), by_name()))
            .unwrap();
        assert_eq!(count, 3);
        let text = String::from_utf8(out.into_inner()).unwrap();
        assert_eq!(text, "/\n├── a.txt\n└── b\n    └── c.txt\n");
    }

    #[test]
    fn json_writer_emits_one_object_per_line() {
        let tmp = sample();
        let mut out = Vec::new();
        write_json(&mut out, tmp.path(), TreeLines::new(tmp.path(), by_name())).unwrap();
        let text = String::from_utf8(out).unwrap();
        let rows: Vec<serde_json::Value> = text
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect();
        assert_eq!(rows.len(), 4);
        assert_eq!(rows[0]["depth"], 0);
        assert_eq!(rows[2]["name"], "b");
        assert_eq!(rows[2]["kind"], "dir");
        assert_eq!(rows[3]["depth"], 2);
        assert_eq!(rows[3]["is_last"], true);
    }
}
