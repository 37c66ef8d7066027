//! `pbql`: load protobuf descriptors into SQLite and query them.

mod input;
mod logging;
mod output;
mod repl;

use anyhow::{Context, Result};
use clap::{ArgAction, Parser};
use colored::Colorize;
use pbql_loader::{LoadStats, Store};
use std::collections::HashSet;
use std::io::{self, Write};
use std::path::PathBuf;

use crate::input::InputOptions;
use crate::output::Format;

const AFTER_HELP: &str = "\
Tables:
  files, dependencies, messages, fields, oneofs, oneof_fields,
  enums, enum_values, services, methods, extensions

Examples:
  # Count methods per service
  pbql -q \"SELECT s.name, COUNT(m.name) AS methods FROM services s LEFT JOIN methods m ON s.full_name = m.service GROUP BY s.name\" ./protos

  # Find all streaming RPCs
  pbql -q \"SELECT * FROM methods WHERE client_streaming OR server_streaming\" descriptor.json

  # Deprecated fields
  pbql -q \"SELECT id FROM fields WHERE options ->> '$.deprecated'\" ./protos";

#[derive(Parser, Debug)]
#[command(
    name = "pbql",
    version,
    about = "Query protobuf definitions using SQL",
    after_help = AFTER_HELP
)]
struct Cli {
    /// Descriptor sets (`*.json`), Buf module directories or `.proto` files.
    #[arg(required = true)]
    inputs: Vec<PathBuf>,

    /// Run one query and exit instead of starting the shell.
    #[arg(short, long)]
    query: Option<String>,

    /// Output format.
    #[arg(short, long, value_enum, default_value_t = Format::Table)]
    format: Format,

    /// Write the tables to this SQLite file instead of an in-memory database.
    #[arg(long)]
    db: Option<PathBuf>,

    /// Extra import root for `.proto` inputs (repeatable).
    #[arg(short = 'I', long = "import", value_name = "DIR")]
    import_paths: Vec<PathBuf>,

    /// Skip `.proto` files that fail to compile instead of failing the run.
    #[arg(short, long)]
    lenient: bool,

    /// `buf` executable used to compile `.proto` inputs.
    #[arg(long, value_name = "PATH", default_value = "buf")]
    buf: PathBuf,

    /// Raise the log level (`-v` info, `-vv` debug). `PBQL_LOG` overrides.
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,
}

fn main() {
    let cli = Cli::parse();
    logging::init(cli.verbose);

    if let Err(e) = run(cli) {
        eprintln!("{} {e:#}", "error:".red().bold());
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
    let mut store = match &cli.db {
        Some(path) => Store::open(path)
            .with_context(|| format!("failed to open database {}", path.display()))?,
        None => Store::open_in_memory().context("failed to open in-memory database")?,
    };

    for loaded in load_inputs(&cli, &mut store)? {
        for error in &loaded.errors {
            eprintln!("{} skipped {error}", "warning:".yellow().bold());
        }
        if cli.verbose > 0 {
            eprintln!(
                "  {} {} ({} files, {} rows)",
                "→".cyan(),
                loaded.label,
                loaded.files,
                loaded.stats.total()
            );
            for (table, count) in &loaded.stats.rows {
                eprintln!("      {:<14} {count}", table.name());
            }
        }
    }

    match &cli.query {
        Some(sql) => {
            let result = output::run_query(store.connection(), sql)?;
            let stdout = io::stdout();
            let mut out = stdout.lock();
            output::render(&result, cli.format, &mut out)?;
            out.flush()?;
            Ok(())
        }
        None => repl::run(&store, cli.format),
    }
}

/// What one input batch added to the store.
struct Loaded {
    label: String,
    files: usize,
    stats: LoadStats,
    errors: Vec<String>,
}

/// Load every input, each in its own atomic batch.
///
/// Files already loaded by an earlier batch, and imports a batch only needs
/// for name resolution, are not written again.
fn load_inputs(cli: &Cli, store: &mut Store) -> Result<Vec<Loaded>> {
    let options = InputOptions {
        buf: buf_command(&cli.buf),
        import_paths: cli.import_paths.clone(),
        lenient: cli.lenient,
    };

    let mut loaded: HashSet<String> = HashSet::new();
    let mut results = Vec::new();
    for mut batch in input::collect_batches(&cli.inputs, &options)? {
        let label = batch.label.clone();
        let errors = std::mem::take(&mut batch.errors);
        let (files, imports) = batch.split(&loaded);
        let stats = store
            .load_batch_with_imports(&files, &imports)
            .with_context(|| format!("failed to load {label}"))?;
        loaded.extend(files.iter().map(|f| f.path.clone()));
        results.push(Loaded {
            label,
            files: files.len(),
            stats,
            errors,
        });
    }
    Ok(results)
}

/// `buf` is run from inside each module, so a relative path to it has to be
/// resolved first. A bare name is left to `PATH`.
fn buf_command(buf: &std::path::Path) -> PathBuf {
    if buf.components().count() > 1 {
        std::fs::canonicalize(buf).unwrap_or_else(|_| buf.to_path_buf())
    } else {
        buf.to_path_buf()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::path::Path;

    #[test]
    fn parses_query_mode() {
        let cli = Cli::try_parse_from([
            "pbql",
            "-q",
            "SELECT * FROM files",
            "-f",
            "json",
            "--db",
            "out.db",
            "-vv",
            "a.json",
            "protos/",
        ])
        .unwrap();

        assert_eq!(cli.query.as_deref(), Some("SELECT * FROM files"));
        assert_eq!(cli.format, Format::Json);
        assert_eq!(cli.db, Some(PathBuf::from("out.db")));
        assert_eq!(cli.verbose, 2);
        assert_eq!(cli.inputs, vec![PathBuf::from("a.json"), PathBuf::from("protos/")]);
    }

    #[test]
    fn defaults_to_table_format() {
        let cli = Cli::try_parse_from(["pbql", "descriptor.json"]).unwrap();
        assert_eq!(cli.format, Format::Table);
        assert!(cli.query.is_none());
        assert_eq!(cli.verbose, 0);
    }

    #[test]
    fn requires_an_input() {
        assert!(Cli::try_parse_from(["pbql", "-q", "SELECT 1"]).is_err());
    }

    #[test]
    fn rejects_unknown_formats() {
        assert!(Cli::try_parse_from(["pbql", "-f", "xml", "a.json"]).is_err());
    }

    #[test]
    fn parses_build_flags() {
        let cli = Cli::try_parse_from([
            "pbql", "-I", "vendor", "--import", "third_party", "-l", "--buf", "bin/buf", "protos",
        ])
        .unwrap();
        assert_eq!(
            cli.import_paths,
            vec![PathBuf::from("vendor"), PathBuf::from("third_party")]
        );
        assert!(cli.lenient);
        assert_eq!(cli.buf, PathBuf::from("bin/buf"));

        let cli = Cli::try_parse_from(["pbql", "protos"]).unwrap();
        assert!(cli.import_paths.is_empty() && !cli.lenient);
        assert_eq!(cli.buf, PathBuf::from("buf"));
    }

    fn parse<P: AsRef<Path>>(args: &[P]) -> Cli {
        let mut argv = vec!["pbql".into()];
        argv.extend(args.iter().map(|a| a.as_ref().as_os_str().to_owned()));
        Cli::try_parse_from::<_, std::ffi::OsString>(argv).unwrap()
    }

    fn file_names(store: &Store) -> Vec<String> {
        let conn = store.connection();
        let mut stmt = conn.prepare("SELECT name FROM files ORDER BY name").unwrap();
        let names = stmt.query_map([], |row| row.get::<_, String>(0)).unwrap();
        names.collect::<Result<_, _>>().unwrap()
    }

    fn write(path: &Path, text: &str) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, text).unwrap();
    }

    #[test]
    fn json_inputs_sharing_files_load_them_once() {
        let dir = tempfile::tempdir().unwrap();
        let a = dir.path().join("a.json");
        let b = dir.path().join("b.json");
        write(&a, r#"{"file": [{"name": "common.proto"}, {"name": "a.proto"}]}"#);
        write(&b, r#"{"file": [{"name": "common.proto"}, {"name": "b.proto"}]}"#);

        let mut store = Store::open_in_memory().unwrap();
        let loaded = load_inputs(&parse(&[&a, &b]), &mut store).unwrap();

        assert_eq!(loaded.len(), 2);
        assert_eq!(loaded[1].files, 1);
        assert_eq!(file_names(&store), vec!["a.proto", "b.proto", "common.proto"]);
    }

    #[test]
    fn empty_directories_load_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let mut cli = parse(&[dir.path()]);
        cli.buf = dir.path().join("no-such-buf");

        let mut store = Store::open_in_memory().unwrap();
        let loaded = load_inputs(&cli, &mut store).unwrap();

        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded[0].stats.total(), 0);
        assert!(file_names(&store).is_empty());
    }

    // Stands in for `buf build`: every `.proto` under the `--path`s (or `.`)
    // is a file, names listed in `./imports` and files of workspace modules
    // other than `m0` are imports, and a file containing BROKEN fails the
    // build.
    #[cfg(unix)]
    const FAKE_BUF: &str = r#"#!/bin/sh
out=""; exclude=0; paths=""
while [ $# -gt 0 ]; do
  case "$1" in
    -o) out="$2"; shift ;;
    --exclude-imports) exclude=1 ;;
    --path) paths="$paths $2"; shift ;;
  esac
  shift
done
[ -n "$paths" ] || paths=.
found=$(for p in $paths; do find -L "$p" -name '*.proto'; done | sort)
for f in $found; do
  if grep -q BROKEN "$f"; then echo "$f:1:1: syntax error" >&2; exit 1; fi
done
names=$(echo "$found" | sed 's|^\./||; s|^m0/||')
if [ "$exclude" = 0 ]; then
  [ -f imports ] && names="$names $(cat imports)"
  for d in m[1-9]*; do
    [ -d "$d" ] && names="$names $(find -L "$d" -name '*.proto' | sed 's|^m[0-9]*/||')"
  done
fi
sep=""
printf '{"file": [' > "$out"
for n in $names; do
  printf '%s{"name": "%s", "package": "acme"}' "$sep" "$n" >> "$out"
  sep=", "
done
printf ']}
' >> "$out"
"#;

    /// Written once so no test forks while another still has it open.
    #[cfg(unix)]
    fn fake_buf() -> PathBuf {
        use std::os::unix::fs::PermissionsExt;
        use std::sync::OnceLock;

        static DIR: OnceLock<tempfile::TempDir> = OnceLock::new();
        let dir = DIR.get_or_init(|| {
            let dir = tempfile::tempdir().unwrap();
            let path = dir.path().join("buf");
            fs::write(&path, FAKE_BUF).unwrap();
            fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
            dir
        });
        dir.path().join("buf")
    }

    #[cfg(unix)]
    fn load_with_fake_buf(mut cli: Cli) -> Result<(Store, Vec<Loaded>)> {
        cli.buf = fake_buf();
        let mut store = Store::open_in_memory()?;
        let loaded = load_inputs(&cli, &mut store)?;
        Ok((store, loaded))
    }

    #[cfg(unix)]
    #[test]
    fn directories_sharing_imports_load_only_their_own_files() {
        let dir = tempfile::tempdir().unwrap();
        let a = dir.path().join("billing");
        let b = dir.path().join("shipping");
        for (root, name) in [(&a, "invoice.proto"), (&b, "parcel.proto")] {
            write(&root.join("acme").join(name), "syntax = \"proto3\";");
            write(&root.join("imports"), "google/protobuf/timestamp.proto\n");
        }

        let (store, loaded) = load_with_fake_buf(parse(&[&a, &b])).unwrap();

        assert_eq!(loaded.len(), 2);
        assert_eq!(file_names(&store), vec!["acme/invoice.proto", "acme/parcel.proto"]);
    }

    #[cfg(unix)]
    #[test]
    fn proto_files_of_one_module_are_one_batch() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        write(&root.join("buf.yaml"), "version: v2\n");
        write(&root.join("imports"), "acme/common.proto\n");
        let x = root.join("acme").join("x.proto");
        let y = root.join("acme").join("y.proto");
        write(&x, "syntax = \"proto3\";");
        write(&y, "syntax = \"proto3\";");
        write(&root.join("acme").join("z.proto"), "syntax = \"proto3\";");

        let (store, loaded) = load_with_fake_buf(parse(&[&x, &y])).unwrap();

        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded[0].files, 2);
        assert_eq!(file_names(&store), vec!["acme/x.proto", "acme/y.proto"]);
    }

    #[cfg(unix)]
    #[test]
    fn lenient_runs_skip_files_that_fail_to_build() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("protos");
        write(&root.join("good.proto"), "syntax = \"proto3\";");
        write(&root.join("broken.proto"), "BROKEN");

        let err = load_with_fake_buf(parse(&[&root])).err().unwrap();
        let message = format!("{err:#}");
        assert!(message.contains("buf build failed"), "{message}");
        assert!(message.contains("broken.proto"), "{message}");

        let mut cli = parse(&[&root]);
        cli.lenient = true;
        let (store, loaded) = load_with_fake_buf(cli).unwrap();

        assert_eq!(file_names(&store), vec!["good.proto"]);
        assert_eq!(loaded[0].errors.len(), 1);
        assert!(loaded[0].errors[0].contains("broken.proto"));
    }

    #[cfg(unix)]
    #[test]
    fn import_roots_resolve_without_loading() {
        let dir = tempfile::tempdir().unwrap();
        let shop = dir.path().join("shop");
        let common = dir.path().join("common");
        write(&shop.join("shop").join("order.proto"), "syntax = \"proto3\";");
        write(&common.join("money").join("money.proto"), "syntax = \"proto3\";");

        let mut cli = parse(&[&shop]);
        cli.import_paths = vec![common];
        let (store, loaded) = load_with_fake_buf(cli).unwrap();

        assert_eq!(loaded[0].files, 1);
        assert_eq!(file_names(&store), vec!["shop/order.proto"]);
    }
}
