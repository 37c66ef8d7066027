//! Interactive SQL shell over a loaded store.
//!
//! By default we use `rustyline` for line editing and history.
//! A minimal stdin-based fallback exists behind `--no-default-features`.

use crate::output::{self, Format};
use anyhow::{anyhow, bail, Result};
use colored::Colorize;
use pbql_loader::Store;
use rusqlite::Connection;
use std::io::{self, Write};
#[cfg(feature = "repl-rustyline")]
use std::path::PathBuf;

const HELP: &str = r#"Commands:
   .help, .h, .?   Show this help
   .tables         List all tables
   .schema         Show the columns of every table
   .format <fmt>   Set output format (table, json, csv)
   .quit, .exit    Exit interactive mode

Example queries:
  -- Count methods per service
  SELECT s.name, COUNT(m.name) AS methods
  FROM services s
  LEFT JOIN methods m ON s.full_name = m.service
  GROUP BY s.name;

  -- Find all streaming RPCs
  SELECT service, name, client_streaming, server_streaming
  FROM methods
  WHERE client_streaming OR server_streaming;

  -- Messages with most fields
  SELECT m.name, COUNT(*) AS field_count
  FROM messages m
  JOIN fields f ON m.full_name = f.message
  GROUP BY m.full_name
  ORDER BY field_count DESC
  LIMIT 10;

Querying options (JSON text, use SQLite's JSON functions):
  -- Deprecated methods
  SELECT name FROM methods WHERE options ->> '$.deprecated';

  -- Custom extension options (quote dotted keys)
  SELECT name, json_extract(options, '$."google.api.http".get') AS path
  FROM methods WHERE options IS NOT NULL;

  -- Map-valued options
  SELECT full_name, key, value
  FROM services, json_each(services.options, '$."acme.v1.limits"');
"#;

const SCHEMA_FOOTER: &str = r#"
Options columns hold JSON (NULL when nothing is set). Query with:
  options ->> '$.option_name'                      -- arrow syntax
  json_extract(options, '$.path')                  -- JSON path
  json_extract(options, '$."dotted.key".field')    -- quoted keys
"#;

#[derive(Debug)]
struct ReplState {
    format: Format,
}

enum ReplControl {
    Continue,
    Exit,
}

pub fn run(store: &Store, format: Format) -> Result<()> {
    let mut state = ReplState { format };

    println!("{}", "pbql".green().bold());
    println!("Type .help for commands, .quit to exit.\n");

    #[cfg(feature = "repl-rustyline")]
    {
        return run_rustyline(&mut state, store.connection());
    }
    #[cfg(not(feature = "repl-rustyline"))]
    {
        return run_simple(&mut state, store.connection());
    }
}

#[cfg(feature = "repl-rustyline")]
fn run_rustyline(state: &mut ReplState, conn: &Connection) -> Result<()> {
    use rustyline::error::ReadlineError;
    use rustyline::history::DefaultHistory;
    use rustyline::Editor;

    let mut rl: Editor<(), DefaultHistory> =
        Editor::new().map_err(|e| anyhow!("failed to init rustyline: {e}"))?;
    let history = history_path();
    if let Some(path) = &history {
        // Missing on first run.
        let _ = rl.load_history(path);
    }

    loop {
        let line = match rl.readline("pbql> ") {
            Ok(l) => l,
            Err(ReadlineError::Eof) => break,
            Err(ReadlineError::Interrupted) => continue,
            Err(e) => return Err(anyhow!("readline error: {e}")),
        };

        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        rl.add_history_entry(line)
            .map_err(|e| anyhow!("failed to record history: {e}"))?;

        if let ReplControl::Exit = handle(state, conn, line)? {
            break;
        }
    }

    if let Some(path) = &history {
        if let Err(e) = rl.save_history(path) {
            tracing::warn!(path = %path.display(), error = %e, "failed to save history");
        }
    }
    println!("Goodbye!");
    Ok(())
}

#[cfg(not(feature = "repl-rustyline"))]
fn run_simple(state: &mut ReplState, conn: &Connection) -> Result<()> {
    let stdin = io::stdin();
    loop {
        print!("{}", "pbql> ".cyan().bold());
        io::stdout().flush()?;

        let mut line = String::new();
        if stdin.read_line(&mut line)? == 0 {
            break;
        }
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        if let ReplControl::Exit = handle(state, conn, line)? {
            break;
        }
    }
    println!("Goodbye!");
    Ok(())
}

/// Run one line against stdout, reporting errors without leaving the shell.
fn handle(state: &mut ReplState, conn: &Connection, line: &str) -> Result<ReplControl> {
    let stdout = io::stdout();
    let mut out = stdout.lock();
    let control = match dispatch_line(state, conn, line, &mut out) {
        Ok(control) => control,
        Err(e) => {
            eprintln!("{} {e:#}", "error:".red().bold());
            ReplControl::Continue
        }
    };
    out.flush()?;
    Ok(control)
}

fn dispatch_line(
    state: &mut ReplState,
    conn: &Connection,
    line: &str,
    out: &mut impl Write,
) -> Result<ReplControl> {
    if !line.starts_with('.') {
        let result = output::run_query(conn, line)?;
        output::render(&result, state.format, out)?;
        writeln!(out)?;
        return Ok(ReplControl::Continue);
    }

    let mut parts = line.split_whitespace();
    let command = parts.next().unwrap_or_default();
    match command {
        ".quit" | ".exit" | ".q" => return Ok(ReplControl::Exit),
        ".help" | ".h" | ".?" => write!(out, "{HELP}")?,
        ".tables" => {
            let mut stmt = conn.prepare(
                "SELECT name FROM sqlite_master WHERE type = 'table' AND name NOT LIKE \
                 'sqlite_%' ORDER BY name",
            )?;
            let names = stmt
                .query_map([], |row| row.get::<_, String>(0))?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            for name in names {
                writeln!(out, "  {name}")?;
            }
        }
        ".schema" => {
            writeln!(out, "Tables:")?;
            for def in pbql_schema::tables()? {
                writeln!(out, "  {} ({})", def.table, def.column_names().join(", "))?;
            }
            write!(out, "{SCHEMA_FOOTER}")?;
        }
        ".format" => match parts.next() {
            None => writeln!(out, "Current format: {}", state.format)?,
            Some(name) => match Format::parse(name) {
                Some(format) => {
                    state.format = format;
                    writeln!(out, "Output format set to {format}")?;
                }
                None => bail!("Invalid format: {name}. Valid formats: table, json, csv"),
            },
        },
        other => bail!("unknown command {other} (try .help)"),
    }
    Ok(ReplControl::Continue)
}

#[cfg(feature = "repl-rustyline")]
fn history_path() -> Option<PathBuf> {
    std::env::var_os("HOME").map(|home| PathBuf::from(home).join(".pbql_history"))
}
