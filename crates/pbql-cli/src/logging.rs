use std::sync::Once;

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

static INIT: Once = Once::new();

const CRATES: &[&str] = &["pbql_cli", "pbql_descriptor", "pbql_loader", "pbql_schema"];

/// Install the stderr subscriber once.
///
/// `PBQL_LOG` takes `EnvFilter` directives (`PBQL_LOG=pbql_loader=debug`).
/// Without it everything logs at `warn`, and each `-v` raises the pbql crates
/// one level.
pub fn init(verbosity: u8) {
    INIT.call_once(|| {
        let filter = EnvFilter::try_from_env("PBQL_LOG")
            .unwrap_or_else(|_| EnvFilter::new(default_directives(verbosity)));

        let _ = tracing_subscriber::registry()
            .with(fmt::layer().with_writer(std::io::stderr).with_target(true))
            .with(filter)
            .try_init();
    });
}

fn default_directives(verbosity: u8) -> String {
    let level = match verbosity {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let mut directives = String::from("warn");
    for name in CRATES {
        directives.push_str(&format!(",{name}={level}"));
    }
    directives
}
