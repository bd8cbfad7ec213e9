use std::io::IsTerminal;

use tracing_subscriber::EnvFilter;

/// Diagnostics go to stderr so `--json` output on stdout stays parseable.
/// `RUST_LOG` picks the filter (default `warn`), `TRACELENS_LOG_FORMAT=json`
/// switches to one JSON object per event.
pub fn init_cli_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr);

    let _ = if json_requested() {
        builder.json().try_init()
    } else {
        builder
            .with_ansi(std::io::stderr().is_terminal())
            .compact()
            .try_init()
    };
}

fn json_requested() -> bool {
    std::env::var("TRACELENS_LOG_FORMAT")
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false)
}
