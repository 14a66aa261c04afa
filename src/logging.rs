//! Tracing setup for the CLI binary.

use std::io;
use std::sync::Once;
use tracing::Level;
use tracing_subscriber::EnvFilter;

static INIT: Once = Once::new();

/// Install the global tracing subscriber. Idempotent.
///
/// `RUST_LOG` directives take precedence; without them the engine logs at
/// INFO, or DEBUG when a test harness is driving it. Diagnostics go to
/// stderr so that search results and JSON on stdout stay parseable.
pub fn init() {
    INIT.call_once(|| {
        let default_level = if under_test_harness() {
            Level::DEBUG
        } else {
            Level::INFO
        };
        let filter = EnvFilter::builder()
            .with_default_directive(default_level.into())
            .from_env_lossy();

        let builder = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(true)
            .with_ansi(false)
            .compact();

        if under_test_harness() {
            // libtest captures output per test; a second binary in the run
            // may already hold the global subscriber slot.
            let _ = builder.with_test_writer().try_init();
        } else if let Err(e) = builder.with_writer(io::stderr).try_init() {
            eprintln!("failed to initialize tracing: {e}");
        }
    });
}

/// Whether a test runner owns the process (nextest, or cargo's test
/// tempdir is set).
fn under_test_harness() -> bool {
    std::env::var_os("NEXTEST").is_some() || std::env::var_os("CARGO_TARGET_TMPDIR").is_some()
}
