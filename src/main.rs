use clap::error::ErrorKind;
use clap::Parser;

use nvg::cli::{run, Cli};

/// Initialize the tracing subscriber for logging.
///
/// Quiet by default; `NVG_DEBUG=1` turns on the decision trace.
/// `RUST_LOG` overrides both when set. Everything goes to stderr so
/// stdout stays silent.
fn init_logging() {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let default_filter = if std::env::var("NVG_DEBUG").as_deref() == Ok("1") {
        "nvg=debug"
    } else {
        "nvg=error"
    };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_filter));

    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_target(false)
                .without_time()
                .with_writer(std::io::stderr),
        )
        .with(filter)
        .init();
}

fn main() {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) if matches!(e.kind(), ErrorKind::DisplayHelp | ErrorKind::DisplayVersion) => {
            let _ = e.print();
            std::process::exit(0);
        }
        Err(e) => {
            // Argument errors exit 1, not clap's default 2.
            eprintln!("{e}");
            std::process::exit(1);
        }
    };

    init_logging();

    if let Err(e) = run(cli) {
        eprintln!("nvg: {e:#}");
        std::process::exit(1);
    }
}
