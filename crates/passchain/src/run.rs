use anyhow::Result;
use tracing_subscriber::EnvFilter;

use crate::check;
use crate::cli::Args;
use crate::preview;

pub fn run(args: Args) -> Result<()> {
    initialise_tracing(args.debug);

    if args.check {
        return check::run_check(&args.preset);
    }

    tracing::info!(
        preset = %args.preset.display(),
        width = args.size.0,
        height = args.size.1,
        audio = ?args.audio,
        profiling = args.profile,
        "starting passchain preview"
    );
    preview::run_preview(&args)
}

fn initialise_tracing(debug: bool) {
    let filter = if debug {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}
