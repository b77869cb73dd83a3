mod args;
mod tally;

use clap::Parser;
use log::info;
use snafu::ErrorCompat;

use crate::args::Args;
use crate::tally::session::{authorize, Session, PASSWORD_ENV};
use crate::tally::{run_tally, settings_from_args, TallyResult};

fn run(args: &Args) -> TallyResult<()> {
    let expected = std::env::var(PASSWORD_ENV).ok();
    let mut session = Session::default();
    authorize(&mut session, args.password.as_deref(), expected.as_deref())?;

    let settings = settings_from_args(args)?;
    let report = run_tally(&settings)?;
    info!(
        "Done: {} BJs, {} files written, {} warnings",
        report.tally.as_ref().map(|t| t.len()).unwrap_or(0),
        report.files_written.len(),
        report.diagnostics.len()
    );
    Ok(())
}

fn main() {
    let args = Args::parse();
    let default_level = if args.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .init();

    if let Err(e) = run(&args) {
        eprintln!("An error occured: {}", e);
        if let Some(bt) = ErrorCompat::backtrace(&e) {
            eprintln!("trace: {}", bt);
        }
        std::process::exit(1);
    }
}
