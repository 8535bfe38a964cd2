//! Documentation release CLI entrypoint.
//!
//! This binary promotes a project's unreleased documentation into a versioned
//! release, updating the version registry and the project's latest-version
//! link. The `latest` subcommand reports the current release of each project.

use chrono::Local;
use clap::Parser;
use docs_release::ReleaseConfig;
use docs_release_promoter::cli::{Cli, Command, PromoteArgs};
use docs_release_promoter::error::Result;
use docs_release_promoter::inference::HttpFetcher;
use docs_release_promoter::latest::run_latest;
use docs_release_promoter::logging;
use docs_release_promoter::output::{dry_run_text, success_message};
use docs_release_promoter::pipeline::Promoter;
use std::io::{self, Write};

fn main() {
    let cli = Cli::parse();
    let mut stderr = io::stderr();
    if let Err(err) = logging::init(cli.verbosity()) {
        write_stderr_line(&mut stderr, format!("warning: logging disabled: {err}"));
    }
    let mut stdout = io::stdout();
    let run_result = run(&cli, &mut stdout, &mut stderr);
    let exit_code = exit_code_for_run_result(run_result, &mut stderr);
    if exit_code != 0 {
        std::process::exit(exit_code);
    }
}

fn run(cli: &Cli, stdout: &mut dyn Write, stderr: &mut dyn Write) -> Result<()> {
    match &cli.command {
        Some(Command::Latest(args)) => run_latest(args, stdout),
        Some(Command::Promote(args)) => run_promote(args, stderr),
        None => run_promote(&cli.promote, stderr),
    }
}

/// Plans the release, then either describes it or applies it.
fn run_promote(args: &PromoteArgs, stderr: &mut dyn Write) -> Result<()> {
    let request = args.to_request(Local::now().date_naive())?;
    let config = ReleaseConfig::load(&args.site_root, args.config.as_deref())?;
    let fetcher = HttpFetcher::new(config.fetch.timeout());
    let promoter =
        Promoter::new(&config, &args.site_root, &fetcher).with_rollback(!args.no_rollback);
    let mut sink = io::sink();

    let plan = promoter.plan(&request, progress_target(args.quiet, stderr, &mut sink))?;

    // Dry-run mode: show what would be done without side effects
    if args.dry_run {
        write_stderr_line(stderr, dry_run_text(&plan));
        return Ok(());
    }

    let report = promoter.execute(plan, progress_target(args.quiet, stderr, &mut sink))?;

    if !args.quiet {
        write_stderr_line(stderr, "");
        write_stderr_line(stderr, success_message(&report));
    }

    Ok(())
}

fn progress_target<'a>(
    quiet: bool,
    stderr: &'a mut dyn Write,
    sink: &'a mut io::Sink,
) -> &'a mut dyn Write {
    if quiet {
        return sink;
    }
    stderr
}

fn exit_code_for_run_result(result: Result<()>, stderr: &mut dyn Write) -> i32 {
    match result {
        Ok(()) => 0,
        Err(err) => {
            write_stderr_line(stderr, format!("error: {err}"));
            1
        }
    }
}

fn write_stderr_line(stderr: &mut dyn Write, message: impl std::fmt::Display) {
    if writeln!(stderr, "{message}").is_err() {
        // Best-effort logging; ignore write failures.
    }
}
