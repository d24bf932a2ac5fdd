//! The `mine` command.

use owo_colors::OwoColorize;
use tracing::info;

use schaapi_rs::core::pipeline::MiningPipeline;
use schaapi_rs::io::corpus_file::{CorpusFile, JsonCorpusAdapter};
use schaapi_rs::io::export::{write_dot_files, write_exports};
use schaapi_rs::io::reports::{write_report, ReportFormat};

use crate::cli::args::MineArgs;
use crate::cli::config_builder::build_mine_config;
use crate::cli::output::{display_report, mining_progress};

/// Mine a corpus file and write the requested outputs
pub fn mine_command(args: MineArgs) -> anyhow::Result<()> {
    let corpus = CorpusFile::from_path(&args.corpus)?;
    let config = build_mine_config(&args, &corpus.library)?;
    info!(
        projects = corpus.projects.len(),
        methods = corpus.method_count(),
        library = ?config.library.packages,
        "Loaded corpus"
    );
    let adapter = JsonCorpusAdapter::new(corpus);

    let report = if args.quiet {
        MiningPipeline::new(config).run(&adapter)?
    } else {
        let (pb, callback) = mining_progress()?;
        let report = MiningPipeline::new(config)
            .with_progress(callback)
            .run(&adapter);
        pb.finish_and_clear();
        report?
    };

    if let Some(out) = &args.out {
        let format = args
            .format
            .map(ReportFormat::from)
            .unwrap_or_else(|| ReportFormat::from_path(out));
        write_report(&report, format, out)?;
        if !args.quiet {
            println!(
                "{} {}",
                "📄 Report written to:".bright_green(),
                out.display().to_string().cyan()
            );
        }
    }
    if let Some(export) = &args.export {
        write_exports(&report.patterns, export)?;
        if !args.quiet {
            println!(
                "{} {}",
                "🧪 Test generator records written to:".bright_green(),
                export.display().to_string().cyan()
            );
        }
    }
    if let Some(dir) = &args.dot {
        let written = write_dot_files(&report.patterns, dir)?;
        if !args.quiet {
            println!(
                "{} {} in {}",
                "🕸  DOT files written:".bright_green(),
                written.len(),
                dir.display().to_string().cyan()
            );
        }
    }

    if !args.quiet {
        println!();
        display_report(&report, args.top);
    }
    Ok(())
}
