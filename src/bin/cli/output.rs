//! Console output: progress bars, pattern tables and summaries.

use indicatif::{ProgressBar, ProgressStyle};
use owo_colors::OwoColorize;
use tabled::{settings::Style as TableStyle, Table, Tabled};

use schaapi_rs::core::config::SchaapiConfig;
use schaapi_rs::core::pipeline::{MiningReport, ProgressCallback};
use schaapi_rs::io::test_results::TestResults;

/// Progress bar driven by pipeline stage updates
pub fn mining_progress() -> anyhow::Result<(ProgressBar, ProgressCallback)> {
    let pb = ProgressBar::new(100);
    pb.set_style(ProgressStyle::with_template(
        "⛏  {msg} [{bar:40.bright_blue/blue}] {pos:>3}% {elapsed_precise}",
    )?);
    pb.set_message("Mining");

    let callback: ProgressCallback = Box::new({
        let pb = pb.clone();
        move |stage: &str, progress: f64| {
            pb.set_message(stage.to_string());
            pb.set_position(progress as u64);
        }
    });
    Ok((pb, callback))
}

/// Row of the pattern table.
#[derive(Tabled)]
struct PatternRow {
    #[tabled(rename = "#")]
    rank: usize,
    support: usize,
    occurrences: usize,
    nodes: usize,
    edges: usize,
    pattern: String,
}

/// Print the best `top` patterns and the run statistics
pub fn display_report(report: &MiningReport, top: usize) {
    let stats = &report.statistics;
    println!("{}", "📊 Mining Summary".bright_blue().bold());
    println!(
        "   Projects: {}  Methods: {}  Graphs: {}  Without library usage: {}  Omitted: {}",
        stats.projects.to_string().cyan(),
        stats.methods.to_string().cyan(),
        stats.graphs.to_string().cyan(),
        stats.empty_graphs,
        stats.omitted
    );
    println!(
        "   Levels: {}  Candidates: {}  Duration: {} ms",
        stats.levels, stats.candidates_evaluated, stats.duration_ms
    );
    if stats.truncated {
        println!(
            "   {}",
            "⚠️  Time budget exhausted; larger patterns may be missing".yellow()
        );
    }
    if stats.unlabeled_templates > 0 {
        println!(
            "   {} {}",
            "⚠️  Templates skipped for lack of a canonical label:".yellow(),
            stats.unlabeled_templates
        );
    }
    println!();

    if report.is_empty() {
        println!("{}", "No pattern reached the support threshold.".yellow());
    } else {
        println!(
            "{} {}",
            "✅ Patterns found:".bright_green().bold(),
            report.pattern_count()
        );
        let rows: Vec<PatternRow> = report
            .patterns
            .iter()
            .take(top)
            .enumerate()
            .map(|(index, pattern)| PatternRow {
                rank: index + 1,
                support: pattern.support,
                occurrences: pattern.occurrences,
                nodes: pattern.node_count(),
                edges: pattern.edge_count(),
                pattern: pattern.summary(),
            })
            .collect();
        let mut table = Table::new(rows);
        table.with(TableStyle::rounded());
        println!("{}", table);
        if report.pattern_count() > top {
            println!(
                "{}",
                format!("   ... {} more (use --top)", report.pattern_count() - top).dimmed()
            );
        }
    }

    if !report.omissions.is_empty() {
        println!();
        println!("{}", "⚠️  Omitted methods".yellow().bold());
        for omission in &report.omissions {
            println!(
                "   {}::{}: {}",
                omission.project,
                omission.method,
                omission.reason.dimmed()
            );
        }
    }
}

/// Row used when printing configuration details.
#[derive(Tabled)]
struct SettingRow {
    setting: &'static str,
    value: String,
}

/// Print the settings that shape a mining run
pub fn display_config_summary(config: &SchaapiConfig) {
    let library = if config.library.packages.is_empty() {
        "(from corpus file)".to_string()
    } else {
        config.library.packages.join(", ")
    };
    let rows = vec![
        SettingRow {
            setting: "library.packages",
            value: library,
        },
        SettingRow {
            setting: "mining.min_support",
            value: config.mining.min_support.to_string(),
        },
        SettingRow {
            setting: "mining.max_pattern_size",
            value: config.mining.max_pattern_size.to_string(),
        },
        SettingRow {
            setting: "mining.support_policy",
            value: format!("{:?}", config.mining.support_policy).to_lowercase(),
        },
        SettingRow {
            setting: "filters.min_pattern_nodes",
            value: config.filters.min_pattern_nodes.to_string(),
        },
    ];
    let mut table = Table::new(rows);
    table.with(TableStyle::rounded());
    println!("{}", table);
}

/// Print every remaining setting
pub fn display_config_details(config: &SchaapiConfig) {
    let rows = vec![
        SettingRow {
            setting: "mining.max_embeddings_per_graph",
            value: config.mining.max_embeddings_per_graph.to_string(),
        },
        SettingRow {
            setting: "mining.timeout_secs",
            value: config
                .mining
                .timeout_secs
                .map_or_else(|| "none".to_string(), |secs| secs.to_string()),
        },
        SettingRow {
            setting: "normalization.max_label_iterations",
            value: config.normalization.max_label_iterations.to_string(),
        },
        SettingRow {
            setting: "normalization.max_canonical_branches",
            value: config.normalization.max_canonical_branches.to_string(),
        },
        SettingRow {
            setting: "filters.drop_incomplete_init",
            value: config.filters.drop_incomplete_init.to_string(),
        },
        SettingRow {
            setting: "filters.drop_empty_loops",
            value: config.filters.drop_empty_loops.to_string(),
        },
        SettingRow {
            setting: "performance.parallel",
            value: config.performance.parallel.to_string(),
        },
        SettingRow {
            setting: "performance.max_threads",
            value: config
                .performance
                .max_threads
                .map_or_else(|| "all cores".to_string(), |n| n.to_string()),
        },
    ];
    let mut table = Table::new(rows);
    table.with(TableStyle::rounded());
    println!("{}", table);
}

/// Row of the per-class test table.
#[derive(Tabled)]
struct TestClassRow {
    class: String,
    total: usize,
    passed: usize,
    ignored: usize,
    failed: usize,
}

/// Print per-class test counts and failures
pub fn display_test_results(results: &TestResults) {
    let rows: Vec<TestClassRow> = results
        .sub_results
        .iter()
        .map(|(class, sub)| TestClassRow {
            class: class.clone(),
            total: sub.total_count(),
            passed: sub.pass_count(),
            ignored: sub.ignore_count(),
            failed: sub.failure_count(),
        })
        .collect();
    let mut table = Table::new(rows);
    table.with(TableStyle::rounded());
    println!("{}", table);

    println!(
        "Total: {}  Passed: {}  Ignored: {}  Failed: {}",
        results.total_count(),
        results.pass_count().to_string().green(),
        results.ignore_count().to_string().yellow(),
        results.failure_count().to_string().red()
    );
    for failure in results.failures() {
        println!("   {} {}", "✗".red(), failure);
    }
}
