//! The `summarize-tests` command.

use owo_colors::OwoColorize;

use schaapi_rs::io::test_results::TestResults;

use crate::cli::args::SummarizeTestsArgs;
use crate::cli::output::display_test_results;

/// Summarize a generated test run; fails when any test failed
pub fn summarize_tests(args: SummarizeTestsArgs) -> anyhow::Result<()> {
    let results = TestResults::from_json_file(&args.results)?;
    if results.is_empty() {
        println!("{}", "No tests were executed.".yellow());
        return Ok(());
    }

    display_test_results(&results);
    if results.has_failures() {
        return Err(anyhow::anyhow!(
            "{} of {} tests failed",
            results.failure_count(),
            results.total_count()
        ));
    }
    Ok(())
}
