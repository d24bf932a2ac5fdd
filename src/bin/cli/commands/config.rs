//! `print-default-config`, `init-config` and `validate-config`.

use owo_colors::OwoColorize;
use tabled::{settings::Style as TableStyle, Table, Tabled};

use schaapi_rs::core::config::SchaapiConfig;

use crate::cli::args::{InitConfigArgs, ValidateConfigArgs};
use crate::cli::config_builder::load_configuration;
use crate::cli::output::{display_config_details, display_config_summary};

/// Print the built-in defaults as YAML
pub fn print_default_config() -> anyhow::Result<()> {
    println!("{}", "# Default schaapi configuration".dimmed());
    println!(
        "{}",
        "# Edit library.packages, then pass the file to `schaapi mine --config`".dimmed()
    );
    println!();

    let yaml = serde_yaml::to_string(&SchaapiConfig::default())?;
    println!("{yaml}");

    Ok(())
}

/// Write the built-in defaults to a new configuration file
pub fn init_config(args: InitConfigArgs) -> anyhow::Result<()> {
    if args.output.exists() && !args.force {
        anyhow::bail!(
            "{} already exists; pass --force to replace it",
            args.output.display()
        );
    }

    SchaapiConfig::default().to_yaml_file(&args.output)?;

    println!(
        "{} {}",
        "✅ Wrote configuration:".bright_green().bold(),
        args.output.display().to_string().cyan()
    );
    println!();
    println!(
        "   Name the library under {} and run {}",
        "library.packages".bold(),
        format!(
            "schaapi mine --corpus corpus.json --config {}",
            args.output.display()
        )
        .cyan()
    );
    println!();

    /// Setting worth adjusting for a first run.
    #[derive(Tabled)]
    struct SettingTip {
        setting: &'static str,
        effect: &'static str,
    }

    let tips = vec![
        SettingTip {
            setting: "mining.min_support",
            effect: "Projects a pattern must recur in (>= 2)",
        },
        SettingTip {
            setting: "mining.max_pattern_size",
            effect: "Stop growing templates past this many nodes",
        },
        SettingTip {
            setting: "mining.support_policy",
            effect: "projects: distinct projects; graphs: distinct methods",
        },
        SettingTip {
            setting: "mining.timeout_secs",
            effect: "Stop after the current level once exceeded",
        },
        SettingTip {
            setting: "filters.min_pattern_nodes",
            effect: "Hide patterns smaller than this",
        },
        SettingTip {
            setting: "filters.drop_empty_loops",
            effect: "Hide patterns looping on a single call",
        },
        SettingTip {
            setting: "performance.max_threads",
            effect: "Dedicated worker pool size (unset: all cores)",
        },
    ];

    let mut table = Table::new(tips);
    table.with(TableStyle::rounded());
    println!("{table}");

    Ok(())
}

/// Load and check a configuration file
pub fn validate_config(args: ValidateConfigArgs) -> anyhow::Result<()> {
    println!(
        "{} {}",
        "🔍 Checking".bright_blue().bold(),
        args.config.display().to_string().cyan()
    );
    println!();

    let checked = load_configuration(Some(&args.config)).and_then(|config| {
        config.validate()?;
        Ok(config)
    });
    let config = match checked {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{} {e}", "❌ Configuration validation failed:".red());
            println!(
                "{}",
                "   Compare with `schaapi print-default-config`; min_support must be at least 2 and limits positive."
                    .dimmed()
            );
            return Err(anyhow::anyhow!("Configuration validation failed: {e}"));
        }
    };

    println!("{}", "✅ Configuration file is valid".bright_green().bold());
    println!();
    display_config_summary(&config);
    if args.detailed {
        println!();
        display_config_details(&config);
    }

    Ok(())
}
