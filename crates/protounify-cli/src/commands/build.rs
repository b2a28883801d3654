//! Build command - rewrite, compile and aggregate the unified tree

use anyhow::{Context, Result};
use protounify_build::{Pipeline, PipelineReport};
use protounify_config::ConfigLoader;
use std::path::PathBuf;

/// Build command arguments
#[derive(Default)]
pub struct BuildArgs {
    /// Project directory (defaults to current directory)
    pub project_dir: Option<PathBuf>,
}

/// Run the build command
pub fn run(args: BuildArgs) -> Result<()> {
    let project_dir = args.project_dir.unwrap_or_else(|| PathBuf::from("."));

    let config = ConfigLoader::new()
        .load_from_directory(&project_dir)
        .context("Failed to load configuration")?;
    if !config.found {
        tracing::debug!(
            "no configuration found, using defaults rooted at {}",
            config.project_root.display()
        );
    }

    let pipeline = Pipeline::new(&config).context("Failed to create pipeline")?;
    let report = pipeline.run().context("Build failed")?;

    print_summary(&report);
    Ok(())
}

fn print_summary(report: &PipelineReport) {
    println!("{}", "=".repeat(60));
    println!(
        "Build succeeded in {:.2}s",
        report.stats.total_time.as_secs_f64()
    );
    println!("{}", "=".repeat(60));
    println!(
        "  Sources:   {} rewritten ({} changed, {} filtered out)",
        report.rewritten.len(),
        report.rewrites_written,
        report.filtered_out
    );
    println!(
        "  Compiled:  {} of {} ({} fresh)",
        report.compile.compiled.len(),
        report.compile.total,
        report.compile.fresh
    );
    println!(
        "  Packages:  {} ({} manifests updated)",
        report.aggregate.groups.packages().len(),
        report.aggregate.written
    );
    println!("{}", "=".repeat(60));
}
