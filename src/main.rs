use clap::Parser;
use vspc_reports::utils::error::{ErrorSeverity, VspcError};
use vspc_reports::utils::logger;
use vspc_reports::{BrowserArtifactSource, CliArgs, Outcome, ReportRunner, RunReport};

#[tokio::main]
async fn main() {
    let args = CliArgs::parse();

    if args.json_logs {
        logger::init_json_logger(args.verbose);
    } else {
        logger::init_cli_logger(args.verbose);
    }

    tracing::info!("Starting vspc-reports");

    let config = match args
        .load_file_config()
        .and_then(|file| args.clone().into_run_config(file))
    {
        Ok(config) => config,
        Err(e) => {
            tracing::error!("❌ Configuration validation failed: {}", e);
            fail(&e);
        }
    };
    if config.verbose {
        tracing::debug!("Run config: {:?}", config);
    }

    let source = BrowserArtifactSource::from_config(&config);
    let runner = ReportRunner::new(source, config);

    match runner.run().await {
        Ok(report) => {
            print_summary(&report);
            if let Some(e) = report.target_error() {
                fail(&e);
            }
            std::process::exit(report.exit_code());
        }
        Err(e) => {
            tracing::error!(
                "❌ Run failed: {} (Category: {:?}, Severity: {:?})",
                e,
                e.category(),
                e.severity()
            );
            fail(&e);
        }
    }
}

fn fail(e: &VspcError) -> ! {
    eprintln!("❌ {}", e.user_friendly_message());
    eprintln!("💡 {}", e.recovery_suggestion());

    // 根據錯誤嚴重程度決定退出碼
    let exit_code = match e.severity() {
        ErrorSeverity::Low => 0,
        ErrorSeverity::Medium => 2,
        ErrorSeverity::High => 1,
        ErrorSeverity::Critical => 3,
    };
    std::process::exit(exit_code);
}

fn print_summary(report: &RunReport) {
    let rule = "=".repeat(60);
    println!("\n{}", rule);
    println!("SUMMARY");
    println!("{}", rule);

    for result in &report.results {
        let line = match &result.outcome {
            Outcome::Created { report_name } => format!("created      {}", report_name),
            Outcome::SkippedDryRun => "would create".to_string(),
            Outcome::Failed { reason } => format!("FAILED       {}", reason),
            Outcome::SkippedAlreadyExists | Outcome::SkippedNotTargeted => continue,
        };
        println!("  {} ({}): {}", result.entity.name, result.entity.id, line);
    }

    let summary = &report.summary;
    if report.dry_run {
        println!("Would create: {}", summary.would_create);
    } else {
        println!("Successfully created: {}", summary.created);
    }
    println!("Skipped: {}", summary.skipped);
    println!("Failed: {}", summary.failed);
    for (entity, reason) in report.failures() {
        println!("  - {}: {}", entity.name, reason);
    }

    if report.dry_run {
        println!("\nThis was a dry run. Run without --dry-run to create the reports.");
    }
}
