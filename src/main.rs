//! Options report: daily options-market HTML reports and chain snapshots.

use std::sync::Arc;

use chrono::Utc;
use options_report::chains::export_chains;
use options_report::config::{Command, Config, ReportArgs, ReportKind};
use options_report::delivery::publish;
use options_report::reports::{
    self, BasicReport, GexReport, OptionReport, Report, ReportContext, SymbolReport,
};
use options_report::startup::{init_email, init_market, init_s3};
use opreport_telemetry::{capture_error, setup_telemetry};
use tracing::{error, info};

/// Build version (injected at compile time)
const VERSION: &str = env!("CARGO_PKG_VERSION");

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::init()?;
    let telemetry = setup_telemetry(&config.telemetry());

    info!(
        version = VERSION,
        symbols = ?config.symbols(),
        timezone = %config.timezone(),
        pid = std::process::id(),
        "Starting options-report"
    );

    let result = match &config.command {
        Command::Report(args) => run_report(&config, args).await,
        Command::Chains => run_chains(&config).await,
    };

    if let Err(e) = &result {
        error!(error = %e, "Run failed");
        capture_error(e);
    }

    telemetry.shutdown();
    result
}

async fn run_report(config: &Config, args: &ReportArgs) -> anyhow::Result<()> {
    let now = Utc::now().with_timezone(&config.timezone());
    let ctx = ReportContext {
        market: init_market(config)?,
        settings: config.analysis_settings(),
        today: now.date_naive(),
    };

    let builder: Arc<dyn SymbolReport> = match args.kind {
        ReportKind::Options => Arc::new(OptionReport::new(ctx)),
        ReportKind::Gex => Arc::new(GexReport::new(ctx)),
        ReportKind::Basic => Arc::new(BasicReport),
    };

    let mut report = Report::new(&config.author, &config.title, config.symbols(), now);
    reports::run(&mut report, builder, config.runner_options()).await;
    let path = report.save_to_html(&config.reports_dir).await?;

    if args.send {
        let storage = init_s3(config)?
            .ok_or_else(|| anyhow::anyhow!("--send requires storage to be configured"))?;
        let email = init_email(config)?;
        publish(
            &storage,
            email.as_ref(),
            &path,
            config.presign_ttl(),
            &config.recipients(),
        )
        .await?;
    }

    info!(path = %path.display(), "Done");
    Ok(())
}

async fn run_chains(config: &Config) -> anyhow::Result<()> {
    let now = Utc::now().with_timezone(&config.timezone());
    let market = init_market(config)?;
    let storage = init_s3(config)?;

    let symbols = config.symbols();
    let written = export_chains(
        market.as_ref(),
        storage.as_ref(),
        &symbols,
        &config.chains_dir,
        now,
    )
    .await;

    info!(exported = written.len(), requested = symbols.len(), "Chains exported");
    Ok(())
}
