//! Runs a [`SymbolReport`] for every symbol of a [`Report`].

use std::sync::Arc;

use opreport_core::{AppError, AppResult};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{error, info, warn};

use super::{Report, SymbolReport};
use crate::html::h;

/// How symbols are scheduled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunnerOptions {
    pub parallel: bool,
    /// Concurrent symbols in parallel mode; `None` means one worker per symbol.
    pub max_workers: Option<usize>,
    /// Total attempts per symbol, at least one.
    pub retry_attempts: u32,
}

impl Default for RunnerOptions {
    fn default() -> Self {
        Self {
            parallel: false,
            max_workers: None,
            retry_attempts: 3,
        }
    }
}

/// Process one symbol, retrying any failure up to `attempts` times in total.
pub async fn process_with_retry(
    builder: &dyn SymbolReport,
    symbol: &str,
    attempts: u32,
) -> AppResult<String> {
    let attempts = attempts.max(1);
    let mut attempt = 1;
    loop {
        match builder.process_symbol(symbol).await {
            Ok(html) => return Ok(html),
            Err(e) if attempt < attempts => {
                warn!(symbol, attempt, error = %e, transient = e.is_transient(), "Symbol failed, retrying");
                attempt += 1;
            }
            Err(e) => return Err(e),
        }
    }
}

fn failure_tab(symbol: &str, e: &AppError) -> String {
    h(1, &format!("Failed to process {symbol}")) + &h(5, &e.to_string())
}

/// Fill one tab per symbol, in ticker order, whatever order the work finishes in.
///
/// A symbol that still fails after its retries gets a tab describing the error;
/// the other symbols are unaffected.
pub async fn run(report: &mut Report, builder: Arc<dyn SymbolReport>, options: RunnerOptions) {
    let symbols = report.symbols().to_vec();
    info!(symbols = symbols.len(), parallel = options.parallel, "Processing symbols");

    let results = if options.parallel {
        run_parallel(&symbols, builder, options).await
    } else {
        let mut results = Vec::with_capacity(symbols.len());
        for symbol in &symbols {
            results.push(process_with_retry(builder.as_ref(), symbol, options.retry_attempts).await);
        }
        results
    };

    let mut failed = 0;
    for (symbol, result) in symbols.iter().zip(results) {
        let html = match result {
            Ok(html) => html,
            Err(e) => {
                error!(symbol, error = %e, "Symbol failed");
                failed += 1;
                failure_tab(symbol, &e)
            }
        };
        report.add_tab(symbol, &html);
    }
    info!(failed, "Symbols processed");
}

async fn run_parallel(
    symbols: &[String],
    builder: Arc<dyn SymbolReport>,
    options: RunnerOptions,
) -> Vec<AppResult<String>> {
    let workers = options.max_workers.unwrap_or(symbols.len()).max(1);
    let semaphore = Arc::new(Semaphore::new(workers));
    let mut join_set = JoinSet::new();

    for (index, symbol) in symbols.iter().cloned().enumerate() {
        let builder = Arc::clone(&builder);
        let semaphore = Arc::clone(&semaphore);
        let attempts = options.retry_attempts;
        join_set.spawn(async move {
            let result = match semaphore.acquire_owned().await {
                Ok(_permit) => process_with_retry(builder.as_ref(), &symbol, attempts).await,
                Err(e) => Err(AppError::Internal(format!("worker pool closed: {e}"))),
            };
            (index, result)
        });
    }

    let mut results: Vec<Option<AppResult<String>>> = symbols.iter().map(|_| None).collect();
    while let Some(joined) = join_set.join_next().await {
        match joined {
            Ok((index, result)) => results[index] = Some(result),
            Err(e) => error!(error = %e, "Symbol task panicked"),
        }
    }

    results
        .into_iter()
        .map(|r| r.unwrap_or_else(|| Err(AppError::Internal("symbol task did not finish".into()))))
        .collect()
}
