//! Full option chain snapshots as CSV, optionally uploaded to storage.

use std::path::{Path, PathBuf};

use chrono::{DateTime, NaiveDate};
use chrono_tz::Tz;
use opreport_core::{AppResult, ResultExt};
use opreport_market::{MarketData, OptionChain, OptionContract, OptionType};
use opreport_storage::S3Storage;
use serde::Serialize;
use tracing::{error, info, instrument};

use crate::delivery::object_key;

const CSV_CONTENT_TYPE: &str = "text/csv";

/// One CSV line; field order is the column order.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ChainRow {
    option_type: OptionType,
    expiration: NaiveDate,
    strike: f64,
    last_price: f64,
    bid: f64,
    ask: f64,
    open_interest: u64,
    volume: u64,
}

impl From<&OptionContract> for ChainRow {
    fn from(c: &OptionContract) -> Self {
        Self {
            option_type: c.option_type,
            expiration: c.expiration,
            strike: c.strike,
            last_price: c.last_price,
            bid: c.bid,
            ask: c.ask,
            open_interest: c.open_interest,
            volume: c.volume,
        }
    }
}

/// `{dir}/{symbol}/{YYYY-MM-DD}/{HH:MM}/{symbol}.csv`
#[must_use]
pub fn chain_csv_path(dir: &Path, symbol: &str, now: DateTime<Tz>) -> PathBuf {
    dir.join(symbol)
        .join(now.format("%Y-%m-%d").to_string())
        .join(now.format("%H:%M").to_string())
        .join(format!("{symbol}.csv"))
}

/// Chain as CSV text, one row per contract.
pub fn chain_csv(chain: &OptionChain) -> AppResult<Vec<u8>> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    for contract in &chain.contracts {
        writer
            .serialize(ChainRow::from(contract))
            .internal("Failed to write CSV row")?;
    }
    writer.into_inner().internal("Failed to finish CSV")
}

/// Write the chain to `path`, creating parent directories.
pub async fn write_chain_csv(chain: &OptionChain, path: &Path) -> AppResult<()> {
    let csv = chain_csv(chain)?;
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    tokio::fs::write(path, csv).await?;
    Ok(())
}

#[instrument(skip(market, storage, dir, now))]
async fn export_symbol(
    market: &dyn MarketData,
    storage: Option<&S3Storage>,
    symbol: &str,
    dir: &Path,
    now: DateTime<Tz>,
) -> AppResult<PathBuf> {
    let chain = market.full_chain(symbol).await?;
    let path = chain_csv_path(dir, symbol, now);
    write_chain_csv(&chain, &path).await?;
    info!(contracts = chain.len(), path = %path.display(), "Chain exported");

    if let Some(storage) = storage {
        storage
            .upload_file(&path, &object_key(&path), CSV_CONTENT_TYPE)
            .await?;
    }
    Ok(path)
}

/// Export every symbol; a failing symbol is logged and skipped.
///
/// Returns the files written.
pub async fn export_chains(
    market: &dyn MarketData,
    storage: Option<&S3Storage>,
    symbols: &[String],
    dir: &Path,
    now: DateTime<Tz>,
) -> Vec<PathBuf> {
    let mut written = Vec::with_capacity(symbols.len());
    for symbol in symbols {
        info!(symbol, "Fetching chain");
        match export_symbol(market, storage, symbol, dir, now).await {
            Ok(path) => written.push(path),
            Err(e) => error!(symbol, error = %e, "Chain export failed"),
        }
    }
    written
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;
    use crate::testing::{FakeMarket, call, put};

    fn now() -> DateTime<Tz> {
        chrono_tz::America::New_York
            .with_ymd_and_hms(2026, 10, 19, 9, 45, 0)
            .unwrap()
    }

    #[test]
    fn path_layout() {
        let path = chain_csv_path(Path::new("chains"), "SPY", now());
        assert_eq!(path, PathBuf::from("chains/SPY/2026-10-19/09:45/SPY.csv"));
    }

    #[tokio::test]
    async fn csv_columns_and_rows() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("SPY.csv");
        let chain = OptionChain::new(
            "SPY",
            vec![
                call("2026-10-19", 100.0, 500, 1_000),
                put("2026-10-23", 95.5, 20, 300),
            ],
        );

        write_chain_csv(&chain, &path).await.unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(
            lines[0],
            "optionType,expiration,strike,lastPrice,bid,ask,openInterest,volume"
        );
        assert_eq!(lines[1], "call,2026-10-19,100.0,1.25,1.2,1.3,1000,500");
        assert_eq!(lines[2], "put,2026-10-23,95.5,1.25,1.2,1.3,300,20");
        assert_eq!(lines.len(), 3);
    }

    #[tokio::test]
    async fn failing_symbol_is_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let market = FakeMarket::new().broken("BAD");
        let symbols = vec!["BAD".to_string(), "SPY".to_string()];

        let written = export_chains(&market, None, &symbols, dir.path(), now()).await;

        assert_eq!(written, vec![chain_csv_path(dir.path(), "SPY", now())]);
        assert!(written[0].exists());
        assert!(!chain_csv_path(dir.path(), "BAD", now()).exists());
    }
}
