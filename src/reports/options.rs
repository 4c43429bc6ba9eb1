use async_trait::async_trait;
use opreport_analytics::{
    Concentration, filter_active_volume_expirations, next_friday, options_levels,
    should_include_friday,
};
use opreport_core::AppResult;
use opreport_market::OptionType;
use tracing::{info, instrument};

use super::{ReportContext, SymbolReport, symbol_heading};
use crate::plots::{
    Scope, absolute_concentration_plot, expiration_concentration_plot, gex_plot,
    long_period_plot, one_day_plot, rsi_options_plot,
};

/// Momentum, levels, open-interest concentration and gamma exposure.
pub struct OptionReport {
    ctx: ReportContext,
}

impl OptionReport {
    #[must_use]
    pub fn new(ctx: ReportContext) -> Self {
        Self { ctx }
    }
}

#[async_trait]
impl SymbolReport for OptionReport {
    #[instrument(skip(self))]
    async fn process_symbol(&self, symbol: &str) -> AppResult<String> {
        let market = self.ctx.market.as_ref();
        let settings = &self.ctx.settings;
        let today = self.ctx.today;

        let chain = market.full_chain(symbol).await?;
        let price = market.price(symbol).await?;
        let params = self.ctx.greeks(price);
        info!(contracts = chain.len(), price, "Loaded chain");

        let mut html = symbol_heading(symbol);

        let expirations =
            filter_active_volume_expirations(&chain, settings.active_volume_threshold, today);
        html += &rsi_options_plot(market, symbol, &expirations, OptionType::Call, price).await?;
        html += &rsi_options_plot(market, symbol, &expirations, OptionType::Put, price).await?;

        let levels = options_levels(&chain, price, &params);
        html += &long_period_plot(market, symbol, &levels, today).await?;
        html += &one_day_plot(market, symbol, &levels, today).await?;

        let price_range = settings.price_range(symbol);
        let include_friday = should_include_friday(symbol, &settings.daily_expiry_symbols, today);
        let friday = Scope::NextFriday(next_friday(today));

        html += &absolute_concentration_plot(
            &chain,
            price,
            Scope::Current,
            Concentration::OpenInterest,
            price_range,
        )?;
        if include_friday {
            html += &absolute_concentration_plot(
                &chain,
                price,
                friday,
                Concentration::OpenInterest,
                price_range,
            )?;
        }
        html += &absolute_concentration_plot(
            &chain,
            price,
            Scope::All,
            Concentration::OpenInterest,
            price_range,
        )?;

        html += &gex_plot(&chain, price, Scope::Current, price_range, &params)?;
        if include_friday {
            html += &gex_plot(&chain, price, friday, 2.0 * price_range, &params)?;
        }

        html += &expiration_concentration_plot(&chain, Concentration::OpenInterest)?;

        Ok(html)
    }
}
