use async_trait::async_trait;
use opreport_analytics::{Concentration, filter_active_volume_expirations};
use opreport_core::AppResult;
use tracing::{info, instrument};

use super::{ReportContext, SymbolReport, symbol_heading};
use crate::plots::{Scope, absolute_concentration_plot, expiration_concentration_plot, gex_plot};

/// Gamma exposure and open interest for each active expiration.
pub struct GexReport {
    ctx: ReportContext,
}

impl GexReport {
    #[must_use]
    pub fn new(ctx: ReportContext) -> Self {
        Self { ctx }
    }
}

#[async_trait]
impl SymbolReport for GexReport {
    #[instrument(skip(self))]
    async fn process_symbol(&self, symbol: &str) -> AppResult<String> {
        let market = self.ctx.market.as_ref();
        let settings = &self.ctx.settings;

        let chain = market.full_chain(symbol).await?;
        let price = market.price(symbol).await?;
        let params = self.ctx.greeks(price);
        let price_range = settings.price_range(symbol);

        let expirations =
            filter_active_volume_expirations(&chain, settings.active_volume_threshold, self.ctx.today);
        info!(expirations = expirations.len(), price, "Active expirations");

        let mut html = symbol_heading(symbol);
        for expiration in expirations {
            let scope = Scope::Expiration(expiration);
            html += &gex_plot(&chain, price, scope, price_range, &params)?;
            html += &absolute_concentration_plot(
                &chain,
                price,
                scope,
                Concentration::OpenInterest,
                price_range,
            )?;
        }
        html += &expiration_concentration_plot(&chain, Concentration::OpenInterest)?;

        Ok(html)
    }
}
