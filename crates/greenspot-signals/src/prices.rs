//! Price list sources

use async_trait::async_trait;
use greenspot_core::{gpu_skus, RegionInfo};
use std::time::Duration;
use tracing::debug;

use crate::error::SignalError;
use crate::traits::{PriceQuote, PriceSource};

fn round4(value: f64) -> f64 {
    (value * 10_000.0).round() / 10_000.0
}

/// Reference prices from the catalog, scaled by the region multiplier
pub fn catalog_quotes(region: &RegionInfo) -> Vec<PriceQuote> {
    gpu_skus()
        .iter()
        .map(|sku| PriceQuote {
            sku: sku.sku.to_string(),
            gpu_name: sku.gpu_name.to_string(),
            gpu_count: sku.gpu_count,
            vcpus: sku.vcpus,
            ram_gb: sku.ram_gb,
            tier: sku.tier,
            spot_usd_hr: round4(sku.spot_usd_hr * region.price_multiplier),
            on_demand_usd_hr: round4(sku.on_demand_usd_hr * region.price_multiplier),
        })
        .collect()
}

/// Offline price source backed by the catalog
#[derive(Debug, Clone, Copy, Default)]
pub struct CatalogPriceSource;

#[async_trait]
impl PriceSource for CatalogPriceSource {
    async fn quotes(&self, region: &RegionInfo) -> Result<Vec<PriceQuote>, SignalError> {
        Ok(catalog_quotes(region))
    }

    fn name(&self) -> &'static str {
        "catalog"
    }
}

/// Remote price list service returning a JSON array of quotes
pub struct HttpPriceSource {
    client: reqwest::Client,
    base_url: String,
}

impl HttpPriceSource {
    /// Create a new price source for the given service URL
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, SignalError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| SignalError::Transport(e.to_string()))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait]
impl PriceSource for HttpPriceSource {
    async fn quotes(&self, region: &RegionInfo) -> Result<Vec<PriceQuote>, SignalError> {
        let response = self
            .client
            .get(&self.base_url)
            .query(&[("region", region.id)])
            .send()
            .await?
            .error_for_status()?;

        let quotes: Vec<PriceQuote> = response.json().await?;
        if quotes.is_empty() {
            return Err(SignalError::Decode(format!(
                "empty price list for {}",
                region.id
            )));
        }

        debug!(region = region.id, quotes = quotes.len(), "Fetched price list");
        Ok(quotes)
    }

    fn name(&self) -> &'static str {
        "price-service"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use greenspot_core::find_region;

    #[tokio::test]
    async fn test_catalog_quotes_scaled_by_region() {
        let mumbai = find_region("ap-south-1").unwrap();
        let ireland = find_region("eu-west-1").unwrap();

        let cheap = CatalogPriceSource.quotes(mumbai).await.unwrap();
        let base = CatalogPriceSource.quotes(ireland).await.unwrap();

        assert_eq!(cheap.len(), gpu_skus().len());
        assert_eq!(cheap[0].sku, "g4dn.xlarge");
        assert!(cheap[0].spot_usd_hr < base[0].spot_usd_hr);
        assert_eq!(base[0].spot_usd_hr, 0.18);
    }

    #[test]
    fn test_quote_json_shape() {
        let json = r#"[{"sku":"g4dn.xlarge","gpu_name":"NVIDIA T4","gpu_count":1,"vcpus":4,
            "ram_gb":16.0,"tier":"low","spot_usd_hr":0.2,"on_demand_usd_hr":0.526}]"#;
        let quotes: Vec<PriceQuote> = serde_json::from_str(json).unwrap();
        assert_eq!(quotes[0].tier, greenspot_core::Tier::Low);
    }

    #[test]
    fn test_http_source_creation() {
        let source = HttpPriceSource::new("http://localhost:8900/prices/", Duration::from_secs(1));
        assert_eq!(source.unwrap().base_url, "http://localhost:8900/prices");
    }
}
