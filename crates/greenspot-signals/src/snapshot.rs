//! Per-request region snapshot assembly

use chrono::{DateTime, Timelike, Utc};
use futures::future::join_all;
use greenspot_core::{
    symmetric_jitter, unit_jitter, zones_for, Availability, CandidateOffer, CarbonIndex,
    GreenspotResult, RegionInfo, RegionSnapshot, SignalSources, SignalsConfig, Tier, ZoneSnapshot,
};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

use crate::carbon::{CarbonModel, ModelOnlyCarbon, UkGridCarbon};
use crate::error::SignalError;
use crate::prices::{catalog_quotes, CatalogPriceSource, HttpPriceSource};
use crate::traits::{CarbonSource, PriceQuote, PriceSource, WeatherForecast, WeatherSource};
use crate::weather::{OpenMeteoWeather, StaticWeather};

/// Maximum relative deviation of a zone's spot price from the region quote
const ZONE_PRICE_JITTER: f64 = 0.08;

fn round4(value: f64) -> f64 {
    (value * 10_000.0).round() / 10_000.0
}

fn availability_for(zone_id: &str, sku: &str, tier: Tier) -> Availability {
    let roll = unit_jitter(&[zone_id, sku, "availability"]);
    let bucket = if roll < 0.45 {
        Availability::High
    } else if roll < 0.75 {
        Availability::Medium
    } else if roll < 0.92 {
        Availability::Low
    } else {
        Availability::VeryLow
    };
    if tier == Tier::Premium {
        bucket.degrade()
    } else {
        bucket
    }
}

/// Derive a zone's offers from the region price list
///
/// The spot price and availability vary per zone through deterministic
/// jitter keyed on the zone, the SKU and the hour of day.
pub fn zone_offers(zone_id: &str, quotes: &[PriceQuote], hour: u32) -> Vec<CandidateOffer> {
    let hour = hour.to_string();
    quotes
        .iter()
        .map(|q| {
            let jitter = symmetric_jitter(&[zone_id, &q.sku, &hour], ZONE_PRICE_JITTER);
            CandidateOffer::new(
                q.sku.clone(),
                q.gpu_name.clone(),
                q.gpu_count,
                q.vcpus,
                q.ram_gb,
                round4(q.spot_usd_hr * (1.0 + jitter)),
                q.on_demand_usd_hr,
                availability_for(zone_id, &q.sku, q.tier),
                q.tier,
            )
        })
        .collect()
}

/// Builds region snapshots from the three signal collaborators
///
/// Each call is bounded by `timeout`. A failed or slow call is replaced by
/// its documented default:
/// - price: catalog reference quotes (`catalog-fallback`)
/// - weather: 15 °C, 10 km/h, no sun, flat series (`default`)
/// - carbon: estimation model over the weather (`model-fallback`)
pub struct SnapshotAssembler {
    prices: Arc<dyn PriceSource>,
    weather: Arc<dyn WeatherSource>,
    carbon: Arc<dyn CarbonSource>,
    timeout: Duration,
}

impl SnapshotAssembler {
    /// Create a new assembler from explicit collaborators
    pub fn new(
        prices: Arc<dyn PriceSource>,
        weather: Arc<dyn WeatherSource>,
        carbon: Arc<dyn CarbonSource>,
        timeout: Duration,
    ) -> Self {
        Self {
            prices,
            weather,
            carbon,
            timeout,
        }
    }

    /// Create an assembler with the collaborators named in the configuration
    pub fn from_config(config: &SignalsConfig) -> GreenspotResult<Self> {
        use greenspot_core::{CarbonSourceKind, GreenspotError, PriceSourceKind, WeatherSourceKind};

        let timeout = Duration::from_millis(config.timeout_ms);
        let to_config_err = |e: SignalError| GreenspotError::Config(e.to_string());

        let prices: Arc<dyn PriceSource> = match config.price_source {
            PriceSourceKind::Catalog => Arc::new(CatalogPriceSource),
            PriceSourceKind::Http => {
                Arc::new(HttpPriceSource::new(&config.price_url, timeout).map_err(to_config_err)?)
            }
        };
        let weather: Arc<dyn WeatherSource> = match config.weather_source {
            WeatherSourceKind::OpenMeteo => {
                Arc::new(OpenMeteoWeather::new(&config.weather_url, timeout).map_err(to_config_err)?)
            }
            WeatherSourceKind::Static => Arc::new(StaticWeather::default()),
        };
        let carbon: Arc<dyn CarbonSource> = match config.carbon_source {
            CarbonSourceKind::UkGrid => Arc::new(
                UkGridCarbon::new(&config.carbon_url, &config.live_carbon_region, timeout)
                    .map_err(to_config_err)?,
            ),
            CarbonSourceKind::Model => Arc::new(ModelOnlyCarbon),
        };

        Ok(Self::new(prices, weather, carbon, timeout))
    }

    /// Offline assembler: catalog prices, static weather, modelled carbon
    pub fn offline() -> Self {
        Self::new(
            Arc::new(CatalogPriceSource),
            Arc::new(StaticWeather::default()),
            Arc::new(ModelOnlyCarbon),
            Duration::from_secs(1),
        )
    }

    async fn bounded<T, F>(&self, fut: F) -> Result<T, SignalError>
    where
        F: Future<Output = Result<T, SignalError>>,
    {
        match tokio::time::timeout(self.timeout, fut).await {
            Ok(result) => result,
            Err(_) => Err(SignalError::Timeout(self.timeout)),
        }
    }

    /// Build a fresh snapshot for one region
    ///
    /// The three signals are fetched concurrently; zones are built only
    /// once all three are available.
    pub async fn assemble(&self, region: &RegionInfo, now: DateTime<Utc>) -> RegionSnapshot {
        let (prices, weather, carbon) = tokio::join!(
            self.bounded(self.prices.quotes(region)),
            self.bounded(self.weather.forecast(region)),
            self.bounded(self.carbon.intensity(region)),
        );

        let (quotes, price_source) = match prices {
            Ok(quotes) => (quotes, self.prices.name().to_string()),
            Err(e) => {
                warn!(region = region.id, signal = "price", error = %e, "Signal unavailable, using catalog prices");
                (catalog_quotes(region), "catalog-fallback".to_string())
            }
        };

        let forecast = match weather {
            Ok(forecast) if forecast.hourly.len() == 24 => forecast,
            Ok(forecast) => {
                warn!(
                    region = region.id,
                    signal = "weather",
                    samples = forecast.hourly.len(),
                    "Incomplete hourly weather, using defaults"
                );
                WeatherForecast::fallback("default")
            }
            Err(e) => {
                warn!(region = region.id, signal = "weather", error = %e, "Signal unavailable, using default weather");
                WeatherForecast::fallback("default")
            }
        };

        let model = CarbonModel::new(region.grid);
        let modelled_now = model.estimate(&forecast.current);
        let mut carbon_curve = model.curve(&forecast.hourly);

        let (intensity, index, carbon_source) = match carbon {
            Ok(Some(reading)) => {
                // Anchor the modelled curve to the live reading
                if modelled_now > 0.0 {
                    let scale = reading.intensity_g_per_kwh / modelled_now;
                    carbon_curve.iter_mut().for_each(|v| *v *= scale);
                }
                (reading.intensity_g_per_kwh, reading.index, reading.source)
            }
            Ok(None) => (
                modelled_now,
                CarbonIndex::from_intensity(modelled_now),
                "model".to_string(),
            ),
            Err(e) => {
                warn!(region = region.id, signal = "carbon", error = %e, "Signal unavailable, using carbon model");
                (
                    modelled_now,
                    CarbonIndex::from_intensity(modelled_now),
                    "model-fallback".to_string(),
                )
            }
        };

        let hour = now.hour();
        let zones: Vec<ZoneSnapshot> = zones_for(region)
            .into_iter()
            .map(|zone| ZoneSnapshot {
                offers: zone_offers(&zone.zone_id, &quotes, hour),
                zone_id: zone.zone_id,
                zone_name: zone.zone_name,
                carbon_intensity: intensity,
                carbon_index: index,
                temperature_c: forecast.current.temperature_c,
                wind_kmh: forecast.current.wind_kmh,
            })
            .collect();

        debug!(
            region = region.id,
            zones = zones.len(),
            intensity,
            price_source = %price_source,
            "Assembled region snapshot"
        );

        RegionSnapshot {
            region_id: region.id.to_string(),
            region_name: region.name.to_string(),
            cloud_provider: region.provider.to_string(),
            location: region.location.to_string(),
            zones,
            carbon_curve,
            sources: SignalSources {
                price: price_source,
                weather: forecast.source,
                carbon: carbon_source,
            },
            captured_at: now,
        }
    }

    /// Build snapshots for several regions concurrently, preserving order
    pub async fn assemble_all(
        &self,
        regions: &[&RegionInfo],
        now: DateTime<Utc>,
    ) -> Vec<RegionSnapshot> {
        join_all(regions.iter().map(|region| self.assemble(region, now))).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::traits::{CarbonReading, WeatherSample};
    use async_trait::async_trait;
    use chrono::TimeZone;
    use greenspot_core::find_region;

    struct FailingPrices;

    #[async_trait]
    impl PriceSource for FailingPrices {
        async fn quotes(&self, _region: &RegionInfo) -> Result<Vec<PriceQuote>, SignalError> {
            Err(SignalError::Transport("connection refused".to_string()))
        }

        fn name(&self) -> &'static str {
            "failing"
        }
    }

    struct SlowWeather;

    #[async_trait]
    impl WeatherSource for SlowWeather {
        async fn forecast(&self, _region: &RegionInfo) -> Result<WeatherForecast, SignalError> {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok(WeatherForecast::fallback("slow"))
        }
    }

    struct FixedCarbon(f64, CarbonIndex);

    #[async_trait]
    impl CarbonSource for FixedCarbon {
        async fn intensity(
            &self,
            _region: &RegionInfo,
        ) -> Result<Option<CarbonReading>, SignalError> {
            Ok(Some(CarbonReading {
                intensity_g_per_kwh: self.0,
                index: self.1,
                source: "fixed".to_string(),
            }))
        }
    }

    fn noon() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 10, 19, 12, 0, 0).unwrap()
    }

    #[tokio::test]
    async fn test_offline_snapshot() {
        let assembler = SnapshotAssembler::offline();
        let region = find_region("eu-north-1").unwrap();
        let snapshot = assembler.assemble(region, noon()).await;

        assert_eq!(snapshot.region_id, "eu-north-1");
        assert_eq!(snapshot.zones.len(), 3);
        assert_eq!(snapshot.carbon_curve.len(), 24);
        assert_eq!(snapshot.sources.price, "catalog");
        assert_eq!(snapshot.sources.weather, "static");
        assert_eq!(snapshot.sources.carbon, "model");
        assert!(snapshot.zones.iter().all(|z| !z.offers.is_empty()));
    }

    #[tokio::test]
    async fn test_snapshot_is_deterministic() {
        let assembler = SnapshotAssembler::offline();
        let region = find_region("us-west-2").unwrap();
        let a = assembler.assemble(region, noon()).await;
        let b = assembler.assemble(region, noon()).await;
        for (za, zb) in a.zones.iter().zip(b.zones.iter()) {
            assert_eq!(za.offers, zb.offers);
        }
    }

    #[tokio::test]
    async fn test_degraded_signals_use_defaults() {
        let assembler = SnapshotAssembler::new(
            Arc::new(FailingPrices),
            Arc::new(SlowWeather),
            Arc::new(ModelOnlyCarbon),
            Duration::from_millis(50),
        );
        let region = find_region("eu-west-1").unwrap();
        let snapshot = assembler.assemble(region, noon()).await;

        assert_eq!(snapshot.sources.price, "catalog-fallback");
        assert_eq!(snapshot.sources.weather, "default");
        assert_eq!(snapshot.zones[0].temperature_c, WeatherSample::default().temperature_c);
        assert_eq!(snapshot.zones[0].offers.len(), greenspot_core::gpu_skus().len());
    }

    #[tokio::test]
    async fn test_live_carbon_anchors_curve() {
        let assembler = SnapshotAssembler::new(
            Arc::new(CatalogPriceSource),
            Arc::new(StaticWeather::default()),
            Arc::new(FixedCarbon(123.0, CarbonIndex::Moderate)),
            Duration::from_secs(1),
        );
        let region = find_region("eu-west-2").unwrap();
        let snapshot = assembler.assemble(region, noon()).await;

        assert_eq!(snapshot.zones[0].carbon_intensity, 123.0);
        assert_eq!(snapshot.sources.carbon, "fixed");
        // The feed's own index wins over the one derived from intensity
        assert!(snapshot.zones.iter().all(|z| z.carbon_index == CarbonIndex::Moderate));
        // Static weather is flat, so the anchored curve is flat at the live value
        assert!(snapshot.carbon_curve.iter().all(|v| (v - 123.0).abs() < 1e-9));
    }

    #[tokio::test]
    async fn test_assemble_all_preserves_order() {
        let assembler = SnapshotAssembler::offline();
        let regions: Vec<&RegionInfo> = greenspot_core::regions().iter().collect();
        let snapshots = assembler.assemble_all(&regions, noon()).await;
        let ids: Vec<&str> = snapshots.iter().map(|s| s.region_id.as_str()).collect();
        let expected: Vec<&str> = regions.iter().map(|r| r.id).collect();
        assert_eq!(ids, expected);
    }

    #[test]
    fn test_zone_offers_jitter_bounds() {
        let region = find_region("us-east-1").unwrap();
        let quotes = catalog_quotes(region);
        let offers = zone_offers("us-east-1a", &quotes, 7);
        for (offer, quote) in offers.iter().zip(quotes.iter()) {
            let ratio = offer.spot_price_per_hour / quote.spot_usd_hr;
            assert!(ratio > 0.91 && ratio < 1.09);
            assert_eq!(offer.on_demand_price_per_hour, quote.on_demand_usd_hr);
        }
    }
}
