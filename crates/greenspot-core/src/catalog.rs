//! Candidate catalog: known regions, zones, GPU SKUs and grid profiles
//!
//! Enumeration order of regions, zones and SKUs is fixed. Placement relies on
//! it for deterministic tie-breaking.

use serde::Serialize;

/// Electricity generation profile of a region's grid
#[derive(Debug, Clone, Copy, Serialize)]
pub struct GridProfile {
    /// Intensity of the marginal fossil mix in gCO2/kWh
    pub fossil_intensity: f64,
    /// Share of demand met by firm low-carbon sources (hydro, nuclear)
    pub firm_clean_share: f64,
    /// Installed wind capacity relative to demand
    pub wind_share: f64,
    /// Installed solar capacity relative to demand
    pub solar_share: f64,
}

/// A cloud region known to the catalog
#[derive(Debug, Clone, Serialize)]
pub struct RegionInfo {
    pub id: &'static str,
    pub name: &'static str,
    pub provider: &'static str,
    pub location: &'static str,
    pub latitude: f64,
    pub longitude: f64,
    /// Regional factor applied to reference SKU prices
    pub price_multiplier: f64,
    pub grid: GridProfile,
}

/// A GPU instance type with reference pricing
#[derive(Debug, Clone, Serialize)]
pub struct GpuSku {
    pub sku: &'static str,
    pub gpu_name: &'static str,
    pub gpu_count: u32,
    pub vcpus: u32,
    /// Accelerator memory in GB
    pub ram_gb: f64,
    pub tier: crate::Tier,
    pub on_demand_usd_hr: f64,
    pub spot_usd_hr: f64,
}

/// An availability zone within a region
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ZoneInfo {
    pub zone_id: String,
    pub zone_name: String,
}

const ZONE_SUFFIXES: [char; 3] = ['a', 'b', 'c'];

static REGIONS: [RegionInfo; 6] = [
    RegionInfo {
        id: "eu-north-1",
        name: "Europe (Stockholm)",
        provider: "aws",
        location: "Stockholm, Sweden",
        latitude: 59.33,
        longitude: 18.07,
        price_multiplier: 0.95,
        grid: GridProfile {
            fossil_intensity: 450.0,
            firm_clean_share: 0.85,
            wind_share: 0.20,
            solar_share: 0.02,
        },
    },
    RegionInfo {
        id: "eu-west-1",
        name: "Europe (Ireland)",
        provider: "aws",
        location: "Dublin, Ireland",
        latitude: 53.35,
        longitude: -6.26,
        price_multiplier: 1.0,
        grid: GridProfile {
            fossil_intensity: 480.0,
            firm_clean_share: 0.05,
            wind_share: 0.55,
            solar_share: 0.02,
        },
    },
    RegionInfo {
        id: "eu-west-2",
        name: "Europe (London)",
        provider: "aws",
        location: "London, United Kingdom",
        latitude: 51.51,
        longitude: -0.13,
        price_multiplier: 1.05,
        grid: GridProfile {
            fossil_intensity: 450.0,
            firm_clean_share: 0.25,
            wind_share: 0.45,
            solar_share: 0.08,
        },
    },
    RegionInfo {
        id: "us-east-1",
        name: "US East (N. Virginia)",
        provider: "aws",
        location: "Ashburn, Virginia, USA",
        latitude: 38.90,
        longitude: -77.04,
        price_multiplier: 0.92,
        grid: GridProfile {
            fossil_intensity: 520.0,
            firm_clean_share: 0.33,
            wind_share: 0.05,
            solar_share: 0.08,
        },
    },
    RegionInfo {
        id: "us-west-2",
        name: "US West (Oregon)",
        provider: "aws",
        location: "Boardman, Oregon, USA",
        latitude: 45.52,
        longitude: -122.68,
        price_multiplier: 0.95,
        grid: GridProfile {
            fossil_intensity: 500.0,
            firm_clean_share: 0.60,
            wind_share: 0.15,
            solar_share: 0.05,
        },
    },
    RegionInfo {
        id: "ap-south-1",
        name: "Asia Pacific (Mumbai)",
        provider: "aws",
        location: "Mumbai, India",
        latitude: 19.08,
        longitude: 72.88,
        price_multiplier: 0.85,
        grid: GridProfile {
            fossil_intensity: 780.0,
            firm_clean_share: 0.05,
            wind_share: 0.10,
            solar_share: 0.15,
        },
    },
];

static GPU_SKUS: [GpuSku; 6] = [
    GpuSku {
        sku: "g4dn.xlarge",
        gpu_name: "NVIDIA T4",
        gpu_count: 1,
        vcpus: 4,
        ram_gb: 16.0,
        tier: crate::Tier::Low,
        on_demand_usd_hr: 0.526,
        spot_usd_hr: 0.18,
    },
    GpuSku {
        sku: "g6.xlarge",
        gpu_name: "NVIDIA L4",
        gpu_count: 1,
        vcpus: 4,
        ram_gb: 24.0,
        tier: crate::Tier::Mid,
        on_demand_usd_hr: 0.805,
        spot_usd_hr: 0.31,
    },
    GpuSku {
        sku: "g5.xlarge",
        gpu_name: "NVIDIA A10G",
        gpu_count: 1,
        vcpus: 4,
        ram_gb: 24.0,
        tier: crate::Tier::Mid,
        on_demand_usd_hr: 1.006,
        spot_usd_hr: 0.36,
    },
    GpuSku {
        sku: "g6e.xlarge",
        gpu_name: "NVIDIA L40S",
        gpu_count: 1,
        vcpus: 4,
        ram_gb: 48.0,
        tier: crate::Tier::High,
        on_demand_usd_hr: 1.861,
        spot_usd_hr: 0.72,
    },
    GpuSku {
        sku: "g5.12xlarge",
        gpu_name: "NVIDIA A10G",
        gpu_count: 4,
        vcpus: 48,
        ram_gb: 96.0,
        tier: crate::Tier::High,
        on_demand_usd_hr: 5.672,
        spot_usd_hr: 2.05,
    },
    GpuSku {
        sku: "p4d.24xlarge",
        gpu_name: "NVIDIA A100",
        gpu_count: 8,
        vcpus: 96,
        ram_gb: 320.0,
        tier: crate::Tier::Premium,
        on_demand_usd_hr: 32.773,
        spot_usd_hr: 12.5,
    },
];

/// All known regions, in enumeration order
pub fn regions() -> &'static [RegionInfo] {
    &REGIONS
}

/// Look up a region by id
pub fn find_region(id: &str) -> Option<&'static RegionInfo> {
    REGIONS.iter().find(|r| r.id == id)
}

/// All known GPU SKUs, in enumeration order
pub fn gpu_skus() -> &'static [GpuSku] {
    &GPU_SKUS
}

/// Look up a GPU SKU by instance type
pub fn find_sku(sku: &str) -> Option<&'static GpuSku> {
    GPU_SKUS.iter().find(|s| s.sku == sku)
}

/// Zones of a region, in enumeration order
pub fn zones_for(region: &RegionInfo) -> Vec<ZoneInfo> {
    let city = region.location.split(',').next().unwrap_or(region.location);
    ZONE_SUFFIXES
        .iter()
        .map(|suffix| ZoneInfo {
            zone_id: format!("{}{}", region.id, suffix),
            zone_name: format!("{} ({})", city, suffix.to_ascii_uppercase()),
        })
        .collect()
}

/// Region that owns the given zone id
pub fn region_of_zone(zone_id: &str) -> Option<&'static RegionInfo> {
    REGIONS.iter().find(|r| {
        zone_id.len() == r.id.len() + 1
            && zone_id.starts_with(r.id)
            && zone_id
                .chars()
                .last()
                .is_some_and(|c| ZONE_SUFFIXES.contains(&c))
    })
}

/// Fixed migration target for a zone: the next zone in the same region
pub fn neighbor_zone(zone_id: &str) -> Option<String> {
    let region = region_of_zone(zone_id)?;
    let suffix = zone_id.chars().last()?;
    let idx = ZONE_SUFFIXES.iter().position(|c| *c == suffix)?;
    let next = ZONE_SUFFIXES[(idx + 1) % ZONE_SUFFIXES.len()];
    Some(format!("{}{}", region.id, next))
}
