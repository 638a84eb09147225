//! Layer version resolution
//!
//! Latest published layer versions per region, loaded once, and the ARN
//! synthesis shared by pinned and table-resolved references.

use crate::classifier::TracerLayer;
use crate::constants::LAYER_ACCOUNT_ID;
use crate::error::UnsupportedRegionError;
use autotrace_construct::partition_for_region;
use once_cell::sync::Lazy;
use std::collections::HashMap;

type VersionTable = HashMap<&'static str, u32>;

fn table(entries: &[(&[&'static str], u32)]) -> VersionTable {
    entries
        .iter()
        .flat_map(|(regions, version)| regions.iter().map(move |region| (*region, *version)))
        .collect()
}

const MAIN_REGIONS: &[&str] = &[
    "us-east-1",
    "us-east-2",
    "us-west-1",
    "ca-central-1",
    "eu-north-1",
    "eu-west-1",
    "eu-west-2",
    "eu-west-3",
    "eu-central-1",
    "ap-northeast-1",
    "ap-northeast-2",
    "ap-southeast-1",
    "ap-southeast-2",
    "ap-south-1",
    "sa-east-1",
];

const US_WEST_2: &[&str] = &["us-west-2"];
const LATE_OPT_IN_REGIONS: &[&str] = &["ap-east-1", "me-south-1"];
const AF_SOUTH_1: &[&str] = &["af-south-1"];

static NODE_VERSIONS: Lazy<VersionTable> = Lazy::new(|| {
    table(&[
        (MAIN_REGIONS, 215),
        (US_WEST_2, 218),
        (LATE_OPT_IN_REGIONS, 200),
        (AF_SOUTH_1, 92),
    ])
});

static PYTHON_VERSIONS: Lazy<VersionTable> = Lazy::new(|| {
    table(&[
        (MAIN_REGIONS, 240),
        (US_WEST_2, 240),
        (LATE_OPT_IN_REGIONS, 199),
        (AF_SOUTH_1, 62),
    ])
});

/// Latest known version of a layer in a region
#[must_use]
pub fn latest_version(layer: TracerLayer, region: &str) -> Option<u32> {
    let versions = match layer {
        TracerLayer::Node => &*NODE_VERSIONS,
        TracerLayer::Python => &*PYTHON_VERSIONS,
    };
    versions.get(region).copied()
}

/// ARN prefix shared by every layer of the tracer account in a region
#[must_use]
pub fn layer_arn_prefix(region: &str) -> String {
    format!(
        "arn:{}:lambda:{region}:{LAYER_ACCOUNT_ID}:layer:",
        partition_for_region(region)
    )
}

/// ARN of a specific layer version
#[must_use]
pub fn layer_arn(layer: TracerLayer, region: &str, version: u32) -> String {
    format!("{}{}:{version}", layer_arn_prefix(region), layer.layer_name())
}

/// Resolve the layer ARN for a region, honouring a pin
///
/// A pinned version is used as-is, without checking it was published.
///
/// # Errors
/// `UnsupportedRegionError` if nothing is pinned and the region has no
/// published version of this layer
pub fn resolve_layer_arn(
    layer: TracerLayer,
    region: &str,
    pinned: Option<u32>,
) -> Result<String, UnsupportedRegionError> {
    let version = match pinned {
        Some(version) => version,
        None => latest_version(layer, region).ok_or_else(|| UnsupportedRegionError {
            layer: layer.layer_name(),
            region: region.to_string(),
        })?,
    };
    Ok(layer_arn(layer, region, version))
}
