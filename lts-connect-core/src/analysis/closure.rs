//! Land-use closure
//!
//! Parcels of an allowed use (parking, institutional, commercial...) next to
//! the corridor are folded into the analysis region, together with allowed
//! parcels sharing a boundary with them. A store reachable through its
//! parking lot then counts even when it sits off every island.

use std::collections::BTreeSet;

use geo::{MultiPolygon, Relate};
use log::debug;

use crate::{
    config::LandUseConfig,
    geometry::{fill_holes, union_all},
    model::{Layer, RegionStatus},
};

/// Union of allowed parcels intersecting `corridor` and the allowed parcels
/// touching them. `None` when no parcel qualifies.
pub fn land_use_closure(
    layer: &Layer<MultiPolygon<f64>>,
    corridor: &MultiPolygon<f64>,
    land_use: &LandUseConfig,
) -> Option<MultiPolygon<f64>> {
    let allowed = |index: &usize| {
        layer.features[*index]
            .category(&land_use.category_property)
            .is_some_and(|category| land_use.allows(&category))
    };

    let proximate: Vec<usize> = layer
        .intersecting_indices(corridor)
        .into_iter()
        .filter(allowed)
        .collect();

    if proximate.is_empty() {
        return None;
    }

    let mut selected: BTreeSet<usize> = proximate.iter().copied().collect();
    for &index in &proximate {
        let parcel = &layer.features[index].geometry;
        let touching = layer
            .intersecting_indices(parcel)
            .into_iter()
            .filter(|other| *other != index && !selected.contains(other))
            .filter(allowed)
            .filter(|&other| parcel.relate(&layer.features[other].geometry).is_touches())
            .collect::<Vec<_>>();
        selected.extend(touching);
    }

    debug!(
        "Land-use closure: {} proximate parcels, {} with touching neighbours",
        proximate.len(),
        selected.len()
    );

    Some(union_all(
        selected
            .into_iter()
            .map(|index| layer.features[index].geometry.clone()),
    ))
}

/// Folds the closure into the active region. A missing closure leaves the
/// region unchanged; with `fill` set the holes opened by the union are closed.
pub fn apply_closure(
    region: RegionStatus,
    closure: Option<MultiPolygon<f64>>,
    fill: bool,
) -> RegionStatus {
    let Some(closure) = closure else {
        return region;
    };
    let Some(current) = region.geometry() else {
        return region;
    };

    let mut merged = union_all([current.clone(), closure]);
    if fill {
        merged = fill_holes(merged);
    }
    region.with_geometry(merged)
}
