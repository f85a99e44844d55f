//! Connectivity analysis of candidate segments
//!
//! A request goes through registration, the corridor buffer, proximate island
//! lookup, the blob or isochrone decision, the land-use closure, stat pulls
//! and finally the summary record. Every derived geometry is persisted in the
//! segment store as it is produced.

pub mod blob;
pub mod closure;
pub mod isochrone;
pub mod registrar;
pub mod stats;
pub mod summary;

use geo::{Geometry, MultiPolygon};
use log::{debug, info, warn};

pub use blob::{ProximateIslandSet, build_blob, corridor_buffer, find_proximate_islands};
pub use closure::{apply_closure, land_use_closure};
pub use isochrone::{IsochroneResult, build_isochrone, isochrone_in_scope};
pub use registrar::{gap_geometry, register};
pub use stats::{CategoryCount, CategoryMiles, StatValue, pull_stat};
pub use summary::{SegmentSummary, append_csv, to_feature_collection, write_geojson};

use crate::{
    EdgeId, Error,
    config::AnalysisConfig,
    incidents::IncidentSource,
    model::{DataLayers, NetworkTables, NetworkType, RegionStatus, SegmentRequest, StudySegment},
    network::{NetworkCatalog, NetworkLevel},
    store::{DerivedLayer, SegmentStore},
};

/// Fields already stored on the segment record at registration
const REGISTERED_FIELDS: [&str; 3] = ["id", "username", "seg_name"];

/// Runs analyses against prepared networks, attribute layers and a store
pub struct Analyzer<'a, S: SegmentStore> {
    catalog: &'a NetworkCatalog,
    layers: &'a DataLayers,
    store: &'a mut S,
    incidents: Option<&'a dyn IncidentSource>,
    config: &'a AnalysisConfig,
}

impl<'a, S: SegmentStore> Analyzer<'a, S> {
    pub fn new(
        catalog: &'a NetworkCatalog,
        layers: &'a DataLayers,
        store: &'a mut S,
        config: &'a AnalysisConfig,
    ) -> Self {
        Self {
            catalog,
            layers,
            store,
            incidents: None,
            config,
        }
    }

    pub fn with_incidents(mut self, incidents: &'a dyn IncidentSource) -> Self {
        self.incidents = Some(incidents);
        self
    }

    /// Registers the requested segment and analyzes it.
    ///
    /// Registration failures and store failures abort the analysis. A failed
    /// isochrone falls back to the blob and a failed stat is recorded as
    /// unavailable.
    pub fn analyze(&mut self, request: &SegmentRequest) -> Result<SegmentSummary, Error> {
        let tables = NetworkTables::new(request.network, request.comfort_level)?;
        let catalog = self.catalog;
        let level = catalog.level(&tables)?;
        let segment = register(&mut *self.store, request)?;
        self.run(level, &segment)
    }

    /// Analyzes a candidate made of existing gap edges
    pub fn analyze_gaps(
        &mut self,
        network: NetworkType,
        comfort_level: Option<u8>,
        gap_ids: &[EdgeId],
        owner: &str,
        name: &str,
        overwrite: bool,
    ) -> Result<SegmentSummary, Error> {
        let tables = NetworkTables::new(network, comfort_level)?;
        let catalog = self.catalog;
        let level = catalog.level(&tables)?;
        let request = SegmentRequest {
            network,
            geometry: gap_geometry(level, gap_ids)?,
            owner: owner.to_string(),
            name: name.to_string(),
            comfort_level,
            overwrite,
        };
        self.analyze(&request)
    }

    fn run(&mut self, level: &NetworkLevel, segment: &StudySegment) -> Result<SegmentSummary, Error> {
        let config = self.config;
        let network = segment.network();

        let corridor = corridor_buffer(segment, config.buffer_distance);
        self.store_geometry(segment, DerivedLayer::Buffer, &corridor)?;

        let proximate = find_proximate_islands(&level.islands, &corridor);
        self.store.put_geometry(
            network,
            DerivedLayer::Islands,
            segment.id,
            &segment.owner,
            Geometry::MultiLineString(proximate.geometry.clone()),
        )?;
        info!(
            "Segment {} touches {} islands, {:.2} miles",
            segment.id,
            proximate.island_ids.len(),
            proximate.miles
        );

        let mut region = if isochrone_in_scope(proximate.miles, config.scope_threshold_miles) {
            info!(
                "{:.2} miles exceeds {} miles, building isochrone",
                proximate.miles, config.scope_threshold_miles
            );
            match build_isochrone(&level.network, &corridor, config) {
                Ok(result) => RegionStatus::Isochrone {
                    geometry: result.geometry,
                    miles: result.miles,
                },
                Err(e) => {
                    warn!("{e}, keeping the blob for segment {}", segment.id);
                    RegionStatus::Blob(build_blob(&proximate, &corridor, config.hull_concavity))
                }
            }
        } else {
            RegionStatus::Blob(build_blob(&proximate, &corridor, config.hull_concavity))
        };

        match self.layers.polygon_layer(&config.land_use.layer) {
            Ok(landuse) => {
                let closure = land_use_closure(landuse, &corridor, &config.land_use);
                region = apply_closure(region, closure, config.fill_closure_holes);
            }
            Err(_) => debug!("No {} layer, skipping land-use closure", config.land_use.layer),
        }

        let miles = match &region {
            RegionStatus::Isochrone { miles, .. } => *miles,
            _ => proximate.miles,
        };
        if let Some(geometry) = region.geometry() {
            let layer = if region.has_isochrone() == Some(true) {
                DerivedLayer::Isochrone
            } else {
                DerivedLayer::Blob
            };
            self.store_geometry(segment, layer, geometry)?;
        }

        let mut values = Vec::with_capacity(config.stats.len());
        for definition in &config.stats {
            let value = stats::evaluate(
                definition,
                self.layers,
                &region,
                &corridor,
                self.incidents,
                config,
            );
            self.store.update_field(
                network,
                segment.id,
                &segment.owner,
                &definition.field,
                value.to_json(),
            )?;
            values.push((definition.field.clone(), value));
        }

        let summary = SegmentSummary::new(segment, &region, miles, &values);
        for (field, value) in &summary.fields {
            let written = REGISTERED_FIELDS.contains(&field.as_str())
                || values.iter().any(|(stat, _)| stat == field);
            if written {
                continue;
            }
            self.store
                .update_field(network, segment.id, &segment.owner, field, value.clone())?;
        }
        self.store.append_result(&summary)?;

        info!("Analyzed segment {} ({})", segment.id, segment.name);
        Ok(summary)
    }

    fn store_geometry(
        &mut self,
        segment: &StudySegment,
        layer: DerivedLayer,
        geometry: &MultiPolygon<f64>,
    ) -> Result<(), Error> {
        self.store.put_geometry(
            segment.network(),
            layer,
            segment.id,
            &segment.owner,
            Geometry::MultiPolygon(geometry.clone()),
        )
    }
}
