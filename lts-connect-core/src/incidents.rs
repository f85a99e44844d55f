//! Crash statistics service
//!
//! The service takes a polygon and answers with per-year counts broken out by
//! travel mode. Counts are summed across years and the selected modes.

use std::collections::BTreeMap;

use geo::MultiPolygon;
use serde::Deserialize;

use crate::Error;

/// Per-year, per-mode counts returned for one polygon
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(transparent)]
pub struct IncidentCounts {
    pub years: BTreeMap<String, YearSummary>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct YearSummary {
    #[serde(default)]
    pub mode: BTreeMap<String, u64>,
}

impl IncidentCounts {
    /// Sum over every year of the modes named in `modes`, or of all modes when
    /// `modes` is empty. Mode names compare case-insensitively.
    pub fn total(&self, modes: &[String]) -> u64 {
        self.years
            .values()
            .flat_map(|year| year.mode.iter())
            .filter(|(mode, _)| modes.is_empty() || modes.iter().any(|m| m.eq_ignore_ascii_case(mode)))
            .map(|(_, count)| *count)
            .sum()
    }
}

pub trait IncidentSource {
    fn incident_counts(&self, region: &MultiPolygon<f64>) -> Result<IncidentCounts, Error>;
}

#[cfg(feature = "crash-api")]
pub use http::HttpIncidentSource;

#[cfg(feature = "crash-api")]
mod http {
    use std::time::Duration;

    use geo::MultiPolygon;
    use geojson::{Geometry, Value as GeoJsonValue};
    use log::debug;

    use super::{IncidentCounts, IncidentSource};
    use crate::Error;

    /// Blocking client of the crash statistics HTTP API
    #[derive(Debug, Clone)]
    pub struct HttpIncidentSource {
        client: reqwest::blocking::Client,
        url: String,
    }

    impl HttpIncidentSource {
        pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self, Error> {
            let client = reqwest::blocking::Client::builder()
                .timeout(timeout)
                .build()
                .map_err(|e| Error::ExternalService(e.to_string()))?;
            Ok(Self {
                client,
                url: url.into(),
            })
        }
    }

    impl IncidentSource for HttpIncidentSource {
        fn incident_counts(&self, region: &MultiPolygon<f64>) -> Result<IncidentCounts, Error> {
            let geometry = Geometry::new(GeoJsonValue::from(region));
            let geojson = serde_json::to_string(&geometry)
                .map_err(|e| Error::GeoJsonError(e.to_string()))?;

            debug!("Requesting crash summary from {}", self.url);
            self.client
                .get(&self.url)
                .query(&[("geojson", geojson)])
                .send()
                .and_then(reqwest::blocking::Response::error_for_status)
                .map_err(|e| Error::ExternalService(e.to_string()))?
                .json::<IncidentCounts>()
                .map_err(|e| Error::ExternalService(format!("malformed crash summary: {e}")))
        }
    }
}
