//! Ties the geo store, the classifier and the map controller together.

use chrono::Utc;
use serde::Serialize;
use thiserror::Error;

use crate::{
    geo::{FishermanState, FishermanUpdate, GeoError, RiskZone},
    map::{MapBackend, MapError, MapObject, MapSurfaceController, SyncReport, ViewOptions},
    risk::{classify, nearest_zone, RiskLevel, RiskThresholds},
    store::GeoStateStore,
};

#[derive(Debug, Error)]
pub enum DashboardError {
    #[error(transparent)]
    Geo(#[from] GeoError),
    #[error(transparent)]
    Map(#[from] MapError),
}

#[derive(Debug, Clone, Serialize)]
pub struct StatusPanel {
    pub latitude: f64,
    pub longitude: f64,
    pub hour: u8,
    pub month: u8,
    pub time: String,
    pub risk_level: RiskLevel,
    pub nearest_zone_km: Option<f64>,
}

impl StatusPanel {
    pub fn new(state: &FishermanState, risk_level: RiskLevel, zones: &[RiskZone]) -> Self {
        Self {
            latitude: state.latitude,
            longitude: state.longitude,
            hour: state.hour,
            month: state.month,
            time: format!("{:02}:00", state.hour),
            risk_level,
            nearest_zone_km: nearest_zone(state, zones).map(|(_, d)| d),
        }
    }

    pub fn lines(&self) -> Vec<String> {
        let mut lines = vec![
            format!("Location: {}, {}", self.latitude, self.longitude),
            format!("Time: {}", self.time),
            format!("Month: {}", self.month),
            format!("Risk Level: {}", self.risk_level),
        ];
        if let Some(d) = self.nearest_zone_km {
            lines.push(format!("Nearest risk zone: {d:.1} km"));
        }
        lines
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct DashboardFrame {
    pub sequence: u64,
    pub timestamp: String,
    pub status: StatusPanel,
    pub zones: Vec<RiskZone>,
    pub objects: Vec<MapObject>,
}

pub struct Dashboard<B: MapBackend> {
    store: GeoStateStore,
    thresholds: RiskThresholds,
    controller: MapSurfaceController<B>,
    container: String,
    zoom: u8,
    sequence: u64,
}

impl<B: MapBackend> Dashboard<B> {
    pub fn new(
        store: GeoStateStore,
        thresholds: RiskThresholds,
        backend: B,
        container: impl Into<String>,
        zoom: u8,
    ) -> Self {
        Self {
            store,
            thresholds,
            controller: MapSurfaceController::new(backend),
            container: container.into(),
            zoom,
            sequence: 0,
        }
    }

    /// Creates the surface if needed and draws the current state onto it.
    pub fn mount(&mut self) -> Result<DashboardFrame, DashboardError> {
        let view = ViewOptions {
            center: self.store.state().position(),
            zoom: self.zoom,
        };
        self.controller.ensure_surface(&self.container, &view)?;
        self.redraw()?;
        self.frame()
    }

    pub fn apply(&mut self, update: FishermanUpdate) -> Result<DashboardFrame, DashboardError> {
        self.store.update(update)?;
        self.redraw()?;
        self.frame()
    }

    fn redraw(&mut self) -> Result<SyncReport, MapError> {
        self.controller
            .sync(Some(self.store.state()), self.store.zones())
    }

    pub fn risk_level(&self) -> RiskLevel {
        classify(self.store.state(), self.store.zones(), &self.thresholds)
    }

    pub fn frame(&mut self) -> Result<DashboardFrame, DashboardError> {
        self.sequence += 1;
        let state = self.store.state();
        Ok(DashboardFrame {
            sequence: self.sequence,
            timestamp: Utc::now().to_rfc3339(),
            status: StatusPanel::new(state, self.risk_level(), self.store.zones()),
            zones: self.store.zones().to_vec(),
            objects: self.controller.objects()?,
        })
    }

    pub fn unmount(&mut self) -> Result<(), DashboardError> {
        self.controller.teardown()?;
        Ok(())
    }

    pub fn is_mounted(&self) -> bool {
        self.controller.surface().is_some()
    }

    pub fn state(&self) -> &FishermanState {
        self.store.state()
    }

    pub fn controller(&self) -> &MapSurfaceController<B> {
        &self.controller
    }
}
