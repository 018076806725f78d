//! Map surface ownership and overlay synchronisation.
//!
//! [`MapSurfaceController`] owns a single surface on a [`MapBackend`] and
//! rebuilds its marker set from the fisherman state and the risk zones on
//! every change. The backend trait is the whole mapping-SDK boundary, so any
//! engine that can create a map and add, remove and list objects can be
//! plugged in.

pub mod memory;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::warn;

use crate::geo::{FishermanState, LatLng, RiskZone};

pub use memory::MemoryMap;

pub const DEFAULT_ZOOM: u8 = 7;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SurfaceId(u64);

impl SurfaceId {
    pub fn new(raw: u64) -> Self {
        Self(raw)
    }

    pub fn raw(self) -> u64 {
        self.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ObjectId(u64);

impl ObjectId {
    pub fn new(raw: u64) -> Self {
        Self(raw)
    }

    pub fn raw(self) -> u64 {
        self.0
    }
}

/// Handle to the live map instance and the container it is bound to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MapSurface {
    pub id: SurfaceId,
    pub container: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ViewOptions {
    pub center: LatLng,
    pub zoom: u8,
}

impl ViewOptions {
    pub fn centered_on(center: LatLng) -> Self {
        Self {
            center,
            zoom: DEFAULT_ZOOM,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MarkerKind {
    Fisherman,
    RiskZone,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Marker {
    pub kind: MarkerKind,
    pub position: LatLng,
    pub label: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MapObject {
    pub id: ObjectId,
    pub marker: Marker,
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum MapError {
    #[error("render target '{0}' does not exist")]
    ContainerNotFound(String),
    #[error("surface already bound to '{bound}', cannot rebind to '{requested}'")]
    SurfaceBound { bound: String, requested: String },
    #[error("no map surface has been created yet")]
    SurfaceNotReady,
    #[error("fisherman location is missing or not finite")]
    InvalidLocation,
    #[error("map backend error: {0}")]
    Backend(String),
}

/// Minimal capability set required from a mapping engine.
pub trait MapBackend {
    fn container_exists(&self, container: &str) -> bool;
    fn create_map(&mut self, container: &str, view: &ViewOptions) -> Result<SurfaceId, MapError>;
    fn add_object(&mut self, surface: SurfaceId, marker: Marker) -> Result<ObjectId, MapError>;
    fn remove_objects(&mut self, surface: SurfaceId, ids: &[ObjectId]) -> Result<(), MapError>;
    fn get_objects(&self, surface: SurfaceId) -> Result<Vec<MapObject>, MapError>;
    fn dispose_map(&mut self, surface: SurfaceId) -> Result<(), MapError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SyncReport {
    pub surface: SurfaceId,
    pub removed: usize,
    pub placed: usize,
}

/// Markers for one overlay: the fisherman first, then one per zone.
pub fn overlay_markers(location: &FishermanState, zones: &[RiskZone]) -> Vec<Marker> {
    let mut markers = Vec::with_capacity(zones.len() + 1);
    markers.push(Marker {
        kind: MarkerKind::Fisherman,
        position: location.position(),
        label: "Fisherman".to_string(),
    });
    for (index, zone) in zones.iter().enumerate() {
        markers.push(Marker {
            kind: MarkerKind::RiskZone,
            position: zone.position(),
            label: format!("Risk zone {}", index + 1),
        });
    }
    markers
}

pub struct MapSurfaceController<B: MapBackend> {
    backend: B,
    surface: Option<MapSurface>,
}

impl<B: MapBackend> MapSurfaceController<B> {
    pub fn new(backend: B) -> Self {
        Self {
            backend,
            surface: None,
        }
    }

    /// Creates the surface on first call and hands back the same handle
    /// afterwards.
    pub fn ensure_surface(
        &mut self,
        container: &str,
        view: &ViewOptions,
    ) -> Result<MapSurface, MapError> {
        if let Some(surface) = &self.surface {
            if surface.container == container {
                return Ok(surface.clone());
            }
            return Err(MapError::SurfaceBound {
                bound: surface.container.clone(),
                requested: container.to_string(),
            });
        }

        if !self.backend.container_exists(container) {
            return Err(MapError::ContainerNotFound(container.to_string()));
        }
        let id = self.backend.create_map(container, view)?;
        let surface = MapSurface {
            id,
            container: container.to_string(),
        };
        self.surface = Some(surface.clone());
        Ok(surface)
    }

    /// Replaces every object on the surface with the overlay for
    /// `location` and `zones`. On failure the previous objects are put back.
    pub fn sync(
        &mut self,
        location: Option<&FishermanState>,
        zones: &[RiskZone],
    ) -> Result<SyncReport, MapError> {
        let location = match location {
            Some(loc) if loc.position().is_finite() => loc,
            _ => return Err(MapError::InvalidLocation),
        };
        if zones.iter().any(|zone| !zone.position().is_finite()) {
            return Err(MapError::InvalidLocation);
        }
        let surface = self
            .surface
            .as_ref()
            .map(|s| s.id)
            .ok_or(MapError::SurfaceNotReady)?;

        let markers = overlay_markers(location, zones);
        let previous = self.backend.get_objects(surface)?;
        let previous_ids: Vec<ObjectId> = previous.iter().map(|object| object.id).collect();
        self.backend.remove_objects(surface, &previous_ids)?;

        let mut placed = Vec::with_capacity(markers.len());
        for marker in markers {
            match self.backend.add_object(surface, marker) {
                Ok(id) => placed.push(id),
                Err(err) => {
                    self.restore(surface, &placed, previous);
                    return Err(err);
                }
            }
        }

        Ok(SyncReport {
            surface,
            removed: previous_ids.len(),
            placed: placed.len(),
        })
    }

    // Best effort: the caller sees the error that triggered the restore.
    fn restore(&mut self, surface: SurfaceId, placed: &[ObjectId], previous: Vec<MapObject>) {
        if let Err(err) = self.backend.remove_objects(surface, placed) {
            warn!(
                "surface {}: could not remove partial overlay: {err}",
                surface.raw()
            );
        }
        for object in previous {
            if let Err(err) = self.backend.add_object(surface, object.marker) {
                warn!("surface {}: could not restore marker: {err}", surface.raw());
            }
        }
    }

    /// Clears markers and releases the surface. No-op without a surface.
    pub fn teardown(&mut self) -> Result<(), MapError> {
        let Some(surface) = self.surface.as_ref().map(|s| s.id) else {
            return Ok(());
        };
        let ids: Vec<ObjectId> = self
            .backend
            .get_objects(surface)?
            .iter()
            .map(|object| object.id)
            .collect();
        self.backend.remove_objects(surface, &ids)?;
        self.backend.dispose_map(surface)?;
        self.surface = None;
        Ok(())
    }

    pub fn surface(&self) -> Option<&MapSurface> {
        self.surface.as_ref()
    }

    /// Objects currently on the surface; empty before `ensure_surface`.
    pub fn objects(&self) -> Result<Vec<MapObject>, MapError> {
        match &self.surface {
            Some(surface) => self.backend.get_objects(surface.id),
            None => Ok(Vec::new()),
        }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CONTAINER: &str = "mapContainer";

    fn fisherman() -> FishermanState {
        FishermanState {
            latitude: 35.5,
            longitude: -165.0,
            hour: 9,
            month: 3,
        }
    }

    fn zones() -> Vec<RiskZone> {
        vec![RiskZone::new(35.8, -165.5), RiskZone::new(35.2, -164.5)]
    }

    fn view() -> ViewOptions {
        ViewOptions::centered_on(fisherman().position())
    }

    fn mounted() -> MapSurfaceController<MemoryMap> {
        let mut backend = MemoryMap::new();
        backend.mount(CONTAINER);
        MapSurfaceController::new(backend)
    }

    /// Wraps the in-memory map and fails a single add once `budget` adds
    /// have gone through. `sticky` makes every dispose fail.
    struct FlakyMap {
        inner: MemoryMap,
        budget: Option<usize>,
        sticky: bool,
    }

    fn flaky() -> MapSurfaceController<FlakyMap> {
        let mut inner = MemoryMap::new();
        inner.mount(CONTAINER);
        MapSurfaceController::new(FlakyMap {
            inner,
            budget: None,
            sticky: false,
        })
    }

    impl MapBackend for FlakyMap {
        fn container_exists(&self, container: &str) -> bool {
            self.inner.container_exists(container)
        }

        fn create_map(
            &mut self,
            container: &str,
            view: &ViewOptions,
        ) -> Result<SurfaceId, MapError> {
            self.inner.create_map(container, view)
        }

        fn add_object(&mut self, surface: SurfaceId, marker: Marker) -> Result<ObjectId, MapError> {
            match self.budget {
                Some(0) => {
                    self.budget = None;
                    Err(MapError::Backend("quota exhausted".into()))
                }
                Some(n) => {
                    self.budget = Some(n - 1);
                    self.inner.add_object(surface, marker)
                }
                None => self.inner.add_object(surface, marker),
            }
        }

        fn remove_objects(&mut self, surface: SurfaceId, ids: &[ObjectId]) -> Result<(), MapError> {
            self.inner.remove_objects(surface, ids)
        }

        fn get_objects(&self, surface: SurfaceId) -> Result<Vec<MapObject>, MapError> {
            self.inner.get_objects(surface)
        }

        fn dispose_map(&mut self, surface: SurfaceId) -> Result<(), MapError> {
            if self.sticky {
                return Err(MapError::Backend("surface is busy".into()));
            }
            self.inner.dispose_map(surface)
        }
    }

    #[test]
    fn ensure_surface_is_idempotent() {
        let mut controller = mounted();
        let first = controller.ensure_surface(CONTAINER, &view()).unwrap();
        let second = controller.ensure_surface(CONTAINER, &view()).unwrap();
        assert_eq!(first, second);
        assert_eq!(controller.backend().surface_count(), 1);
    }

    #[test]
    fn ensure_surface_requires_container() {
        let mut controller = MapSurfaceController::new(MemoryMap::new());
        let err = controller.ensure_surface(CONTAINER, &view()).unwrap_err();
        assert_eq!(err, MapError::ContainerNotFound(CONTAINER.to_string()));
        assert!(controller.surface().is_none());
    }

    #[test]
    fn surface_is_never_rebound() {
        let mut controller = mounted();
        controller.backend_mut().mount("other");
        controller.ensure_surface(CONTAINER, &view()).unwrap();
        let err = controller.ensure_surface("other", &view()).unwrap_err();
        assert!(matches!(err, MapError::SurfaceBound { .. }));
        assert_eq!(controller.backend().surface_count(), 1);
    }

    #[test]
    fn sync_places_fisherman_and_zones() {
        let mut controller = mounted();
        controller.ensure_surface(CONTAINER, &view()).unwrap();
        let report = controller.sync(Some(&fisherman()), &zones()).unwrap();
        assert_eq!(report.placed, 3);

        let objects = controller.objects().unwrap();
        assert_eq!(objects.len(), 3);
        let boats: Vec<_> = objects
            .iter()
            .filter(|o| o.marker.kind == MarkerKind::Fisherman)
            .collect();
        assert_eq!(boats.len(), 1);
        assert_eq!(boats[0].marker.position, LatLng::new(35.5, -165.0));
    }

    #[test]
    fn sync_rebuilds_instead_of_accumulating() {
        let mut controller = mounted();
        controller.ensure_surface(CONTAINER, &view()).unwrap();
        controller.sync(Some(&fisherman()), &zones()).unwrap();
        let mut moved = fisherman();
        moved.latitude = 36.0;
        let report = controller.sync(Some(&moved), &zones()).unwrap();
        assert_eq!(report.removed, 3);

        let objects = controller.objects().unwrap();
        assert_eq!(objects.len(), 3);
        assert!(objects
            .iter()
            .any(|o| o.marker.kind == MarkerKind::Fisherman && o.marker.position.lat == 36.0));
        assert!(!objects.iter().any(|o| o.marker.position.lat == 35.5));
    }

    #[test]
    fn sync_without_location_changes_nothing() {
        let mut controller = mounted();
        controller.ensure_surface(CONTAINER, &view()).unwrap();
        controller.sync(Some(&fisherman()), &zones()).unwrap();
        let before = controller.objects().unwrap();

        assert_eq!(
            controller.sync(None, &zones()),
            Err(MapError::InvalidLocation)
        );
        let mut broken = fisherman();
        broken.longitude = f64::NAN;
        assert_eq!(
            controller.sync(Some(&broken), &zones()),
            Err(MapError::InvalidLocation)
        );
        assert_eq!(controller.objects().unwrap(), before);
    }

    #[test]
    fn sync_before_surface_is_reported() {
        let mut controller = mounted();
        assert_eq!(
            controller.sync(Some(&fisherman()), &zones()),
            Err(MapError::SurfaceNotReady)
        );
    }

    #[test]
    fn failed_sync_restores_previous_overlay() {
        let mut controller = flaky();
        controller.ensure_surface(CONTAINER, &view()).unwrap();
        controller.sync(Some(&fisherman()), &zones()).unwrap();
        let before: Vec<Marker> = controller
            .objects()
            .unwrap()
            .into_iter()
            .map(|o| o.marker)
            .collect();

        // Two adds go through, the third fails, then the restore runs.
        controller.backend_mut().budget = Some(2);
        let mut moved = fisherman();
        moved.latitude = 10.0;
        let err = controller.sync(Some(&moved), &zones()).unwrap_err();
        assert!(matches!(err, MapError::Backend(_)));

        let after: Vec<Marker> = controller
            .objects()
            .unwrap()
            .into_iter()
            .map(|o| o.marker)
            .collect();
        assert_eq!(after.len(), before.len());
        for marker in &before {
            assert!(after.contains(marker), "missing {marker:?}");
        }
    }

    #[test]
    fn teardown_releases_surface() {
        let mut controller = mounted();
        let first = controller.ensure_surface(CONTAINER, &view()).unwrap();
        controller.sync(Some(&fisherman()), &zones()).unwrap();
        controller.teardown().unwrap();
        assert!(controller.surface().is_none());
        assert_eq!(controller.backend().surface_count(), 0);

        let second = controller.ensure_surface(CONTAINER, &view()).unwrap();
        assert_ne!(first.id, second.id);
        assert!(controller.objects().unwrap().is_empty());
    }

    #[test]
    fn sync_without_zones_draws_only_the_fisherman() {
        let mut controller = mounted();
        controller.ensure_surface(CONTAINER, &view()).unwrap();
        controller.sync(Some(&fisherman()), &zones()).unwrap();

        let report = controller.sync(Some(&fisherman()), &[]).unwrap();
        assert_eq!(report.removed, 3);
        assert_eq!(report.placed, 1);
        let objects = controller.objects().unwrap();
        assert_eq!(objects.len(), 1);
        assert_eq!(objects[0].marker.kind, MarkerKind::Fisherman);
    }

    #[test]
    fn failed_teardown_keeps_the_surface() {
        let mut controller = flaky();
        let first = controller.ensure_surface(CONTAINER, &view()).unwrap();
        controller.sync(Some(&fisherman()), &zones()).unwrap();

        controller.backend_mut().sticky = true;
        assert!(controller.teardown().is_err());
        assert_eq!(controller.surface(), Some(&first));

        let again = controller.ensure_surface(CONTAINER, &view()).unwrap();
        assert_eq!(again, first);
        assert_eq!(controller.backend().inner.surfaces_on(CONTAINER), 1);

        controller.backend_mut().sticky = false;
        controller.teardown().unwrap();
        assert!(controller.surface().is_none());
        assert_eq!(controller.backend().inner.surfaces_on(CONTAINER), 0);
    }
}
