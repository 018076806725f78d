use std::collections::{BTreeMap, HashSet};

use super::{MapBackend, MapError, MapObject, Marker, ObjectId, SurfaceId, ViewOptions};

#[derive(Debug, Clone)]
struct MemorySurface {
    container: String,
    view: ViewOptions,
    objects: Vec<MapObject>,
}

/// Mapping backend that keeps the object graph in memory.
///
/// Containers play the role of DOM elements: a surface can only be created
/// on a container that has been mounted. The web dashboard serialises this
/// object graph for the browser to draw.
#[derive(Debug, Default)]
pub struct MemoryMap {
    containers: HashSet<String>,
    surfaces: BTreeMap<SurfaceId, MemorySurface>,
    next_surface: u64,
    next_object: u64,
}

impl MemoryMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mount(&mut self, container: impl Into<String>) {
        self.containers.insert(container.into());
    }

    pub fn unmount(&mut self, container: &str) -> bool {
        self.containers.remove(container)
    }

    pub fn surface_count(&self) -> usize {
        self.surfaces.len()
    }

    pub fn surfaces_on(&self, container: &str) -> usize {
        self.surfaces
            .values()
            .filter(|surface| surface.container == container)
            .count()
    }

    pub fn view(&self, surface: SurfaceId) -> Option<ViewOptions> {
        self.surfaces.get(&surface).map(|s| s.view)
    }

    fn surface_mut(&mut self, surface: SurfaceId) -> Result<&mut MemorySurface, MapError> {
        self.surfaces
            .get_mut(&surface)
            .ok_or_else(|| MapError::Backend(format!("unknown surface {}", surface.raw())))
    }
}

impl MapBackend for MemoryMap {
    fn container_exists(&self, container: &str) -> bool {
        self.containers.contains(container)
    }

    fn create_map(&mut self, container: &str, view: &ViewOptions) -> Result<SurfaceId, MapError> {
        if !self.container_exists(container) {
            return Err(MapError::ContainerNotFound(container.to_string()));
        }
        let id = SurfaceId::new(self.next_surface);
        self.next_surface += 1;
        self.surfaces.insert(
            id,
            MemorySurface {
                container: container.to_string(),
                view: *view,
                objects: Vec::new(),
            },
        );
        Ok(id)
    }

    fn add_object(&mut self, surface: SurfaceId, marker: Marker) -> Result<ObjectId, MapError> {
        let id = ObjectId::new(self.next_object);
        self.surface_mut(surface)?
            .objects
            .push(MapObject { id, marker });
        self.next_object += 1;
        Ok(id)
    }

    fn remove_objects(&mut self, surface: SurfaceId, ids: &[ObjectId]) -> Result<(), MapError> {
        self.surface_mut(surface)?
            .objects
            .retain(|object| !ids.contains(&object.id));
        Ok(())
    }

    fn get_objects(&self, surface: SurfaceId) -> Result<Vec<MapObject>, MapError> {
        self.surfaces
            .get(&surface)
            .map(|s| s.objects.clone())
            .ok_or_else(|| MapError::Backend(format!("unknown surface {}", surface.raw())))
    }

    fn dispose_map(&mut self, surface: SurfaceId) -> Result<(), MapError> {
        self.surfaces
            .remove(&surface)
            .map(|_| ())
            .ok_or_else(|| MapError::Backend(format!("unknown surface {}", surface.raw())))
    }
}
