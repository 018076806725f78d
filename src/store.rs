use crate::geo::{check_coordinate, FishermanState, FishermanUpdate, GeoError, RiskZone};

/// Current fisherman state plus the session's fixed risk-zone set.
#[derive(Debug, Clone)]
pub struct GeoStateStore {
    state: FishermanState,
    zones: Vec<RiskZone>,
}

impl GeoStateStore {
    pub fn new(initial: FishermanState, zones: Vec<RiskZone>) -> Result<Self, GeoError> {
        initial.validate()?;
        for zone in &zones {
            check_coordinate(zone.latitude, zone.longitude)?;
        }
        Ok(Self {
            state: initial,
            zones,
        })
    }

    /// Merges `partial` onto the current state. A rejected update leaves
    /// the state untouched.
    pub fn update(&mut self, partial: FishermanUpdate) -> Result<FishermanState, GeoError> {
        let next = partial.merged_onto(&self.state);
        next.validate()?;
        self.state = next;
        Ok(next)
    }

    pub fn state(&self) -> &FishermanState {
        &self.state
    }

    pub fn zones(&self) -> &[RiskZone] {
        &self.zones
    }
}
