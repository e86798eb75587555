use std::collections::BTreeSet;

use chrono::NaiveDateTime;
use geo::Coord;
use serde::{Deserialize, Serialize};

use crate::models::{Equipment, InterestPoint, Parcours, Zone};
use crate::timeline::{depose_instant, pose_instant};

/// Visible map extent in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ViewportBounds {
    pub north: f64,
    pub south: f64,
    pub east: f64,
    pub west: f64,
}

impl ViewportBounds {
    /// Edges are inclusive.
    pub fn contains(&self, c: Coord) -> bool {
        c.y >= self.south && c.y <= self.north && c.x >= self.west && c.x <= self.east
    }
}

/// Equipment type selection.
///
/// `Unset` is the state before the type list has been loaded and lets every
/// equipment through; `Empty` is an explicit "no type selected" and hides all
/// equipment.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum TypeFilter {
    #[default]
    Unset,
    Empty,
    Only(BTreeSet<String>),
}

impl TypeFilter {
    pub fn from_selection<I>(ids: I) -> TypeFilter
    where
        I: IntoIterator<Item = String>,
    {
        let ids: BTreeSet<String> = ids.into_iter().collect();
        if ids.is_empty() {
            TypeFilter::Empty
        } else {
            TypeFilter::Only(ids)
        }
    }

    /// Untyped equipment passes any concrete selection.
    pub fn allows(&self, type_id: Option<&str>) -> bool {
        match self {
            TypeFilter::Unset => true,
            TypeFilter::Empty => false,
            TypeFilter::Only(ids) => type_id.map_or(true, |id| ids.contains(id)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LayerToggles {
    pub zones: bool,
    pub parcours: bool,
    pub interests: bool,
    pub equipment: bool,
}

impl Default for LayerToggles {
    fn default() -> Self {
        LayerToggles {
            zones: true,
            parcours: true,
            interests: true,
            equipment: true,
        }
    }
}

/// Is the equipment installed at `cursor`? Equipment without any resolvable
/// date is always shown.
pub fn temporally_visible(equipment: &Equipment, cursor: NaiveDateTime) -> bool {
    match (pose_instant(equipment), depose_instant(equipment)) {
        (None, None) => true,
        (Some(pose), None) => cursor >= pose,
        (None, Some(depose)) => cursor <= depose,
        (Some(pose), Some(depose)) => pose <= cursor && cursor <= depose,
    }
}

/// Any vertex inside the viewport. Without a viewport, or without
/// coordinates, the equipment is shown.
pub fn spatially_visible(equipment: &Equipment, viewport: Option<&ViewportBounds>) -> bool {
    let viewport = match viewport {
        Some(viewport) => viewport,
        None => return true,
    };
    if equipment.coordinates.is_empty() {
        return true;
    }
    equipment
        .coordinates
        .iter()
        .any(|c| viewport.contains(Coord { x: c.x, y: c.y }))
}

pub fn type_visible(equipment: &Equipment, filter: &TypeFilter) -> bool {
    filter.allows(equipment.type_id.as_deref())
}

/// Every show/hide decision made for the map, in one place.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct VisibilityFilter {
    pub layers: LayerToggles,
    pub types: TypeFilter,
    /// Last extent reported by the map; overwritten on every pan/zoom.
    pub viewport: Option<ViewportBounds>,
    pub spatial_filter: bool,
    /// Temporal filter is active while a cursor is set.
    pub cursor: Option<NaiveDateTime>,
}

impl VisibilityFilter {
    pub fn set_viewport(&mut self, bounds: ViewportBounds) {
        self.viewport = Some(bounds);
    }

    pub fn set_cursor(&mut self, cursor: Option<NaiveDateTime>) {
        self.cursor = cursor;
    }

    fn active_viewport(&self) -> Option<&ViewportBounds> {
        if self.spatial_filter {
            self.viewport.as_ref()
        } else {
            None
        }
    }

    pub fn zone_visible(&self, _zone: &Zone) -> bool {
        self.layers.zones
    }

    pub fn parcours_visible(&self, _parcours: &Parcours) -> bool {
        self.layers.parcours
    }

    pub fn interest_visible(&self, _interest: &InterestPoint) -> bool {
        self.layers.interests
    }

    pub fn equipment_visible(&self, equipment: &Equipment) -> bool {
        self.layers.equipment
            && type_visible(equipment, &self.types)
            && spatially_visible(equipment, self.active_viewport())
            && self
                .cursor
                .map_or(true, |cursor| temporally_visible(equipment, cursor))
    }

    pub fn visible_equipment<'a>(&self, equipment: &'a [Equipment]) -> Vec<&'a Equipment> {
        equipment
            .iter()
            .filter(|eq| self.equipment_visible(eq))
            .collect()
    }

    /// Rows of the schedule: dated equipment, narrowed to the viewport when
    /// the spatial filter is on. The cursor does not hide rows.
    pub fn timeline_rows<'a>(&self, equipment: &'a [Equipment]) -> Vec<&'a Equipment> {
        equipment
            .iter()
            .filter(|eq| eq.has_dates() && spatially_visible(eq, self.active_viewport()))
            .collect()
    }
}
