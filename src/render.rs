//! GeoJSON layers handed to the map, and per-entity summaries for the
//! detail panel.

use serde::Serialize;
use serde_json::{json, Value};
use tracing::warn;

use crate::actions::ActionIndex;
use crate::geomath::{format_coordinates, path_length, CoordinateFormat};
use crate::geometry::Geometry;
use crate::models::{ActionType, EntityKind, Equipment, InterestPoint, Parcours, Zone};
use crate::scene::Scene;
use crate::visibility::VisibilityFilter;

pub const DEFAULT_ZONE_COLOR: &str = "#6366f1";
pub const DEFAULT_PARCOURS_COLOR: &str = "#ef4444";

/// Stroke width of an equipment line, from its type name.
pub fn line_width(type_name: Option<&str>) -> u32 {
    let name = match type_name {
        Some(name) => name.to_lowercase(),
        None => return 3,
    };
    if name.contains("bloc") || name.contains("glissière") || name.contains("glissiere") {
        5
    } else if name.contains("barrière") || name.contains("barriere") {
        2
    } else {
        3
    }
}

/// Vehicles are drawn as a single marker rather than a line.
pub fn is_vehicle(type_name: Option<&str>) -> bool {
    type_name.map_or(false, |name| {
        let name = name.to_lowercase();
        name.contains("véhicule") || name.contains("vehicule") || name.contains("engin")
    })
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Skipped {
    pub id: String,
    pub kind: EntityKind,
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MapLayers {
    /// Zones and parcours.
    pub geometries: Value,
    pub equipment: Value,
    pub vehicles: Value,
    pub interests: Value,
    pub skipped: Vec<Skipped>,
}

fn collection(features: Vec<Value>) -> Value {
    json!({ "type": "FeatureCollection", "features": features })
}

fn feature(geometry: Value, properties: Value) -> Value {
    json!({ "type": "Feature", "geometry": geometry, "properties": properties })
}

fn or_default<'a>(color: &'a str, default: &'a str) -> &'a str {
    if color.is_empty() {
        default
    } else {
        color
    }
}

struct Builder {
    skipped: Vec<Skipped>,
}

impl Builder {
    fn skip(&mut self, id: &str, kind: EntityKind, reason: String) {
        warn!(%id, %kind, %reason, "entity not rendered");
        self.skipped.push(Skipped {
            id: id.to_string(),
            kind,
            reason,
        });
    }

    fn parsed(&mut self, id: &str, kind: EntityKind, text: &str) -> Option<Geometry> {
        match Geometry::parse(text) {
            Ok(geometry) => Some(geometry),
            Err(e) => {
                self.skip(id, kind, e.to_string());
                None
            }
        }
    }

    fn zone(&mut self, zone: &Zone) -> Option<Value> {
        let geometry = self.parsed(&zone.id, EntityKind::Zone, &zone.geometry)?;
        Some(feature(
            geometry.to_geojson(),
            json!({
                "id": zone.id,
                "type": "zone",
                "event_id": zone.event_id,
                "color": or_default(&zone.color, DEFAULT_ZONE_COLOR),
            }),
        ))
    }

    fn parcours(&mut self, parcours: &Parcours) -> Option<Value> {
        let geometry = self.parsed(&parcours.id, EntityKind::Parcours, &parcours.geometry)?;
        Some(feature(
            geometry.to_geojson(),
            json!({
                "id": parcours.id,
                "type": "parcours",
                "event_id": parcours.event_id,
                "color": or_default(&parcours.color, DEFAULT_PARCOURS_COLOR),
            }),
        ))
    }

    fn interest(&mut self, interest: &InterestPoint) -> Option<Value> {
        let geometry = self.parsed(&interest.id, EntityKind::Interest, &interest.geometry)?;
        Some(feature(
            geometry.to_geojson(),
            json!({
                "id": interest.id,
                "type": "interest",
                "description": interest.description,
            }),
        ))
    }

    fn equipment_line(&mut self, equipment: &Equipment) -> Option<Value> {
        let path = equipment.path();
        if path.len() < 2 {
            self.skip(
                &equipment.id,
                EntityKind::Equipment,
                format!("a line needs 2 coordinates, got {}", path.len()),
            );
            return None;
        }
        Some(feature(
            Geometry::LineString(path).to_geojson(),
            json!({
                "id": equipment.id,
                "type": "equipment",
                "type_name": equipment.type_name,
                "line_width": line_width(equipment.type_name.as_deref()),
            }),
        ))
    }

    fn vehicle(&mut self, equipment: &Equipment) -> Option<Value> {
        let path = equipment.path();
        let centre = match path.get(path.len() / 2) {
            Some(c) => *c,
            None => {
                self.skip(&equipment.id, EntityKind::Equipment, "no coordinates".to_string());
                return None;
            }
        };
        Some(feature(
            Geometry::Point(centre).to_geojson(),
            json!({
                "id": equipment.id,
                "type": "equipment",
                "type_name": equipment.type_name,
            }),
        ))
    }
}

impl MapLayers {
    pub fn build(scene: &Scene, filter: &VisibilityFilter) -> MapLayers {
        let mut builder = Builder { skipped: Vec::new() };

        let mut geometries = Vec::new();
        for zone in scene.zones.iter().filter(|z| filter.zone_visible(z)) {
            geometries.extend(builder.zone(zone));
        }
        for parcours in scene.parcours.iter().filter(|p| filter.parcours_visible(p)) {
            geometries.extend(builder.parcours(parcours));
        }

        let mut lines = Vec::new();
        let mut vehicles = Vec::new();
        for equipment in filter.visible_equipment(&scene.equipment) {
            if is_vehicle(equipment.type_name.as_deref()) {
                vehicles.extend(builder.vehicle(equipment));
            } else {
                lines.extend(builder.equipment_line(equipment));
            }
        }

        let mut interests = Vec::new();
        for interest in scene.interests.iter().filter(|i| filter.interest_visible(i)) {
            interests.extend(builder.interest(interest));
        }

        MapLayers {
            geometries: collection(geometries),
            equipment: collection(lines),
            vehicles: collection(vehicles),
            interests: collection(interests),
            skipped: builder.skipped,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityAction {
    Edit,
    Delete,
    Recolor,
}

/// What the detail panel shows for a clicked entity.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EntitySummary {
    pub id: String,
    pub kind: EntityKind,
    pub title: String,
    pub subtitle: String,
    pub color: Option<String>,
    pub details: Vec<(String, String)>,
    pub actions: Vec<EntityAction>,
    /// Longitude, latitude.
    pub anchor: Option<(f64, f64)>,
}

fn short_id(id: &str) -> &str {
    id.get(..8).unwrap_or(id)
}

fn anchor_of(text: &str) -> Option<(f64, f64)> {
    Geometry::parse(text).ok()?.anchor().map(|c| (c.x, c.y))
}

fn position_detail(anchor: Option<(f64, f64)>) -> Option<(String, String)> {
    anchor.map(|(lon, lat)| {
        (
            "position".to_string(),
            format_coordinates(lat, lon, CoordinateFormat::default()),
        )
    })
}

impl EntitySummary {
    pub fn zone(zone: &Zone) -> EntitySummary {
        let anchor = anchor_of(&zone.geometry);
        let title = if zone.name.is_empty() {
            format!("Zone #{}", short_id(&zone.id))
        } else {
            zone.name.clone()
        };
        EntitySummary {
            id: zone.id.clone(),
            kind: EntityKind::Zone,
            title,
            subtitle: zone.description.clone().unwrap_or_else(|| "No description".to_string()),
            color: Some(or_default(&zone.color, DEFAULT_ZONE_COLOR).to_string()),
            details: position_detail(anchor).into_iter().collect(),
            actions: vec![EntityAction::Edit, EntityAction::Recolor, EntityAction::Delete],
            anchor,
        }
    }

    pub fn parcours(parcours: &Parcours) -> EntitySummary {
        let anchor = anchor_of(&parcours.geometry);
        let title = if parcours.name.is_empty() {
            format!("Parcours #{}", short_id(&parcours.id))
        } else {
            parcours.name.clone()
        };

        let mut details = Vec::new();
        if let Some(start) = parcours.start_time {
            details.push(("start".to_string(), start.format("%Y-%m-%d %H:%M").to_string()));
        }
        details.push((
            "speed".to_string(),
            format!("{} - {} km/h", parcours.speed_low, parcours.speed_high),
        ));
        if let Ok(Geometry::LineString(points)) = Geometry::parse(&parcours.geometry) {
            if let Ok(length) = path_length(&points) {
                details.push(("length".to_string(), crate::geomath::format_distance(length)));
            }
        }

        EntitySummary {
            id: parcours.id.clone(),
            kind: EntityKind::Parcours,
            title,
            subtitle: String::new(),
            color: Some(or_default(&parcours.color, DEFAULT_PARCOURS_COLOR).to_string()),
            details,
            actions: vec![EntityAction::Edit, EntityAction::Recolor, EntityAction::Delete],
            anchor,
        }
    }

    pub fn interest(interest: &InterestPoint) -> EntitySummary {
        let anchor = anchor_of(&interest.geometry);
        EntitySummary {
            id: interest.id.clone(),
            kind: EntityKind::Interest,
            title: "Interest point".to_string(),
            subtitle: interest.description.clone(),
            color: None,
            details: position_detail(anchor).into_iter().collect(),
            actions: vec![EntityAction::Delete],
            anchor,
        }
    }

    /// `team_name` resolves the teams in charge of pose and depose.
    pub fn equipment<'a, F>(equipment: &Equipment, actions: &'a ActionIndex, team_name: F) -> EntitySummary
    where
        F: Fn(&str) -> Option<&'a str>,
    {
        let path = equipment.path();
        let mut details = vec![
            ("quantity".to_string(), equipment.quantity.to_string()),
        ];
        if let Ok(length) = path_length(&path) {
            details.push(("length".to_string(), crate::geomath::format_distance(length)));
        }

        let schedule = [
            ("pose", &equipment.date_pose, &equipment.hour_pose, ActionType::Pose),
            ("depose", &equipment.date_depose, &equipment.hour_depose, ActionType::Depose),
        ];
        for (label, date, hour, action_type) in schedule {
            if let Some(date) = date {
                let when = match hour {
                    Some(hour) => format!("{} {}", date, hour),
                    None => date.clone(),
                };
                details.push((label.to_string(), when));
            }
            if let Some(action) = actions.of_type(&equipment.id, action_type).next() {
                let team = team_name(&action.team_id).unwrap_or(&action.team_id);
                details.push((format!("{} team", label), team.to_string()));
            }
        }

        EntitySummary {
            id: equipment.id.clone(),
            kind: EntityKind::Equipment,
            title: equipment
                .type_name
                .clone()
                .unwrap_or_else(|| format!("Equipment #{}", short_id(&equipment.id))),
            subtitle: equipment.description.clone().unwrap_or_default(),
            color: None,
            details,
            actions: vec![EntityAction::Delete],
            anchor: path.get(path.len() / 2).map(|c| (c.x, c.y)),
        }
    }
}
