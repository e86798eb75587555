//! Persistence collaborator.
//!
//! The map core never writes entities itself: every create, update and delete
//! goes through a `Store`, one entity per call. `MemoryStore` keeps everything
//! in memory and can be loaded from and saved to a JSON file, which is what
//! the command-line tools run against.

use std::fs::File;
use std::io::{self, BufReader, BufWriter};
use std::path::Path;

use chrono::NaiveDateTime;
use geo::Coord;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::geometry::{Geometry, GeometryKind};
use crate::models::{
    Action, ActionType, EntityKind, Equipment, EquipmentCoordinate, EquipmentType, InterestPoint,
    Parcours, Team, Zone,
};

/// User supplied attributes of a drawn zone, parcours or interest point.
#[derive(Debug, Clone, PartialEq)]
pub enum GeometryAttributes {
    Zone {
        name: String,
        color: String,
        description: Option<String>,
    },
    Parcours {
        name: String,
        color: String,
        start_time: Option<NaiveDateTime>,
        speed_low: f64,
        speed_high: f64,
    },
    Interest {
        description: String,
    },
}

impl GeometryAttributes {
    pub fn kind(&self) -> EntityKind {
        match self {
            GeometryAttributes::Zone { .. } => EntityKind::Zone,
            GeometryAttributes::Parcours { .. } => EntityKind::Parcours,
            GeometryAttributes::Interest { .. } => EntityKind::Interest,
        }
    }

    /// Geometry type stored for this kind of entity.
    pub fn geometry_kind(&self) -> GeometryKind {
        match self {
            GeometryAttributes::Zone { .. } => GeometryKind::Polygon,
            GeometryAttributes::Parcours { .. } => GeometryKind::LineString,
            GeometryAttributes::Interest { .. } => GeometryKind::Point,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct EquipmentAttributes {
    pub type_id: Option<String>,
    pub quantity: u32,
    pub length_per_unit: f64,
    pub description: Option<String>,
    pub date_pose: Option<String>,
    pub hour_pose: Option<String>,
    pub date_depose: Option<String>,
    pub hour_depose: Option<String>,
}

pub trait Store {
    fn persist_geometry(&mut self, event_id: &str, attributes: &GeometryAttributes, wkt: &str) -> Result<String>;
    fn update_geometry(&mut self, id: &str, wkt: &str, attributes: &GeometryAttributes) -> Result<()>;
    fn delete_geometry(&mut self, id: &str) -> Result<()>;

    fn persist_equipment(
        &mut self,
        event_id: &str,
        attributes: &EquipmentAttributes,
        coordinates: &[Coord],
    ) -> Result<String>;
    fn delete_equipment(&mut self, id: &str) -> Result<()>;

    /// Creates the action, or reassigns the existing one of that type.
    fn upsert_action(&mut self, team_id: &str, equipment_id: &str, action_type: ActionType) -> Result<String>;
    fn delete_action(&mut self, action_id: &str) -> Result<()>;

    fn list_zones(&self, event_id: &str) -> Result<Vec<Zone>>;
    fn list_parcours(&self, event_id: &str) -> Result<Vec<Parcours>>;
    fn list_interests(&self, event_id: &str) -> Result<Vec<InterestPoint>>;
    fn list_equipment(&self, event_id: &str) -> Result<Vec<Equipment>>;
    fn list_actions(&self, event_id: &str) -> Result<Vec<Action>>;
    fn list_teams(&self, event_id: &str) -> Result<Vec<Team>>;
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MemoryStore {
    #[serde(default)]
    pub zones: Vec<Zone>,
    #[serde(default)]
    pub parcours: Vec<Parcours>,
    #[serde(default)]
    pub interests: Vec<InterestPoint>,
    #[serde(default)]
    pub equipment: Vec<Equipment>,
    #[serde(default)]
    pub equipment_types: Vec<EquipmentType>,
    #[serde(default)]
    pub actions: Vec<Action>,
    #[serde(default)]
    pub teams: Vec<Team>,
}

fn new_id() -> String {
    Uuid::new_v4().to_string()
}

impl MemoryStore {
    pub fn new() -> MemoryStore {
        MemoryStore::default()
    }

    /// Loads a store file; a missing file is an empty store.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<MemoryStore> {
        let path = path.as_ref();
        match File::open(path) {
            Ok(file) => {
                let store = serde_json::from_reader(BufReader::new(file))?;
                debug!(path = %path.display(), "store loaded");
                Ok(store)
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(MemoryStore::default()),
            Err(e) => Err(e.into()),
        }
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let file = File::create(path.as_ref())?;
        serde_json::to_writer_pretty(BufWriter::new(file), self)?;
        debug!(path = %path.as_ref().display(), "store saved");
        Ok(())
    }

    pub fn add_team(&mut self, event_id: &str, name: &str) -> Team {
        let team = Team {
            id: new_id(),
            name: name.to_string(),
            event_id: event_id.to_string(),
        };
        self.teams.push(team.clone());
        team
    }

    pub fn add_equipment_type(&mut self, name: &str, description: Option<&str>) -> EquipmentType {
        let equipment_type = EquipmentType {
            id: new_id(),
            name: name.to_string(),
            description: description.map(str::to_string),
        };
        self.equipment_types.push(equipment_type.clone());
        equipment_type
    }

    fn checked_geometry(operation: &'static str, entity: &str, attributes: &GeometryAttributes, wkt: &str) -> Result<()> {
        let geometry = Geometry::parse(wkt)
            .map_err(|e| Error::persistence(operation, entity, e.to_string()))?;
        if geometry.kind() != attributes.geometry_kind() {
            return Err(Error::persistence(
                operation,
                entity,
                format!("a {} needs a {}, got a {}", attributes.kind(), attributes.geometry_kind(), geometry.kind()),
            ));
        }
        Ok(())
    }

    fn type_name(&self, type_id: Option<&str>) -> Option<String> {
        let type_id = type_id?;
        self.equipment_types
            .iter()
            .find(|t| t.id == type_id)
            .map(|t| t.name.clone())
    }
}

impl Store for MemoryStore {
    fn persist_geometry(&mut self, event_id: &str, attributes: &GeometryAttributes, wkt: &str) -> Result<String> {
        let id = new_id();
        MemoryStore::checked_geometry("persist_geometry", &id, attributes, wkt)?;

        match attributes.clone() {
            GeometryAttributes::Zone { name, color, description } => self.zones.push(Zone {
                id: id.clone(),
                event_id: event_id.to_string(),
                name,
                color,
                description,
                geometry: wkt.to_string(),
            }),
            GeometryAttributes::Parcours { name, color, start_time, speed_low, speed_high } => {
                self.parcours.push(Parcours {
                    id: id.clone(),
                    event_id: event_id.to_string(),
                    name,
                    color,
                    start_time,
                    speed_low,
                    speed_high,
                    geometry: wkt.to_string(),
                })
            }
            GeometryAttributes::Interest { description } => self.interests.push(InterestPoint {
                id: id.clone(),
                event_id: event_id.to_string(),
                description,
                geometry: wkt.to_string(),
            }),
        }
        info!(%id, kind = %attributes.kind(), "geometry created");
        Ok(id)
    }

    fn update_geometry(&mut self, id: &str, wkt: &str, attributes: &GeometryAttributes) -> Result<()> {
        MemoryStore::checked_geometry("update_geometry", id, attributes, wkt)?;
        let missing = || Error::persistence("update_geometry", id, format!("no {} with this id", attributes.kind()));

        match attributes.clone() {
            GeometryAttributes::Zone { name, color, description } => {
                let zone = self.zones.iter_mut().find(|z| z.id == id).ok_or_else(missing)?;
                zone.name = name;
                zone.color = color;
                zone.description = description;
                zone.geometry = wkt.to_string();
            }
            GeometryAttributes::Parcours { name, color, start_time, speed_low, speed_high } => {
                let parcours = self.parcours.iter_mut().find(|p| p.id == id).ok_or_else(missing)?;
                parcours.name = name;
                parcours.color = color;
                parcours.start_time = start_time;
                parcours.speed_low = speed_low;
                parcours.speed_high = speed_high;
                parcours.geometry = wkt.to_string();
            }
            GeometryAttributes::Interest { description } => {
                let interest = self.interests.iter_mut().find(|i| i.id == id).ok_or_else(missing)?;
                interest.description = description;
                interest.geometry = wkt.to_string();
            }
        }
        info!(%id, "geometry updated");
        Ok(())
    }

    fn delete_geometry(&mut self, id: &str) -> Result<()> {
        let before = self.zones.len() + self.parcours.len() + self.interests.len();
        self.zones.retain(|z| z.id != id);
        self.parcours.retain(|p| p.id != id);
        self.interests.retain(|i| i.id != id);
        if before == self.zones.len() + self.parcours.len() + self.interests.len() {
            return Err(Error::persistence("delete_geometry", id, "no geometry with this id"));
        }
        info!(%id, "geometry deleted");
        Ok(())
    }

    fn persist_equipment(
        &mut self,
        event_id: &str,
        attributes: &EquipmentAttributes,
        coordinates: &[Coord],
    ) -> Result<String> {
        let id = new_id();
        if coordinates.is_empty() {
            return Err(Error::persistence("persist_equipment", &id, "equipment without coordinates"));
        }

        self.equipment.push(Equipment {
            id: id.clone(),
            event_id: event_id.to_string(),
            type_id: attributes.type_id.clone(),
            type_name: None,
            quantity: attributes.quantity,
            length_per_unit: attributes.length_per_unit,
            description: attributes.description.clone(),
            date_pose: attributes.date_pose.clone(),
            hour_pose: attributes.hour_pose.clone(),
            date_depose: attributes.date_depose.clone(),
            hour_depose: attributes.hour_depose.clone(),
            coordinates: coordinates
                .iter()
                .enumerate()
                .map(|(i, c)| EquipmentCoordinate {
                    x: c.x,
                    y: c.y,
                    order_index: Some(i as i64),
                })
                .collect(),
        });
        info!(%id, points = coordinates.len(), "equipment created");
        Ok(id)
    }

    fn delete_equipment(&mut self, id: &str) -> Result<()> {
        let before = self.equipment.len();
        self.equipment.retain(|e| e.id != id);
        if before == self.equipment.len() {
            return Err(Error::persistence("delete_equipment", id, "no equipment with this id"));
        }
        self.actions.retain(|a| a.equipment_id != id);
        info!(%id, "equipment deleted");
        Ok(())
    }

    fn upsert_action(&mut self, team_id: &str, equipment_id: &str, action_type: ActionType) -> Result<String> {
        if !self.equipment.iter().any(|e| e.id == equipment_id) {
            return Err(Error::persistence("upsert_action", equipment_id, "no equipment with this id"));
        }

        let existing = self
            .actions
            .iter()
            .position(|a| a.equipment_id == equipment_id && a.action_type == action_type);
        let id = match existing {
            Some(index) => {
                let action = &mut self.actions[index];
                action.team_id = team_id.to_string();
                action.id.clone()
            }
            None => {
                let id = new_id();
                self.actions.push(Action {
                    id: id.clone(),
                    team_id: team_id.to_string(),
                    equipment_id: equipment_id.to_string(),
                    action_type,
                });
                id
            }
        };
        // one action per (equipment, type)
        self.actions
            .retain(|a| a.id == id || a.equipment_id != equipment_id || a.action_type != action_type);
        debug!(%id, team_id, equipment_id, %action_type, "action upserted");
        Ok(id)
    }

    fn delete_action(&mut self, action_id: &str) -> Result<()> {
        let before = self.actions.len();
        self.actions.retain(|a| a.id != action_id);
        if before == self.actions.len() {
            return Err(Error::persistence("delete_action", action_id, "no action with this id"));
        }
        Ok(())
    }

    fn list_zones(&self, event_id: &str) -> Result<Vec<Zone>> {
        Ok(self.zones.iter().filter(|z| z.event_id == event_id).cloned().collect())
    }

    fn list_parcours(&self, event_id: &str) -> Result<Vec<Parcours>> {
        Ok(self.parcours.iter().filter(|p| p.event_id == event_id).cloned().collect())
    }

    fn list_interests(&self, event_id: &str) -> Result<Vec<InterestPoint>> {
        Ok(self.interests.iter().filter(|i| i.event_id == event_id).cloned().collect())
    }

    fn list_equipment(&self, event_id: &str) -> Result<Vec<Equipment>> {
        Ok(self
            .equipment
            .iter()
            .filter(|e| e.event_id == event_id)
            .map(|e| Equipment {
                type_name: self.type_name(e.type_id.as_deref()),
                ..e.clone()
            })
            .collect())
    }

    fn list_actions(&self, event_id: &str) -> Result<Vec<Action>> {
        Ok(self
            .actions
            .iter()
            .filter(|a| {
                self.equipment
                    .iter()
                    .any(|e| e.id == a.equipment_id && e.event_id == event_id)
            })
            .cloned()
            .collect())
    }

    fn list_teams(&self, event_id: &str) -> Result<Vec<Team>> {
        Ok(self.teams.iter().filter(|t| t.event_id == event_id).cloned().collect())
    }
}
