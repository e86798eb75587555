use std::fmt;

use chrono::NaiveDateTime;
use geo::Coord;
use serde::{Deserialize, Serialize};

/// The kinds of entity placed on the map.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Zone,
    Parcours,
    Interest,
    Equipment,
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            EntityKind::Zone => write!(f, "zone"),
            EntityKind::Parcours => write!(f, "parcours"),
            EntityKind::Interest => write!(f, "interest point"),
            EntityKind::Equipment => write!(f, "equipment"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Zone {
    pub id: String,
    pub event_id: String,
    pub name: String,
    pub color: String,
    pub description: Option<String>,
    /// Polygon in storage text form.
    pub geometry: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Parcours {
    pub id: String,
    pub event_id: String,
    pub name: String,
    pub color: String,
    pub start_time: Option<NaiveDateTime>,
    pub speed_low: f64,
    pub speed_high: f64,
    /// LineString in storage text form.
    pub geometry: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InterestPoint {
    pub id: String,
    pub event_id: String,
    pub description: String,
    /// Point in storage text form.
    pub geometry: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EquipmentType {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EquipmentCoordinate {
    pub x: f64,
    pub y: f64,
    pub order_index: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Equipment {
    pub id: String,
    pub event_id: String,
    pub type_id: Option<String>,
    /// Joined from the equipment type, used for styling only.
    #[serde(default)]
    pub type_name: Option<String>,
    pub quantity: u32,
    pub length_per_unit: f64,
    pub description: Option<String>,
    pub date_pose: Option<String>,
    pub hour_pose: Option<String>,
    pub date_depose: Option<String>,
    pub hour_depose: Option<String>,
    #[serde(default)]
    pub coordinates: Vec<EquipmentCoordinate>,
}

impl Equipment {
    /// Coordinates as a path, ordered by `order_index` (missing index sorts as 0).
    pub fn path(&self) -> Vec<Coord> {
        let mut coordinates = self.coordinates.clone();
        coordinates.sort_by_key(|c| c.order_index.unwrap_or(0));
        coordinates
            .iter()
            .map(|c| Coord { x: c.x, y: c.y })
            .collect()
    }

    /// Blank dates do not count.
    pub fn has_dates(&self) -> bool {
        let filled = |d: &Option<String>| d.as_deref().map_or(false, |d| !d.trim().is_empty());
        filled(&self.date_pose) || filled(&self.date_depose)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActionType {
    Pose,
    Depose,
}

impl fmt::Display for ActionType {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ActionType::Pose => write!(f, "pose"),
            ActionType::Depose => write!(f, "depose"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Action {
    pub id: String,
    pub team_id: String,
    pub equipment_id: String,
    pub action_type: ActionType,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Team {
    pub id: String,
    pub name: String,
    pub event_id: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn path_follows_order_index() {
        let equipment = Equipment {
            coordinates: vec![
                EquipmentCoordinate { x: 3.0, y: 3.0, order_index: Some(2) },
                EquipmentCoordinate { x: 1.0, y: 1.0, order_index: Some(0) },
                EquipmentCoordinate { x: 2.0, y: 2.0, order_index: Some(1) },
            ],
            ..Default::default()
        };
        let xs: Vec<f64> = equipment.path().iter().map(|c| c.x).collect();
        assert_eq!(xs, vec![1.0, 2.0, 3.0]);
    }

    #[test]
    fn blank_dates_are_not_dates() {
        let mut equipment = Equipment {
            date_pose: Some(String::new()),
            date_depose: Some("  ".to_string()),
            ..Default::default()
        };
        assert!(!equipment.has_dates());
        equipment.date_depose = Some("2024-01-01".to_string());
        assert!(equipment.has_dates());
        assert!(!Equipment::default().has_dates());
    }

    #[test]
    fn action_type_serializes_lowercase() {
        let json = serde_json::to_string(&ActionType::Depose).unwrap();
        assert_eq!(json, "\"depose\"");
    }
}
