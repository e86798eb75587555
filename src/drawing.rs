//! Drawing state machine and the hand-off of drawn shapes to the store.
//!
//! At most one shape is staged at a time. A staged shape stays in place until
//! it is saved or cancelled, so a failed save can be retried with the same
//! geometry.

use chrono::NaiveDateTime;
use geo::Coord;
use tracing::{debug, info, warn};

use crate::error::{Error, Result};
use crate::geomath::path_length;
use crate::geometry::Geometry;
use crate::models::{EntityKind, Parcours, Zone};
use crate::store::{EquipmentAttributes, GeometryAttributes, Store};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DrawMode {
    #[default]
    None,
    Zone,
    Parcours,
    Interest,
    Equipment,
}

/// Raw shape coming out of the drawing tool.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Sketch {
    pub points: Vec<Coord>,
    /// The user closed the shape back onto its first point.
    pub closed: bool,
}

impl Sketch {
    pub fn into_geometry(self) -> Result<Geometry> {
        match (self.points.len(), self.closed) {
            (1, _) => Ok(Geometry::Point(self.points[0])),
            (n, true) if n >= 3 => Ok(Geometry::Polygon(self.points)),
            (n, _) if n >= 2 => Ok(Geometry::LineString(self.points)),
            (n, _) => Err(Error::malformed(
                "sketch",
                format!("cannot build a shape from {} point(s)", n),
            )),
        }
    }
}

/// A committed shape waiting for its attributes.
#[derive(Debug, Clone, PartialEq)]
pub enum Staged {
    Zone(Geometry),
    Parcours(Geometry),
    Interest(Geometry),
    Equipment {
        coordinates: Vec<Coord>,
        /// Metres along the drawn path.
        path_length: f64,
    },
}

impl Staged {
    pub fn kind(&self) -> EntityKind {
        match self {
            Staged::Zone(_) => EntityKind::Zone,
            Staged::Parcours(_) => EntityKind::Parcours,
            Staged::Interest(_) => EntityKind::Interest,
            Staged::Equipment { .. } => EntityKind::Equipment,
        }
    }

    pub fn geometry(&self) -> Geometry {
        match self {
            Staged::Zone(g) | Staged::Parcours(g) | Staged::Interest(g) => g.clone(),
            Staged::Equipment { coordinates, .. } => Geometry::LineString(coordinates.clone()),
        }
    }

    pub fn wkt(&self) -> String {
        self.geometry().to_wkt()
    }

    /// Number of units needed to cover the drawn equipment path.
    pub fn suggested_count(&self, length_per_unit: f64) -> Option<u32> {
        match self {
            Staged::Equipment { path_length, .. } => suggested_count(*path_length, length_per_unit),
            _ => None,
        }
    }
}

pub fn suggested_count(path_length: f64, length_per_unit: f64) -> Option<u32> {
    if !(length_per_unit > 0.0) || !path_length.is_finite() {
        return None;
    }
    Some((path_length / length_per_unit).ceil() as u32)
}

#[derive(Debug, Clone, Default)]
pub struct DrawingSession {
    event_id: Option<String>,
    mode: DrawMode,
    pending: Option<Staged>,
}

impl DrawingSession {
    pub fn new(event_id: Option<&str>) -> DrawingSession {
        DrawingSession {
            event_id: event_id.map(str::to_string),
            ..Default::default()
        }
    }

    /// Switching event drops whatever was being drawn.
    pub fn set_event(&mut self, event_id: Option<&str>) {
        self.event_id = event_id.map(str::to_string);
        self.reset();
    }

    pub fn event_id(&self) -> Option<&str> {
        self.event_id.as_deref()
    }

    pub fn mode(&self) -> DrawMode {
        self.mode
    }

    pub fn pending(&self) -> Option<&Staged> {
        self.pending.as_ref()
    }

    pub fn start(&mut self, mode: DrawMode) -> Result<()> {
        if self.event_id.is_none() {
            return Err(Error::NoActiveEvent);
        }
        if self.pending.is_some() {
            return Err(Error::DrawingInProgress);
        }
        debug!(?mode, "drawing started");
        self.mode = mode;
        Ok(())
    }

    /// Stages a finished shape. The shape decides the entity, except for
    /// lines which become equipment only while drawing equipment.
    pub fn commit(&mut self, geometry: Geometry) -> Result<&Staged> {
        if self.event_id.is_none() {
            return Err(Error::NoActiveEvent);
        }
        if self.mode == DrawMode::None {
            return Err(Error::NotDrawing);
        }
        if self.pending.is_some() {
            return Err(Error::DrawingInProgress);
        }

        let staged = match geometry {
            Geometry::Polygon(_) => Staged::Zone(geometry),
            Geometry::LineString(coordinates) if self.mode == DrawMode::Equipment => {
                let length = path_length(&coordinates)?;
                Staged::Equipment {
                    coordinates,
                    path_length: length,
                }
            }
            Geometry::LineString(_) => Staged::Parcours(geometry),
            Geometry::Point(_) => {
                self.mode = DrawMode::None;
                Staged::Interest(geometry)
            }
        };
        info!(kind = %staged.kind(), "shape staged");
        Ok(self.pending.insert(staged))
    }

    pub fn commit_sketch(&mut self, sketch: Sketch) -> Result<&Staged> {
        let geometry = sketch.into_geometry()?;
        self.commit(geometry)
    }

    pub fn cancel(&mut self) {
        if self.pending.is_some() || self.mode != DrawMode::None {
            debug!("drawing cancelled");
        }
        self.reset();
    }

    fn reset(&mut self) {
        self.mode = DrawMode::None;
        self.pending = None;
    }

    fn active_event(&self) -> Result<String> {
        self.event_id.clone().ok_or(Error::NoActiveEvent)
    }

    fn save_geometry<S: Store + ?Sized>(
        &mut self,
        store: &mut S,
        attributes: GeometryAttributes,
        what: &'static str,
    ) -> Result<String> {
        let event_id = self.active_event()?;
        let staged = match &self.pending {
            Some(staged) if staged.kind() == attributes.kind() => staged,
            _ => return Err(Error::NothingPending(what)),
        };

        match store.persist_geometry(&event_id, &attributes, &staged.wkt()) {
            Ok(id) => {
                self.reset();
                Ok(id)
            }
            Err(e) => {
                warn!(error = %e, "saving drawn {} failed, keeping it staged", what);
                Err(e)
            }
        }
    }

    pub fn save_zone<S: Store + ?Sized>(
        &mut self,
        store: &mut S,
        name: &str,
        color: &str,
        description: Option<&str>,
    ) -> Result<String> {
        let attributes = GeometryAttributes::Zone {
            name: name.to_string(),
            color: color.to_string(),
            description: description.map(str::to_string),
        };
        self.save_geometry(store, attributes, "zone")
    }

    pub fn save_parcours<S: Store + ?Sized>(
        &mut self,
        store: &mut S,
        name: &str,
        color: &str,
        start_time: Option<NaiveDateTime>,
        speeds: (f64, f64),
    ) -> Result<String> {
        let attributes = GeometryAttributes::Parcours {
            name: name.to_string(),
            color: color.to_string(),
            start_time,
            speed_low: speeds.0,
            speed_high: speeds.1,
        };
        self.save_geometry(store, attributes, "parcours")
    }

    pub fn save_interest<S: Store + ?Sized>(&mut self, store: &mut S, description: &str) -> Result<String> {
        let attributes = GeometryAttributes::Interest {
            description: description.to_string(),
        };
        self.save_geometry(store, attributes, "interest point")
    }

    pub fn save_equipment<S: Store + ?Sized>(
        &mut self,
        store: &mut S,
        attributes: &EquipmentAttributes,
    ) -> Result<String> {
        let event_id = self.active_event()?;
        let coordinates = match &self.pending {
            Some(Staged::Equipment { coordinates, .. }) => coordinates,
            _ => return Err(Error::NothingPending("equipment")),
        };

        match store.persist_equipment(&event_id, attributes, coordinates) {
            Ok(id) => {
                self.reset();
                Ok(id)
            }
            Err(e) => {
                warn!(error = %e, "saving drawn equipment failed, keeping it staged");
                Err(e)
            }
        }
    }
}

/// Editing the shape or colour of an existing zone or parcours.
#[derive(Debug, Clone, PartialEq)]
pub struct EditSession {
    id: String,
    attributes: GeometryAttributes,
    geometry: String,
}

impl EditSession {
    pub fn for_zone(zone: &Zone) -> EditSession {
        EditSession {
            id: zone.id.clone(),
            attributes: GeometryAttributes::Zone {
                name: zone.name.clone(),
                color: zone.color.clone(),
                description: zone.description.clone(),
            },
            geometry: zone.geometry.clone(),
        }
    }

    pub fn for_parcours(parcours: &Parcours) -> EditSession {
        EditSession {
            id: parcours.id.clone(),
            attributes: GeometryAttributes::Parcours {
                name: parcours.name.clone(),
                color: parcours.color.clone(),
                start_time: parcours.start_time,
                speed_low: parcours.speed_low,
                speed_high: parcours.speed_high,
            },
            geometry: parcours.geometry.clone(),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn geometry(&self) -> &str {
        &self.geometry
    }

    /// Replaces the shape, keeping every other attribute.
    pub fn save<S: Store + ?Sized>(&mut self, store: &mut S, geometry: &Geometry) -> Result<()> {
        let expected = self.attributes.geometry_kind();
        if geometry.kind() != expected {
            return Err(Error::malformed(
                &geometry.to_wkt(),
                format!("a {} must stay a {}", self.attributes.kind(), expected),
            ));
        }

        let wkt = geometry.to_wkt();
        store.update_geometry(&self.id, &wkt, &self.attributes)?;
        self.geometry = wkt;
        Ok(())
    }

    pub fn recolor<S: Store + ?Sized>(&mut self, store: &mut S, color: &str) -> Result<()> {
        let mut attributes = self.attributes.clone();
        match &mut attributes {
            GeometryAttributes::Zone { color: c, .. } | GeometryAttributes::Parcours { color: c, .. } => {
                *c = color.to_string()
            }
            GeometryAttributes::Interest { .. } => {}
        }
        store.update_geometry(&self.id, &self.geometry, &attributes)?;
        self.attributes = attributes;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::GeometryKind;
    use crate::store::MemoryStore;

    fn c(x: f64, y: f64) -> Coord {
        Coord { x, y }
    }

    fn line() -> Geometry {
        Geometry::LineString(vec![c(7.75, 48.58), c(7.76, 48.58)])
    }

    fn square() -> Geometry {
        Geometry::Polygon(vec![c(0.0, 0.0), c(1.0, 0.0), c(1.0, 1.0), c(0.0, 1.0)])
    }

    /// Store whose writes always fail.
    struct Offline;

    impl Store for Offline {
        fn persist_geometry(&mut self, _: &str, _: &GeometryAttributes, _: &str) -> Result<String> {
            Err(Error::persistence("persist_geometry", "new", "offline"))
        }
        fn update_geometry(&mut self, id: &str, _: &str, _: &GeometryAttributes) -> Result<()> {
            Err(Error::persistence("update_geometry", id, "offline"))
        }
        fn delete_geometry(&mut self, id: &str) -> Result<()> {
            Err(Error::persistence("delete_geometry", id, "offline"))
        }
        fn persist_equipment(&mut self, _: &str, _: &EquipmentAttributes, _: &[Coord]) -> Result<String> {
            Err(Error::persistence("persist_equipment", "new", "offline"))
        }
        fn delete_equipment(&mut self, id: &str) -> Result<()> {
            Err(Error::persistence("delete_equipment", id, "offline"))
        }
        fn upsert_action(&mut self, _: &str, id: &str, _: crate::models::ActionType) -> Result<String> {
            Err(Error::persistence("upsert_action", id, "offline"))
        }
        fn delete_action(&mut self, id: &str) -> Result<()> {
            Err(Error::persistence("delete_action", id, "offline"))
        }
        fn list_zones(&self, _: &str) -> Result<Vec<Zone>> {
            Ok(Vec::new())
        }
        fn list_parcours(&self, _: &str) -> Result<Vec<Parcours>> {
            Ok(Vec::new())
        }
        fn list_interests(&self, _: &str) -> Result<Vec<crate::models::InterestPoint>> {
            Ok(Vec::new())
        }
        fn list_equipment(&self, _: &str) -> Result<Vec<crate::models::Equipment>> {
            Ok(Vec::new())
        }
        fn list_actions(&self, _: &str) -> Result<Vec<crate::models::Action>> {
            Ok(Vec::new())
        }
        fn list_teams(&self, _: &str) -> Result<Vec<crate::models::Team>> {
            Ok(Vec::new())
        }
    }

    #[test]
    fn start_needs_an_event() {
        let mut session = DrawingSession::new(None);
        assert!(matches!(session.start(DrawMode::Zone), Err(Error::NoActiveEvent)));
        assert_eq!(session.mode(), DrawMode::None);

        session.set_event(Some("ev1"));
        session.start(DrawMode::Zone).unwrap();
        assert_eq!(session.mode(), DrawMode::Zone);
    }

    #[test]
    fn commit_needs_a_started_drawing() {
        let mut session = DrawingSession::new(None);
        assert!(matches!(session.commit(line()), Err(Error::NoActiveEvent)));
        assert!(session.pending().is_none());

        session.set_event(Some("ev1"));
        assert!(matches!(session.commit(line()), Err(Error::NotDrawing)));
        assert!(session.pending().is_none());

        session.start(DrawMode::Interest).unwrap();
        session.commit(Geometry::Point(c(7.75, 48.58))).unwrap();
        session.cancel();
        assert!(matches!(
            session.commit(Geometry::Point(c(7.75, 48.58))),
            Err(Error::NotDrawing)
        ));
    }

    #[test]
    fn lines_follow_the_mode() {
        let mut session = DrawingSession::new(Some("ev1"));
        session.start(DrawMode::Parcours).unwrap();
        assert_eq!(session.commit(line()).unwrap().kind(), EntityKind::Parcours);
        session.cancel();

        session.start(DrawMode::Equipment).unwrap();
        match session.commit(line()).unwrap() {
            Staged::Equipment { coordinates, path_length } => {
                assert_eq!(coordinates.len(), 2);
                assert!(*path_length > 700.0 && *path_length < 800.0, "{}", path_length);
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn shape_wins_over_mode() {
        let mut session = DrawingSession::new(Some("ev1"));
        session.start(DrawMode::Equipment).unwrap();
        assert_eq!(session.commit(square()).unwrap().kind(), EntityKind::Zone);
        assert_eq!(session.mode(), DrawMode::Equipment);
    }

    #[test]
    fn point_commit_resets_mode() {
        let mut session = DrawingSession::new(Some("ev1"));
        session.start(DrawMode::Interest).unwrap();
        session.commit(Geometry::Point(c(7.75, 48.58))).unwrap();
        assert_eq!(session.mode(), DrawMode::None);
        assert_eq!(session.pending().map(Staged::kind), Some(EntityKind::Interest));
    }

    #[test]
    fn one_pending_shape_at_a_time() {
        let mut session = DrawingSession::new(Some("ev1"));
        session.start(DrawMode::Zone).unwrap();
        session.commit(square()).unwrap();
        assert!(matches!(session.start(DrawMode::Parcours), Err(Error::DrawingInProgress)));
        assert!(matches!(session.commit(line()), Err(Error::DrawingInProgress)));

        session.cancel();
        assert!(session.pending().is_none());
        assert_eq!(session.mode(), DrawMode::None);
        session.start(DrawMode::Parcours).unwrap();
    }

    #[test]
    fn sketches_infer_their_shape() {
        let p = c(1.0, 1.0);
        let point = Sketch { points: vec![p], closed: false };
        assert_eq!(point.into_geometry().unwrap().kind(), GeometryKind::Point);

        let open = Sketch { points: vec![p, p, p], closed: false };
        assert_eq!(open.into_geometry().unwrap().kind(), GeometryKind::LineString);

        let ring = Sketch { points: vec![p, p, p], closed: true };
        assert_eq!(ring.into_geometry().unwrap().kind(), GeometryKind::Polygon);

        let short_ring = Sketch { points: vec![p, p], closed: true };
        assert_eq!(short_ring.into_geometry().unwrap().kind(), GeometryKind::LineString);

        assert!(Sketch::default().into_geometry().is_err());
    }

    #[test]
    fn suggested_counts_round_up() {
        assert_eq!(suggested_count(10.0, 2.0), Some(5));
        assert_eq!(suggested_count(10.5, 2.0), Some(6));
        assert_eq!(suggested_count(0.0, 2.0), Some(0));
        assert_eq!(suggested_count(10.0, 0.0), None);
        assert_eq!(suggested_count(10.0, -1.0), None);
        assert_eq!(suggested_count(10.0, f64::NAN), None);
    }

    #[test]
    fn saving_clears_the_session() {
        let mut store = MemoryStore::new();
        let mut session = DrawingSession::new(Some("ev1"));
        session.start(DrawMode::Zone).unwrap();
        session.commit(square()).unwrap();

        assert!(matches!(
            session.save_parcours(&mut store, "Route", "#ef4444", None, (10.0, 20.0)),
            Err(Error::NothingPending(_))
        ));

        let id = session.save_zone(&mut store, "Village", "#6366f1", None).unwrap();
        assert!(session.pending().is_none());
        assert_eq!(session.mode(), DrawMode::None);
        assert_eq!(store.list_zones("ev1").unwrap()[0].id, id);
    }

    #[test]
    fn failed_save_keeps_the_shape() {
        let mut session = DrawingSession::new(Some("ev1"));
        session.start(DrawMode::Equipment).unwrap();
        session.commit(line()).unwrap();

        let attributes = EquipmentAttributes { quantity: 3, length_per_unit: 2.0, ..Default::default() };
        assert!(matches!(
            session.save_equipment(&mut Offline, &attributes),
            Err(Error::Persistence { .. })
        ));
        assert_eq!(session.pending().map(Staged::kind), Some(EntityKind::Equipment));

        let mut store = MemoryStore::new();
        session.save_equipment(&mut store, &attributes).unwrap();
        assert_eq!(store.list_equipment("ev1").unwrap().len(), 1);
    }

    #[test]
    fn edit_session_updates_shape_and_colour() {
        let mut store = MemoryStore::new();
        let mut session = DrawingSession::new(Some("ev1"));
        session.start(DrawMode::Zone).unwrap();
        session.commit(square()).unwrap();
        session.save_zone(&mut store, "Village", "#6366f1", Some("stands")).unwrap();

        let zone = store.list_zones("ev1").unwrap().remove(0);
        let mut edit = EditSession::for_zone(&zone);
        assert!(edit.save(&mut store, &line()).is_err());

        let bigger = Geometry::Polygon(vec![c(0.0, 0.0), c(2.0, 0.0), c(2.0, 2.0)]);
        edit.save(&mut store, &bigger).unwrap();
        edit.recolor(&mut store, "#000000").unwrap();

        let zone = store.list_zones("ev1").unwrap().remove(0);
        assert_eq!(zone.geometry, bigger.to_wkt());
        assert_eq!(zone.color, "#000000");
        assert_eq!(zone.description.as_deref(), Some("stands"));
    }
}
