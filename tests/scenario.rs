extern crate jalon;

use chrono::{NaiveDate, NaiveDateTime};
use geo::Coord;

use jalon::actions::{assign_teams, common_team};
use jalon::drawing::{DrawMode, DrawingSession, Sketch, Staged};
use jalon::models::{Action, ActionType, Equipment, InterestPoint, Parcours, Team, Zone};
use jalon::render::MapLayers;
use jalon::scene::{Scene, SharedScene};
use jalon::store::{EquipmentAttributes, GeometryAttributes};
use jalon::timeline::Timeline;
use jalon::visibility::{ViewportBounds, VisibilityFilter};
use jalon::{Error, MemoryStore, Result, Store};

fn at(day: u32, hour: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2024, 6, day)
        .and_then(|d| d.and_hms_opt(hour, 0, 0))
        .unwrap()
}

fn c(x: f64, y: f64) -> Coord {
    Coord { x, y }
}

/// Memory store that refuses actions on one equipment.
struct Flaky {
    inner: MemoryStore,
    broken: String,
}

impl Store for Flaky {
    fn persist_geometry(&mut self, event_id: &str, attributes: &GeometryAttributes, wkt: &str) -> Result<String> {
        self.inner.persist_geometry(event_id, attributes, wkt)
    }
    fn update_geometry(&mut self, id: &str, wkt: &str, attributes: &GeometryAttributes) -> Result<()> {
        self.inner.update_geometry(id, wkt, attributes)
    }
    fn delete_geometry(&mut self, id: &str) -> Result<()> {
        self.inner.delete_geometry(id)
    }
    fn persist_equipment(&mut self, event_id: &str, attributes: &EquipmentAttributes, coordinates: &[Coord]) -> Result<String> {
        self.inner.persist_equipment(event_id, attributes, coordinates)
    }
    fn delete_equipment(&mut self, id: &str) -> Result<()> {
        self.inner.delete_equipment(id)
    }
    fn upsert_action(&mut self, team_id: &str, equipment_id: &str, action_type: ActionType) -> Result<String> {
        if equipment_id == self.broken {
            return Err(Error::Persistence {
                operation: "upsert_action",
                entity: equipment_id.to_string(),
                message: "connection reset".to_string(),
            });
        }
        self.inner.upsert_action(team_id, equipment_id, action_type)
    }
    fn delete_action(&mut self, action_id: &str) -> Result<()> {
        self.inner.delete_action(action_id)
    }
    fn list_zones(&self, event_id: &str) -> Result<Vec<Zone>> {
        self.inner.list_zones(event_id)
    }
    fn list_parcours(&self, event_id: &str) -> Result<Vec<Parcours>> {
        self.inner.list_parcours(event_id)
    }
    fn list_interests(&self, event_id: &str) -> Result<Vec<InterestPoint>> {
        self.inner.list_interests(event_id)
    }
    fn list_equipment(&self, event_id: &str) -> Result<Vec<Equipment>> {
        self.inner.list_equipment(event_id)
    }
    fn list_actions(&self, event_id: &str) -> Result<Vec<Action>> {
        self.inner.list_actions(event_id)
    }
    fn list_teams(&self, event_id: &str) -> Result<Vec<Team>> {
        self.inner.list_teams(event_id)
    }
}

/// Draws a zone, a parcours, an interest point and two barriers.
fn draw_event(store: &mut MemoryStore) -> (String, String) {
    let barrier = store.add_equipment_type("Barrière Vauban", None);
    let mut session = DrawingSession::new(Some("fete"));

    session.start(DrawMode::Zone).unwrap();
    session
        .commit_sketch(Sketch {
            points: vec![c(7.74, 48.57), c(7.76, 48.57), c(7.76, 48.59), c(7.74, 48.59)],
            closed: true,
        })
        .unwrap();
    session.save_zone(store, "Village", "#6366f1", None).unwrap();

    session.start(DrawMode::Parcours).unwrap();
    session
        .commit_sketch(Sketch { points: vec![c(7.74, 48.58), c(7.76, 48.58)], closed: false })
        .unwrap();
    session.save_parcours(store, "10 km", "", None, (8.0, 16.0)).unwrap();

    session.start(DrawMode::Interest).unwrap();
    session.commit_sketch(Sketch { points: vec![c(7.75, 48.58)], closed: false }).unwrap();
    assert_eq!(session.mode(), DrawMode::None);
    session.save_interest(store, "Secours").unwrap();

    let mut ids = Vec::new();
    for (day, from, to) in [(1, "08:00", "18:00"), (2, "06:00", "20:00")] {
        session.start(DrawMode::Equipment).unwrap();
        let staged = session
            .commit_sketch(Sketch { points: vec![c(7.75, 48.58), c(7.7501, 48.58)], closed: false })
            .unwrap();
        let count = match staged {
            Staged::Equipment { .. } => staged.suggested_count(2.0).unwrap(),
            other => panic!("unexpected {:?}", other),
        };
        assert_eq!(count, 4);

        let attributes = EquipmentAttributes {
            type_id: Some(barrier.id.clone()),
            quantity: count,
            length_per_unit: 2.0,
            date_pose: Some(format!("2024-06-0{}", day)),
            hour_pose: Some(from.to_string()),
            date_depose: Some(format!("2024-06-0{}", day)),
            hour_depose: Some(to.to_string()),
            ..Default::default()
        };
        ids.push(session.save_equipment(store, &attributes).unwrap());
    }
    (ids[0].clone(), ids[1].clone())
}

#[test]
fn draw_load_schedule_and_assign() {
    let mut store = MemoryStore::new();
    let alpha = store.add_team("fete", "Alpha");
    let bravo = store.add_team("fete", "Bravo");
    let (first, second) = draw_event(&mut store);

    let shared = SharedScene::new(Scene::load(&store, "fete").unwrap());
    let scene = shared.snapshot();
    assert_eq!(scene.zones.len(), 1);
    assert_eq!(scene.parcours.len(), 1);
    assert_eq!(scene.interests.len(), 1);
    assert_eq!(scene.equipment.len(), 2);

    let timeline = Timeline::new(&scene.equipment, at(1, 0));
    assert_eq!(timeline.bounds().start, at(1, 7));
    assert_eq!(timeline.bounds().end, at(2, 22));
    assert_eq!(timeline.cursor(), at(1, 8));
    assert_eq!(timeline.day_blocks().len(), 2);

    let mut filter = VisibilityFilter::default();
    filter.set_cursor(Some(at(1, 12)));
    let visible: Vec<&str> = filter
        .visible_equipment(&scene.equipment)
        .iter()
        .map(|e| e.id.as_str())
        .collect();
    assert_eq!(visible, vec![first.as_str()]);

    let layers = MapLayers::build(&scene, &filter);
    assert!(layers.skipped.is_empty());
    assert_eq!(layers.equipment["features"].as_array().unwrap().len(), 1);
    assert_eq!(layers.equipment["features"][0]["properties"]["line_width"], 2);
    assert_eq!(layers.geometries["features"][1]["properties"]["color"], "#ef4444");

    filter.set_viewport(ViewportBounds { north: 1.0, south: 0.0, east: 1.0, west: 0.0 });
    filter.spatial_filter = true;
    assert!(filter.timeline_rows(&scene.equipment).is_empty());

    let selection = vec![first.clone(), second.clone()];
    let mut index = scene.actions.clone();
    let applied = assign_teams(&mut store, &mut index, &selection, Some(alpha.id.as_str()), Some(bravo.id.as_str())).unwrap();
    assert_eq!(applied.len(), 4);
    shared.update(|scene| scene.actions = index.clone());

    let scene = shared.snapshot();
    assert_eq!(common_team(&scene.actions, &selection, ActionType::Pose), Some(alpha.id.clone()));
    assert_eq!(common_team(&scene.actions, &selection, ActionType::Depose), Some(bravo.id.clone()));

    let reloaded = Scene::load(&store, "fete").unwrap();
    assert_eq!(reloaded.actions, scene.actions);
}

#[test]
fn partial_assignment_keeps_successes() {
    let mut store = MemoryStore::new();
    let alpha = store.add_team("fete", "Alpha");
    let (first, second) = draw_event(&mut store);

    let mut flaky = Flaky { inner: store, broken: second.clone() };
    let scene = Scene::load(&flaky, "fete").unwrap();
    let mut index = scene.actions.clone();
    let selection = vec![first.clone(), second.clone()];

    match assign_teams(&mut flaky, &mut index, &selection, Some(alpha.id.as_str()), None) {
        Err(Error::PartialAssignment { applied, failures }) => {
            assert_eq!(applied.len(), 1);
            assert_eq!(failures.len(), 1);
            assert_eq!(failures[0].equipment_id, second);
            assert_eq!(failures[0].action_type, ActionType::Pose);
        }
        other => panic!("unexpected {:?}", other),
    }

    assert_eq!(common_team(&index, &selection, ActionType::Pose), None);
    assert_eq!(common_team(&index, &selection[..1], ActionType::Pose), Some(alpha.id.clone()));
    assert_eq!(flaky.list_actions("fete").unwrap().len(), 1);
}

#[test]
fn store_survives_a_save_and_reload() {
    let mut store = MemoryStore::new();
    draw_event(&mut store);

    let path = std::env::temp_dir().join(format!("jalon-scenario-{}.json", uuid::Uuid::new_v4()));
    store.save(&path).unwrap();
    let reopened = MemoryStore::open(&path).unwrap();
    std::fs::remove_file(&path).unwrap();

    let before = Scene::load(&store, "fete").unwrap();
    let after = Scene::load(&reopened, "fete").unwrap();
    assert_eq!(before, after);
}
