//! In-memory snapshot of one event's entities.
//!
//! Readers take an `Arc<Scene>` and keep a consistent view of entities and
//! viewport for as long as they hold it. Writers clone the current scene,
//! modify the copy and swap it in with a bumped version.

use std::sync::{Arc, RwLock};

use tracing::debug;

use crate::actions::ActionIndex;
use crate::error::Result;
use crate::models::{Equipment, InterestPoint, Parcours, Team, Zone};
use crate::store::Store;
use crate::visibility::ViewportBounds;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Scene {
    pub event_id: String,
    pub zones: Vec<Zone>,
    pub parcours: Vec<Parcours>,
    pub interests: Vec<InterestPoint>,
    pub equipment: Vec<Equipment>,
    pub teams: Vec<Team>,
    pub actions: ActionIndex,
    pub viewport: Option<ViewportBounds>,
    pub version: u64,
}

impl Scene {
    pub fn load<S: Store + ?Sized>(store: &S, event_id: &str) -> Result<Scene> {
        let scene = Scene {
            event_id: event_id.to_string(),
            zones: store.list_zones(event_id)?,
            parcours: store.list_parcours(event_id)?,
            interests: store.list_interests(event_id)?,
            equipment: store.list_equipment(event_id)?,
            teams: store.list_teams(event_id)?,
            actions: ActionIndex::new(store.list_actions(event_id)?),
            viewport: None,
            version: 0,
        };
        debug!(
            event_id,
            zones = scene.zones.len(),
            parcours = scene.parcours.len(),
            interests = scene.interests.len(),
            equipment = scene.equipment.len(),
            "scene loaded"
        );
        Ok(scene)
    }

    pub fn equipment(&self, id: &str) -> Option<&Equipment> {
        self.equipment.iter().find(|e| e.id == id)
    }

    pub fn team_name(&self, id: &str) -> Option<&str> {
        self.teams.iter().find(|t| t.id == id).map(|t| t.name.as_str())
    }
}

#[derive(Debug, Clone, Default)]
pub struct SharedScene {
    current: Arc<RwLock<Arc<Scene>>>,
}

impl SharedScene {
    pub fn new(scene: Scene) -> SharedScene {
        SharedScene {
            current: Arc::new(RwLock::new(Arc::new(scene))),
        }
    }

    pub fn snapshot(&self) -> Arc<Scene> {
        let guard = self.current.read().unwrap_or_else(|e| e.into_inner());
        Arc::clone(&guard)
    }

    /// Applies `change` to a copy of the current scene and publishes it.
    /// Returns the new version.
    pub fn update<F>(&self, change: F) -> u64
    where
        F: FnOnce(&mut Scene),
    {
        let mut guard = self.current.write().unwrap_or_else(|e| e.into_inner());
        let mut next = Scene::clone(&guard);
        change(&mut next);
        next.version = guard.version + 1;
        let version = next.version;
        *guard = Arc::new(next);
        version
    }

    /// Replaces the whole scene, e.g. after a reload from the store.
    pub fn replace(&self, scene: Scene) -> u64 {
        self.update(move |current| {
            let viewport = current.viewport;
            *current = scene;
            current.viewport = current.viewport.or(viewport);
        })
    }

    pub fn set_viewport(&self, bounds: ViewportBounds) -> u64 {
        self.update(|scene| scene.viewport = Some(bounds))
    }
}
