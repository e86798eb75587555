//! Event equipment map engine: geometry storage format, distances, drawing,
//! the pose/depose timeline, map visibility and team assignments.

pub mod actions;
pub mod config;
pub mod drawing;
pub mod error;
pub mod geomath;
pub mod geometry;
pub mod gpx;
pub mod models;
pub mod render;
pub mod scene;
pub mod store;
pub mod timeline;
pub mod visibility;

pub use crate::error::{Error, Result};
pub use crate::geometry::{Geometry, GeometryKind};
pub use crate::store::{MemoryStore, Store};

use crate::config::Settings;

/// Opens the store named by the settings.
pub fn establish_store(settings: &Settings) -> Result<MemoryStore> {
    MemoryStore::open(&settings.data_file)
}

/// Event to work on: the command-line value, else the configured one.
pub fn event_or_default(event: Option<String>, settings: &Settings) -> Result<String> {
    event
        .or_else(|| settings.event_id.clone())
        .ok_or(Error::NoActiveEvent)
}
