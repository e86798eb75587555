use std::io;

use thiserror::Error;

use crate::models::{Action, ActionType};

pub type Result<T> = std::result::Result<T, Error>;

/// One (equipment, action type) upsert that the store rejected during a
/// batch team assignment.
#[derive(Debug, Clone, PartialEq)]
pub struct AssignmentFailure {
    pub equipment_id: String,
    pub action_type: ActionType,
    pub team_id: String,
    pub message: String,
}

#[derive(Debug, Error)]
pub enum Error {
    #[error("malformed geometry {input:?}: {reason}")]
    MalformedGeometry { input: String, reason: String },

    #[error("invalid coordinate (lat {lat}, lon {lon})")]
    InvalidCoordinate { lat: f64, lon: f64 },

    #[error("no active event selected")]
    NoActiveEvent,

    #[error("a drawn geometry is already waiting to be saved or cancelled")]
    DrawingInProgress,

    #[error("no drawing started")]
    NotDrawing,

    #[error("nothing pending for {0}")]
    NothingPending(&'static str),

    #[error("{operation} failed for {entity}: {message}")]
    Persistence {
        operation: &'static str,
        entity: String,
        message: String,
    },

    #[error("team assignment failed for {} of {} actions", failures.len(), failures.len() + applied.len())]
    PartialAssignment {
        applied: Vec<Action>,
        failures: Vec<AssignmentFailure>,
    },

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error(transparent)]
    Io(#[from] io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Gpx(#[from] gpx::errors::GpxError),
}

impl Error {
    pub(crate) fn malformed(input: &str, reason: impl Into<String>) -> Error {
        Error::MalformedGeometry {
            input: input.to_string(),
            reason: reason.into(),
        }
    }

    pub(crate) fn persistence(
        operation: &'static str,
        entity: impl Into<String>,
        message: impl Into<String>,
    ) -> Error {
        Error::Persistence {
            operation,
            entity: entity.into(),
            message: message.into(),
        }
    }
}
