//! Team assignments over a multi-selection of equipment.

use std::collections::HashMap;

use tracing::{info, warn};

use crate::error::{AssignmentFailure, Error, Result};
use crate::models::{Action, ActionType};
use crate::store::Store;

/// Known actions grouped by equipment.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ActionIndex {
    by_equipment: HashMap<String, Vec<Action>>,
}

impl ActionIndex {
    pub fn new(actions: impl IntoIterator<Item = Action>) -> ActionIndex {
        let mut index = ActionIndex::default();
        for action in actions {
            index.by_equipment.entry(action.equipment_id.clone()).or_default().push(action);
        }
        index
    }

    pub fn for_equipment(&self, equipment_id: &str) -> &[Action] {
        self.by_equipment.get(equipment_id).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn of_type<'a>(&'a self, equipment_id: &str, action_type: ActionType) -> impl Iterator<Item = &'a Action> {
        self.for_equipment(equipment_id)
            .iter()
            .filter(move |a| a.action_type == action_type)
    }

    pub fn len(&self) -> usize {
        self.by_equipment.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Records a stored action, replacing the one it supersedes.
    pub fn apply(&mut self, action: Action) {
        let actions = self.by_equipment.entry(action.equipment_id.clone()).or_default();
        actions.retain(|a| a.id != action.id && a.action_type != action.action_type);
        actions.push(action);
    }
}

/// The team shared by the whole selection for `action_type`, if every
/// selected equipment has exactly one such action and they agree.
pub fn common_team(index: &ActionIndex, selection: &[String], action_type: ActionType) -> Option<String> {
    let mut team: Option<&str> = None;
    for equipment_id in selection {
        let mut actions = index.of_type(equipment_id, action_type);
        let action = actions.next()?;
        if actions.next().is_some() {
            return None;
        }
        match team {
            Some(t) if t != action.team_id => return None,
            _ => team = Some(action.team_id.as_str()),
        }
    }
    team.map(str::to_string)
}

/// Upserts pose and/or depose actions for every selected equipment.
///
/// Every upsert is attempted. When some fail, the successful ones are still
/// applied to `index` and reported with the failures in
/// `Error::PartialAssignment`.
pub fn assign_teams<S: Store + ?Sized>(
    store: &mut S,
    index: &mut ActionIndex,
    selection: &[String],
    pose_team: Option<&str>,
    depose_team: Option<&str>,
) -> Result<Vec<Action>> {
    let mut applied = Vec::new();
    let mut failures = Vec::new();

    for equipment_id in selection {
        for (action_type, team) in [(ActionType::Pose, pose_team), (ActionType::Depose, depose_team)] {
            let team_id = match team {
                Some(team_id) => team_id,
                None => continue,
            };
            match store.upsert_action(team_id, equipment_id, action_type) {
                Ok(id) => {
                    let action = Action {
                        id,
                        team_id: team_id.to_string(),
                        equipment_id: equipment_id.clone(),
                        action_type,
                    };
                    index.apply(action.clone());
                    applied.push(action);
                }
                Err(e) => {
                    warn!(equipment_id = %equipment_id, %action_type, error = %e, "team assignment failed");
                    failures.push(AssignmentFailure {
                        equipment_id: equipment_id.clone(),
                        action_type,
                        team_id: team_id.to_string(),
                        message: e.to_string(),
                    });
                }
            }
        }
    }

    if failures.is_empty() {
        info!(count = applied.len(), "teams assigned");
        Ok(applied)
    } else {
        Err(Error::PartialAssignment { applied, failures })
    }
}
