extern crate getopts;
extern crate jalon;

use getopts::Options;
use std::env;
use std::process;

use jalon::actions::{assign_teams, common_team};
use jalon::config::{self, Settings};
use jalon::models::ActionType;
use jalon::scene::Scene;
use jalon::{establish_store, event_or_default, Error, Result};

fn print_usage(program: &str, opts: Options) {
    let brief = format!("Usage: {} [options] EQUIPMENT_ID...", program);
    print!("{}", opts.usage(&brief));
}

/// Accepts a team id or a team name.
fn resolve_team(scene: &Scene, team: Option<String>) -> Result<Option<String>> {
    let team = match team {
        Some(team) => team,
        None => return Ok(None),
    };
    scene
        .teams
        .iter()
        .find(|t| t.id == team || t.name == team)
        .map(|t| Some(t.id.clone()))
        .ok_or_else(|| Error::Config(format!("unknown team {:?}", team)))
}

fn run(args: Vec<String>) -> Result<()> {
    let program = args[0].clone();

    let mut opts = Options::new();
    opts.optopt("e", "event", "event id", "EVENT");
    opts.optopt("p", "pose", "team installing the equipment", "TEAM");
    opts.optopt("d", "depose", "team removing the equipment", "TEAM");
    opts.optflag("h", "help", "print this help menu");
    let matches = opts
        .parse(&args[1..])
        .map_err(|f| Error::Config(f.to_string()))?;
    if matches.opt_present("h") || matches.free.is_empty() {
        print_usage(&program, opts);
        return Ok(());
    }

    let settings = Settings::from_env()?;
    let event_id = event_or_default(matches.opt_str("e"), &settings)?;
    let mut store = establish_store(&settings)?;
    let scene = Scene::load(&store, &event_id)?;
    let selection = matches.free.clone();

    let pose = resolve_team(&scene, matches.opt_str("p"))?;
    let depose = resolve_team(&scene, matches.opt_str("d"))?;

    let mut index = scene.actions.clone();
    if pose.is_some() || depose.is_some() {
        let result = assign_teams(&mut store, &mut index, &selection, pose.as_deref(), depose.as_deref());
        // keep whatever was applied, even on partial failure
        store.save(&settings.data_file)?;
        let applied = result?;
        println!("{} action(s) assigned", applied.len());
    }

    for action_type in [ActionType::Pose, ActionType::Depose] {
        let team = common_team(&index, &selection, action_type);
        let name = team
            .as_deref()
            .map(|id| scene.team_name(id).unwrap_or(id).to_string())
            .unwrap_or_else(|| "(mixed or none)".to_string());
        println!("{}: {}", action_type, name);
    }
    Ok(())
}

fn main() {
    config::init_logging();
    if let Err(e) = run(env::args().collect()) {
        eprintln!("error: {}", e);
        if let Error::PartialAssignment { failures, .. } = &e {
            for failure in failures {
                eprintln!("  {} {}: {}", failure.equipment_id, failure.action_type, failure.message);
            }
        }
        process::exit(1);
    }
}
