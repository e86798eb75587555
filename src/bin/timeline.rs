extern crate getopts;
extern crate jalon;

use getopts::Options;
use std::env;
use std::process;

use chrono::NaiveDateTime;
use jalon::config::{self, Settings};
use jalon::scene::Scene;
use jalon::timeline::{pose_instant, Timeline};
use jalon::visibility::{ViewportBounds, VisibilityFilter};
use jalon::{establish_store, event_or_default, Error, Result};

fn print_usage(program: &str, opts: Options) {
    let brief = format!("Usage: {} [options]", program);
    print!("{}", opts.usage(&brief));
}

fn parse_viewport(raw: &str) -> Result<ViewportBounds> {
    let parts: Vec<f64> = raw
        .split(',')
        .map(|p| p.trim().parse::<f64>())
        .collect::<std::result::Result<_, _>>()
        .map_err(|e| Error::Config(format!("bad viewport {:?}: {}", raw, e)))?;
    match parts[..] {
        [north, south, east, west] => Ok(ViewportBounds { north, south, east, west }),
        _ => Err(Error::Config(format!("viewport needs north,south,east,west, got {:?}", raw))),
    }
}

fn run(args: Vec<String>) -> Result<()> {
    let program = args[0].clone();

    let mut opts = Options::new();
    opts.optopt("e", "event", "event id", "EVENT");
    opts.optopt("c", "cursor", "show what is installed at this time", "YYYY-MM-DDTHH:MM");
    opts.optopt("v", "viewport", "only list equipment in view", "N,S,E,W");
    opts.optflag("h", "help", "print this help menu");
    let matches = opts
        .parse(&args[1..])
        .map_err(|f| Error::Config(f.to_string()))?;
    if matches.opt_present("h") {
        print_usage(&program, opts);
        return Ok(());
    }

    let settings = Settings::from_env()?;
    let event_id = event_or_default(matches.opt_str("e"), &settings)?;
    let store = establish_store(&settings)?;
    let scene = Scene::load(&store, &event_id)?;

    let mut timeline = Timeline::from_equipment(&scene.equipment);
    let mut filter = VisibilityFilter::default();
    if let Some(raw) = matches.opt_str("v") {
        filter.set_viewport(parse_viewport(&raw)?);
        filter.spatial_filter = true;
    }
    if let Some(raw) = matches.opt_str("c") {
        let cursor = NaiveDateTime::parse_from_str(&raw, "%Y-%m-%dT%H:%M")
            .map_err(|e| Error::Config(format!("bad cursor {:?}: {}", raw, e)))?;
        timeline.set_cursor(cursor);
        filter.set_cursor(Some(timeline.cursor()));
    }

    let bounds = timeline.bounds();
    println!("{} -> {} (ticks every {}h)", bounds.start, bounds.end, timeline.interval().num_hours());
    for day in timeline.day_blocks() {
        let weekend = if day.is_weekend { " *" } else { "" };
        println!("  {:<12} {:6.2}% +{:6.2}%{}", day.label, day.left_percent, day.width_percent, weekend);
    }
    println!("cursor {} ({:.2}%)", timeline.cursor(), timeline.cursor_percent());

    let mut rows = filter.timeline_rows(&scene.equipment);
    rows.sort_by_key(|eq| pose_instant(eq));
    for eq in rows {
        let markers = timeline.markers(eq);
        let fmt = |p: Option<f64>| p.map_or("-".to_string(), |p| format!("{:.2}%", p));
        let installed = if filter.equipment_visible(eq) { "x" } else { " " };
        println!(
            "[{}] {:<24} pose {:>8} depose {:>8}",
            installed,
            eq.type_name.as_deref().unwrap_or(&eq.id),
            fmt(markers.pose),
            fmt(markers.depose)
        );
    }
    Ok(())
}

fn main() {
    config::init_logging();
    if let Err(e) = run(env::args().collect()) {
        eprintln!("error: {}", e);
        process::exit(1);
    }
}
