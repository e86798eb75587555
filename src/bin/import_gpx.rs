extern crate getopts;
extern crate jalon;

use getopts::Options;
use std::env;
use std::process;

use jalon::config::{self, Settings};
use jalon::drawing::{DrawMode, DrawingSession};
use jalon::geomath::{format_distance, path_length};
use jalon::gpx;
use jalon::render::DEFAULT_PARCOURS_COLOR;
use jalon::{establish_store, event_or_default, Error, Result};

fn print_usage(program: &str, opts: Options) {
    let brief = format!("Usage: {} [options]", program);
    print!("{}", opts.usage(&brief));
}

fn parse_speed(raw: Option<String>, default: f64) -> Result<f64> {
    match raw {
        Some(s) => s
            .parse()
            .map_err(|_| Error::Config(format!("bad speed {:?}", s))),
        None => Ok(default),
    }
}

fn run(args: Vec<String>) -> Result<()> {
    let program = args[0].clone();

    let mut opts = Options::new();
    opts.optopt("e", "event", "event id", "EVENT");
    opts.optopt("n", "name", "parcours name", "NAME");
    opts.optopt("g", "gpx", "GPX file", "FILE");
    opts.optopt("c", "color", "line colour", "#RRGGBB");
    opts.optopt("l", "speed-low", "slowest speed in km/h", "KMH");
    opts.optopt("s", "speed-high", "fastest speed in km/h", "KMH");
    opts.optflag("h", "help", "print this help menu");
    let matches = opts
        .parse(&args[1..])
        .map_err(|f| Error::Config(f.to_string()))?;
    if matches.opt_present("h") {
        print_usage(&program, opts);
        return Ok(());
    }
    let (name, file) = match (matches.opt_str("n"), matches.opt_str("g")) {
        (Some(name), Some(file)) => (name, file),
        _ => {
            print_usage(&program, opts);
            return Ok(());
        }
    };
    let color = matches
        .opt_str("c")
        .unwrap_or_else(|| DEFAULT_PARCOURS_COLOR.to_string());
    let speeds = (
        parse_speed(matches.opt_str("l"), 0.0)?,
        parse_speed(matches.opt_str("s"), 0.0)?,
    );

    let settings = Settings::from_env()?;
    let event_id = event_or_default(matches.opt_str("e"), &settings)?;
    let mut store = establish_store(&settings)?;

    let gpx_data = gpx::read_whole_file(&file)?;
    let points = gpx::parse_gpx(&gpx_data)?;
    let route = gpx::route_geometry(&points)?;
    let length = path_length(route.coords())?;

    let mut session = DrawingSession::new(Some(event_id.as_str()));
    session.start(DrawMode::Parcours)?;
    session.commit(route)?;
    let id = session.save_parcours(&mut store, &name, &color, None, speeds)?;
    store.save(&settings.data_file)?;

    println!("parcours {} created: {} points, {}", id, points.len(), format_distance(length));
    Ok(())
}

fn main() {
    config::init_logging();
    if let Err(e) = run(env::args().collect()) {
        eprintln!("error: {}", e);
        process::exit(1);
    }
}
