extern crate getopts;
extern crate jalon;

use getopts::Options;
use std::env;
use std::process;

use jalon::config::{self, Settings};
use jalon::drawing::suggested_count;
use jalon::geomath::{
    bearing, format_coordinates, format_distance, path_length, CoordinateFormat,
};
use jalon::{Error, Geometry, GeometryKind, Result};

fn print_usage(program: &str, opts: Options) {
    let brief = format!("Usage: {} [options] WKT", program);
    print!("{}", opts.usage(&brief));
}

fn run(args: Vec<String>) -> Result<()> {
    let program = args[0].clone();

    let mut opts = Options::new();
    opts.optflag("j", "geojson", "print the GeoJSON form");
    opts.optflag("d", "dms", "print positions as degrees, minutes, seconds");
    opts.optopt("u", "length-per-unit", "metres per equipment unit", "METRES");
    opts.optflag("h", "help", "print this help menu");
    let matches = opts
        .parse(&args[1..])
        .map_err(|f| Error::Config(f.to_string()))?;
    if matches.opt_present("h") || matches.free.is_empty() {
        print_usage(&program, opts);
        return Ok(());
    }

    let settings = Settings::from_env()?;
    let length_per_unit = match matches.opt_str("u") {
        Some(raw) => config::parse_length_per_unit(&raw)?,
        None => settings.length_per_unit,
    };
    let format = if matches.opt_present("d") {
        CoordinateFormat::Dms
    } else {
        CoordinateFormat::default()
    };

    let geometry = Geometry::parse(&matches.free.join(" "))?;
    println!("{} with {} point(s)", geometry.kind(), geometry.coords().len());
    println!("{}", geometry);

    if let Some(anchor) = geometry.anchor() {
        println!("anchor {}", format_coordinates(anchor.y, anchor.x, format));
    }
    if let Some(extent) = geometry.extent() {
        println!(
            "extent N {} S {} E {} W {}",
            extent.north, extent.south, extent.east, extent.west
        );
    }
    if geometry.kind() == GeometryKind::LineString {
        let coords = geometry.coords();
        let length = path_length(coords)?;
        println!("length {}", format_distance(length));
        if let (Some(first), Some(last)) = (coords.first(), coords.last()) {
            println!("bearing {:.1}°", bearing(*first, *last));
        }
        if let Some(count) = suggested_count(length, length_per_unit) {
            println!("{} unit(s) of {} m", count, length_per_unit);
        }
    }
    if matches.opt_present("j") {
        println!("{}", serde_json::to_string_pretty(&geometry.to_geojson())?);
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
