use std::sync::Arc;
use std::time::Duration;

use clap::{Arg, ArgMatches, Command};
use tracing::{error, warn};
use tracing_subscriber::EnvFilter;

use devorient::config::{Backend, Settings};
use devorient::{platform, set_default_service, Orientation, OrientationService, Result};

fn cli() -> Command<'static> {
    Command::new("devorient")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Report, watch and lock the screen orientation")
        .subcommand_required(true)
        .arg_required_else_help(true)
        .arg(
            Arg::new("backend")
                .long("backend")
                .short('b')
                .value_name("BACKEND")
                .help("Display backend")
                .possible_values(Backend::NAMES)
                .takes_value(true),
        )
        .arg(
            Arg::new("display")
                .long("display")
                .short('d')
                .value_name("DISPLAY")
                .help("Output to watch and rotate, e.g. eDP-1")
                .takes_value(true),
        )
        .arg(
            Arg::new("sleep")
                .long("sleep")
                .short('s')
                .value_name("SLEEP")
                .help("Accelerometer poll interval in milliseconds")
                .takes_value(true),
        )
        .arg(
            Arg::new("threshold")
                .long("threshold")
                .short('t')
                .value_name("THRESHOLD")
                .help("Accelerometer reading past which the device counts as tilted")
                .takes_value(true),
        )
        .subcommand(Command::new("get").about("Print the current orientation"))
        .subcommand(
            Command::new("lock").about("Lock the display orientation").arg(
                Arg::new("orientation")
                    .required(true)
                    .possible_values(Orientation::ALL.iter().map(|o| o.as_str())),
            ),
        )
        .subcommand(Command::new("unlock").about("Remove the orientation lock"))
        .subcommand(
            Command::new("watch")
                .about("Print orientation changes until interrupted")
                .arg(
                    Arg::new("json")
                        .long("json")
                        .help("Print one JSON object per event"),
                ),
        )
}

fn settings_from(matches: &ArgMatches) -> Result<Settings> {
    let mut settings = Settings::from_env();
    if let Some(backend) = matches.value_of("backend") {
        settings.backend = backend.parse()?;
    }
    if let Some(display) = matches.value_of("display") {
        settings.display = display.to_owned();
    }
    if let Some(sleep) = matches.value_of("sleep") {
        match sleep.parse::<u64>() {
            Ok(ms) if ms > 0 => settings.poll_interval = Duration::from_millis(ms),
            _ => warn!("ignoring invalid --sleep {:?}", sleep),
        }
    }
    if let Some(threshold) = matches.value_of("threshold") {
        match threshold.parse::<i32>() {
            Ok(t) if t >= 0 => settings.threshold = t,
            _ => warn!("ignoring invalid --threshold {:?}", threshold),
        }
    }
    Ok(settings)
}

fn watch(service: &OrientationService, json: bool) -> Result<()> {
    service.subscribe_log_events(|event| warn!("{}", event.message));
    let changes = service.orientation_changes();

    let current = service.current_orientation();
    if json {
        println!("{}", serde_json::json!({ "orientation": current }));
    } else {
        println!("{}", current);
    }

    for event in changes {
        if json {
            println!("{}", serde_json::to_string(&event)?);
        } else {
            println!("{}", event.orientation);
        }
    }
    Ok(())
}

fn run() -> Result<()> {
    let matches = cli().get_matches();
    let settings = settings_from(&matches)?;
    let service = Arc::new(platform::detect(&settings)?);
    set_default_service(Some(service.clone()));

    match matches.subcommand() {
        Some(("get", _)) => println!("{}", service.current_orientation()),
        Some(("lock", sub)) => {
            let orientation: Orientation = sub.value_of("orientation").unwrap_or_default().parse()?;
            service.lock_orientation(orientation)?;
        }
        Some(("unlock", _)) => service.unlock_orientation()?,
        Some(("watch", sub)) => watch(&service, sub.is_present("json"))?,
        _ => {}
    }

    set_default_service(None);
    Ok(())
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    if let Err(e) = run() {
        error!("{}", e);
        std::process::exit(1);
    }
}
