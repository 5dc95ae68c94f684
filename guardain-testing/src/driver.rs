use std::{path::PathBuf, sync::Arc, time::Duration};

use chrono::Utc;
use clap::{Args, Parser, Subcommand, ValueEnum};
use guardain_logic::{
    Bearing, Dashboard, DashboardState, DirectionIndicator, IndicatorView, Location,
    OrientationSession, SafetyApi, SessionState, SourceKind, StationDirections,
};
use guardain_test_shared::{
    FixedLocation, LogUpdates, ScriptPlatform, ScriptStep, jitter_script, parse_script,
    prelude::*,
};
use guardain_transport::{ApiClient, build_client, directions_url};
use tokio::sync::watch;

/// Time given to the session to drain its queue once a script has finished
const SETTLE_TIME: Duration = Duration::from_millis(50);

#[derive(Parser)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Args, Debug, Clone, Copy)]
struct Point {
    /// Latitude in decimal degrees
    #[arg(long, allow_negative_numbers = true)]
    lat: f64,
    /// Longitude in decimal degrees
    #[arg(long, allow_negative_numbers = true)]
    lon: f64,
}

impl From<Point> for Location {
    fn from(p: Point) -> Self {
        Location::new(p.lat, p.lon)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Source {
    Absolute,
    Vendor,
}

impl From<Source> for SourceKind {
    fn from(value: Source) -> Self {
        match value {
            Source::Absolute => SourceKind::AbsoluteOrientation,
            Source::Vendor => SourceKind::VendorCompassHeading,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Print the bearing between two points
    Bearing {
        #[arg(long, allow_negative_numbers = true, num_args = 2, value_names = ["LAT", "LON"])]
        from: Vec<f64>,
        #[arg(long, allow_negative_numbers = true, num_args = 2, value_names = ["LAT", "LON"])]
        to: Vec<f64>,
    },
    /// Replay a JSON lines orientation script and print the arrow rotation for each sample
    Compass {
        script: PathBuf,
        /// Bearing to the target in degrees
        #[arg(long, default_value_t = 0.0, allow_negative_numbers = true)]
        bearing: f64,
    },
    /// Feed a jittery heading through a session
    Simulate {
        #[arg(long)]
        heading: f64,
        /// Maximum deviation either side of the heading
        #[arg(long, default_value_t = 5.0)]
        spread: f64,
        #[arg(long, default_value_t = 10)]
        count: usize,
        #[arg(long, default_value_t = 100)]
        delay_ms: u64,
        #[arg(long, value_enum, default_value_t = Source::Absolute)]
        source: Source,
        #[arg(long, default_value_t = 0.0, allow_negative_numbers = true)]
        bearing: f64,
    },
    /// Ask the API for the threat level and nearest station at a point
    Assess(Point),
    /// Find the nearest police station to a point
    Station(Point),
    /// Print a maps link for a place name
    Directions { place: String },
}

fn location_arg(values: &[f64]) -> Result<Location> {
    let [lat, lon] = values else {
        bail!("Expected a latitude and a longitude");
    };
    Ok(Location::new(*lat, *lon))
}

fn print_view(view: IndicatorView) {
    let heading = view
        .heading
        .map(|h| format!("{h:6.1}"))
        .unwrap_or_else(|| "   ---".to_string());
    println!(
        "bearing {:6.1}  heading {heading}  rotate {:7.1}  {:?}",
        view.bearing, view.rotation, view.status
    );
}

async fn run_script(steps: Vec<ScriptStep>, bearing: Bearing) -> Result {
    let platform = Arc::new(ScriptPlatform::new(steps));
    let (tx, rx) = watch::channel(None);
    let guard = OrientationSession::start(platform.clone(), tx).await;

    let mut indicator = DirectionIndicator::new(bearing);
    indicator.observe_session(guard.state());
    if guard.state() == SessionState::Unsupported {
        print_view(indicator.view());
        return Ok(());
    }

    let follow = tokio::spawn(async move {
        indicator.follow(rx, print_view).await;
    });

    let delivered = platform.play().await;
    tokio::time::sleep(SETTLE_TIME).await;
    println!("Session ended as {:?}", guard.state());
    drop(guard);

    follow.await.context("Indicator task failed")?;
    println!("{delivered} events delivered");
    Ok(())
}

fn print_station(directions: &StationDirections) -> Result {
    let station = &directions.station;
    println!(
        "{} is {:.2} km away, bearing {:.1} ({})",
        station.name,
        station.distance_km,
        directions.bearing.degrees(),
        directions.compass_point.label()
    );
    println!("{}", directions_url(&station.name)?);
    Ok(())
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result {
    colog::init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Bearing { from, to } => {
            let from = location_arg(&from)?;
            let to = location_arg(&to)?;
            let bearing = from.bearing_to(&to);
            println!(
                "{:.2} ({}), {:.2} km",
                bearing.degrees(),
                bearing.compass_point().label(),
                from.distance_km(&to)
            );
        }
        Commands::Compass { script, bearing } => {
            let raw = tokio::fs::read_to_string(&script)
                .await
                .with_context(|| format!("Failed to read {}", script.display()))?;
            run_script(parse_script(&raw)?, Bearing::from_degrees(bearing)).await?;
        }
        Commands::Simulate {
            heading,
            spread,
            count,
            delay_ms,
            source,
            bearing,
        } => {
            let steps = jitter_script(source.into(), heading, spread, count, delay_ms);
            run_script(steps, Bearing::from_degrees(bearing)).await?;
        }
        Commands::Assess(point) => {
            let api = ApiClient::new(build_client()?);
            let dashboard = Dashboard::new(FixedLocation(point.into()), api, LogUpdates);
            match dashboard.refresh(Utc::now()).await {
                DashboardState::Ready(overview) => {
                    println!("Threat level {}: {}", overview.threat.level, overview.threat.reason);
                    match &overview.station {
                        Some(directions) => print_station(directions)?,
                        None => println!("No police station found nearby"),
                    }
                }
                DashboardState::Failed(why) => bail!("{why}"),
                other => bail!("Dashboard ended in {other:?}"),
            }
        }
        Commands::Station(point) => {
            let api = ApiClient::new(build_client()?);
            let at = Location::from(point);
            match api.nearest_station(at).await? {
                Some(station) => print_station(&StationDirections::new(at, station))?,
                None => println!("No police station found nearby"),
            }
        }
        Commands::Directions { place } => {
            println!("{}", directions_url(&place)?);
        }
    }

    Ok(())
}
