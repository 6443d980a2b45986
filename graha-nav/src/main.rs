//! GrahaNav - planet explorer
//!
//! Runs the exploration controller against the simulated robot and
//! mothership on an in-process bus.
//!
//! ```text
//! graha-nav [config.toml] [--planet <planet.toml>] [--duplicate]
//! ```
//!
//! Without a config argument `graha.toml` is used when present, otherwise
//! the defaults. Without `--planet` the bundled demo planet is explored.
//! `--duplicate` makes the bus deliver every message twice.

use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use graha_nav::config::NavConfig;
use graha_nav::error::Result;
use graha_nav::explorer::{Explorer, Outcome};
use graha_nav::protocol::Session;
use graha_nav::sim::{Mothership, PlanetMap, SimRobot};
use graha_nav::transport::LoopbackBus;
use signal_hook::consts::{SIGINT, SIGTERM};
use signal_hook::iterator::Signals;
use tracing_subscriber::EnvFilter;

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("graha_nav=info")),
        )
        .init();

    let args: Vec<String> = std::env::args().collect();

    let config = if args.len() > 1 && !args[1].starts_with("--") {
        let config_path = Path::new(&args[1]);
        tracing::info!("Loading configuration from {:?}", config_path);
        NavConfig::load(config_path)?
    } else if Path::new("graha.toml").exists() {
        tracing::info!("Loading configuration from graha.toml");
        NavConfig::load(Path::new("graha.toml"))?
    } else {
        tracing::info!("Using default configuration");
        NavConfig::default()
    };

    let planet = match args
        .iter()
        .position(|a| a == "--planet")
        .and_then(|i| args.get(i + 1))
    {
        Some(path) => {
            tracing::info!("Loading planet from {}", path);
            PlanetMap::load(Path::new(path))?
        }
        None => PlanetMap::demo()?,
    };
    let planet = Arc::new(planet);
    let duplicate = args.iter().any(|a| a == "--duplicate");

    tracing::info!("GrahaNav v{}", env!("CARGO_PKG_VERSION"));
    tracing::info!(
        "Group {}, planet {}, start {}",
        config.connection.group,
        planet.name(),
        planet.start()
    );
    if duplicate {
        tracing::info!("Bus delivers every message twice");
    }

    let shutdown = Arc::new(AtomicBool::new(false));
    setup_signal_handler(Arc::clone(&shutdown))?;

    let bus = LoopbackBus::with_duplicates(duplicate);
    let mothership = Mothership::launch(&bus, Arc::clone(&planet), &config.connection.group)?;
    let client = bus.client("explorer")?;
    let session = Session::connect(client, &config.session, &config.connection.group)?;
    let robot = SimRobot::new(Arc::clone(&planet), config.robot.clone());

    let mut explorer = Explorer::new(robot, session, config.robot.clone(), config.drive.clone())
        .with_test_planet(config.connection.test_planet.clone())
        .with_shutdown(shutdown);

    let outcome = explorer.run()?;
    match outcome {
        Outcome::Completed => tracing::info!("Planet fully explored"),
        Outcome::TargetReached(node) => tracing::info!("Target {} reached", node),
        Outcome::Interrupted => tracing::warn!("Exploration interrupted"),
    }

    let graph = explorer.graph();
    tracing::info!(
        "Nodes={} PathsDriven={} Confirmed={} Rejected={} WatchdogAlerts={}",
        graph.node_count(),
        explorer.paths_driven(),
        mothership.confirmed_paths(),
        explorer.session().rejected_count(),
        explorer.session().alerts()
    );
    if mothership.errors() > 0 {
        tracing::warn!("Mothership rejected {} messages", mothership.errors());
    }

    tracing::info!("GrahaNav finished");
    Ok(())
}

/// Set `shutdown` on SIGINT or SIGTERM.
fn setup_signal_handler(shutdown: Arc<AtomicBool>) -> Result<()> {
    let mut signals = Signals::new([SIGINT, SIGTERM])?;
    std::thread::Builder::new()
        .name("signal-handler".to_string())
        .spawn(move || {
            if let Some(sig) = signals.forever().next() {
                tracing::info!("Received signal {:?}, initiating shutdown...", sig);
                shutdown.store(true, Ordering::Relaxed);
            }
        })?;
    Ok(())
}
