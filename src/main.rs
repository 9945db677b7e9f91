use std::collections::BTreeMap;
use std::io::Write;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use camino::Utf8Path;
use tokio::signal;
use tokio::signal::unix::SignalKind;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;

use helialux_bridge::config::{self, AppConfig};
use helialux_bridge::coordinator::Coordinator;
use helialux_bridge::device::{DeviceClient, HelialuxClient};
use helialux_bridge::entities::light::TankLight;
use helialux_bridge::error::ApiResult;
use helialux_bridge::server;
use helialux_bridge::server::appstate::{AppState, Tank};

/// Poll cadence applied once the first refresh has completed. The configured
/// per-tank interval (minutes) only covers the startup window.
const FAST_POLL_INTERVAL: Duration = Duration::from_secs(15);

/*
 * Formatter function to output in syslog format. This makes sense when running
 * as a service (where output might go to a log file, or the system journal)
 */
#[allow(clippy::match_same_arms)]
fn syslog_format(
    buf: &mut pretty_env_logger::env_logger::fmt::Formatter,
    record: &log::Record,
) -> std::io::Result<()> {
    writeln!(
        buf,
        "<{}>{}: {}",
        match record.level() {
            log::Level::Error => 3,
            log::Level::Warn => 4,
            log::Level::Info => 6,
            log::Level::Debug => 7,
            log::Level::Trace => 7,
        },
        record.target(),
        record.args()
    )
}

fn init_logging() -> ApiResult<()> {
    /* Try to provide reasonable default filters, when RUST_LOG is not specified */
    const DEFAULT_LOG_FILTERS: &[&str] = &[
        "debug",
        "hyper=info",
        "reqwest=info",
        "h2=info",
        "axum::rejection=trace",
    ];

    let log_filters = std::env::var("RUST_LOG").unwrap_or_else(|_| DEFAULT_LOG_FILTERS.join(","));

    /* Detect if we need syslog or human-readable formatting */
    if std::env::var("SYSTEMD_EXEC_PID").is_ok_and(|pid| pid == std::process::id().to_string()) {
        Ok(pretty_env_logger::env_logger::builder()
            .format(syslog_format)
            .parse_filters(&log_filters)
            .try_init()?)
    } else {
        Ok(pretty_env_logger::formatted_timed_builder()
            .parse_filters(&log_filters)
            .try_init()?)
    }
}

async fn build_tanks(
    config: &AppConfig,
    cancel: &CancellationToken,
) -> ApiResult<BTreeMap<String, Tank>> {
    let mut tanks = BTreeMap::new();

    for (key, tank_config) in &config.tanks {
        let name = tank_config.display_name(key);
        let client: Arc<Mutex<dyn DeviceClient>> =
            Arc::new(Mutex::new(HelialuxClient::new(&name, tank_config)?));

        let coordinator = Arc::new(Coordinator::new(
            &name,
            client,
            Duration::from_secs(tank_config.update_interval * 60),
        ));

        // Dependent entities must not come up before the first refresh
        // attempt has completed, success or failure.
        coordinator.refresh().await;
        log::info!(
            "[{name}] First refresh complete: {:?}",
            coordinator.state().status
        );

        coordinator.set_update_interval(FAST_POLL_INTERVAL);

        let task = coordinator.clone();
        let token = cancel.child_token();
        tokio::spawn(async move { task.run(token).await });

        let light = TankLight::new(&name, coordinator.clone());
        tanks.insert(
            key.clone(),
            Tank {
                name,
                coordinator,
                light,
            },
        );
    }

    Ok(tanks)
}

fn install_signal_handlers(cancel: &CancellationToken) -> ApiResult<()> {
    fn shutdown(msg: &str, cancel: &CancellationToken) {
        log::warn!("{msg}");
        let _ = std::io::stderr().flush();
        cancel.cancel();
    }

    let token = cancel.clone();
    tokio::spawn(async move {
        if matches!(signal::ctrl_c().await, Ok(())) {
            shutdown("Ctrl-C pressed, exiting..", &token);
        }
    });

    let token = cancel.clone();
    let mut signal = signal::unix::signal(SignalKind::terminate())?;
    tokio::spawn(async move {
        if matches!(signal.recv().await, Some(())) {
            shutdown("SIGTERM received, exiting..", &token);
        }
    });

    Ok(())
}

async fn run() -> ApiResult<()> {
    init_logging()?;

    let config = config::parse(Utf8Path::new("config.yaml"))?;
    log::debug!("Configuration loaded successfully");

    if !config.has_tanks() {
        log::warn!("{}", "-".repeat(80));
        log::warn!("No tanks configured in config!");
        log::warn!("The bridge will run, but has no controllers to poll.");
        log::warn!("");
        log::warn!(" ** Please configure at least one tank to use the bridge **");
        log::warn!("{}", "-".repeat(80));
    }

    let cancel = CancellationToken::new();
    install_signal_handlers(&cancel)?;

    let tanks = build_tanks(&config, &cancel).await?;

    let addr = SocketAddr::from((config.server.ipaddress, config.server.port));
    let appstate = AppState::new(config, tanks);

    log::info!("Opening listen port on {addr}");
    let listener = tokio::net::TcpListener::bind(addr).await?;

    axum::serve(listener, server::build_service(appstate))
        .with_graceful_shutdown(cancel.clone().cancelled_owned())
        .await?;

    Ok(())
}

#[tokio::main]
async fn main() {
    if let Err(err) = run().await {
        log::error!("Bridge error: {err}");
        log::error!("Fatal error encountered, cannot continue.");
    }
}
