//! Main boat-side executable entry point.
//!
//! # Architecture
//!
//! The executable runs a single websocket hub:
//!
//!     - Initialise the session, logger and parameters
//!     - Create the components (motors, servos, pumps, sensors, camera, sample log)
//!     - Serve observers until ctrl-c or SIGTERM:
//!         - Telemetry loop: sample sensors and broadcast a snapshot
//!         - Video loop: capture and broadcast a camera frame
//!         - Per connection: execute telecommands in arrival order
//!     - Shut down, leaving every device in a safe state

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use color_eyre::{eyre::WrapErr, Report};
use log::{info, warn};
use tokio::net::TcpListener;
use std::sync::Arc;

// Internal
use boat_lib::{components::Components, hub::Hub, params::BoatExecParams};
use util::{
    host,
    logger::{logger_init, LevelFilter},
    session::Session,
};

// ---------------------------------------------------------------------------
// FUNCTIONS
// ---------------------------------------------------------------------------

/// Executable main function, entry point.
#[tokio::main]
async fn main() -> Result<(), Report> {
    color_eyre::install()?;

    // ---- EARLY INITIALISATION ----

    // Initialise session
    let session = Session::new(
        "boat_exec",
        "sessions"
    ).wrap_err("Failed to create the session")?;

    // Initialise logger
    logger_init(LevelFilter::Debug, &session)
        .wrap_err("Failed to initialise logging")?;

    // Log information on this execution.
    info!("Aquabot Boat Executable\n");
    info!(
        "Running on: {:#?}",
        host::get_uname().wrap_err("Failed to get host information")?
    );
    info!("Session directory: {:?}\n", session.session_root);

    // ---- LOAD PARAMETERS ----

    let params: BoatExecParams = util::params::load(
        "boat_exec.toml"
    ).wrap_err("Could not load exec params")?;

    info!("Exec parameters loaded ({:?} backend)", params.hardware.backend);

    // ---- INITIALISE COMPONENTS ----

    info!("Initialising components...");

    let components = Components::from_params(&params)
        .wrap_err("Failed to initialise the components")?;

    info!("Component initialisation complete\n");

    // ---- INITIALISE NETWORK ----

    let bind_addr = params.websocket.bind_addr();
    let listener = TcpListener::bind(&bind_addr)
        .await
        .wrap_err_with(|| format!("Could not bind to {}", bind_addr))?;

    let hub = Arc::new(Hub::new(components, params).wrap_err("Failed to create the hub")?);

    let server = tokio::spawn({
        let hub = hub.clone();
        async move { hub.serve(listener).await }
    });

    // ---- MAIN LOOP ----

    info!("Hub running, press ctrl-c to stop\n");

    shutdown_signal().await;

    // ---- SHUTDOWN ----

    info!("Shutdown requested");

    hub.shutdown().await;

    server.await
        .wrap_err("Hub task panicked")?
        .wrap_err("Hub failed")?;

    info!("End of execution");

    Ok(())
}

/// Resolves on ctrl-c, or on SIGTERM on unix.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("Could not listen for ctrl-c: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};

        match signal(SignalKind::terminate()) {
            Ok(mut s) => {
                s.recv().await;
            },
            Err(e) => {
                warn!("Could not listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => (),
        _ = terminate => (),
    }
}
