//! # Hub
//!
//! Accepts observer connections over websockets, runs the broadcast loops and routes inbound
//! telecommands through the [`Dispatcher`].
//!
//! Each connection gets a reader, which executes its commands one at a time in arrival order, and
//! a writer, which drains the connection's outbound queue. Replies go only to the sender.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use std::{
    net::SocketAddr,
    sync::{Arc, Mutex, PoisonError},
    time::Duration,
};

use comms_if::tm::{TelemetrySnapshot, Tm};
use futures_util::{SinkExt, StreamExt};
use log::{debug, info, trace, warn};
use tokio::{
    net::{TcpListener, TcpStream},
    sync::watch,
};
use tokio_tungstenite::tungstenite::Message;
use tokio_util::{sync::CancellationToken, task::TaskTracker};

use crate::{
    broadcast,
    components::Components,
    dispatcher::Dispatcher,
    params::BoatExecParams,
    registry::{Frame, Registry},
};

// ------------------------------------------------------------------------------------------------
// CONSTANTS
// ------------------------------------------------------------------------------------------------

/// Time allowed for a peer to complete the websocket handshake.
const HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(5);

/// Time allowed for a writer to flush its queue once its connection has closed.
const WRITER_CLOSE_TIMEOUT: Duration = Duration::from_secs(1);

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

pub struct Hub {
    params: BoatExecParams,
    components: Arc<Components>,
    registry: Arc<Registry>,
    dispatcher: Arc<Dispatcher>,

    /// `config` message sent to every new connection
    greeting: Frame,

    /// Writer side of the telemetry cache, taken by the first call to [`Hub::serve`]
    cache: Mutex<Option<watch::Sender<Option<TelemetrySnapshot>>>>,
    telemetry: watch::Receiver<Option<TelemetrySnapshot>>,

    cancel: CancellationToken,
    tracker: TaskTracker,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum HubError {
    #[error("The hub is already serving")]
    AlreadyServing,

    #[error("Could not serialise the configuration: {0}")]
    Config(serde_json::Error),

    #[error("Listener error: {0}")]
    Io(#[from] std::io::Error),
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl Hub {
    pub fn new(components: Components, params: BoatExecParams) -> Result<Self, HubError> {
        let config = serde_json::to_value(&params).map_err(HubError::Config)?;
        let greeting = Tm::Config(config).to_json().map_err(HubError::Config)?;

        let components = Arc::new(components);
        let (cache_tx, cache_rx) = watch::channel(None);

        let dispatcher = Dispatcher::new(
            components.clone(),
            cache_rx.clone(),
            params.pump_durations.default
        );

        Ok(Self {
            params,
            components,
            registry: Arc::new(Registry::new()),
            dispatcher: Arc::new(dispatcher),
            greeting: Arc::from(greeting),
            cache: Mutex::new(Some(cache_tx)),
            telemetry: cache_rx,
            cancel: CancellationToken::new(),
            tracker: TaskTracker::new(),
        })
    }

    /// Start the broadcast loops and accept connections on `listener` until shutdown.
    ///
    /// A hub can only serve once, later calls return [`HubError::AlreadyServing`].
    pub async fn serve(&self, listener: TcpListener) -> Result<(), HubError> {
        let cache = self.cache.lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
            .ok_or(HubError::AlreadyServing)?;

        let bc = &self.params.broadcast;

        self.tracker.spawn(broadcast::telemetry_loop(
            self.components.clone(),
            self.registry.clone(),
            cache,
            Duration::from_secs_f64(bc.telemetry_period_s),
            self.cancel.clone()
        ));
        self.tracker.spawn(broadcast::video_loop(
            self.components.clone(),
            self.registry.clone(),
            Duration::from_secs_f64(bc.video_period_s),
            bc.jpeg_quality,
            self.cancel.clone()
        ));

        info!("Hub listening on ws://{}", listener.local_addr()?);

        loop {
            let accepted = tokio::select! {
                _ = self.cancel.cancelled() => break,
                a = listener.accept() => a,
            };

            match accepted {
                Ok((stream, addr)) => {
                    self.tracker.spawn(connection(
                        stream,
                        addr,
                        self.registry.clone(),
                        self.dispatcher.clone(),
                        self.greeting.clone(),
                        self.cancel.clone(),
                        self.tracker.clone()
                    ));
                },
                Err(e) => warn!("Could not accept connection: {}", e),
            }
        }

        info!("Hub stopped accepting connections");

        Ok(())
    }

    /// Stop serving, wait for every task to finish, then put the devices in a safe state.
    pub async fn shutdown(&self) {
        info!("Hub shutting down...");

        self.cancel.cancel();
        self.tracker.close();
        self.tracker.wait().await;

        self.components.cleanup().await;

        info!("Hub shut down");
    }

    /// Number of connected observers.
    pub fn connection_count(&self) -> usize {
        self.registry.len()
    }

    /// Receiver for the latest telemetry snapshot.
    pub fn telemetry(&self) -> watch::Receiver<Option<TelemetrySnapshot>> {
        self.telemetry.clone()
    }

    pub fn components(&self) -> &Components {
        &self.components
    }
}

// ------------------------------------------------------------------------------------------------
// FUNCTIONS
// ------------------------------------------------------------------------------------------------

/// Serve a single observer until it disconnects or the hub shuts down.
async fn connection(
    stream: TcpStream,
    addr: SocketAddr,
    registry: Arc<Registry>,
    dispatcher: Arc<Dispatcher>,
    greeting: Frame,
    cancel: CancellationToken,
    tracker: TaskTracker
) {
    let handshake = tokio::time::timeout(
        HANDSHAKE_TIMEOUT,
        tokio_tungstenite::accept_async(stream)
    );

    let ws = tokio::select! {
        _ = cancel.cancelled() => {
            debug!("Handshake with {} abandoned on shutdown", addr);
            return;
        },
        r = handshake => r,
    };

    let ws = match ws {
        Ok(Ok(ws)) => ws,
        Ok(Err(e)) => {
            warn!("Websocket handshake with {} failed: {}", addr, e);
            return;
        },
        Err(_) => {
            warn!("Websocket handshake with {} timed out", addr);
            return;
        }
    };

    let (mut sink, mut source) = ws.split();
    let (id, mut outbound) = registry.register(greeting);

    info!("Observer {} connected from {}", id, addr);

    // Ends once the connection is unregistered and the queue is drained
    let writer = tracker.spawn(async move {
        while let Some(frame) = outbound.recv().await {
            if let Err(e) = sink.send(Message::Text(frame.to_string())).await {
                debug!("Could not send to {}: {}", id, e);
                return;
            }
        }
        sink.close().await.ok();
    });

    loop {
        let msg = tokio::select! {
            _ = cancel.cancelled() => break,
            m = source.next() => m,
        };

        match msg {
            Some(Ok(Message::Text(text))) => {
                let reply = match dispatcher.handle(&text).await {
                    Some(r) => r,
                    None => continue,
                };

                match reply.to_json() {
                    Ok(json) => {
                        registry.send_to(id, Arc::from(json));
                    },
                    Err(e) => warn!("Could not serialise reply to {}: {}", id, e),
                }
            },
            Some(Ok(Message::Close(_))) | None => break,
            Some(Ok(_)) => trace!("Ignoring non-text frame from {}", id),
            Some(Err(e)) => {
                warn!("Connection {} error: {}", id, e);
                break;
            }
        }
    }

    registry.unregister(id);

    let abort = writer.abort_handle();
    if tokio::time::timeout(WRITER_CLOSE_TIMEOUT, writer).await.is_err() {
        debug!("Writer for {} did not finish in time, aborting", id);
        abort.abort();
    }

    info!("Observer {} disconnected", id);
}
