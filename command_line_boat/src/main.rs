//! # Aquabot command line
//!
//! Interactive operator console. Connects to the boat's hub, sends telecommands typed at the
//! prompt and prints the replies.

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

mod cli;

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use color_eyre::{eyre::WrapErr, Report};
use log::{debug, info, warn};
use rustyline::{error::ReadlineError, DefaultEditor};
use std::{
    fs,
    io::ErrorKind,
    net::TcpStream,
    path::Path,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc, Mutex, MutexGuard, PoisonError,
    },
    thread,
    time::Duration,
};
use structopt::StructOpt;
use tungstenite::{stream::MaybeTlsStream, Message, WebSocket};

// Internal
use cli::{parse_line, Action};
use comms_if::{net::NetParams, tm::Tm};
use util::logger::{console_logger_init, LevelFilter};

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

const PROMPT: &str = "Aquabot $ ";
const HISTORY_PATH: &str = "data/history.txt";

/// How long the receiver waits for a message before letting the sender in.
const POLL_PERIOD: Duration = Duration::from_millis(50);

// ---------------------------------------------------------------------------
// STRUCTS
// ---------------------------------------------------------------------------

#[derive(Debug, StructOpt)]
#[structopt(name = "command_line_boat", about = "Operator console for the Aquabot hub")]
struct Opt {
    /// Address of the boat
    #[structopt(long, default_value = "127.0.0.1")]
    host: String,

    /// Port of the boat's websocket hub
    #[structopt(long, default_value = "8765")]
    port: u16,
}

type Socket = WebSocket<MaybeTlsStream<TcpStream>>;

// ---------------------------------------------------------------------------
// FUNCTIONS
// ---------------------------------------------------------------------------

fn main() -> Result<(), Report> {
    color_eyre::install()?;
    console_logger_init(LevelFilter::Info).wrap_err("Failed to initialise logging")?;

    let opt = Opt::from_args();
    let url = NetParams { host: opt.host.clone(), port: opt.port }.endpoint(&opt.host);

    let (mut socket, _) = tungstenite::connect(url.as_str())
        .wrap_err_with(|| format!("Could not connect to {}", url))?;

    if let MaybeTlsStream::Plain(s) = socket.get_mut() {
        s.set_read_timeout(Some(POLL_PERIOD))
            .wrap_err("Could not set the socket read timeout")?;
    }

    info!("Connected to {}, type \"help\" for commands", url);

    let socket = Arc::new(Mutex::new(socket));
    let running = Arc::new(AtomicBool::new(true));
    let show_telemetry = Arc::new(AtomicBool::new(false));

    let receiver = {
        let socket = socket.clone();
        let running = running.clone();
        let show_telemetry = show_telemetry.clone();
        thread::spawn(move || receive(&socket, &running, &show_telemetry))
    };

    let mut rl = DefaultEditor::new().wrap_err("Could not start the line editor")?;
    if rl.load_history(HISTORY_PATH).is_err() {
        println!("No history detected");
    }

    while running.load(Ordering::Relaxed) {
        let line = match rl.readline(PROMPT) {
            Ok(l) => l,
            Err(ReadlineError::Interrupted) | Err(ReadlineError::Eof) => break,
            Err(e) => {
                println!("Unhandled Error: {:?}", e);
                break
            }
        };

        if line.trim().is_empty() {
            continue;
        }
        rl.add_history_entry(line.as_str()).ok();

        match parse_line(&line) {
            Ok(Action::Send(tc)) => {
                debug!("Sending {}", tc.to_json());
                if let Err(e) = lock(&socket).send(Message::Text(tc.to_json())) {
                    warn!("Could not send command: {}", e);
                }
            },
            Ok(Action::ToggleTelemetry) => {
                let show = !show_telemetry.fetch_xor(true, Ordering::Relaxed);
                println!("Telemetry display {}", if show { "on" } else { "off" });
            },
            Ok(Action::Quit) => break,
            Err(msg) => println!("{}", msg),
        }
    }

    println!("Exiting...");

    running.store(false, Ordering::Relaxed);
    if receiver.join().is_err() {
        warn!("Receiver thread panicked");
    }
    lock(&socket).close(None).ok();

    if let Some(dir) = Path::new(HISTORY_PATH).parent() {
        fs::create_dir_all(dir).ok();
    }
    if let Err(e) = rl.save_history(HISTORY_PATH) {
        warn!("Could not save history: {}", e);
    }

    Ok(())
}

/// Print messages from the hub until the connection closes or `running` is cleared.
fn receive(socket: &Mutex<Socket>, running: &AtomicBool, show_telemetry: &AtomicBool) {
    while running.load(Ordering::Relaxed) {
        let msg = lock(socket).read();

        match msg {
            Ok(Message::Text(text)) => match Tm::from_json(&text) {
                Ok(tm) => {
                    if let Some(s) = cli::describe(&tm, show_telemetry.load(Ordering::Relaxed)) {
                        println!("{}", s);
                    }
                },
                Err(e) => warn!("Invalid message from the boat: {}", e),
            },
            Ok(_) => (),
            Err(tungstenite::Error::Io(e))
                if matches!(e.kind(), ErrorKind::WouldBlock | ErrorKind::TimedOut) =>
            {
                // Give the prompt a chance to send
                thread::sleep(Duration::from_millis(1));
            },
            Err(tungstenite::Error::ConnectionClosed) | Err(tungstenite::Error::AlreadyClosed) => {
                println!("Connection closed by the boat, press enter to exit");
                break;
            },
            Err(e) => {
                println!("Connection error: {}, press enter to exit", e);
                break;
            }
        }
    }

    running.store(false, Ordering::Relaxed);
}

fn lock(socket: &Mutex<Socket>) -> MutexGuard<'_, Socket> {
    socket.lock().unwrap_or_else(PoisonError::into_inner)
}
