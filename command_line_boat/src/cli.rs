//! # Console commands
//!
//! Grammar of the lines typed at the console prompt, and formatting of the hub's replies.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use comms_if::{
    eqpt::sample::SamplesData,
    tc::{MotorCmd, PanDirection, SamplesCmd, ServoCmd, Tc, TiltDirection},
    tm::Tm,
};
use structopt::{clap::AppSettings, StructOpt};

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// A line typed at the prompt.
#[derive(Debug, StructOpt)]
#[structopt(name = "aquabot", setting = AppSettings::NoBinaryName)]
pub enum Command {
    /// Drive the boat
    Drive {
        #[structopt(subcommand)]
        cmd: MotorCmd,
    },

    /// Move the camera
    Servo {
        #[structopt(subcommand)]
        cmd: ServoArgs,
    },

    /// Run a sampling pump
    Pump {
        /// Pump number, starting from 1
        pump_id: i64,

        /// Run time in seconds, the boat's default if not given
        #[structopt(short, long)]
        duration: Option<f64>,
    },

    /// Query or export the sample log
    Samples {
        #[structopt(subcommand)]
        cmd: SamplesCmd,
    },

    /// Toggle printing of telemetry
    Telemetry,

    /// Leave the console
    Quit,
}

#[derive(Debug, StructOpt)]
pub enum ServoArgs {
    /// Pan left or right by a step in degrees
    Pan {
        direction: String,
        step: Option<f64>,
    },

    /// Tilt up or down by a step in degrees
    Tilt {
        direction: String,
        step: Option<f64>,
    },

    /// Pan to an absolute angle
    SetPan { angle: f64 },

    /// Tilt to an absolute angle
    SetTilt { angle: f64 },

    /// Centre the camera
    Center,

    /// Apply a named pose (center, front, left, right, up, down)
    Preset { name: String },

    /// Move smoothly to a pose
    Smooth {
        pan: f64,
        tilt: f64,

        #[structopt(long, default_value = "20")]
        steps: u32,

        /// Delay between steps in seconds
        #[structopt(long, default_value = "0.02")]
        delay: f64,
    },
}

/// What to do with a parsed line.
#[derive(Debug, PartialEq)]
pub enum Action {
    Send(Tc),
    ToggleTelemetry,
    Quit,
}

// ---------------------------------------------------------------------------
// FUNCTIONS
// ---------------------------------------------------------------------------

/// Parse a console line. The error is the message to show the operator, which includes the
/// usage text for `help`.
pub fn parse_line(line: &str) -> Result<Action, String> {
    let cmd = Command::from_iter_safe(line.split_whitespace()).map_err(|e| e.message)?;

    Ok(match cmd {
        Command::Drive { cmd } => Action::Send(Tc::Control(cmd)),
        Command::Servo { cmd } => Action::Send(Tc::Servo(servo_cmd(cmd)?)),
        Command::Pump { pump_id, duration } => Action::Send(Tc::Pump {
            pump_id,
            duration_s: duration,
        }),
        Command::Samples { cmd } => Action::Send(Tc::Samples(cmd)),
        Command::Telemetry => Action::ToggleTelemetry,
        Command::Quit => Action::Quit,
    })
}

fn servo_cmd(args: ServoArgs) -> Result<ServoCmd, String> {
    use comms_if::tc::servo::DEFAULT_STEP_DEG;

    Ok(match args {
        ServoArgs::Pan { direction, step } => ServoCmd::Pan {
            direction: match direction.as_str() {
                "left" => PanDirection::Left,
                "right" => PanDirection::Right,
                d => return Err(format!("Unknown pan direction \"{}\", use left or right", d)),
            },
            step: step.unwrap_or(DEFAULT_STEP_DEG),
        },
        ServoArgs::Tilt { direction, step } => ServoCmd::Tilt {
            direction: match direction.as_str() {
                "up" => TiltDirection::Up,
                "down" => TiltDirection::Down,
                d => return Err(format!("Unknown tilt direction \"{}\", use up or down", d)),
            },
            step: step.unwrap_or(DEFAULT_STEP_DEG),
        },
        ServoArgs::SetPan { angle } => ServoCmd::SetPan { angle },
        ServoArgs::SetTilt { angle } => ServoCmd::SetTilt { angle },
        ServoArgs::Center => ServoCmd::Center,
        ServoArgs::Preset { name } => ServoCmd::Preset { name },
        ServoArgs::Smooth { pan, tilt, steps, delay } => ServoCmd::Smooth {
            pan,
            tilt,
            steps,
            delay_s: delay,
        },
    })
}

/// Text to show for a message from the hub, or `None` if it shouldn't be shown.
pub fn describe(tm: &Tm, show_telemetry: bool) -> Option<String> {
    match tm {
        Tm::Config(c) => Some(format!(
            "Connected to boat ({} backend, {} pumps, default pump time {} s)",
            c["hardware"]["backend"].as_str().unwrap_or("unknown"),
            c["pins"]["pumps"].as_array().map(|p| p.len()).unwrap_or(0),
            c["pump_durations"]["default"]
        )),
        Tm::Telemetry(s) if show_telemetry => {
            let gps = match s.gps.and_then(|f| f.position()) {
                Some(p) => format!("{:.6}, {:.6}", p.lat, p.lon),
                None => String::from("no fix"),
            };
            let battery = match s.battery {
                Some(b) => format!("{:.2} V ({}%)", b.voltage, b.percentage),
                None => String::from("--"),
            };

            Some(format!(
                "GPS: {} | Battery: {} | Camera: pan {:.0}, tilt {:.0}",
                gps, battery, s.servos.pan_angle, s.servos.tilt_angle
            ))
        },
        Tm::Telemetry(_) | Tm::Video(_) => None,
        Tm::ServoStatus(s) => Some(format!(
            "Camera at pan {:.1}, tilt {:.1}",
            s.pan_angle, s.tilt_angle
        )),
        Tm::SamplesData(d) => Some(match d {
            SamplesData::AllSamples { samples } => {
                let mut out = format!("{} samples", samples.len());
                for s in samples {
                    out.push_str(&format!(
                        "\n  {} pump {} {:>5.1} s at {}",
                        s.sample_id, s.pump_id, s.duration, s.timestamp
                    ));
                }
                out
            },
            SamplesData::Statistics { statistics } => serde_json::to_string_pretty(statistics)
                .unwrap_or_else(|e| format!("Invalid statistics: {}", e)),
            SamplesData::GeojsonExported { message, .. }
            | SamplesData::CsvExported { message, .. } => message.clone(),
        }),
    }
}
