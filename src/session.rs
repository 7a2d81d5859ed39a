//! Receive-decode-dispatch-reply loop over the server connection.
//!
//! Every exchange starts with a command token from the server and ends with
//! one acknowledgment from the client. `speed` and `diode` take a parameter:
//! the client answers the command with a prompt, receives the parameter and
//! only then acknowledges. `file` streams the report bytes, unframed, before
//! the acknowledgment.
//!
//! ```text
//! server            client
//!   up      ──▶
//!           ◀──     OK
//!   speed   ──▶
//!           ◀──     OK        (prompt)
//!   250     ──▶
//!           ◀──     OK
//!   file    ──▶
//!           ◀──     <report bytes>OK
//! ```

use crate::command::{trim_parameter, Command, DiodeColor};
use crate::config::{Acknowledgment, ClientConfig};
use crate::drive::Drive;
use crate::error::{Error, Result};
use crate::gateway::{DeviceGateway, LedChannels, MotorMode, LEDS_OFF};
use crate::motor_profile::MAX_SPEED;
use crate::power::PowerStatus;
use crate::report;
use crate::uplink::{Received, Uplink};
use std::fs::File;
use std::io::{self, Read};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Green on the third LED once the server is reached.
pub const CONNECTED_LEDS: LedChannels = [0, 0, 0, 0, 0, 0, 0, 1, 0];
/// Red on the first LED when the server cannot be reached.
pub const CONNECT_FAILED_LEDS: LedChannels = [1, 0, 0, 0, 0, 0, 0, 0, 0];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitReason {
    ConnectionLost,
    Interrupted,
}

pub struct Session<G: DeviceGateway> {
    gateway: G,
    uplink: Uplink,
    config: ClientConfig,
    drive: Drive,
    speed: i32,
    diode: Option<DiodeColor>,
    interrupted: Arc<AtomicBool>,
    closed: bool,
}

impl<G: DeviceGateway> Session<G> {
    /// Takes ownership of a configured gateway and a connected uplink.
    pub fn start(
        mut gateway: G,
        uplink: Uplink,
        config: ClientConfig,
        interrupted: Arc<AtomicBool>,
    ) -> Result<Self> {
        gateway.set_leds(CONNECTED_LEDS)?;
        let drive = Drive::new(config.drive.clone());
        Ok(Self {
            gateway,
            uplink,
            speed: config.drive.initial_speed,
            config,
            drive,
            diode: None,
            interrupted,
            closed: false,
        })
    }

    #[cfg(test)]
    pub fn speed(&self) -> i32 {
        self.speed
    }

    #[cfg(test)]
    pub fn diode(&self) -> Option<DiodeColor> {
        self.diode
    }

    /// Serves commands until the connection fails or the process is interrupted,
    /// then releases the robot.
    pub fn run(&mut self) -> ExitReason {
        let reason = loop {
            if let Err(error) = self.serve_one() {
                if self.interrupted.load(Ordering::SeqCst) {
                    log::info!("interrupted, closing the session");
                    break ExitReason::Interrupted;
                }
                log::warn!("[Client] Connection lost: {}", error);
                break ExitReason::ConnectionLost;
            }
        };
        self.shutdown();
        reason
    }

    /// Stops the motors, clears the LEDs and closes the connection.
    ///
    /// Runs once; later calls do nothing.
    pub fn shutdown(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;
        if let Err(error) = self.gateway.set_speed(0, 0) {
            log::error!("failed to stop motors: {}", error);
        }
        if let Err(error) = self.gateway.set_mode(MotorMode::Idle) {
            log::error!("failed to idle motors: {}", error);
        }
        if let Err(error) = self.gateway.set_leds(LEDS_OFF) {
            log::error!("failed to clear LEDs: {}", error);
        }
        self.uplink.close();
        log::info!(
            "session closed (speed {}, diode {:?})",
            self.speed,
            self.diode
        );
    }

    fn serve_one(&mut self) -> io::Result<()> {
        let token = match self.uplink.receive(self.config.command_timeout())? {
            Received::Token(token) => token,
            Received::TimedOut => {
                return Err(io::Error::new(
                    io::ErrorKind::TimedOut,
                    "no command from server",
                ))
            }
        };
        let command = Command::decode(&token);
        log::debug!(
            "server sent {:?} ({:?})",
            String::from_utf8_lossy(&token),
            command
        );

        let outcome = match command {
            Command::Move(direction) => self
                .drive
                .go(&mut self.gateway, direction, self.speed)
                .map_err(Error::from),
            Command::Stop => self.drive.stop(&mut self.gateway).map_err(Error::from),
            Command::SetSpeed => self.set_speed(),
            Command::SetDiode => self.set_diode(),
            Command::RequestFile => self.send_report(),
            Command::Unknown => Ok(()),
        };
        match outcome {
            Ok(()) => {}
            Err(Error::Io(error)) => return Err(error),
            Err(error) => log::error!("{:?} failed: {}", command, error),
        }

        let acknowledgment = self.acknowledgment();
        self.uplink.send(acknowledgment.as_bytes())
    }

    fn acknowledgment(&mut self) -> String {
        match self.config.acknowledgment {
            Acknowledgment::Ok => "OK".to_string(),
            Acknowledgment::BatteryLevel => match PowerStatus::read(&mut self.gateway) {
                Ok(battery) => battery.remaining_percent.to_string(),
                Err(error) => {
                    log::warn!("battery unavailable for acknowledgment: {}", error);
                    "OK".to_string()
                }
            },
        }
    }

    /// Prompts the server and waits for the parameter of a two-phase command.
    fn receive_parameter(&mut self) -> Result<Option<Vec<u8>>> {
        let prompt = self.acknowledgment();
        self.uplink.send(prompt.as_bytes())?;
        match self.uplink.receive(self.config.parameter_timeout())? {
            Received::Token(parameter) => Ok(Some(parameter)),
            Received::TimedOut => {
                log::warn!("no parameter received in time, command cancelled");
                Ok(None)
            }
        }
    }

    fn set_speed(&mut self) -> Result<()> {
        if let Some(parameter) = self.receive_parameter()? {
            match parse_speed(&parameter, MAX_SPEED) {
                Some(speed) => {
                    self.speed = speed;
                    log::info!("speed set to {}", speed);
                }
                None => log::warn!(
                    "ignoring invalid speed {:?}",
                    String::from_utf8_lossy(&parameter)
                ),
            }
        }
        Ok(())
    }

    fn set_diode(&mut self) -> Result<()> {
        if let Some(parameter) = self.receive_parameter()? {
            match DiodeColor::from_name(trim_parameter(&parameter)) {
                Some(color) => {
                    let (red, green, blue) = color.rgb();
                    self.gateway.set_leds([red, green, blue, 0, 0, 0, 0, 0, 0])?;
                    self.diode = Some(color);
                    log::info!("diode set to {:?}", color);
                }
                None => log::warn!(
                    "ignoring unknown diode color {:?}",
                    String::from_utf8_lossy(&parameter)
                ),
            }
        }
        Ok(())
    }

    /// Rebuilds the report and streams it to the server.
    ///
    /// File problems abandon only this request; a failed send ends the session.
    fn send_report(&mut self) -> Result<()> {
        let path = self.config.report_path.clone();
        if let Err(error) = report::build(&mut self.gateway, &path) {
            log::error!("could not write {}: {}", path.display(), error);
            return Ok(());
        }
        let mut file = match File::open(&path) {
            Ok(file) => file,
            Err(error) => {
                log::error!("ERROR: File {} not found: {}", path.display(), error);
                return Ok(());
            }
        };

        log::info!("[Client] Sending {} to the Server...", path.display());
        let mut chunk = vec![0u8; self.config.file_chunk_size];
        let mut sent = 0;
        loop {
            let count = match file.read(&mut chunk) {
                Ok(0) => break,
                Ok(count) => count,
                Err(error) if error.kind() == io::ErrorKind::Interrupted => continue,
                Err(error) => {
                    log::error!("reading {} failed: {}", path.display(), error);
                    break;
                }
            };
            self.uplink.send(&chunk[..count])?;
            sent += count;
        }
        log::info!("Ok File {} from Client was Sent! ({} bytes)", path.display(), sent);
        Ok(())
    }
}

impl<G: DeviceGateway> Drop for Session<G> {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// Reads a decimal speed magnitude in `0..=max`.
///
/// Signs are rejected: direction comes from the command alone.
fn parse_speed(parameter: &[u8], max: i32) -> Option<i32> {
    let text = std::str::from_utf8(trim_parameter(parameter)).ok()?;
    if !text.bytes().all(|byte| byte.is_ascii_digit()) {
        return None;
    }
    let speed: u16 = text.parse().ok()?;
    Some(i32::from(speed)).filter(|&speed| speed <= max)
}
