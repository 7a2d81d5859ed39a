#![warn(rust_2018_idioms)]

mod command;
mod config;
mod drive;
mod error;
mod gateway;
mod motor_profile;
mod power;
mod report;
mod session;
mod signal;
mod uplink;

use crate::config::{ClientConfig, CONFIG_FILE};
use crate::error::{Error, Result};
use crate::gateway::simulated::SimulatedBus;
use crate::gateway::{format_revision, DeviceGateway, DSPIC_DEVICE};
use crate::power::PowerStatus;
use crate::session::{ExitReason, Session, CONNECT_FAILED_LEDS};
use crate::uplink::Uplink;

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let code = match run() {
        Ok(ExitReason::ConnectionLost) | Ok(ExitReason::Interrupted) => 0,
        Err(error) => {
            log::error!("{}", error);
            error.exit_code()
        }
    };
    std::process::exit(code);
}

fn run() -> Result<ExitReason> {
    let config = ClientConfig::load(CONFIG_FILE)?;

    let args: Vec<String> = std::env::args().collect();
    let bus = SimulatedBus::init(&args).map_err(Error::GatewayInit)?;
    let mut gateway = bus.open(DSPIC_DEVICE).map_err(Error::DeviceOpen)?;

    motor_profile::configure_motors(&mut gateway)?;
    match gateway.revision() {
        Ok(byte) => {
            let (version, revision) = format_revision(byte);
            log::info!("Khepera4 version {} revision {}", version, revision);
        }
        Err(error) => log::warn!("could not read the firmware revision: {}", error),
    }
    match PowerStatus::read(&mut gateway) {
        Ok(battery) => log::info!("battery {}", battery),
        Err(error) => log::warn!("battery unavailable: {}", error),
    }

    let uplink = match Uplink::connect(uplink::server_address()) {
        Ok(uplink) => uplink,
        Err(error) => {
            if let Err(led_error) = gateway.set_leds(CONNECT_FAILED_LEDS) {
                log::warn!("could not signal the failure on the LEDs: {}", led_error);
            }
            return Err(error);
        }
    };

    let interrupted = signal::watch_termination(uplink.shutdown_handle()?)?;
    let mut session = Session::start(gateway, uplink, config, interrupted)?;
    let reason = session.run();
    log::info!("[Client] Connection closed ({:?})", reason);
    Ok(reason)
}
