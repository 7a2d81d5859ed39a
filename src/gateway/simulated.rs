//! Simulated motor controller used when no robot library is linked in.
//!
//! Keeps the actuator state the real controller would hold, journals the most
//! recent actuator calls and answers sensor reads with fixed, plausible
//! telemetry.
//! Clones share the same state, so a test can keep a handle while the
//! session owns another.

use super::{DeviceGateway, LedChannels, MotorMode, DSPIC_DEVICE, LEDS_OFF};
use crate::error::GatewayError;
use crate::motor_profile::{PidGains, SpeedProfile};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Instant;

const KNOWN_OPTIONS: [&str; 2] = ["--kh4-verbose", "--kh4-quiet"];

const PROXIMITY: [u16; 12] = [12, 34, 56, 210, 44, 31, 9, 15, 880, 902, 897, 875];
const AMBIENT: [u16; 12] = [
    3890, 3901, 3875, 3860, 3912, 3899, 3870, 3888, 3990, 3985, 3979, 3992,
];
// left 90, left 45, front, right 45, right 90 in cm; 1000 means nothing in range
const ULTRASONIC: [i16; 5] = [1000, 87, 45, 1000, 25];

const FIRMWARE_REVISION: u8 = 0x23;

/// Actuator calls kept in the journal; older ones are dropped.
pub const JOURNAL_LEN: usize = 64;

/// Actuator calls observed by the simulated controller.
#[allow(dead_code)]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GatewayCall {
    PositionMargin(u32),
    Pid(PidGains),
    SpeedProfile(SpeedProfile),
    Mode(MotorMode),
    Speed(i32, i32),
    Leds(LedChannels),
}

#[derive(Clone)]
pub struct SimulatedGateway {
    inner: Arc<Mutex<SimulatedState>>,
}

struct SimulatedState {
    mode: MotorMode,
    speed: (i32, i32),
    position: (f64, f64),
    last_update: Instant,
    leds: LedChannels,
    battery_percent: u8,
    charging: bool,
    calls: VecDeque<GatewayCall>,
}

impl SimulatedState {
    fn journal(&mut self, call: GatewayCall) {
        if self.calls.len() == JOURNAL_LEN {
            self.calls.pop_front();
        }
        self.calls.push_back(call);
    }

    /// Integrates wheel travel since the last speed change.
    fn advance(&mut self) {
        let now = Instant::now();
        let elapsed = now.duration_since(self.last_update).as_secs_f64();
        self.last_update = now;
        if self.mode == MotorMode::Speed {
            // controller speed units are pulses per 10 ms window
            self.position.0 += self.speed.0 as f64 * elapsed * 100.0;
            self.position.1 += self.speed.1 as f64 * elapsed * 100.0;
        }
    }
}

/// Result of library initialisation; devices are opened from it by name.
pub struct SimulatedBus {
    verbose: bool,
}

impl SimulatedBus {
    pub fn init(args: &[String]) -> Result<Self, GatewayError> {
        let mut verbose = false;
        for arg in args.iter().skip(1).filter(|arg| arg.starts_with("--kh4-")) {
            if !KNOWN_OPTIONS.contains(&arg.as_str()) {
                return Err(format!("unknown option `{}`", arg).into());
            }
            verbose = arg == "--kh4-verbose";
        }
        Ok(Self { verbose })
    }

    pub fn open(&self, device: &str) -> Result<SimulatedGateway, GatewayError> {
        if device != DSPIC_DEVICE {
            return Err(format!("no such device `{}`", device).into());
        }
        if self.verbose {
            log::debug!("opened simulated {}", device);
        }
        Ok(SimulatedGateway::new())
    }
}

impl SimulatedGateway {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(SimulatedState {
                mode: MotorMode::Idle,
                speed: (0, 0),
                position: (0.0, 0.0),
                last_update: Instant::now(),
                leds: LEDS_OFF,
                battery_percent: 87,
                charging: false,
                calls: VecDeque::with_capacity(JOURNAL_LEN),
            })),
        }
    }

    fn state(&self) -> MutexGuard<'_, SimulatedState> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn record(&self, call: GatewayCall) {
        self.state().journal(call);
    }
}

// inspection hooks, only driven by tests
#[allow(dead_code)]
impl SimulatedGateway {
    pub fn mode(&self) -> MotorMode {
        self.state().mode
    }

    pub fn wheel_speeds(&self) -> (i32, i32) {
        self.state().speed
    }

    pub fn leds(&self) -> LedChannels {
        self.state().leds
    }

    pub fn set_battery_percent(&self, percent: u8) {
        self.state().battery_percent = percent;
    }

    pub fn set_charging(&self, charging: bool) {
        self.state().charging = charging;
    }

    /// The last [`JOURNAL_LEN`] actuator calls, oldest first.
    pub fn calls(&self) -> Vec<GatewayCall> {
        self.state().calls.iter().cloned().collect()
    }

    pub fn clear_calls(&self) {
        self.state().calls.clear();
    }
}

impl Default for SimulatedGateway {
    fn default() -> Self {
        Self::new()
    }
}

fn fill_words<I: IntoIterator<Item = [u8; 2]>>(
    buffer: &mut [u8],
    words: I,
) -> Result<(), GatewayError> {
    let mut written = 0;
    for word in words {
        let slot = buffer
            .get_mut(written..written + 2)
            .ok_or("telemetry buffer too small")?;
        slot.copy_from_slice(&word);
        written += 2;
    }
    Ok(())
}

impl DeviceGateway for SimulatedGateway {
    fn set_position_margin(&mut self, margin: u32) -> Result<(), GatewayError> {
        self.record(GatewayCall::PositionMargin(margin));
        Ok(())
    }

    fn configure_pid(&mut self, gains: PidGains) -> Result<(), GatewayError> {
        self.record(GatewayCall::Pid(gains));
        Ok(())
    }

    fn set_speed_profile(&mut self, profile: SpeedProfile) -> Result<(), GatewayError> {
        self.record(GatewayCall::SpeedProfile(profile));
        Ok(())
    }

    fn set_mode(&mut self, mode: MotorMode) -> Result<(), GatewayError> {
        let mut state = self.state();
        state.advance();
        state.mode = mode;
        state.journal(GatewayCall::Mode(mode));
        Ok(())
    }

    fn set_speed(&mut self, left: i32, right: i32) -> Result<(), GatewayError> {
        let mut state = self.state();
        state.advance();
        state.speed = (left, right);
        state.journal(GatewayCall::Speed(left, right));
        Ok(())
    }

    fn set_leds(&mut self, channels: LedChannels) -> Result<(), GatewayError> {
        if let Some(channel) = channels.iter().find(|&&channel| channel > 63) {
            return Err(format!("LED intensity {} is above 63", channel).into());
        }
        let mut state = self.state();
        state.leds = channels;
        state.journal(GatewayCall::Leds(channels));
        Ok(())
    }

    fn revision(&mut self) -> Result<u8, GatewayError> {
        Ok(FIRMWARE_REVISION)
    }

    fn proximity_ir(&mut self, buffer: &mut [u8]) -> Result<(), GatewayError> {
        fill_words(buffer, PROXIMITY.iter().map(|value| value.to_le_bytes()))
    }

    fn ambient_ir(&mut self, buffer: &mut [u8]) -> Result<(), GatewayError> {
        fill_words(buffer, AMBIENT.iter().map(|value| value.to_le_bytes()))
    }

    fn measure_us(&mut self, buffer: &mut [u8]) -> Result<(), GatewayError> {
        fill_words(buffer, ULTRASONIC.iter().map(|value| value.to_le_bytes()))
    }

    fn battery_status(&mut self, buffer: &mut [u8]) -> Result<(), GatewayError> {
        let (percent, charging) = {
            let state = self.state();
            (state.battery_percent, state.charging)
        };
        let current: i16 = if charging { 6400 } else { -3072 };
        let average_current: i16 = if charging { 6144 } else { -2944 };
        let status: u8 = if charging { 0x81 } else { 0x01 };
        let capacity = u16::from(percent) * 10; // 1.6 mAh units
        let temperature: i16 = 7680; // 30 C
        let voltage: u16 = 400; // 3904 mV

        let slot = buffer
            .get_mut(..12)
            .ok_or("telemetry buffer too small")?;
        slot[0] = status;
        slot[1..3].copy_from_slice(&capacity.to_le_bytes());
        slot[3] = percent;
        slot[4..6].copy_from_slice(&current.to_le_bytes());
        slot[6..8].copy_from_slice(&average_current.to_le_bytes());
        slot[8..10].copy_from_slice(&temperature.to_le_bytes());
        slot[10..12].copy_from_slice(&voltage.to_le_bytes());
        Ok(())
    }

    fn battery_charging(&mut self) -> Result<bool, GatewayError> {
        Ok(self.state().charging)
    }

    fn speed(&mut self) -> Result<(i32, i32), GatewayError> {
        Ok(self.state().speed)
    }

    fn position(&mut self) -> Result<(i32, i32), GatewayError> {
        let mut state = self.state();
        state.advance();
        Ok((state.position.0 as i32, state.position.1 as i32))
    }
}
