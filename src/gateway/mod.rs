//! Access to the robot's motor controller, LEDs and sensors.
//!
//! Sensor reads fill a raw byte buffer the same way the controller firmware
//! reports them: little-endian 16-bit words, one per channel. Decoding and
//! unit conversion are left to the caller.

pub mod simulated;

use crate::error::GatewayError;
use crate::motor_profile::{PidGains, SpeedProfile};

/// Name of the motor/sensor microcontroller on the I2C bus.
pub const DSPIC_DEVICE: &str = "Khepera4:dsPic";

/// Size of the scratch buffer handed to sensor reads.
pub const TELEMETRY_BUFFER_LEN: usize = 100;

/// Three RGB LEDs, channels ordered R1 G1 B1 R2 G2 B2 R3 G3 B3.
pub type LedChannels = [u8; 9];

pub const LEDS_OFF: LedChannels = [0; 9];

// calibration of the motor controller
pub const WHEEL_DIAMETER_MM: f64 = 42.0;
pub const PULSES_PER_REVOLUTION: f64 = 19456.0;
pub const PULSE_TO_MM: f64 = std::f64::consts::PI * WHEEL_DIAMETER_MM / PULSES_PER_REVOLUTION;
pub const SPEED_TO_MM_S: f64 = 0.678181;

// calibration of the DS2781 battery monitor
pub const BATTERY_CAPACITY_TO_MAH: f64 = 1.6;
pub const BATTERY_CURRENT_TO_MA: f64 = 0.07813;
pub const BATTERY_TEMPERATURE_TO_C: f64 = 0.003906;
pub const BATTERY_VOLTAGE_TO_MV: f64 = 9.76;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MotorMode {
    /// No regulation, motors free.
    Idle,
    /// Closed-loop speed regulation.
    Speed,
}

pub trait DeviceGateway {
    fn set_position_margin(&mut self, margin: u32) -> Result<(), GatewayError>;
    fn configure_pid(&mut self, gains: PidGains) -> Result<(), GatewayError>;
    fn set_speed_profile(&mut self, profile: SpeedProfile) -> Result<(), GatewayError>;

    fn set_mode(&mut self, mode: MotorMode) -> Result<(), GatewayError>;
    fn set_speed(&mut self, left: i32, right: i32) -> Result<(), GatewayError>;
    fn set_leds(&mut self, channels: LedChannels) -> Result<(), GatewayError>;

    /// Firmware byte: high nibble is the version, low nibble the revision.
    fn revision(&mut self) -> Result<u8, GatewayError>;

    fn proximity_ir(&mut self, buffer: &mut [u8]) -> Result<(), GatewayError>;
    fn ambient_ir(&mut self, buffer: &mut [u8]) -> Result<(), GatewayError>;
    fn measure_us(&mut self, buffer: &mut [u8]) -> Result<(), GatewayError>;
    fn battery_status(&mut self, buffer: &mut [u8]) -> Result<(), GatewayError>;
    fn battery_charging(&mut self) -> Result<bool, GatewayError>;

    /// Wheel speeds in controller units (left, right).
    fn speed(&mut self) -> Result<(i32, i32), GatewayError>;
    /// Wheel positions in encoder pulses (left, right).
    fn position(&mut self) -> Result<(i32, i32), GatewayError>;
}

/// Decodes `N` little-endian 16-bit words from the start of `buffer`.
pub fn decode_words<const N: usize>(buffer: &[u8]) -> [u16; N] {
    let mut words = [0u16; N];
    for (word, pair) in words.iter_mut().zip(buffer.chunks_exact(2)) {
        *word = u16::from_le_bytes([pair[0], pair[1]]);
    }
    words
}

/// Splits the firmware byte into a version letter and a revision number.
pub fn format_revision(byte: u8) -> (char, u8) {
    let version = (b'A' + (byte >> 4)) as char;
    (version, byte & 0x0F)
}
