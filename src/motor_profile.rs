use crate::error::GatewayError;
use crate::gateway::{DeviceGateway, MotorMode};

/// Position control margin in encoder pulses.
pub const POSITION_MARGIN: u32 = 20;

/// Fastest wheel speed the controller is profiled for, in speed units.
pub const MAX_SPEED: i32 = 400;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PidGains {
    pub kp: i32, // Proportional gain
    pub ki: i32, // Integral gain
    pub kd: i32, // Derivative gain
}

impl std::default::Default for PidGains {
    fn default() -> Self {
        Self {
            kp: 10,
            ki: 5,
            kd: 1,
        }
    }
}

/// Acceleration slope of the motor controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SpeedProfile {
    pub acc_inc: i32,
    pub acc_div: i32,
    pub min_speed_acc: i32,
    pub min_speed_dec: i32,
    pub max_speed: i32,
}

impl std::default::Default for SpeedProfile {
    fn default() -> Self {
        Self {
            acc_inc: 3,
            acc_div: 0,
            min_speed_acc: 20,
            min_speed_dec: 1,
            max_speed: MAX_SPEED,
        }
    }
}

/// Applies the tuned controller parameters and leaves the motors idle.
pub fn configure_motors(gateway: &mut dyn DeviceGateway) -> Result<(), GatewayError> {
    gateway.set_position_margin(POSITION_MARGIN)?;
    gateway.configure_pid(PidGains::default())?;
    gateway.set_speed_profile(SpeedProfile::default())?;
    gateway.set_mode(MotorMode::Idle)
}
