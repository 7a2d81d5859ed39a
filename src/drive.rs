use crate::command::Direction;
use crate::config::{DrivePolicy, Polarity};
use crate::error::GatewayError;
use crate::gateway::{DeviceGateway, MotorMode};

pub struct Drive {
    policy: DrivePolicy,
}

impl Drive {
    pub fn new(policy: DrivePolicy) -> Self {
        Self { policy }
    }

    /// Scale applied to both wheels while turning on the spot.
    pub fn rotation_factor(&self, speed: i32) -> f64 {
        if speed.saturating_abs() > self.policy.high_speed_threshold {
            self.policy.rotate_high_speed_factor
        } else {
            self.policy.rotate_low_speed_factor
        }
    }

    /// Wheel speeds (left, right) for a move at the given speed magnitude.
    pub fn wheel_speeds(&self, direction: Direction, speed: i32) -> (i32, i32) {
        let (left, right, factor) = match direction {
            Direction::Forward => (speed, speed, 1.0),
            Direction::Backward => (speed.saturating_neg(), speed.saturating_neg(), 1.0),
            Direction::Left => (speed.saturating_neg(), speed, self.rotation_factor(speed)),
            Direction::Right => (speed, speed.saturating_neg(), self.rotation_factor(speed)),
        };
        let sign = match self.policy.forward_polarity {
            Polarity::Normal => 1,
            Polarity::Inverted => -1,
        };
        (
            Drive::scale(left.saturating_mul(sign), factor),
            Drive::scale(right.saturating_mul(sign), factor),
        )
    }

    pub fn go(
        &self,
        gateway: &mut dyn DeviceGateway,
        direction: Direction,
        speed: i32,
    ) -> Result<(), GatewayError> {
        let (left, right) = self.wheel_speeds(direction, speed);
        gateway.set_mode(MotorMode::Speed)?;
        gateway.set_speed(left, right)?;
        if self.policy.return_to_idle_after_move {
            std::thread::sleep(self.policy.drive_interval());
            self.stop(gateway)?;
        }
        Ok(())
    }

    pub fn stop(&self, gateway: &mut dyn DeviceGateway) -> Result<(), GatewayError> {
        gateway.set_speed(0, 0)?;
        gateway.set_mode(MotorMode::Idle)
    }

    // truncates toward zero like the controller's integer speed registers
    fn scale(speed: i32, factor: f64) -> i32 {
        (speed as f64 * factor) as i32
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::simulated::{GatewayCall, SimulatedGateway};

    fn drive(polarity: Polarity) -> Drive {
        Drive::new(DrivePolicy {
            forward_polarity: polarity,
            drive_interval_ms: 1,
            ..DrivePolicy::default()
        })
    }

    #[test]
    fn normal_polarity_table() {
        let drive = drive(Polarity::Normal);
        assert_eq!(drive.wheel_speeds(Direction::Forward, 100), (100, 100));
        assert_eq!(drive.wheel_speeds(Direction::Backward, 100), (-100, -100));
        assert_eq!(drive.wheel_speeds(Direction::Left, 100), (-75, 75));
        assert_eq!(drive.wheel_speeds(Direction::Right, 100), (75, -75));
    }

    #[test]
    fn inverted_polarity_flips_every_sign() {
        let drive = drive(Polarity::Inverted);
        assert_eq!(drive.wheel_speeds(Direction::Forward, 100), (-100, -100));
        assert_eq!(drive.wheel_speeds(Direction::Backward, 100), (100, 100));
        assert_eq!(drive.wheel_speeds(Direction::Left, 100), (75, -75));
        assert_eq!(drive.wheel_speeds(Direction::Right, 100), (-75, 75));
    }

    #[test]
    fn fast_turns_use_the_high_speed_factor() {
        let drive = drive(Polarity::Normal);
        assert_eq!(drive.rotation_factor(300), 0.75);
        assert_eq!(drive.rotation_factor(301), 0.5);
        assert_eq!(drive.wheel_speeds(Direction::Left, 400), (-200, 200));
        assert_eq!(drive.wheel_speeds(Direction::Right, 101), (75, -75));
    }

    #[test]
    fn extreme_speeds_saturate_instead_of_overflowing() {
        let drive = drive(Polarity::Inverted);
        assert_eq!(
            drive.wheel_speeds(Direction::Backward, i32::MIN),
            (-i32::MAX, -i32::MAX)
        );
        assert_eq!(drive.rotation_factor(i32::MIN), 0.5);
        let (left, right) = drive.wheel_speeds(Direction::Left, i32::MAX);
        assert!(left > 0 && right < 0);
    }

    #[test]
    fn move_returns_to_idle_after_interval() {
        let mut gateway = SimulatedGateway::new();
        drive(Polarity::Normal)
            .go(&mut gateway, Direction::Forward, 250)
            .unwrap();
        assert_eq!(
            gateway.calls(),
            vec![
                GatewayCall::Mode(MotorMode::Speed),
                GatewayCall::Speed(250, 250),
                GatewayCall::Speed(0, 0),
                GatewayCall::Mode(MotorMode::Idle),
            ]
        );
    }

    #[test]
    fn move_can_leave_robot_running() {
        let mut gateway = SimulatedGateway::new();
        let drive = Drive::new(DrivePolicy {
            return_to_idle_after_move: false,
            ..DrivePolicy::default()
        });
        drive.go(&mut gateway, Direction::Right, 100).unwrap();
        assert_eq!(gateway.mode(), MotorMode::Speed);
        assert_eq!(gateway.wheel_speeds(), (75, -75));
    }
}
