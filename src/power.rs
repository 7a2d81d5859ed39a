use crate::error::GatewayError;
use crate::gateway::{
    DeviceGateway, BATTERY_CAPACITY_TO_MAH, BATTERY_CURRENT_TO_MA, BATTERY_TEMPERATURE_TO_C,
    BATTERY_VOLTAGE_TO_MV, TELEMETRY_BUFFER_LEN,
};
use std::fmt::{Display, Formatter};

/// Battery monitor reading, converted to physical units.
#[derive(Debug, Clone, PartialEq)]
pub struct PowerStatus {
    pub status: u8,
    pub remaining_capacity_mah: f64,
    pub remaining_percent: u8,
    pub current_ma: f64,
    pub average_current_ma: f64,
    pub temperature_c: f64,
    pub voltage_mv: f64,
    pub charging: bool,
}

impl Display for PowerStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let charger = if self.charging { "plugged" } else { "unplugged" };
        write!(
            f,
            "[{}%|{:.0} mV|{:.0} mA|{}]",
            self.remaining_percent, self.voltage_mv, self.current_ma, charger
        )
    }
}

impl PowerStatus {
    /// Decodes the register dump returned by [`DeviceGateway::battery_status`].
    pub fn decode(buffer: &[u8], charging: bool) -> Result<Self, GatewayError> {
        if buffer.len() < 12 {
            return Err(format!("battery status needs 12 bytes, got {}", buffer.len()).into());
        }
        let unsigned = |index: usize| u16::from_le_bytes([buffer[index], buffer[index + 1]]);
        let signed = |index: usize| i16::from_le_bytes([buffer[index], buffer[index + 1]]);
        Ok(Self {
            status: buffer[0],
            remaining_capacity_mah: f64::from(unsigned(1)) * BATTERY_CAPACITY_TO_MAH,
            remaining_percent: buffer[3],
            current_ma: f64::from(signed(4)) * BATTERY_CURRENT_TO_MA,
            average_current_ma: f64::from(signed(6)) * BATTERY_CURRENT_TO_MA,
            temperature_c: f64::from(signed(8)) * BATTERY_TEMPERATURE_TO_C,
            voltage_mv: f64::from(unsigned(10)) * BATTERY_VOLTAGE_TO_MV,
            charging,
        })
    }

    pub fn read(gateway: &mut dyn DeviceGateway) -> Result<Self, GatewayError> {
        let mut buffer = [0u8; TELEMETRY_BUFFER_LEN];
        gateway.battery_status(&mut buffer)?;
        let charging = gateway.battery_charging()?;
        Self::decode(&buffer, charging)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::simulated::SimulatedGateway;

    #[test]
    fn decodes_scaled_registers() {
        let buffer = [
            0x01, 0xe8, 0x03, 64, // status, 1000 capacity units, 64 %
            0x00, 0xf4, // -3072 current units
            0x80, 0xf4, // -2944
            0x00, 0x1e, // 7680
            0x90, 0x01, // 400
        ];
        let status = PowerStatus::decode(&buffer, true).unwrap();
        assert_eq!(status.remaining_percent, 64);
        assert!((status.remaining_capacity_mah - 1600.0).abs() < 1e-9);
        assert!((status.current_ma - -240.01536).abs() < 1e-6);
        assert!((status.temperature_c - 29.99808).abs() < 1e-6);
        assert!((status.voltage_mv - 3904.0).abs() < 1e-9);
        assert_eq!(status.to_string(), "[64%|3904 mV|-240 mA|plugged]");
    }

    #[test]
    fn short_dump_is_rejected() {
        assert!(PowerStatus::decode(&[0u8; 6], false).is_err());
    }

    #[test]
    fn reads_through_the_gateway() {
        let mut gateway = SimulatedGateway::new();
        gateway.set_battery_percent(42);
        gateway.set_charging(true);
        let status = PowerStatus::read(&mut gateway).unwrap();
        assert_eq!(status.remaining_percent, 42);
        assert!(status.charging);
        assert_eq!(status.status, 0x81);
    }
}
