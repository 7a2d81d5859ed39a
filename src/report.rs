//! Sensor dump sent to the server on `file` requests.
//!
//! The report is a semicolon-delimited text file built section by section.
//! The first section truncates the file, every later one appends to it, so
//! each request starts from scratch.
//!
//! ```text
//! Proximity Sensors
//! back left;  12
//! ...
//! US sensors : distance [cm]
//! left 90;1000
//! ...
//! Battery
//! status (DS2781);0x1
//! remaining capacity; 87 %
//! ```

use crate::error::{GatewayError, Result};
use crate::gateway::{
    decode_words, DeviceGateway, PULSE_TO_MM, SPEED_TO_MM_S, TELEMETRY_BUFFER_LEN,
};
use crate::power::PowerStatus;
use std::fs::{File, OpenOptions};
use std::path::Path;

const IR_LABELS: [&str; 12] = [
    "back left",
    "left",
    "front left",
    "front",
    "front right",
    "right",
    "back right",
    "back",
    "ground left",
    "gnd front left",
    "gnd front right",
    "ground right",
];

const US_LABELS: [&str; 5] = ["left 90", "left 45", "front", "right 45", "right 90"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Section {
    Proximity,
    Ultrasonic,
    Ambient,
    Motor,
    Battery,
}

impl Section {
    pub const ALL: [Section; 5] = [
        Section::Proximity,
        Section::Ultrasonic,
        Section::Ambient,
        Section::Motor,
        Section::Battery,
    ];

    fn rows(
        self,
        gateway: &mut dyn DeviceGateway,
    ) -> std::result::Result<Vec<Vec<String>>, GatewayError> {
        let mut buffer = [0u8; TELEMETRY_BUFFER_LEN];
        let rows = match self {
            Section::Proximity => {
                gateway.proximity_ir(&mut buffer)?;
                let sensors = decode_words::<12>(&buffer);
                labelled(
                    "Proximity Sensors",
                    &IR_LABELS,
                    sensors.iter().map(|v| format!("{:4}", v)),
                )
            }
            Section::Ultrasonic => {
                gateway.measure_us(&mut buffer)?;
                let distances = decode_words::<5>(&buffer);
                labelled(
                    "US sensors : distance [cm]",
                    &US_LABELS,
                    distances.iter().map(|&v| format!("{:4}", v as i16)),
                )
            }
            Section::Ambient => {
                gateway.ambient_ir(&mut buffer)?;
                let sensors = decode_words::<12>(&buffer);
                labelled(
                    "Ambient Sensors",
                    &IR_LABELS,
                    sensors.iter().map(|v| format!("{:04}", v)),
                )
            }
            Section::Motor => {
                let (speed_left, speed_right) = gateway.speed()?;
                let (position_left, position_right) = gateway.position()?;
                vec![
                    vec!["motor speed and position".to_string()],
                    vec![
                        "motors speed [mm/s (pulse)]".to_string(),
                        "left".to_string(),
                        format!("{:7.1}", f64::from(speed_left) * SPEED_TO_MM_S),
                        format!("({:5})", speed_left),
                        "right".to_string(),
                        format!("{:7.1}", f64::from(speed_right) * SPEED_TO_MM_S),
                        format!("({:5})", speed_right),
                    ],
                    vec![
                        "motors position [mm (pulse)]".to_string(),
                        "left".to_string(),
                        format!("{:7.1}", f64::from(position_left) * PULSE_TO_MM),
                        format!("({:7})", position_left),
                        "right".to_string(),
                        format!("{:7.1}", f64::from(position_right) * PULSE_TO_MM),
                        format!("({:7})", position_right),
                    ],
                ]
            }
            Section::Battery => {
                let battery = PowerStatus::read(gateway)?;
                let charger = if battery.charging { "plugged" } else { "unplugged" };
                let row = |label: &str, value: String| vec![label.to_string(), value];
                vec![
                    vec!["Battery".to_string()],
                    row("status (DS2781)", format!("0x{:x}", battery.status)),
                    row(
                        "remaining capacity",
                        format!("{:4.0} mAh", battery.remaining_capacity_mah),
                    ),
                    row("remaining capacity", format!("{:3} %", battery.remaining_percent)),
                    row("current", format!("{:4.0} mA", battery.current_ma)),
                    row("average current", format!("{:4.0} mA", battery.average_current_ma)),
                    row("temperature", format!("{:3.1} C", battery.temperature_c)),
                    row("voltage", format!("{:4.0} mV", battery.voltage_mv)),
                    row("charger", charger.to_string()),
                ]
            }
        };
        Ok(rows)
    }
}

fn labelled<I: Iterator<Item = String>>(
    title: &str,
    labels: &[&str],
    values: I,
) -> Vec<Vec<String>> {
    let mut rows = vec![vec![title.to_string()]];
    rows.extend(
        labels
            .iter()
            .zip(values)
            .map(|(label, value)| vec![label.to_string(), value]),
    );
    rows
}

fn report_writer(file: File) -> csv::Writer<File> {
    csv::WriterBuilder::new()
        .delimiter(b';')
        .flexible(true)
        .terminator(csv::Terminator::Any(b'\n'))
        .from_writer(file)
}

/// Queries one section from the gateway and appends it to the report.
pub fn append_section(
    gateway: &mut dyn DeviceGateway,
    path: &Path,
    section: Section,
) -> Result<()> {
    let rows = section.rows(gateway)?;
    let file = OpenOptions::new().create(true).append(true).open(path)?;
    let mut writer = report_writer(file);
    for row in rows {
        writer.write_record(&row)?;
    }
    writer.flush()?;
    Ok(())
}

/// Rewrites the whole report at `path`.
pub fn build(gateway: &mut dyn DeviceGateway, path: &Path) -> Result<()> {
    File::create(path)?;
    for section in Section::ALL.iter() {
        append_section(gateway, path, *section)?;
    }
    log::debug!("report written to {}", path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::simulated::SimulatedGateway;

    #[test]
    fn sections_appear_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data.csv");
        build(&mut SimulatedGateway::new(), &path).unwrap();

        let report = std::fs::read_to_string(&path).unwrap();
        let titles: Vec<usize> = [
            "Proximity Sensors",
            "US sensors : distance [cm]",
            "Ambient Sensors",
            "motor speed and position",
            "Battery",
        ]
        .iter()
        .map(|title| report.find(title).unwrap())
        .collect();
        assert!(titles.windows(2).all(|pair| pair[0] < pair[1]));
    }

    #[test]
    fn values_use_fixed_widths() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data.csv");
        build(&mut SimulatedGateway::new(), &path).unwrap();

        let report = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = report.lines().collect();
        assert_eq!(lines[0], "Proximity Sensors");
        assert_eq!(lines[1], "back left;  12");
        assert!(lines.contains(&"gnd front left; 902"));
        assert!(lines.contains(&"left 45;  87"));
        assert!(lines.contains(&"front;  45"));
        assert!(lines.contains(&"remaining capacity; 87 %"));
        assert!(lines.contains(&"voltage;3904 mV"));
        assert!(lines.contains(&"charger;unplugged"));
        assert!(lines
            .iter()
            .any(|line| line.starts_with("motors speed [mm/s (pulse)];left;    0.0;(    0)")));
    }

    #[test]
    fn ambient_values_are_zero_padded() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ambient.csv");
        append_section(&mut SimulatedGateway::new(), &path, Section::Ambient).unwrap();

        let report = std::fs::read_to_string(&path).unwrap();
        assert_eq!(report.lines().nth(1), Some("back left;3890"));
        assert_eq!(report.lines().count(), 13);
    }

    #[test]
    fn rebuilding_overwrites_previous_report() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data.csv");
        std::fs::write(&path, "stale contents that must disappear\n").unwrap();
        let mut gateway = SimulatedGateway::new();

        build(&mut gateway, &path).unwrap();
        let first = std::fs::read(&path).unwrap();
        build(&mut gateway, &path).unwrap();
        let second = std::fs::read(&path).unwrap();

        assert_eq!(first, second);
        assert!(!String::from_utf8(second).unwrap().contains("stale"));
    }

    #[test]
    fn unwritable_path_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing").join("data.csv");
        assert!(build(&mut SimulatedGateway::new(), &path).is_err());
    }
}
