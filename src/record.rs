//! Fixed-interval polling of the measured output, either recorded to a
//! session log for a CSV file or printed as a live power table.

use std::future::Future;
use std::io;
use std::path::Path;
use std::time::Duration;

use chrono::{DateTime, Local};
use serde::Serialize;
use tokio::time::sleep;
use tracing::info;

use crate::proto::device::Device;
use crate::proto::Result;

/// Pause after each setup command of a recording session.
pub const SETUP_SETTLE: Duration = Duration::from_millis(200);

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.6f";

/// One measured data point of a recording session.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sample {
    pub timestamp: DateTime<Local>,
    pub voltage: f64,
    pub current: f64,
}

/// A finished recording session: the samples plus the set-points they were
/// taken under.
#[derive(Debug, Clone)]
pub struct SessionLog {
    pub voltage: f64,
    pub current: f64,
    pub interval: Duration,
    pub samples: Vec<Sample>,
}

#[derive(Serialize)]
struct CsvRow {
    timestamp: String,
    voltage: f64,
    current: f64,
}

impl SessionLog {
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Writes the samples as CSV with a `timestamp,voltage,current` header.
    pub fn write_csv<W: io::Write>(&self, out: W) -> io::Result<()> {
        let mut writer = csv::Writer::from_writer(out);
        for sample in &self.samples {
            writer.serialize(CsvRow {
                timestamp: sample.timestamp.format(TIMESTAMP_FORMAT).to_string(),
                voltage: sample.voltage,
                current: sample.current,
            })?;
        }
        writer.flush()
    }

    pub fn save(&self, path: impl AsRef<Path>) -> io::Result<()> {
        let file = std::fs::File::create(path.as_ref())?;
        self.write_csv(file)
    }
}

/// Set-points and sampling interval for a recording session.
#[derive(Debug, Clone, Copy)]
pub struct RecordConfig {
    pub voltage: f64,
    pub current: f64,
    pub interval: Duration,
}

/// Configures the supply, powers it on and samples the measured output
/// voltage and current at a fixed interval until `shutdown` resolves.
///
/// Setup sends the set-points, enables both protections and powers the
/// output on, pausing [`SETUP_SETTLE`] after each command. Shutdown is
/// observed between samples; the output is then powered off and the
/// collected samples are returned, an interrupt never discards data. A
/// failed read aborts the whole session and propagates the error.
pub async fn record<F>(
    device: &mut Device,
    config: &RecordConfig,
    shutdown: F,
) -> Result<SessionLog>
where
    F: Future<Output = ()>,
{
    device.set_voltage(config.voltage).await?;
    sleep(SETUP_SETTLE).await;
    device.set_current(config.current).await?;
    sleep(SETUP_SETTLE).await;
    device.set_ovp(true).await?;
    sleep(SETUP_SETTLE).await;
    device.set_ocp(true).await?;
    sleep(SETUP_SETTLE).await;
    device.power_on().await?;
    sleep(SETUP_SETTLE).await;

    tokio::pin!(shutdown);

    let mut samples = Vec::new();
    loop {
        let voltage = device.load_voltage().await?;
        let current = device.load_current().await?;
        samples.push(Sample {
            timestamp: Local::now(),
            voltage,
            current,
        });

        tokio::select! {
            _ = &mut shutdown => break,
            () = sleep(config.interval) => {}
        }
    }

    info!("Recording stopped after {} sample(s)", samples.len());
    device.power_off().await?;

    Ok(SessionLog {
        voltage: config.voltage,
        current: config.current,
        interval: config.interval,
        samples,
    })
}

/// One row of the power monitor.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PowerSample {
    pub timestamp: DateTime<Local>,
    pub voltage: f64,
    pub current: f64,
    pub power: f64,
}

/// Polls the measured output and prints one table row per sample with the
/// running power minimum and maximum.
///
/// The supply is assumed to be configured and running already; no setup is
/// performed and the output is left on. `max_count` bounds the number of
/// samples, 0 means unbounded. Returns the collected samples once the
/// bound is reached or `shutdown` resolves.
pub async fn monitor_power<F>(
    device: &mut Device,
    interval: Duration,
    max_count: u64,
    shutdown: F,
) -> Result<Vec<PowerSample>>
where
    F: Future<Output = ()>,
{
    tokio::pin!(shutdown);

    let mut samples: Vec<PowerSample> = Vec::new();
    let mut p_min = f64::INFINITY;
    let mut p_max = f64::NEG_INFINITY;

    while max_count == 0 || (samples.len() as u64) < max_count {
        let timestamp = Local::now();
        let voltage = device.load_voltage().await?;
        let current = device.load_current().await?;
        let power = voltage * current;
        p_min = p_min.min(power);
        p_max = p_max.max(power);

        if samples.is_empty() {
            println!(
                "Count\tDate     \tTime    \tVolt\tCurrent[A]\tPower[W]\tP_min[W]\tP_max[W]"
            );
        }
        println!(
            "{}\t{}\t{}\t{:.3}\t{:.3}\t{:.3}\t{:.3}\t{:.3}",
            samples.len() + 1,
            timestamp.format("%Y-%m-%d"),
            timestamp.format("%H:%M:%S%.6f"),
            voltage,
            current,
            power,
            p_min,
            p_max
        );
        samples.push(PowerSample {
            timestamp,
            voltage,
            current,
            power,
        });

        tokio::select! {
            _ = &mut shutdown => break,
            () = sleep(interval) => {}
        }
    }

    Ok(samples)
}
