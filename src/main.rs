#![deny(clippy::unwrap_used)]

use clap::{arg, command, value_parser};
use std::io::ErrorKind;
use std::process::exit;
use std::{path::PathBuf, time::Duration};
use tracing::{error, info};

use ps3005ctrl::proto::{ProtoError, Result};
use ps3005ctrl::record::{monitor_power, record, RecordConfig};
use ps3005ctrl::{Device, DEFAULT_BAUDRATE};

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_target(false)
        .without_time()
        .init();

    let matches = command!() // requires `cargo` feature
        .arg(arg!(<PORT> "Serial port of the supply, e.g. /dev/ttyACM0").value_parser(value_parser!(PathBuf)))
        .arg(
            arg!(
                -b --baud <BAUDRATE> "Baudrate"
            )
            .default_value(DEFAULT_BAUDRATE.to_string())
            .value_parser(value_parser!(u32)),
        )
        .subcommand(clap::Command::new("id").about("Get the power supply identification"))
        .subcommand(clap::Command::new("on").about("Turn the output on"))
        .subcommand(clap::Command::new("off").about("Turn the output off"))
        .subcommand(
            clap::Command::new("off_on").about("Turn the output off and on again, with a settle pause"),
        )
        .subcommand(clap::Command::new("enable_ovp").about("Enable over-voltage protection"))
        .subcommand(clap::Command::new("disable_ovp").about("Disable over-voltage protection"))
        .subcommand(clap::Command::new("enable_ocp").about("Enable over-current protection"))
        .subcommand(clap::Command::new("disable_ocp").about("Disable over-current protection"))
        .subcommand(clap::Command::new("load_voltage").about("Read the measured output voltage"))
        .subcommand(clap::Command::new("load_current").about("Read the measured output current"))
        .subcommand(clap::Command::new("load_power").about("Read the measured output power"))
        .subcommand(
            clap::Command::new("voltage")
                .about("Set the output voltage")
                .arg(arg!(<VOLTS> "voltage to set").value_parser(value_parser!(f64))),
        )
        .subcommand(
            clap::Command::new("current")
                .about("Set the output current limit")
                .arg(arg!(<AMPS> "current to set").value_parser(value_parser!(f64))),
        )
        .subcommand(
            clap::Command::new("log_power")
                .about("Monitor the output power until interrupted")
                .arg(
                    arg!([INTERVAL_MS] "sampling interval in ms")
                        .default_value("100")
                        .value_parser(value_parser!(u64)),
                )
                .arg(
                    arg!([MAX_COUNT] "number of samples, 0 for unbounded")
                        .default_value("0")
                        .value_parser(value_parser!(u64)),
                ),
        )
        .subcommand(
            clap::Command::new("log")
                .about("Record measured voltage and current to a csv until interrupted")
                .arg(arg!(<VOLTS> "voltage to set").value_parser(value_parser!(f64)))
                .arg(arg!(<AMPS> "current to set").value_parser(value_parser!(f64)))
                .arg(
                    arg!(--freq <MS> "logging frequency in ms")
                        .default_value("1000")
                        .value_parser(value_parser!(u64)),
                )
                .arg(
                    arg!(--log <FILE> "log csv filename")
                        .default_value("log.csv")
                        .value_parser(value_parser!(PathBuf)),
                ),
        )
        .subcommand_required(true)
        .get_matches();

    match handle_args(&matches).await {
        Ok(()) => {}
        Err(e) => {
            let port = matches
                .get_one::<PathBuf>("PORT")
                .expect("Requires port parameter")
                .display();

            match e {
                ProtoError::Serial(err) => {
                    if err.kind() == tokio_serial::ErrorKind::NoDevice
                        || matches!(err.kind(), tokio_serial::ErrorKind::Io(ErrorKind::NotFound))
                    {
                        error!("Could not connect to device on {}", port);
                    } else {
                        error!("I/O Error: {} [device: {}]", err, port);
                    }
                    exit(1);
                }
                ProtoError::Io(err) => {
                    if err.kind() == ErrorKind::NotFound {
                        error!("Could not connect to device on {}", port);
                    } else {
                        error!("I/O Error: {} [device: {}]", err, port);
                    }
                    exit(1);
                }
                ProtoError::ReplyTimeout(_) | ProtoError::Malformed(_) => {
                    error!("{}", e);
                    exit(1);
                }
                ProtoError::Abort => {
                    error!("Connection to device was closed, aborting!");
                    exit(1);
                }
            }
        }
    }
}

/// Resolves when the user sends an interrupt.
async fn interrupt() {
    tokio::signal::ctrl_c()
        .await
        .expect("Unable to install interrupt handler");
}

async fn handle_args(matches: &clap::ArgMatches) -> Result<()> {
    let baud_rate = matches.get_one::<u32>("baud").unwrap_or(&DEFAULT_BAUDRATE);

    let port = matches
        .get_one::<PathBuf>("PORT")
        .expect("Requires port parameter");
    let mut device = Device::new(port.to_string_lossy().to_string(), *baud_rate)?;

    match matches.subcommand() {
        // Device ID
        Some(("id", _args)) => {
            let ident = device.ident().await?;
            println!("Device ID: {}", ident);
        }
        // Output stage
        Some(("on", _args)) => device.power_on().await?,
        Some(("off", _args)) => device.power_off().await?,
        Some(("off_on", _args)) => device.power_cycle().await?,
        // Protections
        Some(("enable_ovp", _args)) => device.set_ovp(true).await?,
        Some(("disable_ovp", _args)) => device.set_ovp(false).await?,
        Some(("enable_ocp", _args)) => device.set_ocp(true).await?,
        Some(("disable_ocp", _args)) => device.set_ocp(false).await?,
        // Measurements
        Some(("load_voltage", _args)) => {
            let voltage = device.load_voltage().await?;
            println!("Load Voltage [V]: {}", voltage);
        }
        Some(("load_current", _args)) => {
            let current = device.load_current().await?;
            println!("Load Current [A]: {:.3}", current);
        }
        Some(("load_power", _args)) => {
            let power = device.load_power().await?;
            println!("Load Power [W]: {:.3}", power);
        }
        // Set-points
        Some(("voltage", args)) => {
            let volts = args.get_one::<f64>("VOLTS").expect("Requires voltage");
            device.set_voltage(*volts).await?;
        }
        Some(("current", args)) => {
            let amps = args.get_one::<f64>("AMPS").expect("Requires current");
            device.set_current(*amps).await?;
        }
        // Power monitor
        Some(("log_power", args)) => {
            let interval_ms = args
                .get_one::<u64>("INTERVAL_MS")
                .expect("Requires interval");
            let max_count = args.get_one::<u64>("MAX_COUNT").expect("Requires count");

            monitor_power(
                &mut device,
                Duration::from_millis(*interval_ms),
                *max_count,
                interrupt(),
            )
            .await?;
        }
        // Recording session
        Some(("log", args)) => {
            let volts = args.get_one::<f64>("VOLTS").expect("Requires voltage");
            let amps = args.get_one::<f64>("AMPS").expect("Requires current");
            let freq_ms = args.get_one::<u64>("freq").expect("Requires frequency");
            let path = args.get_one::<PathBuf>("log").expect("Requires filename");

            info!("Logging {}V, {}A every {}ms", volts, amps, freq_ms);

            let config = RecordConfig {
                voltage: *volts,
                current: *amps,
                interval: Duration::from_millis(*freq_ms),
            };
            let session = record(&mut device, &config, interrupt()).await?;
            session.save(path)?;

            info!("Saved {} records to {}", session.len(), path.display());
        }
        _ => unreachable!("subcommand is required"),
    }

    Ok(())
}
