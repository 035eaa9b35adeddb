//!
//! This library provides control and data logging for Korad PS3005D
//! bench power supplies over a serial connection.
//!
//! <br>
//!
//! # Details
//!
//! - The supply enumerates as a USB CDC serial port, 9600 baud.
//!
//! - Basic setup and connection
//!
//!   ```no_run
//!   use ps3005ctrl::{Device, DEFAULT_BAUDRATE};
//!   #[tokio::main]
//!   async fn main() -> ps3005ctrl::Result<()> {
//!       let path = "/dev/ttyACM0".to_string();
//!       let mut device = Device::new(&path, DEFAULT_BAUDRATE)?;
//!       eprintln!("Connected to: {}\n", device.ident().await?);
//!       Ok(())
//!   }
//!   ```
//!
//! # Supported devices
//!
//!  * Korad/Velleman PS3005D
//!  * Korad KAxxxxP units (use [`OutputSyntax::Short`] if the firmware
//!    rejects `OUTPUT1`)
//!

pub mod proto;
pub mod record;

pub use proto::command::OutputSyntax;
pub use proto::device::Device;
pub use proto::Result;

#[cfg(unix)]
pub const DEFAULT_TTY: &str = "/dev/ttyACM0";
#[cfg(windows)]
pub const DEFAULT_TTY: &str = "COM1";

/// Default Baudrate for the PS3005D family.
pub const DEFAULT_BAUDRATE: u32 = 9600;
