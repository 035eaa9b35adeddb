use futures::{SinkExt, StreamExt};
use std::{pin::Pin, time::Duration};
use tokio_serial::SerialPortBuilderExt;
use tokio_util::codec::Decoder;
use tracing::info;

use super::Result;
use super::{
    codec::LineCodec,
    command::{Command, OutputSyntax},
    response::Reply,
    ProtoError,
};

trait AsyncReadWrite<S>: futures::Sink<S> + futures::Stream {}

impl<T, S> AsyncReadWrite<S> for T where T: futures::Sink<S> + futures::Stream {}

/// Deadline for the reply line of a query-type command. Enforced here, not
/// by the OS serial timeout.
pub const REPLY_TIMEOUT: Duration = Duration::from_millis(2000);

/// Settle time between power-off and power-on in a power cycle.
pub const POWER_CYCLE_SETTLE: Duration = Duration::from_secs(1);

/// A session with one power supply. The session owns the serial connection
/// exclusively and runs strictly one command/reply exchange at a time.
#[allow(clippy::type_complexity)]
pub struct Device {
    stream: Pin<
        Box<
            dyn AsyncReadWrite<
                Command,
                Error = std::io::Error,
                Item = std::result::Result<Reply, std::io::Error>,
            >,
        >,
    >,
    reply_timeout: Duration,
}

impl Device {
    pub fn new(com: impl AsRef<str>, baudrate: u32) -> Result<Self> {
        Self::with_output_syntax(com, baudrate, OutputSyntax::default())
    }

    /// Like [`Device::new`], with an explicit output-command dialect for
    /// firmware that rejects the full `OUTPUT1` spelling.
    pub fn with_output_syntax(
        com: impl AsRef<str>,
        baudrate: u32,
        syntax: OutputSyntax,
    ) -> Result<Self> {
        let mut port = tokio_serial::new(com.as_ref(), baudrate).open_native_async()?;

        #[cfg(unix)]
        port.set_exclusive(false)
            .expect("Unable to set serial port exclusive to false");

        let stream = LineCodec::new(syntax).framed(port);

        Ok(Self {
            stream: Box::pin(stream),
            reply_timeout: REPLY_TIMEOUT,
        })
    }

    #[cfg(test)]
    pub fn new_faked(response_buf: &[u8]) -> (Self, super::fake::TxLog) {
        let (buffer, tx_log) = super::fake::FakeBuffer::new(response_buf.to_vec());
        let stream = LineCodec::default().framed(buffer);

        (
            Self {
                stream: Box::pin(stream),
                reply_timeout: REPLY_TIMEOUT,
            },
            tx_log,
        )
    }

    /// Overrides the default [`REPLY_TIMEOUT`] for query-type commands.
    pub fn set_reply_timeout(&mut self, timeout: Duration) {
        self.reply_timeout = timeout;
    }

    /// Sends an action-type command. The device does not acknowledge these;
    /// success means the write went through.
    async fn send(&mut self, cmd: Command) -> Result<()> {
        self.stream.send(cmd).await?;
        Ok(())
    }

    /// Sends a query-type command and waits for exactly one reply line
    /// within the reply deadline.
    async fn query(&mut self, cmd: Command) -> Result<Reply> {
        self.stream.send(cmd).await?;
        match tokio::time::timeout(self.reply_timeout, self.stream.next()).await {
            Ok(Some(Ok(reply))) => Ok(reply),
            Ok(Some(Err(ioerr))) => Err(ioerr.into()),
            Ok(None) => Err(ProtoError::Abort),
            Err(_) => Err(ProtoError::ReplyTimeout(self.reply_timeout)),
        }
    }

    /// Identification string, e.g. `KORAD KA3005P V5.8`.
    pub async fn ident(&mut self) -> Result<String> {
        let reply = self.query(Command::Ident).await?;
        Ok(reply.into_string())
    }

    pub async fn power_on(&mut self) -> Result<()> {
        self.send(Command::Output(true)).await?;
        info!("Power ON");
        Ok(())
    }

    pub async fn power_off(&mut self) -> Result<()> {
        self.send(Command::Output(false)).await?;
        info!("Power OFF");
        Ok(())
    }

    /// Powers the output off and back on, with [`POWER_CYCLE_SETTLE`] in
    /// between so the output stage can drain before power is reapplied.
    pub async fn power_cycle(&mut self) -> Result<()> {
        self.power_off().await?;
        info!("sleep {:?}", POWER_CYCLE_SETTLE);
        tokio::time::sleep(POWER_CYCLE_SETTLE).await;
        self.power_on().await
    }

    pub async fn set_voltage(&mut self, volts: f64) -> Result<()> {
        self.send(Command::SetVoltage(volts)).await?;
        info!("Voltage set to {}V", volts);
        Ok(())
    }

    pub async fn set_current(&mut self, amps: f64) -> Result<()> {
        self.send(Command::SetCurrent(amps)).await?;
        info!("Current set to {}A", amps);
        Ok(())
    }

    pub async fn set_ovp(&mut self, enabled: bool) -> Result<()> {
        self.send(Command::Ovp(enabled)).await?;
        info!("{} OVP", if enabled { "Enabled" } else { "Disabled" });
        Ok(())
    }

    pub async fn set_ocp(&mut self, enabled: bool) -> Result<()> {
        self.send(Command::Ocp(enabled)).await?;
        info!("{} OCP", if enabled { "Enabled" } else { "Disabled" });
        Ok(())
    }

    /// Measured voltage at the output terminals.
    pub async fn load_voltage(&mut self) -> Result<f64> {
        self.query(Command::QueryVoltage).await?.parse_measurement()
    }

    /// Measured current through the load.
    pub async fn load_current(&mut self) -> Result<f64> {
        self.query(Command::QueryCurrent).await?.parse_measurement()
    }

    /// Measured output power. Derived from two sequential reads, so the
    /// voltage and current samples are skewed by one round-trip.
    pub async fn load_power(&mut self) -> Result<f64> {
        let volts = self.load_voltage().await?;
        let amps = self.load_current().await?;
        Ok(volts * amps)
    }
}

#[cfg(test)]
mod tests {
    use super::super::fake;
    use super::*;

    #[tokio::test]
    async fn ident_returns_trimmed_reply() {
        let (mut device, tx_log) = Device::new_faked(b"KORAD KA3005P V5.8\r\n");
        assert_eq!(device.ident().await.expect("ident"), "KORAD KA3005P V5.8");
        assert_eq!(fake::sent_lines(&tx_log), ["*IDN?"]);
    }

    #[tokio::test]
    async fn load_voltage_parses_reply() {
        let (mut device, tx_log) = Device::new_faked(b"5.123\n");
        assert_eq!(device.load_voltage().await.expect("volts"), 5.123);
        assert_eq!(fake::sent_lines(&tx_log), ["VOUT1?"]);
    }

    #[tokio::test]
    async fn load_voltage_rejects_garbage() {
        let (mut device, _tx_log) = Device::new_faked(b"abc\n");
        assert!(matches!(
            device.load_voltage().await,
            Err(ProtoError::Malformed(_))
        ));
    }

    #[tokio::test]
    async fn load_voltage_rejects_blank_reply() {
        let (mut device, _tx_log) = Device::new_faked(b"\n");
        assert!(matches!(
            device.load_voltage().await,
            Err(ProtoError::Malformed(_))
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn query_times_out_on_silent_device() {
        let (mut device, _tx_log) = Device::new_faked(b"");
        assert!(matches!(
            device.load_voltage().await,
            Err(ProtoError::ReplyTimeout(_))
        ));
    }

    #[tokio::test]
    async fn reply_timeout_is_bounded() {
        let (mut device, _tx_log) = Device::new_faked(b"");
        device.set_reply_timeout(Duration::from_millis(100));

        let begin = std::time::Instant::now();
        let result = device.load_voltage().await;
        let elapsed = begin.elapsed();

        assert!(matches!(result, Err(ProtoError::ReplyTimeout(_))));
        assert!(
            elapsed >= Duration::from_millis(100) && elapsed < Duration::from_millis(150),
            "query returned after {:?}",
            elapsed
        );
    }

    #[tokio::test(start_paused = true)]
    async fn power_cycle_settles_between_off_and_on() {
        let (mut device, tx_log) = Device::new_faked(b"");
        device.power_cycle().await.expect("power cycle");

        let sent = tx_log.lock().expect("tx log");
        assert_eq!(sent.len(), 2);
        assert_eq!(String::from_utf8_lossy(&sent[0].1).trim_end(), "OUTPUT0");
        assert_eq!(String::from_utf8_lossy(&sent[1].1).trim_end(), "OUTPUT1");
        assert!(sent[1].0 - sent[0].0 >= POWER_CYCLE_SETTLE);
    }

    #[tokio::test]
    async fn load_power_multiplies_two_reads() {
        let (mut device, tx_log) = Device::new_faked(b"5.0\n2.0\n");
        assert_eq!(device.load_power().await.expect("power"), 10.0);
        assert_eq!(fake::sent_lines(&tx_log), ["VOUT1?", "IOUT1?"]);
    }
}
