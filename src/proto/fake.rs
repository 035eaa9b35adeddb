use std::pin::Pin;
use std::sync::{Arc, Mutex};

/// Everything written to the fake port, one entry per write call, stamped
/// with the (possibly paused) tokio clock.
pub type TxLog = Arc<Mutex<Vec<(tokio::time::Instant, Vec<u8>)>>>;

pub struct FakeBuffer {
    response_buf: Vec<u8>,
    tx_log: TxLog,
}

impl FakeBuffer {
    pub fn new(response_buf: Vec<u8>) -> (Self, TxLog) {
        let tx_log = TxLog::default();
        (
            Self {
                response_buf,
                tx_log: tx_log.clone(),
            },
            tx_log,
        )
    }
}

/// Flattens the recorded writes into one command string per line.
pub fn sent_lines(tx_log: &TxLog) -> Vec<String> {
    tx_log
        .lock()
        .expect("tx log")
        .iter()
        .flat_map(|(_, bytes)| {
            String::from_utf8_lossy(bytes)
                .lines()
                .map(str::to_string)
                .collect::<Vec<_>>()
        })
        .collect()
}

impl tokio::io::AsyncRead for FakeBuffer {
    fn poll_read(
        mut self: Pin<&mut Self>,
        _cx: &mut std::task::Context<'_>,
        buf: &mut tokio::io::ReadBuf<'_>,
    ) -> std::task::Poll<std::io::Result<()>> {
        if self.response_buf.is_empty() {
            // A device that never answers. Pending reads are only observed
            // under a timeout, so no waker bookkeeping is needed.
            return std::task::Poll::Pending;
        }
        let c = if buf.capacity() < self.response_buf.len() {
            buf.capacity()
        } else {
            self.response_buf.len()
        };
        buf.put_slice(&self.response_buf[0..c]);
        self.response_buf.drain(0..c);
        std::task::Poll::Ready(Ok(()))
    }
}

impl tokio::io::AsyncWrite for FakeBuffer {
    fn poll_write(
        self: Pin<&mut Self>,
        _cx: &mut std::task::Context<'_>,
        buf: &[u8],
    ) -> std::task::Poll<std::result::Result<usize, std::io::Error>> {
        self.tx_log
            .lock()
            .expect("tx log")
            .push((tokio::time::Instant::now(), buf.to_vec()));
        std::task::Poll::Ready(Ok(buf.len()))
    }

    fn poll_flush(
        self: Pin<&mut Self>,
        _cx: &mut std::task::Context<'_>,
    ) -> std::task::Poll<std::result::Result<(), std::io::Error>> {
        std::task::Poll::Ready(Ok(()))
    }

    fn poll_shutdown(
        self: Pin<&mut Self>,
        _cx: &mut std::task::Context<'_>,
    ) -> std::task::Poll<std::result::Result<(), std::io::Error>> {
        std::task::Poll::Ready(Ok(()))
    }
}
