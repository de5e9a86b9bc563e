use log::{debug, trace};
use regex::Regex;
use tokio::{
    io::{AsyncRead, AsyncReadExt},
    sync::oneshot,
};
use tokio_util::sync::CancellationToken;

pub(crate) const CHUNK_LEN: usize = 1024;

/// First thing a scanner observed on its stream.
#[derive(Clone, Eq, PartialEq, Hash, Debug)]
pub enum Signal {
    Match(String),
    EndOfStream,
}

impl Signal {
    pub fn into_match(self) -> Option<String> {
        match self {
            Signal::Match(text) => Some(text),
            Signal::EndOfStream => None,
        }
    }
}

/// Reads a live stream chunk by chunk and reports the first chunk that matches a pattern.
///
/// Each chunk is matched on its own, so a match that straddles two reads is not seen.
pub struct SignalScanner<R> {
    reader: R,
    pattern: Regex,
}

impl<R> SignalScanner<R>
where
    R: AsyncRead + Unpin,
{
    pub fn new(reader: R, pattern: Regex) -> Self {
        Self { reader, pattern }
    }

    /// Reads until the first match or end-of-stream. A read error ends the stream.
    pub async fn scan(&mut self) -> Signal {
        let mut buf = [0; CHUNK_LEN];
        loop {
            let read_bytes = match self.reader.read(&mut buf).await {
                Ok(0) => return Signal::EndOfStream,
                Ok(read_bytes) => read_bytes,
                Err(err) => {
                    debug!("stream read failed, treating as end of stream: {}", err);
                    return Signal::EndOfStream;
                }
            };
            let chunk = String::from_utf8_lossy(&buf[..read_bytes]);
            trace!("scanning {} bytes", read_bytes);
            if let Some(found) = self.pattern.find(&chunk) {
                return Signal::Match(found.as_str().to_owned());
            }
        }
    }
}

/// Runs a [`SignalScanner`] in the background and delivers its single signal.
///
/// The task ends after sending, when `token` is cancelled, or when the
/// receiver is dropped, whichever comes first; the reader is dropped with it.
pub fn spawn_scanner<R>(
    reader: R,
    pattern: Regex,
    token: CancellationToken,
) -> oneshot::Receiver<Signal>
where
    R: AsyncRead + Unpin + Send + 'static,
{
    let (mut tx, rx) = oneshot::channel();
    tokio::spawn(async move {
        let mut scanner = SignalScanner::new(reader, pattern);
        let signal = tokio::select! {
            signal = scanner.scan() => Some(signal),
            _ = token.cancelled() => None,
            _ = tx.closed() => None,
        };
        match signal {
            Some(signal) => {
                let _ = tx.send(signal);
            }
            None => debug!("scanner stopped before a signal was observed"),
        }
    });
    rx
}
