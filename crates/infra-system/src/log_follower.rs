// Follow read over an append-only log file
//
// Polls for new bytes and hands out complete lines only. A line whose
// newline has not been written yet stays buffered until it arrives.

use async_trait::async_trait;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::PathBuf;
use std::time::Duration;
use tracing::debug;

use ecco_core::application::constants::TAIL_POLL_INTERVAL;
use ecco_core::port::LogFollower;

/// Strip one trailing `\n` (and a `\r` before it), decode lossily
pub(crate) fn decode_line(raw: &[u8]) -> String {
    let line = raw.strip_suffix(b"\n").unwrap_or(raw);
    let line = line.strip_suffix(b"\r").unwrap_or(line);
    String::from_utf8_lossy(line).into_owned()
}

pub struct FileFollower {
    path: PathBuf,
    reader: Option<BufReader<File>>,
    pending: Vec<u8>,
    poll_interval: Duration,
}

impl FileFollower {
    /// Follow `path` from its first byte; waits for the file if it does not exist yet
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            reader: None,
            pending: Vec::new(),
            poll_interval: TAIL_POLL_INTERVAL,
        }
    }

    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    async fn ensure_open(&mut self) -> std::io::Result<()> {
        while self.reader.is_none() {
            match File::open(&self.path) {
                Ok(file) => {
                    debug!(path = %self.path.display(), "Opened log for following");
                    self.reader = Some(BufReader::new(file));
                }
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                    tokio::time::sleep(self.poll_interval).await;
                }
                Err(e) => return Err(e),
            }
        }
        Ok(())
    }

    /// Read whatever is available; true once `pending` holds a complete line
    fn fill_pending(&mut self) -> std::io::Result<bool> {
        let Some(reader) = self.reader.as_mut() else {
            return Ok(false);
        };
        loop {
            match reader.read_until(b'\n', &mut self.pending) {
                Ok(_) => return Ok(self.pending.last() == Some(&b'\n')),
                Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            }
        }
    }
}

#[async_trait]
impl LogFollower for FileFollower {
    async fn next_line(&mut self) -> std::io::Result<String> {
        self.ensure_open().await?;
        loop {
            if self.fill_pending()? {
                let line = decode_line(&self.pending);
                self.pending.clear();
                return Ok(line);
            }
            tokio::time::sleep(self.poll_interval).await;
        }
    }
}
