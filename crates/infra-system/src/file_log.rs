// File-backed log store and sink
//
// One writer per run, opened in append mode. Every line goes out in a single
// write followed by flush + fdatasync, so a concurrent follower sees whole
// lines in write order.

use std::fs::{self, File, OpenOptions};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use ecco_core::port::{LogSink, LogStore, SinkError};

const COUNT_CHUNK: usize = 64 * 1024;

/// Log store on the local filesystem
#[derive(Debug, Default, Clone, Copy)]
pub struct FileLogStore;

impl FileLogStore {
    pub fn new() -> Self {
        Self
    }
}

impl LogStore for FileLogStore {
    fn prepare(&self, path: &Path) -> Result<u64, SinkError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|source| SinkError::CreateDir {
                path: parent.to_path_buf(),
                source,
            })?;
        }

        let file = match File::open(path) {
            Ok(file) => file,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(0),
            Err(source) => {
                return Err(SinkError::Read {
                    path: path.to_path_buf(),
                    source,
                })
            }
        };

        let (lines, terminated) = count_lines(file).map_err(|source| SinkError::Read {
            path: path.to_path_buf(),
            source,
        })?;

        if !terminated {
            debug!(path = %path.display(), "Terminating unfinished last line of existing log");
            let mut sink = FileLogSink::open(path)?;
            sink.write_raw(b"\n")?;
        }

        if lines > 0 {
            info!(path = %path.display(), existing_lines = lines, "Appending to existing log");
        }

        Ok(lines)
    }

    fn open_sink(&self, path: &Path) -> Result<Box<dyn LogSink>, SinkError> {
        Ok(Box::new(FileLogSink::open(path)?))
    }
}

/// Count lines the way a line reader would: an unterminated tail counts as one.
/// Also reports whether the content ends with a newline (empty counts as terminated).
fn count_lines(mut reader: impl Read) -> std::io::Result<(u64, bool)> {
    let mut buf = vec![0u8; COUNT_CHUNK];
    let mut newlines = 0u64;
    let mut last = None;

    loop {
        let n = match reader.read(&mut buf) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        };
        newlines += buf[..n].iter().filter(|&&b| b == b'\n').count() as u64;
        last = Some(buf[n - 1]);
    }

    Ok(match last {
        None | Some(b'\n') => (newlines, true),
        Some(_) => (newlines + 1, false),
    })
}

/// Append-only sink bound to one file
pub struct FileLogSink {
    path: PathBuf,
    file: File,
}

impl FileLogSink {
    pub fn open(path: &Path) -> Result<Self, SinkError> {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .map_err(|source| SinkError::Open {
                path: path.to_path_buf(),
                source,
            })?;

        Ok(Self {
            path: path.to_path_buf(),
            file,
        })
    }

    fn write_raw(&mut self, bytes: &[u8]) -> Result<(), SinkError> {
        self.file
            .write_all(bytes)
            .and_then(|_| self.file.flush())
            .and_then(|_| self.file.sync_data())
            .map_err(|source| SinkError::Write {
                path: self.path.clone(),
                source,
            })
    }
}

impl LogSink for FileLogSink {
    fn append_line(&mut self, text: &str) -> Result<(), SinkError> {
        let mut line = String::with_capacity(text.len() + 1);
        line.push_str(text);
        line.push('\n');
        self.write_raw(line.as_bytes())
    }
}
