//! File reporter writing length-delimited PDU frames.
//!
//! Each frame is a varint length prefix followed by the serialized
//! `TracingData`. Routed and broadcast PDUs share the file; readers recover
//! the routing key from the PDU header without decoding full payloads.

use std::fs::{File, OpenOptions};
use std::io::{self, BufWriter, Write};
use std::path::PathBuf;

use bytes::Bytes;
use tracing::{info, warn};

use traceline_core::Reporter;

#[derive(Debug, Clone)]
pub struct FileReporterConfig {
    /// Output file path.
    pub path: PathBuf,

    /// Whether to append to an existing file.
    pub append: bool,

    /// Flush after each frame.
    pub flush_each: bool,
}

impl Default for FileReporterConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("/tmp/traceline.pdus"),
            append: true,
            flush_each: true,
        }
    }
}

pub struct FileReporter {
    config: FileReporterConfig,
    writer: BufWriter<File>,
    frames_written: u64,
    write_errors: u64,
}

impl FileReporter {
    pub fn new(config: FileReporterConfig) -> io::Result<Self> {
        let file = if config.append {
            OpenOptions::new()
                .create(true)
                .append(true)
                .open(&config.path)?
        } else {
            File::create(&config.path)?
        };
        info!(path = %config.path.display(), "file reporter writing PDU frames");
        Ok(Self {
            config,
            writer: BufWriter::new(file),
            frames_written: 0,
            write_errors: 0,
        })
    }

    pub fn frames_written(&self) -> u64 {
        self.frames_written
    }

    pub fn flush(&mut self) -> io::Result<()> {
        self.writer.flush()
    }

    fn write_frame(&mut self, payload: &Bytes) {
        let mut prefix = Vec::with_capacity(4);
        prost::encoding::encode_varint(payload.len() as u64, &mut prefix);

        let result = self
            .writer
            .write_all(&prefix)
            .and_then(|()| self.writer.write_all(payload))
            .and_then(|()| {
                if self.config.flush_each {
                    self.writer.flush()
                } else {
                    Ok(())
                }
            });

        match result {
            Ok(()) => self.frames_written += 1,
            Err(error) => {
                // Delivery failure policy lives here, not in the core: this
                // reporter just counts and logs.
                self.write_errors += 1;
                warn!(%error, "failed to write PDU frame");
            }
        }
    }
}

impl Reporter for FileReporter {
    fn send(&mut self, _routing_key: &[u8], payload: Bytes) {
        self.write_frame(&payload);
    }

    fn broadcast(&mut self, payload: Bytes) {
        self.write_frame(&payload);
    }
}

impl Drop for FileReporter {
    fn drop(&mut self) {
        if let Err(error) = self.writer.flush() {
            warn!(%error, "failed to flush file reporter on drop");
        }
    }
}
