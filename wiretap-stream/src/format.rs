//! Formatter pipeline stage
//!
//! Converts decoded records into serialized output frames, one frame per
//! record, preserving capture order. The stage runs as a single-consumer
//! task between two bounded channels, so it applies backpressure rather
//! than buffering without bound.

use bytes::Bytes;
use std::fmt;
use std::fmt::Write;
use std::str::FromStr;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::warn;
use wiretap_core::{Error, Record, Result, SessionStatsCounters};

/// Frames buffered between the formatter and the sink
pub const FORMAT_QUEUE_DEPTH: usize = 16;

/// Output format of a capture session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Formatter {
    /// Human-oriented multi-line text block per record
    Text,
    /// One JSON object per record
    Json,
}

impl FromStr for Formatter {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "text" => Ok(Formatter::Text),
            "json" => Ok(Formatter::Json),
            other => Err(Error::config(format!(
                "unknown format '{other}' (expected \"text\" or \"json\")"
            ))),
        }
    }
}

impl fmt::Display for Formatter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Formatter::Text => write!(f, "text"),
            Formatter::Json => write!(f, "json"),
        }
    }
}

impl Formatter {
    /// Spawn the format stage
    ///
    /// Consumes records until the input channel closes; the returned
    /// channel closes when the stage ends. A record that fails to
    /// serialize is logged and dropped, never fatal to the stream.
    pub fn spawn(
        self,
        mut records: mpsc::Receiver<Record>,
        stats: Arc<SessionStatsCounters>,
    ) -> mpsc::Receiver<Bytes> {
        let (tx, rx) = mpsc::channel(FORMAT_QUEUE_DEPTH);

        tokio::spawn(async move {
            while let Some(record) = records.recv().await {
                let frame = match self.format(&record) {
                    Ok(frame) => frame,
                    Err(e) => {
                        warn!(error = %e, "record dropped");
                        stats.record_dropped();
                        continue;
                    }
                };
                stats.record_formatted();
                if tx.send(frame).await.is_err() {
                    break;
                }
            }
        });

        rx
    }

    /// Format one record into an output frame
    pub fn format(&self, record: &Record) -> Result<Bytes> {
        match self {
            Formatter::Text => Ok(Bytes::from(render_text(record))),
            Formatter::Json => render_json(record),
        }
    }
}

fn render_json(record: &Record) -> Result<Bytes> {
    let (src, dst) = record.flow();
    let mut value =
        serde_json::to_value(record).map_err(|e| Error::Format(e.to_string()))?;
    value["src"] = src.into();
    value["dst"] = dst.into();
    serde_json::to_vec(&value)
        .map(Bytes::from)
        .map_err(|e| Error::Format(e.to_string()))
}

fn render_text(record: &Record) -> String {
    let (src, dst) = record.flow();
    let mut out = String::new();

    let _ = writeln!(out, "PACKET: {src} -> {dst} @ {}", record.timestamp);
    let _ = writeln!(
        out,
        "\tLength: {} (captured {}) from device {}",
        record.length, record.capture_length, record.device_index
    );

    for (i, layer) in record.layers.iter().enumerate() {
        let _ = writeln!(
            out,
            "  Layer {} {}: src {} -> dst {}",
            i + 1,
            layer.layer_type,
            layer.src,
            layer.dst
        );
        if !layer.fields.is_empty() {
            let _ = writeln!(out, "\tFields:");
            for (name, value) in &layer.fields {
                let _ = writeln!(out, "\t    {name}: {value}");
            }
        }
        if !layer.payload.is_empty() {
            let _ = writeln!(out, "\tDump:");
            for line in hex_dump(&layer.payload) {
                let _ = writeln!(out, "\t    {line}");
            }
        }
    }

    out
}

/// Render bytes as offset-prefixed hex rows with an ASCII gutter,
/// 16 bytes per row
pub fn hex_dump(data: &[u8]) -> Vec<String> {
    data.chunks(16)
        .enumerate()
        .map(|(row, chunk)| {
            let mut line = String::with_capacity(78);
            let _ = write!(line, "{:08x}  ", row * 16);
            for i in 0..16 {
                match chunk.get(i) {
                    Some(b) => {
                        let _ = write!(line, "{b:02x} ");
                    }
                    None => line.push_str("   "),
                }
                if i == 7 {
                    line.push(' ');
                }
            }
            line.push_str(" |");
            for b in chunk {
                line.push(if b.is_ascii_graphic() || *b == b' ' {
                    *b as char
                } else {
                    '.'
                });
            }
            line.push('|');
            line
        })
        .collect()
}
