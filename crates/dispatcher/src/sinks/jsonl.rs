//! JsonlSink - appends records to a JSON-lines file

use contracts::{BridgeError, TelemetryRecord, TelemetrySink};
use std::collections::HashMap;
use std::fs::{self, File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::PathBuf;
use tracing::{debug, instrument};

/// Configuration for JsonlSink
#[derive(Debug, Clone)]
pub struct JsonlSinkConfig {
    /// Output file; when absent, a timestamped file under `base_path`
    pub path: Option<PathBuf>,

    /// Directory for auto-named output files
    pub base_path: PathBuf,
}

impl JsonlSinkConfig {
    /// Create config from params map
    pub fn from_params(params: &HashMap<String, String>) -> Self {
        Self {
            path: params.get("path").map(PathBuf::from),
            base_path: params
                .get("base_path")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("./output")),
        }
    }

    fn resolve_path(&self) -> PathBuf {
        match &self.path {
            Some(path) => path.clone(),
            None => {
                let stamp = chrono::Utc::now().format("%Y%m%d-%H%M%S");
                self.base_path.join(format!("telemetry-{stamp}.jsonl"))
            }
        }
    }
}

/// Sink that writes one JSON object per record
pub struct JsonlSink {
    name: String,
    path: PathBuf,
    writer: BufWriter<File>,
}

impl JsonlSink {
    /// Create a new JsonlSink
    pub fn new(name: impl Into<String>, config: JsonlSinkConfig) -> std::io::Result<Self> {
        let path = config.resolve_path();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let file = OpenOptions::new().create(true).append(true).open(&path)?;

        Ok(Self {
            name: name.into(),
            path,
            writer: BufWriter::new(file),
        })
    }

    /// Create from params map (for factory)
    pub fn from_params(
        name: impl Into<String>,
        params: &HashMap<String, String>,
    ) -> std::io::Result<Self> {
        Self::new(name, JsonlSinkConfig::from_params(params))
    }

    /// Output file path
    pub fn path(&self) -> &PathBuf {
        &self.path
    }

    fn append_record(&mut self, record: &TelemetryRecord) -> std::io::Result<()> {
        serde_json::to_writer(&mut self.writer, record)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
        self.writer.write_all(b"\n")
    }
}

impl TelemetrySink for JsonlSink {
    fn name(&self) -> &str {
        &self.name
    }

    #[instrument(
        name = "jsonl_sink_write",
        skip(self, record),
        fields(sink = %self.name, record = record.tag())
    )]
    async fn write(&mut self, record: &TelemetryRecord) -> Result<(), BridgeError> {
        self.append_record(record)
            .map_err(|e| BridgeError::sink_write(&self.name, e.to_string()))
    }

    #[instrument(name = "jsonl_sink_flush", skip(self))]
    async fn flush(&mut self) -> Result<(), BridgeError> {
        self.writer
            .flush()
            .map_err(|e| BridgeError::sink_write(&self.name, e.to_string()))
    }

    #[instrument(name = "jsonl_sink_close", skip(self))]
    async fn close(&mut self) -> Result<(), BridgeError> {
        self.writer
            .flush()
            .map_err(|e| BridgeError::sink_write(&self.name, e.to_string()))?;
        debug!(sink = %self.name, path = %self.path.display(), "JsonlSink closed");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::{BaroRecord, Header, Timestamp};
    use tempfile::tempdir;

    fn record(sec: u64) -> TelemetryRecord {
        TelemetryRecord::Barometer(BaroRecord {
            header: Header {
                stamp: Timestamp::new(sec, 0),
                frame_id: "body".to_string(),
            },
            fluid_pressure: 99.0,
        })
    }

    #[tokio::test]
    async fn test_jsonl_sink_writes_lines() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("records.jsonl");
        let config = JsonlSinkConfig {
            path: Some(path.clone()),
            base_path: dir.path().to_path_buf(),
        };

        let mut sink = JsonlSink::new("test_jsonl", config).unwrap();
        sink.write(&record(1)).await.unwrap();
        sink.write(&record(2)).await.unwrap();
        sink.flush().await.unwrap();

        let content = fs::read_to_string(&path).unwrap();
        let lines: Vec<_> = content.lines().collect();
        assert_eq!(lines.len(), 2);

        let parsed: TelemetryRecord = serde_json::from_str(lines[0]).unwrap();
        assert_eq!(parsed.tag(), "barometer");
    }

    #[tokio::test]
    async fn test_jsonl_sink_auto_names_file() {
        let dir = tempdir().unwrap();
        let config = JsonlSinkConfig {
            path: None,
            base_path: dir.path().to_path_buf(),
        };

        let mut sink = JsonlSink::new("auto", config).unwrap();
        sink.write(&record(1)).await.unwrap();
        sink.close().await.unwrap();

        let entries: Vec<_> = fs::read_dir(dir.path()).unwrap().collect();
        assert_eq!(entries.len(), 1);
    }
}
