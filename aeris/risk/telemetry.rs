use std::{path::Path, sync::Arc};

use anyhow::Result;
use serde_json::Value;
use tokio::runtime::Runtime;

use aeris_events::{EventPublisher, EventRecord, FileEventPublisher};
use aeris_logging::{JsonlLogger, LogLevel, LogRecord};

/// Component tag stamped on records emitted by this crate.
const COMPONENT: &str = "aeris-risk";

/// Blocking wrapper around the async file event publisher.
///
/// The scoring path is synchronous, so the sink owns a small runtime and
/// blocks until the event is durable.
#[derive(Debug)]
pub struct EventSink {
    runtime: Runtime,
    publisher: FileEventPublisher,
}

impl EventSink {
    /// Creates a sink appending to the given event log.
    pub fn new(path: impl AsRef<Path>) -> Result<Self> {
        Ok(Self {
            runtime: Runtime::new()?,
            publisher: FileEventPublisher::new(path)?,
        })
    }

    /// Publishes one event.
    pub fn publish(&self, record: EventRecord) -> Result<()> {
        self.runtime.block_on(self.publisher.publish(record))
    }
}

/// Optional logging and event sinks threaded through scoring and training.
///
/// Telemetry failures are surfaced to callers, which swallow them: losing a
/// log line must never fail a scoring request.
#[derive(Debug, Default)]
pub struct RiskTelemetry {
    logger: Option<Arc<JsonlLogger>>,
    events: Option<EventSink>,
}

impl RiskTelemetry {
    /// Starts building a telemetry configuration.
    #[must_use]
    pub fn builder() -> RiskTelemetryBuilder {
        RiskTelemetryBuilder::default()
    }

    /// Writes one structured log record.
    pub fn log(&self, level: LogLevel, message: &str, fields: Value) -> Result<()> {
        if let Some(logger) = &self.logger {
            logger.log(&LogRecord::new(COMPONENT, level, message).with_fields(fields))?;
        }
        Ok(())
    }

    /// Publishes one event record.
    pub fn event(&self, event_type: &str, payload: Value) -> Result<()> {
        if let Some(events) = &self.events {
            events.publish(EventRecord::new(COMPONENT, event_type, payload))?;
        }
        Ok(())
    }
}

/// Builder for [`RiskTelemetry`].
#[derive(Debug, Default)]
pub struct RiskTelemetryBuilder {
    logger: Option<Arc<JsonlLogger>>,
    events: Option<EventSink>,
}

impl RiskTelemetryBuilder {
    /// Attaches a JSONL log file.
    pub fn with_log_file(mut self, path: impl AsRef<Path>) -> Result<Self> {
        self.logger = Some(Arc::new(JsonlLogger::create(path)?));
        Ok(self)
    }

    /// Attaches a durable event log.
    pub fn with_event_file(mut self, path: impl AsRef<Path>) -> Result<Self> {
        self.events = Some(EventSink::new(path)?);
        Ok(self)
    }

    /// Finalizes the configuration.
    #[must_use]
    pub fn build(self) -> RiskTelemetry {
        RiskTelemetry {
            logger: self.logger,
            events: self.events,
        }
    }
}
