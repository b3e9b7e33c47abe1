use prometheus::{Encoder, HistogramOpts, HistogramVec, IntCounterVec, Opts, Registry, TextEncoder};

// ============================================================================
// Metrics Module - Prometheus metrics for observability
// ============================================================================
//
// Provides metrics for:
// - Command processing (received, no-op outcomes, duration)
// - Events appended per event kind
// - Read-side projection updates
//
// All metrics are registered on a central Registry; `render` produces the
// standard text exposition format.
//
// ============================================================================

/// Central metrics registry for the entire application
pub struct Metrics {
    registry: Registry,

    // Command Metrics
    pub commands_received: IntCounterVec,
    pub commands_noop: IntCounterVec,
    pub command_duration: HistogramVec,

    // Event Metrics
    pub events_appended: IntCounterVec,

    // Projection Metrics
    pub projection_updates: IntCounterVec,
}

impl Metrics {
    pub fn new() -> anyhow::Result<Self> {
        let registry = Registry::new();

        let commands_received = IntCounterVec::new(
            Opts::new("commands_received_total", "Total commands received"),
            &["command"],
        )?;
        registry.register(Box::new(commands_received.clone()))?;

        let commands_noop = IntCounterVec::new(
            Opts::new(
                "commands_noop_total",
                "Total commands whose preconditions were not met (no events emitted)",
            ),
            &["command"],
        )?;
        registry.register(Box::new(commands_noop.clone()))?;

        let command_duration = HistogramVec::new(
            HistogramOpts::new("command_duration_seconds", "Command processing duration")
                .buckets(vec![0.001, 0.005, 0.01, 0.05, 0.1, 0.5, 1.0]),
            &["command"],
        )?;
        registry.register(Box::new(command_duration.clone()))?;

        let events_appended = IntCounterVec::new(
            Opts::new("events_appended_total", "Total events appended to streams"),
            &["event_type"],
        )?;
        registry.register(Box::new(events_appended.clone()))?;

        let projection_updates = IntCounterVec::new(
            Opts::new(
                "projection_updates_total",
                "Total events folded into the read-side projection",
            ),
            &["event_type"],
        )?;
        registry.register(Box::new(projection_updates.clone()))?;

        Ok(Self {
            registry,
            commands_received,
            commands_noop,
            command_duration,
            events_appended,
            projection_updates,
        })
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn record_command_received(&self, command: &str) {
        self.commands_received.with_label_values(&[command]).inc();
    }

    pub fn record_command_noop(&self, command: &str) {
        self.commands_noop.with_label_values(&[command]).inc();
    }

    pub fn observe_command_duration(&self, command: &str, seconds: f64) {
        self.command_duration
            .with_label_values(&[command])
            .observe(seconds);
    }

    pub fn record_event_appended(&self, event_type: &str) {
        self.events_appended.with_label_values(&[event_type]).inc();
    }

    pub fn record_projection_update(&self, event_type: &str) {
        self.projection_updates
            .with_label_values(&[event_type])
            .inc();
    }

    /// Render all registered metrics in the text exposition format.
    pub fn render(&self) -> anyhow::Result<String> {
        let mut buffer = Vec::new();
        TextEncoder::new().encode(&self.registry.gather(), &mut buffer)?;
        Ok(String::from_utf8(buffer)?)
    }
}

// ============================================================================
// Unit Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_creation() {
        let metrics = Metrics::new().unwrap();
        assert!(metrics.registry.gather().len() > 0);
    }

    #[test]
    fn test_record_command_lifecycle() {
        let metrics = Metrics::new().unwrap();
        metrics.record_command_received("create-court-order");
        metrics.record_command_received("create-court-order");
        metrics.record_command_noop("update-court-order-validity");
        metrics.observe_command_duration("create-court-order", 0.002);

        let gathered = metrics.registry.gather();
        let received = gathered
            .iter()
            .find(|m| m.name() == "commands_received_total")
            .unwrap();
        assert_eq!(received.metric[0].counter.value, Some(2.0));
    }

    #[test]
    fn test_record_events_by_type() {
        let metrics = Metrics::new().unwrap();
        metrics.record_event_appended("CourtOrderRequested");
        metrics.record_event_appended("CourtOrderRemoved");

        let gathered = metrics.registry.gather();
        let appended = gathered
            .iter()
            .find(|m| m.name() == "events_appended_total")
            .unwrap();
        assert_eq!(appended.metric.len(), 2);
    }

    #[test]
    fn test_render_text_format() {
        let metrics = Metrics::new().unwrap();
        metrics.record_command_received("remove-court-order");
        let rendered = metrics.render().unwrap();
        assert!(rendered.contains("commands_received_total"));
    }
}
