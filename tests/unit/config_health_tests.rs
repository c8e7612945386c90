use eventring::{
    ConfigurationError, GroupStatus, Pipeline, PipelineConfig, PipelineHealth, PipelineState,
    ProducerMode, ShutdownReport, WaitStrategyKind,
};

#[cfg(test)]
mod tests_config {
    use super::*;

    #[test]
    fn test_config_json_round_trip() {
        let config = PipelineConfig::new()
            .with_ring_capacity(256)
            .with_wait_strategy(WaitStrategyKind::Sleeping)
            .with_producer_mode(ProducerMode::Single);
        let json = config.to_json().expect("serialize config");
        assert!(json.contains("\"sleeping\""));
        let parsed = PipelineConfig::from_json(&json).expect("parse config");
        assert_eq!(parsed, config);
    }

    #[test]
    fn test_config_rejects_unknown_fields() {
        let err = PipelineConfig::from_json(r#"{"ring_capacity": 8, "threads": 4}"#)
            .expect_err("unknown field");
        assert!(matches!(err, ConfigurationError::Malformed { .. }));
    }

    #[test]
    fn test_config_capacity_checked_at_start() {
        let config = PipelineConfig::from_json(r#"{"ring_capacity": 100}"#).expect("parse config");
        let pipeline: Pipeline<u8> = Pipeline::new(config);
        let err = pipeline.start().expect_err("capacity 100 is not a power of two");
        assert_eq!(
            err.to_string(),
            "invalid ring capacity 100: must be a power of two and at least 2"
        );
        assert_eq!(pipeline.state(), PipelineState::Created);
    }
}

#[cfg(test)]
mod tests_health {
    use super::*;

    #[test]
    fn test_health_snapshot_serializes_after_drain() {
        let pipeline: Pipeline<u32> = Pipeline::new(PipelineConfig::new().with_ring_capacity(16));
        pipeline
            .register(eventring::ConsumerGroup::new("count").handle_with(|_: &u32, _, _| Ok(())))
            .expect("register");
        pipeline.start().expect("start");
        let publisher = pipeline.publisher().expect("publisher");
        for value in 0..5 {
            publisher.publish(value).expect("publish");
        }
        pipeline.drain();

        let health = pipeline.health();
        let json = health.to_json().expect("serialize health");
        let decoded: PipelineHealth = serde_json::from_str(&json).expect("decode health");
        assert_eq!(decoded, health);
        assert_eq!(decoded.state, PipelineState::Stopped);
        assert_eq!(decoded.cursor, 4);
        assert_eq!(decoded.groups[0].status, GroupStatus::Stopped);
        assert_eq!(decoded.max_lag(), 0);
    }

    #[test]
    fn test_shutdown_report_serializes() {
        let pipeline: Pipeline<u32> = Pipeline::new(PipelineConfig::new());
        let report = pipeline.shutdown(std::time::Duration::from_millis(1));
        let json = serde_json::to_string(&report).expect("serialize report");
        let decoded: ShutdownReport = serde_json::from_str(&json).expect("decode report");
        assert_eq!(decoded, report);
        assert!(decoded.is_clean());
    }
}
