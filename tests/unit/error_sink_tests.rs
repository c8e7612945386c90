use eventring::{ConsumerGroup, HandlerError, Pipeline, PipelineConfig, tokio_channel_sink};
use std::time::Duration;

#[cfg(test)]
mod tests_error_sink {
    use super::*;

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_tokio_channel_sink_forwards_failures() {
        let (sink, mut failures) = tokio_channel_sink();
        let pipeline: Pipeline<u32> = Pipeline::new(PipelineConfig::new().with_ring_capacity(8));
        pipeline.set_error_sink(sink).expect("set sink");
        pipeline
            .register(ConsumerGroup::new("odd").handle_with(|event: &u32, _, _| {
                if event % 2 == 1 {
                    Err(HandlerError::new(format!("odd event {event}")))
                } else {
                    Ok(())
                }
            }))
            .expect("register");
        pipeline.start().expect("start");

        let publisher = pipeline.publisher().expect("publisher");
        publisher.publish_batch([0, 1, 2, 3]).expect("publish");

        let first = tokio::time::timeout(Duration::from_secs(5), failures.recv())
            .await
            .expect("first failure in time")
            .expect("channel open");
        assert_eq!(first.group, "odd");
        assert_eq!(first.sequence, 1);
        assert_eq!(first.error, "odd event 1");

        let second = tokio::time::timeout(Duration::from_secs(5), failures.recv())
            .await
            .expect("second failure in time")
            .expect("channel open");
        assert_eq!(second.sequence, 3);

        tokio::task::spawn_blocking(move || pipeline.drain())
            .await
            .expect("drain task");
        assert!(failures.try_recv().is_err());
    }

    #[test]
    fn test_failure_record_serializes() {
        let (sink, failures) = eventring::std_channel_sink();
        let pipeline: Pipeline<u32> = Pipeline::new(PipelineConfig::new().with_ring_capacity(4));
        pipeline.set_error_sink(sink).expect("set sink");
        pipeline
            .register(
                ConsumerGroup::new("always").handle_with(|_: &u32, _, _| Err("rejected".into())),
            )
            .expect("register");
        pipeline.start().expect("start");
        pipeline.publisher().expect("publisher").publish(7).expect("publish");
        pipeline.drain();

        let failure = failures.try_recv().expect("one failure");
        assert!(failure.timestamp_ms > 0);
        let json = serde_json::to_value(&failure).expect("serialize failure");
        assert_eq!(json["group"], "always");
        assert_eq!(json["error"], "rejected");
        assert_eq!(json["panicked"], false);
    }
}
