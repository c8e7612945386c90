//! Example comparing a graceful drain with a bounded shutdown
//!
//! A deliberately slow consumer group cannot keep up with the producer. The
//! pipeline is stopped with a short timeout, and the report lists what was left
//! unprocessed. Handler failures are forwarded to a channel and printed.

use demos::setup_logger;
use eventring::prelude::*;
use std::thread;
use std::time::Duration;
use tracing::{info, warn};

fn main() {
    setup_logger();

    let config = PipelineConfig::from_json(
        r#"{ "ring_capacity": 64, "wait_strategy": "sleeping", "producer_mode": "single" }"#,
    )
    .expect("valid configuration");
    info!("configuration:\n{}", config.to_json().expect("serializable configuration"));

    let pipeline: Pipeline<u64> = Pipeline::new(config);
    let (sink, failures) = std_channel_sink();
    pipeline.set_error_sink(sink).expect("set error sink");

    pipeline
        .register(ConsumerGroup::new("validate").handle_with(|event: &u64, _, _| {
            if event % 50 == 49 {
                return Err(format!("event {event} failed validation").into());
            }
            Ok(())
        }))
        .expect("register validate");
    pipeline
        .register(
            ConsumerGroup::new("archive")
                .after("validate")
                .policy(FailurePolicy::SkipAndContinue)
                .handle_with(|_: &u64, _, _| {
                    thread::sleep(Duration::from_millis(2));
                    Ok(())
                }),
        )
        .expect("register archive");

    pipeline.start().expect("start pipeline");
    let publisher = pipeline.publisher().expect("publisher");
    for value in 0..200 {
        if let Err(err) = publisher.publish(value) {
            warn!("stopped publishing: {err}");
            break;
        }
    }

    let report = pipeline.shutdown(Duration::from_millis(100));
    info!(
        dropped = report.dropped_events,
        timed_out = report.timed_out,
        detached = ?report.detached_groups,
        "shutdown finished"
    );
    for backlog in &report.groups {
        info!(group = %backlog.name, unprocessed = backlog.unprocessed, "backlog");
    }
    match serde_json::to_string_pretty(&report) {
        Ok(json) => info!("report:\n{json}"),
        Err(err) => warn!("report not serializable: {err}"),
    }

    for failure in failures.try_iter() {
        warn!(
            group = %failure.group,
            sequence = failure.sequence,
            "handler failure: {}",
            failure.error
        );
    }
}
