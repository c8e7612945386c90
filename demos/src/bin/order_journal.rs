//! Example of a three-stage pipeline for incoming orders
//!
//! This example shows how to:
//! 1. Register consumer groups with dependencies (journal and replicate, then apply)
//! 2. Publish from several producer threads
//! 3. Reuse pre-allocated slots with `publish_with`
//! 4. Drain the pipeline and inspect its health

use demos::setup_logger;
use eventring::prelude::*;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::thread;
use tracing::info;

#[derive(Debug, Default, Clone)]
struct OrderEvent {
    client: u32,
    price: u64,
    quantity: u64,
}

fn main() {
    setup_logger();

    let pipeline: Arc<Pipeline<OrderEvent>> = Arc::new(Pipeline::new(
        PipelineConfig::new()
            .with_ring_capacity(1024)
            .with_wait_strategy(WaitStrategyKind::Yielding),
    ));

    let journaled = Arc::new(AtomicU64::new(0));
    let counter = Arc::clone(&journaled);
    pipeline
        .register(ConsumerGroup::new("journal").handle_with(
            move |_: &OrderEvent, _, end_of_batch| {
                // A real journal would flush here
                let written = counter.fetch_add(1, Ordering::Relaxed) + 1;
                if end_of_batch && written % 10_000 == 0 {
                    info!(written, "journal flushed");
                }
                Ok(())
            },
        ))
        .expect("register journal");

    let replicated = Arc::new(AtomicU64::new(0));
    let counter = Arc::clone(&replicated);
    pipeline
        .register(ConsumerGroup::new("replicate").handle_with(move |_: &OrderEvent, _, _| {
            counter.fetch_add(1, Ordering::Relaxed);
            Ok(())
        }))
        .expect("register replicate");

    let notional = Arc::new(AtomicU64::new(0));
    let total = Arc::clone(&notional);
    pipeline
        .register(
            ConsumerGroup::new("apply")
                .after("journal")
                .after("replicate")
                .handle_with(move |order: &OrderEvent, _, _| {
                    if order.quantity == 0 {
                        return Err(HandlerError::new(format!(
                            "client {} sent an empty order",
                            order.client
                        )));
                    }
                    total.fetch_add(order.price * order.quantity, Ordering::Relaxed);
                    Ok(())
                }),
        )
        .expect("register apply");

    pipeline.start().expect("start pipeline");

    let producers: Vec<_> = (0..4u32)
        .map(|client| {
            let publisher = pipeline.publisher().expect("publisher");
            thread::Builder::new()
                .name(format!("client-{client}"))
                .spawn(move || {
                    for index in 0..25_000u64 {
                        publisher
                            .publish_with(|slot, _| {
                                slot.client = client;
                                slot.price = 100 + index % 7;
                                slot.quantity = if index == 12_345 { 0 } else { 1 + index % 3 };
                            })
                            .expect("publish order");
                    }
                })
                .expect("spawn producer")
        })
        .collect();

    let monitor = Arc::clone(&pipeline);
    for producer in producers {
        producer.join().expect("producer thread");
        let health = monitor.health();
        info!(cursor = health.cursor, max_lag = health.max_lag(), "producer finished");
    }

    pipeline.drain();
    info!(
        journaled = journaled.load(Ordering::Relaxed),
        replicated = replicated.load(Ordering::Relaxed),
        notional = notional.load(Ordering::Relaxed),
        "all orders processed"
    );
    match pipeline.health().to_json() {
        Ok(json) => info!("final health:\n{json}"),
        Err(err) => info!("health not serializable: {err}"),
    }
}
