use eventring::{ConsumerGroup, Pipeline, PipelineConfig, ProducerMode};
use proptest::prelude::*;
use std::sync::{Arc, Mutex};

fn run_pipeline(capacity: usize, mode: ProducerMode, batches: &[Vec<u32>]) -> (Vec<u32>, Vec<u32>) {
    let pipeline: Pipeline<u32> = Pipeline::new(
        PipelineConfig::new()
            .with_ring_capacity(capacity)
            .with_producer_mode(mode),
    );
    let first = Arc::new(Mutex::new(Vec::new()));
    let second = Arc::new(Mutex::new(Vec::new()));

    let log = Arc::clone(&first);
    pipeline
        .register(ConsumerGroup::new("first").handle_with(move |event: &u32, _, _| {
            log.lock().expect("first lock").push(*event);
            Ok(())
        }))
        .expect("register first");
    let log = Arc::clone(&second);
    pipeline
        .register(ConsumerGroup::new("second").after("first").handle_with(
            move |event: &u32, _, _| {
                log.lock().expect("second lock").push(*event);
                Ok(())
            },
        ))
        .expect("register second");

    pipeline.start().expect("start");
    let publisher = pipeline.publisher().expect("publisher");
    for batch in batches {
        if batch.len() == 1 {
            publisher.publish(batch[0]).expect("publish");
        } else {
            publisher.publish_batch(batch.iter().copied()).expect("publish batch");
        }
    }
    pipeline.drain();

    let first = first.lock().expect("first lock").clone();
    let second = second.lock().expect("second lock").clone();
    (first, second)
}

#[cfg(test)]
mod tests_ordering_property {
    use super::*;

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(32))]

        #[test]
        fn prop_every_group_sees_publish_order(
            capacity_exp in 1u32..6,
            single in any::<bool>(),
            batches in prop::collection::vec(prop::collection::vec(any::<u32>(), 1..4), 0..40),
        ) {
            let capacity = 1usize << capacity_exp;
            // Batches must fit in the ring
            let batches: Vec<Vec<u32>> = batches
                .into_iter()
                .map(|mut batch| {
                    batch.truncate(capacity - 1);
                    batch
                })
                .collect();
            let mode = if single { ProducerMode::Single } else { ProducerMode::Multi };

            let expected: Vec<u32> = batches.iter().flatten().copied().collect();
            let (first, second) = run_pipeline(capacity, mode, &batches);
            prop_assert_eq!(&first, &expected);
            prop_assert_eq!(&second, &expected);
        }
    }
}
