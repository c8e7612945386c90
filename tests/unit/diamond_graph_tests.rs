use eventring::{ConsumerGroup, Pipeline, PipelineConfig, WaitStrategyKind};
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{Arc, Mutex};

#[cfg(test)]
mod tests_diamond {
    use super::*;

    /// `journal` and `replicate` both read the raw event; `apply` needs both.
    fn diamond(wait_strategy: WaitStrategyKind) {
        let journal_seq = Arc::new(AtomicI64::new(-1));
        let replicate_seq = Arc::new(AtomicI64::new(-1));
        let applied = Arc::new(Mutex::new(Vec::new()));

        let pipeline: Pipeline<u64> = Pipeline::new(
            PipelineConfig::new()
                .with_ring_capacity(32)
                .with_wait_strategy(wait_strategy),
        );

        let journal = Arc::clone(&journal_seq);
        pipeline
            .register(
                ConsumerGroup::new("journal").handle_with(move |_: &u64, sequence, _| {
                    journal.store(sequence, Ordering::SeqCst);
                    Ok(())
                }),
            )
            .expect("register journal");

        let replicate = Arc::clone(&replicate_seq);
        pipeline
            .register(
                ConsumerGroup::new("replicate").handle_with(move |_: &u64, sequence, _| {
                    replicate.store(sequence, Ordering::SeqCst);
                    Ok(())
                }),
            )
            .expect("register replicate");

        let journal = Arc::clone(&journal_seq);
        let replicate = Arc::clone(&replicate_seq);
        let log = Arc::clone(&applied);
        pipeline
            .register(
                ConsumerGroup::new("apply")
                    .after("journal")
                    .after("replicate")
                    .handle_with(move |event: &u64, sequence, _| {
                        assert!(journal.load(Ordering::SeqCst) >= sequence);
                        assert!(replicate.load(Ordering::SeqCst) >= sequence);
                        log.lock().expect("apply lock").push(*event);
                        Ok(())
                    }),
            )
            .expect("register apply");

        pipeline.start().expect("start");
        let publisher = pipeline.publisher().expect("publisher");
        for value in 0..1_000 {
            publisher.publish(value).expect("publish");
        }
        pipeline.drain();

        let applied = applied.lock().expect("apply lock");
        assert_eq!(*applied, (0..1_000).collect::<Vec<u64>>());
        let health = pipeline.health();
        assert!(health.groups.iter().all(|group| group.sequence == 999));
    }

    #[test]
    fn test_diamond_with_blocking_wait() {
        diamond(WaitStrategyKind::Blocking);
    }

    #[test]
    fn test_diamond_with_yielding_wait() {
        diamond(WaitStrategyKind::Yielding);
    }

    #[test]
    fn test_diamond_with_sleeping_wait() {
        diamond(WaitStrategyKind::Sleeping);
    }

    #[test]
    fn test_diamond_with_busy_spin_wait() {
        diamond(WaitStrategyKind::BusySpin);
    }
}
