//! # Lifecycle Flows
//!
//! Ingress latency under slow delivery, drain on stop, late callbacks and
//! repeated stops.

#[cfg(test)]
mod tests {
    use crate::fixtures::{apply_transfer, watch_list, DelayedLocker, RecordingNotifier};
    use pulsar_subscriber::{Dispatcher, DropReason, IngestOutcome, Phase, SubscriberConfig};
    use pulsar_telemetry::init_test_logging;
    use std::sync::Arc;
    use std::time::{Duration, Instant};
    use tokio::time::timeout;

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_ingress_does_not_wait_for_slow_notifier() -> anyhow::Result<()> {
        init_test_logging();
        let notifier = Arc::new(RecordingNotifier::new().gated());
        let dispatcher = Dispatcher::new(
            SubscriberConfig::default().with_work_pool_size(2),
            watch_list(&[("app", &["f0100"])]),
            notifier.clone(),
        )?;

        // Every delivery is parked and the pool is saturated after two
        let started = Instant::now();
        for n in 0..200 {
            let outcome = timeout(
                Duration::from_millis(500),
                apply_transfer(&dispatcher, n, "f0100"),
            )
            .await?;
            assert_eq!(outcome, IngestOutcome::Enqueued);
        }
        assert!(started.elapsed() < Duration::from_secs(2));
        assert_eq!(notifier.delivered_count(), 0);

        notifier.open_gate();
        timeout(Duration::from_secs(10), dispatcher.stop()).await?;
        assert_eq!(notifier.delivered_count(), 200);
        Ok(())
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_stop_drains_every_admitted_message() -> anyhow::Result<()> {
        let notifier = Arc::new(RecordingNotifier::new().with_delay(Duration::from_millis(2)));
        let dispatcher = Dispatcher::new(
            SubscriberConfig::default().with_work_pool_size(8),
            watch_list(&[("app-1", &["f0100"]), ("app-2", &["f0100"])]),
            notifier.clone(),
        )?;

        for n in 0..100 {
            assert_eq!(apply_transfer(&dispatcher, n, "f0100").await, IngestOutcome::Enqueued);
        }

        timeout(Duration::from_secs(10), dispatcher.stop()).await?;

        // Stop returned, so every pair is already delivered and the
        // notifier closed exactly once after the last of them
        assert_eq!(notifier.delivered_count(), 200);
        assert_eq!(notifier.close_count(), 1);
        assert_eq!(dispatcher.phase(), Phase::Stopped);
        assert_eq!(dispatcher.queue_depth(), 0);
        Ok(())
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_call_admitted_before_stop_is_not_lost() -> anyhow::Result<()> {
        let notifier = Arc::new(RecordingNotifier::new());
        let dispatcher = Dispatcher::with_locker(
            SubscriberConfig::default(),
            Arc::new(DelayedLocker::new(Duration::from_millis(200))),
            watch_list(&[("app", &["f0100"])]),
            notifier.clone(),
        )?;

        // Parked inside the dedup round trip when stop begins
        let in_flight = {
            let dispatcher = dispatcher.clone();
            tokio::spawn(async move { apply_transfer(&dispatcher, 1, "f0100").await })
        };
        tokio::time::sleep(Duration::from_millis(50)).await;

        let stopper = {
            let dispatcher = dispatcher.clone();
            tokio::spawn(async move { dispatcher.stop().await })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(dispatcher.phase(), Phase::Stopping);

        // New work during Stopping is turned away immediately
        let late = timeout(
            Duration::from_millis(100),
            apply_transfer(&dispatcher, 2, "f0100"),
        )
        .await?;
        assert_eq!(late, IngestOutcome::Dropped(DropReason::ShuttingDown));

        assert_eq!(in_flight.await?, IngestOutcome::Enqueued);
        timeout(Duration::from_secs(5), stopper).await??;

        let deliveries = notifier.deliveries();
        assert_eq!(deliveries.len(), 1);
        assert_eq!(deliveries[0].root_cid, crate::fixtures::cid(1));
        Ok(())
    }

    #[tokio::test]
    async fn test_late_arrival_after_stop_is_ignored() -> anyhow::Result<()> {
        let notifier = Arc::new(RecordingNotifier::new());
        let dispatcher = Dispatcher::new(
            SubscriberConfig::default(),
            watch_list(&[("app", &["f0100"])]),
            notifier.clone(),
        )?;
        timeout(Duration::from_secs(5), dispatcher.stop()).await?;

        let outcome = apply_transfer(&dispatcher, 1, "f0100").await;
        assert_eq!(outcome, IngestOutcome::Dropped(DropReason::ShuttingDown));

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(notifier.attempts(), 0);
        assert_eq!(dispatcher.stats().dropped, 1);
        Ok(())
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_stop_is_idempotent() -> anyhow::Result<()> {
        let notifier = Arc::new(RecordingNotifier::new().with_delay(Duration::from_millis(20)));
        let dispatcher = Dispatcher::new(
            SubscriberConfig::default(),
            watch_list(&[("app", &["f0100"])]),
            notifier.clone(),
        )?;
        for n in 0..5 {
            apply_transfer(&dispatcher, n, "f0100").await;
        }

        // Concurrent stops all wait for the same drain
        let a = dispatcher.clone();
        let b = dispatcher.clone();
        timeout(Duration::from_secs(5), async move {
            tokio::join!(a.stop(), b.stop());
        })
        .await?;
        assert_eq!(notifier.delivered_count(), 5);

        // Repeated stop on a stopped dispatcher returns promptly
        timeout(Duration::from_millis(100), dispatcher.stop()).await?;
        timeout(Duration::from_millis(100), dispatcher.wait_stopped()).await?;
        assert_eq!(notifier.close_count(), 1);
        Ok(())
    }

    #[tokio::test]
    async fn test_panicking_close_hook_still_stops() -> anyhow::Result<()> {
        let notifier = Arc::new(RecordingNotifier::new().panicking_on_close());
        let dispatcher = Dispatcher::new(
            SubscriberConfig::default(),
            watch_list(&[("app", &["f0100"])]),
            notifier.clone(),
        )?;
        apply_transfer(&dispatcher, 1, "f0100").await;

        timeout(Duration::from_secs(3), dispatcher.stop()).await?;
        assert_eq!(dispatcher.phase(), Phase::Stopped);
        assert_eq!(notifier.delivered_count(), 1);
        assert_eq!(notifier.close_count(), 1);

        // A second stop and a late waiter return at once
        timeout(Duration::from_millis(100), dispatcher.stop()).await?;
        timeout(Duration::from_millis(100), dispatcher.wait_stopped()).await?;
        Ok(())
    }

    #[tokio::test]
    async fn test_dropping_last_handle_drains_queue() -> anyhow::Result<()> {
        let notifier = Arc::new(RecordingNotifier::new());
        let dispatcher = Dispatcher::new(
            SubscriberConfig::default(),
            watch_list(&[("app", &["f0100"])]),
            notifier.clone(),
        )?;
        for n in 0..3 {
            apply_transfer(&dispatcher, n, "f0100").await;
        }
        drop(dispatcher);

        timeout(Duration::from_secs(5), async {
            while notifier.close_count() == 0 {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await?;
        assert_eq!(notifier.delivered_count(), 3);
        Ok(())
    }
}
