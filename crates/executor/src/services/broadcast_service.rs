use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};

use async_trait::async_trait;
use common::actors::{Actor, ActorType};
use teloxide::types::Recipient;
use tokio::{
    task::JoinHandle,
    time::{self, Instant, MissedTickBehavior},
};
use tracing::{debug, error, info, warn};

use crate::notifier::{Notifier, recipient_for};
use crate::services::signal_desk::SignalDesk;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleReport {
    NoTarget,
    OutsideWindow,
    /// Counted per pair: a pair completes when both its signal and its
    /// result were delivered.
    Completed { completed: usize, failed: usize },
}

/// Clears the running flag when a cycle ends, even by panic.
struct CycleGuard(Arc<AtomicBool>);

impl Drop for CycleGuard {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Posts every pair's signal and result to the broadcast target.
#[derive(Clone)]
pub struct Broadcaster {
    desk: Arc<SignalDesk>,
    notifier: Arc<dyn Notifier>,
    target: Option<Recipient>,
    running: Arc<AtomicBool>,
}

impl Broadcaster {
    pub fn new(desk: Arc<SignalDesk>, notifier: Arc<dyn Notifier>) -> Self {
        let target = desk.config().broadcast_target.as_deref().map(recipient_for);
        Self {
            desk,
            notifier,
            target,
            running: Arc::new(AtomicBool::new(false)),
        }
    }

    fn try_begin(&self) -> Option<CycleGuard> {
        self.running
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| CycleGuard(self.running.clone()))
    }

    /// Starts a cycle in the background unless the previous one is still
    /// sending, in which case the tick is dropped.
    pub fn on_tick(&self) -> Option<JoinHandle<CycleReport>> {
        let Some(guard) = self.try_begin() else {
            warn!("Previous broadcast cycle still running. Skipping tick.");
            return None;
        };

        let broadcaster = self.clone();
        Some(tokio::spawn(async move {
            let _guard = guard;
            let report = broadcaster.run_cycle().await;
            match report {
                CycleReport::NoTarget => debug!("No broadcast target configured"),
                CycleReport::OutsideWindow => debug!("Outside broadcast window"),
                CycleReport::Completed { completed, failed } => {
                    info!("Broadcast cycle done: {} pairs completed, {} failed", completed, failed)
                }
            }
            report
        }))
    }

    /// One pass over all pairs, in configured order, one pair at a time.
    pub async fn run_cycle(&self) -> CycleReport {
        let Some(target) = self.target.clone() else {
            return CycleReport::NoTarget;
        };
        let config = self.desk.config();
        if !config.window.within_schedule(&self.desk.now()) {
            return CycleReport::OutsideWindow;
        }

        info!("Broadcasting {} pairs to {:?}", config.pairs.len(), target);

        let mut completed = 0;
        let mut failed = 0;
        for pair in &config.pairs {
            match self
                .desk
                .signal_then_result(self.notifier.as_ref(), target.clone(), pair)
                .await
            {
                Ok(()) => completed += 1,
                Err(e) => {
                    error!("Failed to broadcast {}: {}", pair, e);
                    failed += 1;
                }
            }
        }
        CycleReport::Completed { completed, failed }
    }
}

pub struct BroadcastService {
    broadcaster: Broadcaster,
}

impl BroadcastService {
    pub fn new(broadcaster: Broadcaster) -> Self {
        Self { broadcaster }
    }
}

#[async_trait]
impl Actor for BroadcastService {
    fn name(&self) -> ActorType {
        ActorType::BroadcastActor
    }

    async fn run(&mut self) -> anyhow::Result<()> {
        let config = self.broadcaster.desk.config();
        info!(
            "Starting broadcaster: every {:?} after {:?}, window {} (UTC{})",
            config.tick_interval, config.first_tick_delay, config.window, config.utc_offset
        );

        let Some(first_tick) = Instant::now().checked_add(config.first_tick_delay) else {
            error!(
                "First tick delay {:?} is out of range. Broadcaster stopped.",
                config.first_tick_delay
            );
            return Ok(());
        };
        let mut ticker = time::interval_at(first_tick, config.tick_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            ticker.tick().await;
            self.broadcaster.on_tick();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notifier::MockNotifier;
    use crate::services::signal_desk::tests::{desk_with, frozen_at};
    use common::clock::Clock;
    use common::config::BotConfig;
    use mockall::Sequence;
    use std::time::Duration;
    use teloxide::{ApiError, RequestError, types::ChatId};

    fn config(target: Option<&str>) -> BotConfig {
        let mut config = BotConfig::with_token("t");
        config.broadcast_target = target.map(str::to_string);
        config
    }

    fn broadcaster(
        config: BotConfig,
        clock: Arc<dyn Clock>,
        notifier: MockNotifier,
    ) -> Broadcaster {
        Broadcaster::new(Arc::new(desk_with(config, clock)), Arc::new(notifier))
    }

    #[tokio::test(start_paused = true)]
    async fn test_no_target_sends_nothing_at_any_hour() {
        for (h, m) in [(0, 0), (4, 30), (9, 0), (23, 59)] {
            // No expectations: any send would panic.
            let broadcaster = broadcaster(config(None), frozen_at(h, m), MockNotifier::new());
            assert_eq!(broadcaster.run_cycle().await, CycleReport::NoTarget);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_outside_window_sends_nothing() {
        for (h, m) in [(4, 1), (6, 0), (8, 59)] {
            let broadcaster =
                broadcaster(config(Some("-10042")), frozen_at(h, m), MockNotifier::new());
            assert_eq!(broadcaster.run_cycle().await, CycleReport::OutsideWindow);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_cycle_sends_signal_then_result_per_pair_in_order() {
        let config = config(Some("-100042"));
        let pairs = config.pairs.clone();
        let target = Recipient::Id(ChatId(-100042));

        let mut notifier = MockNotifier::new();
        let mut seq = Sequence::new();
        for pair in &pairs {
            let (p, t) = (pair.clone(), target.clone());
            notifier
                .expect_send_text()
                .times(1)
                .in_sequence(&mut seq)
                .withf(move |to, text| {
                    *to == t && text.contains(&format!("Pair: {}\nSignal: ", p))
                })
                .returning(|_, _| Ok(()));
            let (p, t) = (pair.clone(), target.clone());
            notifier
                .expect_send_text()
                .times(1)
                .in_sequence(&mut seq)
                .withf(move |to, text| {
                    *to == t && text.contains(&format!("Pair: {}\nResult: ", p))
                })
                .returning(|_, _| Ok(()));
        }

        let broadcaster = broadcaster(config, frozen_at(0, 0), notifier);

        let started = Instant::now();
        let report = broadcaster.run_cycle().await;

        assert_eq!(
            report,
            CycleReport::Completed {
                completed: pairs.len(),
                failed: 0
            }
        );
        assert!(started.elapsed() >= Duration::from_secs(60) * pairs.len() as u32);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_pair_does_not_stop_cycle() {
        let mut config = config(Some("@signals"));
        config.pairs = vec!["BTC/USDT".to_string(), "EUR/USD".to_string()];

        let mut notifier = MockNotifier::new();
        let mut seq = Sequence::new();
        notifier
            .expect_send_text()
            .times(1)
            .in_sequence(&mut seq)
            .withf(|_, text| text.contains("Pair: BTC/USDT\nSignal: "))
            .returning(|_, _| Err(RequestError::Api(ApiError::ChatNotFound)));
        notifier
            .expect_send_text()
            .times(2)
            .in_sequence(&mut seq)
            .withf(|to, text| {
                *to == Recipient::ChannelUsername("@signals".to_string())
                    && text.contains("Pair: EUR/USD")
            })
            .returning(|_, _| Ok(()));

        let broadcaster = broadcaster(config, frozen_at(9, 0), notifier);
        assert_eq!(
            broadcaster.run_cycle().await,
            CycleReport::Completed {
                completed: 1,
                failed: 1
            }
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_lost_result_counts_pair_as_failed() {
        let mut config = config(Some("42"));
        config.pairs = vec!["BTC/USDT".to_string(), "EUR/USD".to_string()];

        let mut notifier = MockNotifier::new();
        let mut seq = Sequence::new();
        notifier
            .expect_send_text()
            .times(1)
            .in_sequence(&mut seq)
            .withf(|_, text| text.contains("Pair: BTC/USDT\nSignal: "))
            .returning(|_, _| Ok(()));
        notifier
            .expect_send_text()
            .times(1)
            .in_sequence(&mut seq)
            .withf(|_, text| text.contains("Pair: BTC/USDT\nResult: "))
            .returning(|_, _| Err(RequestError::Api(ApiError::BotKicked)));
        notifier
            .expect_send_text()
            .times(2)
            .in_sequence(&mut seq)
            .withf(|_, text| text.contains("Pair: EUR/USD"))
            .returning(|_, _| Ok(()));

        let broadcaster = broadcaster(config, frozen_at(22, 0), notifier);
        assert_eq!(
            broadcaster.run_cycle().await,
            CycleReport::Completed {
                completed: 1,
                failed: 1
            }
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_unreachable_first_tick_stops_service() {
        let mut config = config(Some("42"));
        config.first_tick_delay = Duration::from_secs(u64::MAX);

        // No expectations: the service must stop before any tick.
        let broadcaster = broadcaster(config, frozen_at(12, 0), MockNotifier::new());
        let mut service = BroadcastService::new(broadcaster);

        assert!(service.run().await.is_ok());
    }

    #[tokio::test(start_paused = true)]
    async fn test_tick_during_running_cycle_is_skipped() {
        let mut config = config(Some("42"));
        config.pairs = vec!["XAG/USD".to_string()];

        let mut notifier = MockNotifier::new();
        notifier
            .expect_send_text()
            .times(4)
            .returning(|_, _| Ok(()));

        let broadcaster = broadcaster(config, frozen_at(4, 0), notifier);

        let first = broadcaster.on_tick().expect("first tick starts a cycle");
        assert!(broadcaster.on_tick().is_none());

        assert_eq!(
            first.await.unwrap(),
            CycleReport::Completed {
                completed: 1,
                failed: 0
            }
        );

        let second = broadcaster.on_tick().expect("flag released after the cycle");
        assert_eq!(
            second.await.unwrap(),
            CycleReport::Completed {
                completed: 1,
                failed: 0
            }
        );
    }
}
