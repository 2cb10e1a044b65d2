use std::sync::Arc;

use chrono::{DateTime, FixedOffset};
use common::{clock::Clock, config::BotConfig};
use strategy::SignalSource;
use teloxide::{RequestError, types::Recipient};
use tracing::{debug, info};

use crate::notifier::Notifier;
use crate::services::messages;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Interaction {
    Rejected,
    Completed { pair: String },
}

/// Turns pairs into chat messages. Shared by the interactive handler and the
/// scheduled broadcaster; holds no per-chat state.
pub struct SignalDesk {
    config: Arc<BotConfig>,
    source: Arc<dyn SignalSource>,
    clock: Arc<dyn Clock>,
}

impl SignalDesk {
    pub fn new(
        config: Arc<BotConfig>,
        source: Arc<dyn SignalSource>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            config,
            source,
            clock,
        }
    }

    pub fn config(&self) -> &BotConfig {
        &self.config
    }

    pub fn now(&self) -> DateTime<FixedOffset> {
        self.clock.now()
    }

    pub fn menu(&self) -> String {
        messages::pair_menu(&self.config, &self.now())
    }

    /// Answers one free-text message: info, signal and (after the result delay)
    /// result for a known pair, or a single rejection listing the pairs.
    pub async fn handle_text(
        &self,
        notifier: &dyn Notifier,
        to: Recipient,
        text: &str,
    ) -> Result<Interaction, RequestError> {
        let text = text.trim();
        let Some(pair) = self.config.pairs.iter().find(|p| p.as_str() == text) else {
            debug!("Rejected pair request {:?}", text);
            notifier
                .send_text(to, messages::invalid_pair(&self.config))
                .await?;
            return Ok(Interaction::Rejected);
        };

        notifier
            .send_text(to.clone(), messages::pair_info(&self.config, pair, &self.now()))
            .await?;
        self.signal_then_result(notifier, to, pair).await?;

        Ok(Interaction::Completed { pair: pair.clone() })
    }

    /// Sends a fresh signal, waits out the trade, then sends its result.
    pub async fn signal_then_result(
        &self,
        notifier: &dyn Notifier,
        to: Recipient,
        pair: &str,
    ) -> Result<(), RequestError> {
        let signal = self.source.signal(pair, self.now().time());
        notifier
            .send_text(to.clone(), messages::signal_message(&self.config, &signal))
            .await?;

        tokio::time::sleep(self.config.result_delay).await;

        let outcome = self.source.outcome();
        notifier
            .send_text(to, messages::result_message(&self.config, pair, &outcome))
            .await?;

        info!(
            "{} {} MTG={} -> {}",
            pair, signal.direction, signal.mtg_step, outcome.result
        );
        Ok(())
    }
}
