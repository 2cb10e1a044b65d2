use dotenvy::dotenv;
use std::sync::Arc;
use teloxide::Bot;
use tracing::{debug, error, info, warn};

use common::actors::ActorType;
use common::clock::{Clock, SystemClock};
use common::config::BotConfig;
use common::logger;
use strategy::{RandomStrategy, SignalSource};

use crate::actors::supervisor::Supervisor;
use crate::services::broadcast_service::{BroadcastService, Broadcaster};
use crate::services::signal_desk::SignalDesk;
use crate::services::telegram_service::TelegramService;

mod actors;
mod notifier;
mod services;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();
    logger::setup_logger();
    debug!("System starting up...");

    let config = Arc::new(BotConfig::from_env().inspect_err(|e| error!("❌ {}", e))?);
    debug!("{:?}", config);

    warn!("Signals and results are random placeholders, not market analysis.");
    match &config.broadcast_target {
        Some(target) => info!(
            "Auto signals go to {} during {} (UTC{})",
            target, config.window, config.utc_offset
        ),
        None => warn!("TELEGRAM_CHAT_ID not set. Auto signals disabled, replying to chats only."),
    }

    let bot = Bot::new(config.token.clone());
    let clock: Arc<dyn Clock> = Arc::new(SystemClock::new(config.utc_offset));
    let source: Arc<dyn SignalSource> = Arc::new(RandomStrategy::new());
    let desk = Arc::new(SignalDesk::new(config.clone(), source, clock));

    let mut supervisor = Supervisor::new();

    let bot_for_telegram = bot.clone();
    let desk_for_telegram = desk.clone();
    supervisor.register_actor(
        ActorType::TelegramActor,
        move || TelegramService::new(bot_for_telegram.clone(), desk_for_telegram.clone()),
    );

    // Shared across restarts so the overlap guard survives them.
    let broadcaster = Broadcaster::new(desk.clone(), Arc::new(bot));
    supervisor.register_actor(
        ActorType::BroadcastActor,
        move || BroadcastService::new(broadcaster.clone()),
    );

    info!("✅ Bot starting...");
    tokio::select! {
        _ = supervisor.start() => {}
        _ = tokio::signal::ctrl_c() => info!("Ctrl-C received. Shutting down."),
    }
    Ok(())
}
