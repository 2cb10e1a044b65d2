use std::{convert::Infallible, sync::Arc};

use async_trait::async_trait;
use common::actors::{Actor, ActorType};
use teloxide::{
    RequestError, dispatching::UpdateHandler, prelude::*, utils::command::BotCommands,
};
use tracing::{debug, info, warn};

use crate::notifier::Notifier;
use crate::services::signal_desk::{Interaction, SignalDesk};

type HandlerResult = Result<(), RequestError>;

#[derive(BotCommands, Clone, Debug, PartialEq, Eq)]
#[command(rename_rule = "lowercase", description = "These commands are supported:")]
pub enum Command {
    #[command(description = "show the pair menu.")]
    Start,
    #[command(description = "display this text.")]
    Help,
}

pub struct TelegramService {
    bot: Bot,
    desk: Arc<SignalDesk>,
}

impl TelegramService {
    pub fn new(bot: Bot, desk: Arc<SignalDesk>) -> Self {
        Self { bot, desk }
    }
}

#[async_trait]
impl Actor for TelegramService {
    fn name(&self) -> ActorType {
        ActorType::TelegramActor
    }

    async fn run(&mut self) -> anyhow::Result<()> {
        info!("Starting Telegram dispatcher");

        // Updates are not serialized per chat: one user's pending result
        // must not hold back anyone else's request.
        Dispatcher::builder(self.bot.clone(), schema())
            .dependencies(dptree::deps![self.desk.clone()])
            .distribution_function(|_| None::<Infallible>)
            .default_handler(|update| async move {
                debug!("Ignoring update {:?}", update.id);
            })
            .build()
            .dispatch()
            .await;

        warn!("Telegram dispatcher stopped");
        Ok(())
    }
}

pub fn schema() -> UpdateHandler<RequestError> {
    Update::filter_message()
        .branch(
            dptree::entry()
                .filter_command::<Command>()
                .endpoint(on_command),
        )
        .branch(
            dptree::filter(|msg: Message| msg.text().is_some_and(is_free_text))
                .endpoint(on_text),
        )
}

/// Slash-prefixed text is a command attempt, never a pair.
fn is_free_text(text: &str) -> bool {
    !text.starts_with('/')
}

async fn on_command(
    bot: Bot,
    msg: Message,
    cmd: Command,
    desk: Arc<SignalDesk>,
) -> HandlerResult {
    let text = match cmd {
        Command::Start => desk.menu(),
        Command::Help => Command::descriptions().to_string(),
    };
    bot.send_text(msg.chat.id.into(), text).await
}

async fn on_text(bot: Bot, msg: Message, desk: Arc<SignalDesk>) -> HandlerResult {
    let text = msg.text().unwrap_or_default();
    match desk.handle_text(&bot, msg.chat.id.into(), text).await? {
        Interaction::Completed { pair } => debug!("Served {} to chat {}", pair, msg.chat.id),
        Interaction::Rejected => debug!("Rejected {:?} from chat {}", text, msg.chat.id),
    }
    Ok(())
}
