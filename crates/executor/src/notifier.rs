use async_trait::async_trait;
use teloxide::{
    RequestError,
    prelude::*,
    types::{ChatId, Recipient},
};

#[cfg(test)]
use mockall::automock;

/// Outbound side of the chat transport.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send_text(&self, to: Recipient, text: String) -> Result<(), RequestError>;
}

#[async_trait]
impl Notifier for Bot {
    async fn send_text(&self, to: Recipient, text: String) -> Result<(), RequestError> {
        self.send_message(to, text).await?;
        Ok(())
    }
}

/// Numeric ids become chat ids, anything else is taken as a channel username.
pub fn recipient_for(target: &str) -> Recipient {
    match target.parse::<i64>() {
        Ok(id) => Recipient::Id(ChatId(id)),
        Err(_) if target.starts_with('@') => Recipient::ChannelUsername(target.to_string()),
        Err(_) => Recipient::ChannelUsername(format!("@{}", target)),
    }
}
