use std::sync::{Arc, OnceLock};
use std::time::Duration;

use serenity::model::gateway::GatewayIntents;
use serenity::Client;
use tracing::{error, info, warn};

use crate::app::App;
use crate::error::DiscordError;
use crate::handler::StewardHandler;

/// Owns the serenity client and drives the event loop.
///
/// Transport drops reconnect automatically; only the fatal configuration
/// error (announcement channel missing at guild-available time) ends the
/// loop, as an `Err` the binary turns into a non-zero exit.
pub struct Adapter {
    app: Arc<App>,
}

impl Adapter {
    pub fn new(app: Arc<App>) -> Self {
        Self { app }
    }

    pub async fn run(self) -> Result<(), DiscordError> {
        let intents = GatewayIntents::GUILDS
            | GatewayIntents::GUILD_MEMBERS
            | GatewayIntents::GUILD_MESSAGES
            | GatewayIntents::GUILD_MESSAGE_REACTIONS
            | GatewayIntents::MESSAGE_CONTENT;

        let fatal: Arc<OnceLock<u64>> = Arc::new(OnceLock::new());

        // A broken token or client config should surface at startup, not
        // retry forever.
        let mut client = self.build_client(intents, Arc::clone(&fatal)).await?;

        loop {
            info!("gateway connecting");

            if let Err(e) = client.start().await {
                warn!("gateway error ({e})");
            } else {
                info!("gateway stopped");
            }

            if let Some(&channel) = fatal.get() {
                return Err(DiscordError::AnnouncementChannelMissing { channel });
            }

            tokio::time::sleep(Duration::from_secs(5)).await;

            // Rebuild the client for the next attempt.
            client = loop {
                match self.build_client(intents, Arc::clone(&fatal)).await {
                    Ok(c) => break c,
                    Err(e) => {
                        error!("reconnect failed ({e}), retrying in 30s");
                        tokio::time::sleep(Duration::from_secs(30)).await;
                    }
                }
            };
        }
    }

    async fn build_client(
        &self,
        intents: GatewayIntents,
        fatal: Arc<OnceLock<u64>>,
    ) -> Result<Client, serenity::Error> {
        let handler = StewardHandler {
            app: Arc::clone(&self.app),
            fatal,
        };

        Client::builder(&self.app.config.discord.bot_token, intents)
            .event_handler(handler)
            .await
    }
}
