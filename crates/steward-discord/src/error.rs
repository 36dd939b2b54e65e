/// Errors produced by the Discord adapter.
#[derive(Debug, thiserror::Error)]
pub enum DiscordError {
    #[error("serenity error: {0}")]
    Serenity(#[from] serenity::Error),

    /// The configured announcement channel does not exist in the guild.
    /// The bot cannot run without it, so this ends the connection.
    #[error("announcement channel {channel} not found in guild")]
    AnnouncementChannelMissing { channel: u64 },
}
