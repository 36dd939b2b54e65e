//! Member-count presence: the bot's activity line mirrors the guild size.

use serenity::gateway::ActivityData;
use serenity::model::id::GuildId;
use serenity::model::user::OnlineStatus;
use serenity::prelude::Context;
use tracing::warn;

pub fn publish(ctx: &Context, member_count: u64) {
    let activity = ActivityData::watching(format!("{member_count} members!"));
    ctx.set_presence(Some(activity), OnlineStatus::Online);
}

/// Recompute the count from the cache and republish. A cold cache is not
/// fatal — the presence just stays stale until the next membership event.
pub fn refresh(ctx: &Context, guild_id: GuildId) {
    let count = ctx.cache.guild(guild_id).map(|guild| guild.member_count);
    match count {
        Some(count) => publish(ctx, count),
        None => warn!(guild = guild_id.get(), "guild not cached; presence not refreshed"),
    }
}
