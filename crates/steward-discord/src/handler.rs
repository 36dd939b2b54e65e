//! The event dispatcher.
//!
//! Every gateway event lands here and is routed through a fixed,
//! priority-ordered pipeline. Nothing on the Message or ReactionAdd paths
//! may end the connection — per-event failures are logged and the event
//! dropped. The one fatal condition is the missing announcement channel
//! at guild-available time.
//!
//! Message routing is an ordered list of guard clauses:
//! 1. bot author → drop
//! 2. direct message → drop
//! 3. debug toggle trigger → toggle, drop (checked before 4 so the
//!    toggle itself is never swallowed by debug mode)
//! 4. debug mode filters the author → drop
//! 5. slow-mode tracking
//! 6. XP award unless the channel is exempt
//! 7. prefixed → built-in table, else custom command, else silence
//! 8. unprefixed → event-channel fallback check

use std::sync::{Arc, OnceLock};
use std::time::{Duration, Instant};

use serenity::async_trait;
use serenity::builder::EditChannel;
use serenity::model::channel::{Message, Reaction};
use serenity::model::gateway::Ready;
use serenity::model::guild::{Guild, Member};
use serenity::model::id::{ChannelId, GuildId};
use serenity::model::user::User;
use serenity::prelude::{Context, EventHandler};
use tokio::sync::mpsc;
use tracing::{error, info, warn};

use steward_games::{Announcement, GameTimer};

use crate::app::App;
use crate::builtins::{self, Invocation};
use crate::debug::DebugGate;
use crate::gate::emoji_name;
use crate::parse;
use crate::presence;
use crate::send::{self, SendOutcome};

/// Serenity event handler wired to the subsystems in [`App`].
pub struct StewardHandler {
    pub app: Arc<App>,
    /// Set to the missing channel id when the fatal configuration error
    /// fires; the adapter reads it after the gateway stops.
    pub fatal: Arc<OnceLock<u64>>,
}

/// Early-exit decision for a message, in guard order.
#[derive(Debug, PartialEq, Eq)]
enum MessageRoute {
    DropBotAuthor,
    DropDirect,
    ToggleDebug,
    DropDebugIgnored,
    Process,
}

fn route_message(
    debug: &DebugGate,
    author_is_bot: bool,
    in_guild: bool,
    author_id: u64,
    content: &str,
) -> MessageRoute {
    if author_is_bot {
        return MessageRoute::DropBotAuthor;
    }
    if !in_guild {
        return MessageRoute::DropDirect;
    }
    if debug.is_toggle_trigger(author_id, content) {
        return MessageRoute::ToggleDebug;
    }
    if debug.should_ignore(author_id) {
        return MessageRoute::DropDebugIgnored;
    }
    MessageRoute::Process
}

/// Terminal branch decision for a processed message.
#[derive(Debug, PartialEq, Eq)]
enum CommandRoute<'a> {
    /// No prefix — the event-channel fallback applies.
    NotCommand,
    /// Prefix with nothing behind it — silent drop, no lookup.
    EmptyCommand,
    Command { token: &'a str },
}

fn route_command(content: &str, prefix: char) -> CommandRoute<'_> {
    if !content.starts_with(prefix) {
        return CommandRoute::NotCommand;
    }
    let stripped = parse::strip_prefix(content, prefix);
    let token = parse::command_token(stripped);
    if token.is_empty() {
        return CommandRoute::EmptyCommand;
    }
    CommandRoute::Command { token }
}

#[async_trait]
impl EventHandler for StewardHandler {
    async fn ready(&self, _ctx: Context, ready: Ready) {
        info!(name = %ready.user.name, id = ready.user.id.get(), "connected");
    }

    async fn guild_create(&self, ctx: Context, guild: Guild, _is_new: Option<bool>) {
        let member_ids: Vec<u64> = guild.members.keys().map(|id| id.get()).collect();
        if let Err(e) = self.app.tracker.refresh(&member_ids) {
            warn!(error = %e, "tracker cache refresh failed");
        }

        let announce = ChannelId::new(self.app.config.games.announcement_channel);
        let Some(channel) = guild.channels.get(&announce) else {
            error!(
                channel = announce.get(),
                guild = %guild.name,
                "announcement channel not found; shutting down"
            );
            let _ = self.fatal.set(announce.get());
            ctx.shard.shutdown_clean();
            return;
        };
        info!(guild = %guild.name, channel = %channel.name, "announcing games");

        // Start the dependent loops exactly once; repeat deliveries after
        // a reconnect find the engine already taken.
        let timer = self.app.game_timer.lock().unwrap().take();
        if let Some(timer) = timer {
            self.start_background(&ctx, timer, announce);
        }

        presence::publish(&ctx, guild.member_count);
    }

    async fn guild_member_addition(&self, ctx: Context, member: Member) {
        presence::refresh(&ctx, member.guild_id);
    }

    async fn guild_member_removal(
        &self,
        ctx: Context,
        guild_id: GuildId,
        user: User,
        _member: Option<Member>,
    ) {
        // Evict before anything else can read the departed member's state.
        self.app.tracker.remove_from_cache(user.id.get());
        presence::refresh(&ctx, guild_id);
    }

    async fn reaction_add(&self, ctx: Context, reaction: Reaction) {
        if self.app.debug.is_active() {
            return;
        }

        // The event subsystem sees every reaction; it decides applicability.
        self.award_event_prize(&ctx, &reaction).await;

        if !self.app.gate.matches(reaction.message_id, &reaction.emoji) {
            return;
        }
        let Some(user_id) = reaction.user_id else {
            return;
        };
        let Some(guild_id) = ctx
            .cache
            .guilds()
            .into_iter()
            .find(|g| Some(*g) == reaction.guild_id)
        else {
            warn!("reaction gate: no connected guild matches the payload");
            return;
        };

        let role = self.app.gate.role();
        let role_exists = ctx
            .cache
            .guild(guild_id)
            .map(|guild| guild.roles.contains_key(&role))
            .unwrap_or(false);
        if !role_exists {
            warn!(role = role.get(), "reaction gate: role not found in guild");
            return;
        }

        let member = match guild_id.member(&ctx.http, user_id).await {
            Ok(member) => member,
            Err(e) => {
                warn!(error = %e, user = user_id.get(), "reaction gate: member lookup failed");
                return;
            }
        };
        // Re-adding an already-held role is a no-op on the platform side,
        // so duplicate reaction events need no dedup state here.
        match member.add_role(&ctx.http, role).await {
            Ok(()) => info!(user = user_id.get(), role = role.get(), "gate role granted"),
            Err(e) => {
                warn!(error = %e, user = user_id.get(), "reaction gate: role grant failed");
            }
        }
    }

    async fn message(&self, ctx: Context, msg: Message) {
        let author_id = msg.author.id.get();
        match route_message(
            &self.app.debug,
            msg.author.bot,
            msg.guild_id.is_some(),
            author_id,
            &msg.content,
        ) {
            MessageRoute::DropBotAuthor
            | MessageRoute::DropDirect
            | MessageRoute::DropDebugIgnored => return,
            MessageRoute::ToggleDebug => {
                let active = self.app.debug.toggle();
                info!(active, user = author_id, "debug mode toggled");
                return;
            }
            MessageRoute::Process => {}
        }

        let channel_id = msg.channel_id.get();
        self.app
            .thermometer
            .record(channel_id, author_id, Instant::now());

        if !self.app.config.xp.exempt_channels.contains(&channel_id) {
            match self.app.tracker.give_xp(author_id) {
                Ok(Some(note)) => self.deliver(&ctx, msg.channel_id, &note).await,
                Ok(None) => {}
                Err(e) => warn!(error = %e, user = author_id, "xp award failed"),
            }
        }

        match route_command(&msg.content, self.app.config.discord.prefix) {
            CommandRoute::NotCommand => {
                if let Err(e) = self.app.events.on_message(channel_id, author_id) {
                    warn!(error = %e, "event check failed");
                }
            }
            CommandRoute::EmptyCommand => {}
            CommandRoute::Command { token } => {
                if let Some(entry) = self.app.builtins.get(token) {
                    let invocation = Invocation::from_message(&self.app, &msg);
                    if let Some(reply) = builtins::dispatch(&self.app, entry, &invocation) {
                        self.deliver(&ctx, msg.channel_id, &reply).await;
                    }
                } else {
                    match self.app.commands.has(token) {
                        Ok(true) => {
                            let mention = format!("<@{author_id}>");
                            match self.app.commands.render(token, &mention) {
                                Ok(reply) => self.deliver(&ctx, msg.channel_id, &reply).await,
                                Err(e) => {
                                    warn!(error = %e, token, "custom command render failed");
                                }
                            }
                        }
                        // Unknown commands are silently ignored, not rejected.
                        Ok(false) => {}
                        Err(e) => warn!(error = %e, token, "custom command lookup failed"),
                    }
                }
            }
        }
    }
}

impl StewardHandler {
    /// Send a reply, containing failures per the error taxonomy.
    async fn deliver(&self, ctx: &Context, channel_id: ChannelId, text: &str) {
        match send::send_reply(&ctx.http, channel_id, text).await {
            SendOutcome::Sent => {}
            SendOutcome::NoPermission => {
                warn!(
                    channel = channel_id.get(),
                    "can see messages but cannot send in channel"
                );
            }
            SendOutcome::TimedOut => warn!(channel = channel_id.get(), "send timed out"),
            SendOutcome::Failed(e) => {
                warn!(channel = channel_id.get(), error = %e, "send failed");
            }
        }
    }

    async fn award_event_prize(&self, ctx: &Context, reaction: &Reaction) {
        let Some(emoji) = emoji_name(&reaction.emoji) else {
            return;
        };
        let Some(prize) = self.app.events.prize_for(reaction.channel_id.get(), emoji) else {
            return;
        };
        let message = match ctx
            .http
            .get_message(reaction.channel_id, reaction.message_id)
            .await
        {
            Ok(message) => message,
            Err(e) => {
                warn!(error = %e, "event prize: message lookup failed");
                return;
            }
        };
        if message.author.bot {
            return;
        }
        let winner = message.author.id.get();
        match self.app.tracker.add_xp(winner, prize) {
            Ok(total) => info!(user = winner, prize, total, "event prize awarded"),
            Err(e) => warn!(error = %e, user = winner, "event prize: award failed"),
        }
    }

    /// Spawn the announcement engine, its delivery forwarder, and the
    /// slow-mode monitor. `Arc<Http>` is a REST handle — it stays valid
    /// across gateway reconnects, so none of these need restarting.
    fn start_background(&self, ctx: &Context, timer: GameTimer, announce: ChannelId) {
        let (tx, mut rx) = mpsc::channel::<Announcement>(64);
        tokio::spawn(timer.run(tx));

        let http = Arc::clone(&ctx.http);
        tokio::spawn(async move {
            while let Some(announcement) = rx.recv().await {
                match send::send_reply(&http, announce, &announcement.text).await {
                    SendOutcome::Sent => {}
                    SendOutcome::NoPermission => {
                        warn!(channel = announce.get(), "cannot post announcements");
                    }
                    SendOutcome::TimedOut => warn!("announcement send timed out"),
                    SendOutcome::Failed(e) => warn!(error = %e, "announcement send failed"),
                }
            }
        });

        let app = Arc::clone(&self.app);
        let http = Arc::clone(&ctx.http);
        let every = Duration::from_secs((app.config.slowmode.window_secs / 2).max(5));
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(every);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                for (channel_id, delay) in app.thermometer.sweep(Instant::now()) {
                    let edit = EditChannel::new().rate_limit_per_user(delay);
                    match ChannelId::new(channel_id).edit(http.as_ref(), edit).await {
                        Ok(_) => info!(channel = channel_id, delay, "slow mode updated"),
                        Err(e) => {
                            warn!(channel = channel_id, error = %e, "slow mode update failed");
                        }
                    }
                }
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gate() -> DebugGate {
        DebugGate::new('!', vec![100])
    }

    #[test]
    fn bot_author_drops_before_everything() {
        let debug = gate();
        // Even a valid toggle trigger from a bot account is dropped.
        assert_eq!(
            route_message(&debug, true, true, 100, "!debug"),
            MessageRoute::DropBotAuthor
        );
    }

    #[test]
    fn direct_messages_drop() {
        let debug = gate();
        assert_eq!(
            route_message(&debug, false, false, 100, "!lvl"),
            MessageRoute::DropDirect
        );
    }

    #[test]
    fn toggle_check_precedes_ignore_check() {
        let debug = gate();
        debug.toggle();
        // Debug mode is active, yet the authorized toggle still routes.
        assert_eq!(
            route_message(&debug, false, true, 100, "!debug"),
            MessageRoute::ToggleDebug
        );
        // Everyone else is filtered while the gate is up.
        assert_eq!(
            route_message(&debug, false, true, 200, "!lvl"),
            MessageRoute::DropDebugIgnored
        );
    }

    #[test]
    fn unauthorized_trigger_is_not_a_toggle() {
        let debug = gate();
        assert_eq!(
            route_message(&debug, false, true, 200, "!debug"),
            MessageRoute::Process
        );
    }

    #[test]
    fn plain_messages_process() {
        let debug = gate();
        assert_eq!(
            route_message(&debug, false, true, 200, "hello friends"),
            MessageRoute::Process
        );
    }

    #[test]
    fn unprefixed_routes_to_fallback() {
        assert_eq!(route_command("hello friends", '!'), CommandRoute::NotCommand);
        assert_eq!(route_command("", '!'), CommandRoute::NotCommand);
    }

    #[test]
    fn bare_prefix_is_an_empty_command() {
        assert_eq!(route_command("!", '!'), CommandRoute::EmptyCommand);
        assert_eq!(route_command("!   ", '!'), CommandRoute::EmptyCommand);
    }

    #[test]
    fn token_extraction_is_case_sensitive() {
        assert_eq!(
            route_command("!lvl", '!'),
            CommandRoute::Command { token: "lvl" }
        );
        assert_eq!(
            route_command("!Lvl", '!'),
            CommandRoute::Command { token: "Lvl" }
        );
    }

    #[test]
    fn arguments_do_not_change_the_token() {
        assert_eq!(
            route_command("!define hug a hug", '!'),
            CommandRoute::Command { token: "define" }
        );
    }
}
