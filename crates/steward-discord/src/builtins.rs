//! Built-in commands.
//!
//! The table is a static name → handler mapping built once at startup;
//! its keys double as the reserved-keyword set handed to the custom
//! command store. Handlers consume an [`Invocation`] and optionally
//! produce reply text — sending (and send-failure containment) stays in
//! the dispatcher.

use std::collections::HashMap;

use serenity::model::channel::Message;
use tracing::warn;

use steward_commands::CommandError;
use steward_games::timer::{parse_weekday, weekday_name};

use crate::app::App;
use crate::parse;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Builtin {
    AddGame,
    AddXp,
    BonusXp,
    ClearGames,
    Define,
    Edit,
    GetGames,
    Help,
    Info,
    Leaderboard,
    Level,
    List,
    NoBonusXp,
    Ranks,
    Remove,
    Say,
    UserInfo,
    Xp,
}

#[derive(Debug, Clone, Copy)]
pub struct Entry {
    pub command: Builtin,
    pub admin_only: bool,
}

/// Name → handler capability. `custom` and `help` share a handler, as do
/// `lvl` and `level`.
const TABLE: &[(&str, Builtin, bool)] = &[
    ("addgame", Builtin::AddGame, true),
    ("addxp", Builtin::AddXp, true),
    ("bonusxp", Builtin::BonusXp, true),
    ("cleargames", Builtin::ClearGames, true),
    ("custom", Builtin::Help, false),
    ("define", Builtin::Define, true),
    ("edit", Builtin::Edit, true),
    ("getgames", Builtin::GetGames, false),
    ("help", Builtin::Help, false),
    ("info", Builtin::Info, false),
    ("lb", Builtin::Leaderboard, false),
    ("level", Builtin::Level, false),
    ("list", Builtin::List, false),
    ("lvl", Builtin::Level, false),
    ("nobonusxp", Builtin::NoBonusXp, true),
    ("ranks", Builtin::Ranks, false),
    ("remove", Builtin::Remove, true),
    ("say", Builtin::Say, true),
    ("userinfo", Builtin::UserInfo, false),
    ("xp", Builtin::Xp, false),
];

pub struct BuiltinTable {
    entries: HashMap<&'static str, Entry>,
}

impl BuiltinTable {
    pub fn new() -> Self {
        let entries = TABLE
            .iter()
            .map(|&(name, command, admin_only)| {
                (
                    name,
                    Entry {
                        command,
                        admin_only,
                    },
                )
            })
            .collect();
        Self { entries }
    }

    /// Case-sensitive exact lookup.
    pub fn get(&self, token: &str) -> Option<Entry> {
        self.entries.get(token).copied()
    }

    /// The reserved keyword set.
    pub fn names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.entries.keys().copied()
    }
}

/// The slice of a message a handler needs, extracted up front so handlers
/// stay platform-free and unit-testable.
#[derive(Debug, Clone)]
pub struct Invocation {
    pub author_id: u64,
    pub content: String,
    /// First mentioned user, for commands targeting another member.
    pub mentioned: Option<u64>,
    pub is_admin: bool,
}

impl Invocation {
    pub fn from_message(app: &App, msg: &Message) -> Self {
        let is_admin = msg
            .member
            .as_deref()
            .map(|member| {
                member
                    .roles
                    .iter()
                    .any(|role| app.config.discord.admin_roles.contains(&role.get()))
            })
            .unwrap_or(false);
        Self {
            author_id: msg.author.id.get(),
            content: msg.content.clone(),
            mentioned: msg.mentions.first().map(|user| user.id.get()),
            is_admin,
        }
    }
}

/// Run one table entry. Admin-only entries are silent for non-admins,
/// consistent with the unknown-command policy.
pub fn dispatch(app: &App, entry: Entry, inv: &Invocation) -> Option<String> {
    if entry.admin_only && !inv.is_admin {
        return None;
    }
    run(entry.command, app, inv)
}

fn run(command: Builtin, app: &App, inv: &Invocation) -> Option<String> {
    let prefix = app.config.discord.prefix;
    let stripped = parse::strip_prefix(&inv.content, prefix);
    let (_, args) = parse::split_command(stripped);

    match command {
        Builtin::AddGame => {
            let usage = format!("Usage: {prefix}addgame <day> <hh:mm> <name>");
            let mut parts = args.splitn(3, char::is_whitespace);
            let (Some(day), Some(time), Some(name)) = (parts.next(), parts.next(), parts.next())
            else {
                return Some(usage);
            };
            let name = name.trim();
            let (Some(day), Some((hour, minute))) = (parse_weekday(day), parse_time(time)) else {
                return Some(usage);
            };
            if name.is_empty() {
                return Some(usage);
            }
            match app.games.add_game(name, day, hour, minute) {
                Ok(game) => Some(format!(
                    "Scheduled **{}** for {}s at {:02}:{:02} UTC.",
                    game.name,
                    weekday_name(day),
                    hour,
                    minute
                )),
                Err(e) => {
                    warn!(error = %e, "addgame failed");
                    None
                }
            }
        }

        Builtin::AddXp => {
            let Some(target) = inv.mentioned else {
                return Some(format!("Usage: {prefix}addxp @member <amount>"));
            };
            let Some(amount) = args
                .split_whitespace()
                .filter_map(|t| t.parse::<i64>().ok())
                .next_back()
            else {
                return Some(format!("Usage: {prefix}addxp @member <amount>"));
            };
            match app.tracker.add_xp(target, amount) {
                Ok(total) => Some(format!("Gave {amount} XP to <@{target}> (now {total}).")),
                Err(e) => {
                    warn!(error = %e, "addxp failed");
                    None
                }
            }
        }

        Builtin::BonusXp => {
            let Some(multiplier) = args
                .split_whitespace()
                .next()
                .and_then(|t| t.parse::<i64>().ok())
            else {
                return Some(format!("Usage: {prefix}bonusxp <multiplier>"));
            };
            app.tracker.set_bonus(multiplier);
            Some(format!(
                "Bonus XP multiplier set to ×{}.",
                app.tracker.bonus()
            ))
        }

        Builtin::NoBonusXp => {
            app.tracker.clear_bonus();
            Some("Bonus XP multiplier reset.".to_string())
        }

        Builtin::ClearGames => match app.games.clear_games() {
            Ok(n) => Some(format!("Removed {n} scheduled game(s).")),
            Err(e) => {
                warn!(error = %e, "cleargames failed");
                None
            }
        },

        Builtin::GetGames => match app.games.list_games() {
            Ok(games) if games.is_empty() => Some("No games scheduled.".to_string()),
            Ok(games) => {
                let lines: Vec<String> = games
                    .iter()
                    .map(|g| {
                        format!(
                            "• **{}** — {}s at {:02}:{:02} UTC",
                            g.name,
                            weekday_name(g.day),
                            g.hour,
                            g.minute
                        )
                    })
                    .collect();
                Some(lines.join("\n"))
            }
            Err(e) => {
                warn!(error = %e, "getgames failed");
                None
            }
        },

        Builtin::Define => {
            let (name, response) = parse::split_command(args);
            if name.is_empty() || response.is_empty() {
                return Some(format!("Usage: {prefix}define <name> <response>"));
            }
            match app.commands.define(name, response) {
                Ok(()) => Some(format!("Custom command {prefix}{name} defined.")),
                Err(CommandError::ReservedName { name }) => Some(format!(
                    "`{name}` is a built-in command and can't be redefined."
                )),
                Err(e) => {
                    warn!(error = %e, "define failed");
                    None
                }
            }
        }

        Builtin::Edit => {
            let (name, response) = parse::split_command(args);
            if name.is_empty() || response.is_empty() {
                return Some(format!("Usage: {prefix}edit <name> <response>"));
            }
            match app.commands.edit(name, response) {
                Ok(()) => Some(format!("Custom command {prefix}{name} updated.")),
                Err(CommandError::NotFound { name }) => {
                    Some(format!("No custom command named {prefix}{name}."))
                }
                Err(CommandError::ReservedName { name }) => Some(format!(
                    "`{name}` is a built-in command and can't be redefined."
                )),
                Err(e) => {
                    warn!(error = %e, "edit failed");
                    None
                }
            }
        }

        Builtin::Remove => {
            let (name, _) = parse::split_command(args);
            if name.is_empty() {
                return Some(format!("Usage: {prefix}remove <name>"));
            }
            match app.commands.remove(name) {
                Ok(()) => Some(format!("Custom command {prefix}{name} removed.")),
                Err(CommandError::NotFound { name }) => {
                    Some(format!("No custom command named {prefix}{name}."))
                }
                Err(e) => {
                    warn!(error = %e, "remove failed");
                    None
                }
            }
        }

        Builtin::List => match app.commands.list() {
            Ok(names) if names.is_empty() => Some("No custom commands defined yet.".to_string()),
            Ok(names) => Some(format!("Custom commands: {}", names.join(", "))),
            Err(e) => {
                warn!(error = %e, "list failed");
                None
            }
        },

        Builtin::Help => {
            let mut names: Vec<&str> = app.builtins.names().collect();
            names.sort_unstable();
            let listed: Vec<String> = names.iter().map(|n| format!("{prefix}{n}")).collect();
            Some(format!(
                "Built-in commands: {}. Custom commands are listed by {prefix}list.",
                listed.join(", ")
            ))
        }

        Builtin::Info => Some(format!(
            "Steward v{} — community bot. Command prefix: `{prefix}`.",
            env!("CARGO_PKG_VERSION")
        )),

        Builtin::Leaderboard => match app.tracker.leaderboard(10) {
            Ok(entries) if entries.is_empty() => Some("The leaderboard is empty.".to_string()),
            Ok(entries) => {
                let lines: Vec<String> = entries
                    .iter()
                    .enumerate()
                    .map(|(i, e)| {
                        format!("{}. <@{}> — level {} ({} XP)", i + 1, e.user_id, e.level, e.xp)
                    })
                    .collect();
                Some(lines.join("\n"))
            }
            Err(e) => {
                warn!(error = %e, "leaderboard failed");
                None
            }
        },

        Builtin::Level => match app.tracker.userinfo(inv.author_id) {
            Ok(stats) => {
                let mut card = format!(
                    "You are level {} with {} XP ({} this month).",
                    stats.level, stats.xp, stats.monthly_xp
                );
                if let Some(rank) = stats.rank {
                    card.push_str(&format!(" Rank: **{rank}**."));
                }
                Some(card)
            }
            Err(e) => {
                warn!(error = %e, "level lookup failed");
                None
            }
        },

        Builtin::Ranks => {
            let ranks = &app.config.xp.ranks;
            if ranks.is_empty() {
                return Some("No ranks configured.".to_string());
            }
            let lines: Vec<String> = ranks
                .iter()
                .map(|r| format!("Level {} — **{}**", r.level, r.title))
                .collect();
            Some(lines.join("\n"))
        }

        Builtin::Say => {
            if args.is_empty() {
                None
            } else {
                Some(args.to_string())
            }
        }

        Builtin::UserInfo => {
            let target = inv.mentioned.unwrap_or(inv.author_id);
            let stats = match app.tracker.userinfo(target) {
                Ok(stats) => stats,
                Err(e) => {
                    warn!(error = %e, "userinfo lookup failed");
                    return None;
                }
            };
            let entries = app.events.entries(target).unwrap_or(0);
            let rank = stats
                .rank
                .map(|r| format!(" Rank: **{r}**."))
                .unwrap_or_default();
            Some(format!(
                "<@{}> — level {}, {} XP ({} this month).{} Event entries: {}.",
                target, stats.level, stats.xp, stats.monthly_xp, rank, entries
            ))
        }

        Builtin::Xp => match app.tracker.get_xp(inv.author_id) {
            Ok(xp) => Some(format!("You have {xp} XP.")),
            Err(e) => {
                warn!(error = %e, "xp lookup failed");
                None
            }
        },
    }
}

fn parse_time(token: &str) -> Option<(u8, u8)> {
    let (hour, minute) = token.split_once(':')?;
    let hour: u8 = hour.parse().ok()?;
    let minute: u8 = minute.parse().ok()?;
    if hour > 23 || minute > 59 {
        return None;
    }
    Some((hour, minute))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    use rusqlite::Connection;
    use steward_commands::CustomCommands;
    use steward_core::config::{
        DatabaseConfig, DiscordConfig, EventsConfig, GamesConfig, GateConfig, SlowmodeConfig,
        StewardConfig, WebConfig, XpConfig,
    };
    use steward_events::EventManager;
    use steward_games::{GameTimer, GamesHandle};
    use steward_slowmode::Thermometer;
    use steward_tracker::Tracker;

    fn mem() -> Arc<Mutex<Connection>> {
        Arc::new(Mutex::new(Connection::open_in_memory().unwrap()))
    }

    fn test_app() -> App {
        let config = StewardConfig {
            discord: DiscordConfig {
                bot_token: "token".to_string(),
                prefix: '!',
                admin_roles: vec![9],
                debug_users: vec![100],
            },
            xp: XpConfig::default(),
            gate: GateConfig {
                message: 555,
                emoji: "\u{1f511}".to_string(),
                role: 777,
            },
            games: GamesConfig {
                announcement_channel: 1,
                poll_secs: 60,
            },
            events: EventsConfig::default(),
            slowmode: SlowmodeConfig::default(),
            database: DatabaseConfig::default(),
            web: WebConfig::default(),
        };
        let tracker = Tracker::new(mem(), config.xp.clone()).unwrap();
        let commands = CustomCommands::new(mem()).unwrap();
        let games = GamesHandle::new(Connection::open_in_memory().unwrap()).unwrap();
        let game_timer = GameTimer::new(Connection::open_in_memory().unwrap(), 60).unwrap();
        let events = EventManager::new(mem(), config.events.clone()).unwrap();
        let thermometer = Thermometer::new(&config.slowmode);
        App::new(config, tracker, commands, games, game_timer, events, thermometer)
    }

    fn admin(content: &str) -> Invocation {
        Invocation {
            author_id: 5,
            content: content.to_string(),
            mentioned: None,
            is_admin: true,
        }
    }

    fn member(content: &str) -> Invocation {
        Invocation {
            is_admin: false,
            ..admin(content)
        }
    }

    #[test]
    fn table_flags_admin_commands() {
        let table = BuiltinTable::new();
        assert!(table.get("define").unwrap().admin_only);
        assert!(table.get("say").unwrap().admin_only);
        assert!(!table.get("lvl").unwrap().admin_only);
        assert!(table.get("unknown").is_none());
        assert_eq!(table.names().count(), 20);
    }

    #[test]
    fn admin_commands_are_silent_for_members() {
        let app = test_app();
        let entry = app.builtins.get("say").unwrap();
        assert_eq!(dispatch(&app, entry, &member("!say hi")), None);
        assert_eq!(
            dispatch(&app, entry, &admin("!say hi")),
            Some("hi".to_string())
        );
    }

    #[test]
    fn reserved_names_cannot_be_defined() {
        let app = test_app();
        let entry = app.builtins.get("define").unwrap();
        let reply = dispatch(&app, entry, &admin("!define lvl pwned")).unwrap();
        assert!(reply.contains("built-in"));
        assert!(!app.commands.has("lvl").unwrap());
    }

    #[test]
    fn define_then_render() {
        let app = test_app();
        let entry = app.builtins.get("define").unwrap();
        let reply = dispatch(&app, entry, &admin("!define hug %user% gets a hug")).unwrap();
        assert!(reply.contains("!hug"));
        assert_eq!(
            app.commands.render("hug", "<@5>").unwrap(),
            "<@5> gets a hug"
        );
    }

    #[test]
    fn say_with_no_text_is_silent() {
        let app = test_app();
        let entry = app.builtins.get("say").unwrap();
        assert_eq!(dispatch(&app, entry, &admin("!say")), None);
    }

    #[test]
    fn xp_reports_zero_for_new_members() {
        let app = test_app();
        let entry = app.builtins.get("xp").unwrap();
        assert_eq!(
            dispatch(&app, entry, &member("!xp")),
            Some("You have 0 XP.".to_string())
        );
    }

    #[test]
    fn addxp_requires_mention_and_amount() {
        let app = test_app();
        let entry = app.builtins.get("addxp").unwrap();
        let usage = dispatch(&app, entry, &admin("!addxp 50")).unwrap();
        assert!(usage.starts_with("Usage:"));

        let mut inv = admin("!addxp <@7> 50");
        inv.mentioned = Some(7);
        let reply = dispatch(&app, entry, &inv).unwrap();
        assert!(reply.contains("50 XP"));
        assert_eq!(app.tracker.get_xp(7).unwrap(), 50);
    }

    #[test]
    fn addgame_validates_arguments() {
        let app = test_app();
        let entry = app.builtins.get("addgame").unwrap();
        assert!(dispatch(&app, entry, &admin("!addgame fri"))
            .unwrap()
            .starts_with("Usage:"));
        assert!(dispatch(&app, entry, &admin("!addgame fri 25:00 Trivia"))
            .unwrap()
            .starts_with("Usage:"));

        let reply = dispatch(&app, entry, &admin("!addgame fri 19:00 Trivia Night")).unwrap();
        assert!(reply.contains("Trivia Night"));
        assert!(reply.contains("Fridays"));
        assert_eq!(app.games.list_games().unwrap().len(), 1);
    }

    #[test]
    fn leaderboard_empty_message() {
        let app = test_app();
        let entry = app.builtins.get("lb").unwrap();
        assert_eq!(
            dispatch(&app, entry, &member("!lb")),
            Some("The leaderboard is empty.".to_string())
        );
    }

    #[test]
    fn bonus_cycle() {
        let app = test_app();
        let set = app.builtins.get("bonusxp").unwrap();
        let reset = app.builtins.get("nobonusxp").unwrap();
        assert!(dispatch(&app, set, &admin("!bonusxp 2"))
            .unwrap()
            .contains("×2"));
        assert_eq!(app.tracker.bonus(), 2);
        dispatch(&app, reset, &admin("!nobonusxp")).unwrap();
        assert_eq!(app.tracker.bonus(), 1);
    }
}
