use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

/// Top-level config (steward.toml + STEWARD_* env overrides).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StewardConfig {
    pub discord: DiscordConfig,
    #[serde(default)]
    pub xp: XpConfig,
    pub gate: GateConfig,
    pub games: GamesConfig,
    #[serde(default)]
    pub events: EventsConfig,
    #[serde(default)]
    pub slowmode: SlowmodeConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub web: WebConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiscordConfig {
    pub bot_token: String,
    /// Leading character that marks a message as a command.
    #[serde(default = "default_prefix")]
    pub prefix: char,
    /// Role ids whose holders may use the admin-only built-in commands.
    #[serde(default)]
    pub admin_roles: Vec<u64>,
    /// User ids allowed to toggle debug mode and to keep talking to the
    /// bot while it is active.
    #[serde(default)]
    pub debug_users: Vec<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct XpConfig {
    /// Channels where messages never earn XP.
    #[serde(default)]
    pub exempt_channels: Vec<u64>,
    #[serde(default = "default_xp_per_message")]
    pub per_message: i64,
    /// Minimum seconds between two awards for the same member.
    #[serde(default = "default_xp_cooldown")]
    pub cooldown_secs: u64,
    /// Rank titles earned at level thresholds, lowest first.
    #[serde(default)]
    pub ranks: Vec<Rank>,
}

impl Default for XpConfig {
    fn default() -> Self {
        Self {
            exempt_channels: Vec::new(),
            per_message: default_xp_per_message(),
            cooldown_secs: default_xp_cooldown(),
            ranks: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Rank {
    pub level: i64,
    pub title: String,
}

/// The one-time reaction-to-role rule: reacting to `message` with `emoji`
/// grants `role`. Loaded at startup, never mutated.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GateConfig {
    pub message: u64,
    pub emoji: String,
    pub role: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GamesConfig {
    /// Channel that receives game announcements. The bot refuses to run
    /// without it.
    pub announcement_channel: u64,
    #[serde(default = "default_games_poll")]
    pub poll_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct EventsConfig {
    /// Channel where timed community events take place.
    pub channel: Option<u64>,
    #[serde(default = "default_prize_emoji")]
    pub prize_emoji: String,
    #[serde(default = "default_prize_xp")]
    pub prize_xp: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SlowmodeConfig {
    /// Sliding-window length for message-rate tracking.
    #[serde(default = "default_slowmode_window")]
    pub window_secs: u64,
    /// Messages inside the window before a channel counts as hot.
    #[serde(default = "default_slowmode_threshold")]
    pub hot_threshold: usize,
    #[serde(default = "default_slowmode_max_delay")]
    pub max_delay_secs: u16,
}

impl Default for SlowmodeConfig {
    fn default() -> Self {
        Self {
            window_secs: default_slowmode_window(),
            hot_threshold: default_slowmode_threshold(),
            max_delay_secs: default_slowmode_max_delay(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    #[serde(default = "default_db_path")]
    pub path: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default = "default_web_bind")]
    pub bind: String,
    #[serde(default = "default_web_port")]
    pub port: u16,
}

impl Default for WebConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            bind: default_web_bind(),
            port: default_web_port(),
        }
    }
}

fn default_prefix() -> char {
    '!'
}
fn default_xp_per_message() -> i64 {
    15
}
fn default_xp_cooldown() -> u64 {
    60
}
fn default_games_poll() -> u64 {
    60
}
fn default_prize_emoji() -> String {
    "\u{1f3c6}".to_string() // 🏆
}
fn default_prize_xp() -> i64 {
    100
}
fn default_slowmode_window() -> u64 {
    60
}
fn default_slowmode_threshold() -> usize {
    30
}
fn default_slowmode_max_delay() -> u16 {
    30
}
fn default_db_path() -> String {
    let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
    format!("{}/.steward/steward.db", home)
}
fn default_web_bind() -> String {
    "127.0.0.1".to_string()
}
fn default_web_port() -> u16 {
    8380
}

impl StewardConfig {
    /// Load config from a TOML file with STEWARD_* env var overrides.
    pub fn load(config_path: Option<&str>) -> crate::error::Result<Self> {
        let path = config_path
            .map(String::from)
            .unwrap_or_else(default_config_path);

        let config: StewardConfig = Figment::new()
            .merge(Toml::file(&path))
            .merge(Env::prefixed("STEWARD_").split("_"))
            .extract()
            .map_err(|e| crate::error::CoreError::Config(e.to_string()))?;

        Ok(config)
    }
}

fn default_config_path() -> String {
    let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
    format!("{}/.steward/steward.toml", home)
}
