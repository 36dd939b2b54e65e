//! Shared application state handed to the event handler.

use std::sync::Mutex;

use steward_commands::CustomCommands;
use steward_core::StewardConfig;
use steward_events::EventManager;
use steward_games::{GameTimer, GamesHandle};
use steward_slowmode::Thermometer;
use steward_tracker::Tracker;

use crate::builtins::BuiltinTable;
use crate::debug::DebugGate;
use crate::gate::ReactionGate;

/// Everything the dispatcher borrows while processing one event. Built
/// once at startup; the command table, gate configuration and reserved
/// keywords are immutable from then on.
pub struct App {
    pub config: StewardConfig,
    pub tracker: Tracker,
    pub commands: CustomCommands,
    pub games: GamesHandle,
    /// Announcement engine, taken by the first guild-available event.
    pub game_timer: Mutex<Option<GameTimer>>,
    pub events: EventManager,
    pub thermometer: Thermometer,
    pub debug: DebugGate,
    pub gate: ReactionGate,
    pub builtins: BuiltinTable,
}

impl App {
    pub fn new(
        config: StewardConfig,
        tracker: Tracker,
        commands: CustomCommands,
        games: GamesHandle,
        game_timer: GameTimer,
        events: EventManager,
        thermometer: Thermometer,
    ) -> Self {
        let builtins = BuiltinTable::new();
        // Built-in names can never be shadowed by custom commands.
        commands.set_reserved(builtins.names().map(String::from));

        let debug = DebugGate::new(config.discord.prefix, config.discord.debug_users.clone());
        let gate = ReactionGate::new(&config.gate);

        Self {
            config,
            tracker,
            commands,
            games,
            game_timer: Mutex::new(Some(game_timer)),
            events,
            thermometer,
            debug,
            gate,
            builtins,
        }
    }
}
