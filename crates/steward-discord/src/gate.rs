//! Reaction role gate: reacting to one sentinel message with one sentinel
//! emoji grants one role. Configuration is frozen at startup.

use serenity::model::channel::ReactionType;
use serenity::model::id::{MessageId, RoleId};

use steward_core::config::GateConfig;

pub struct ReactionGate {
    message: MessageId,
    emoji: String,
    role: RoleId,
}

impl ReactionGate {
    pub fn new(config: &GateConfig) -> Self {
        Self {
            message: MessageId::new(config.message),
            emoji: config.emoji.clone(),
            role: RoleId::new(config.role),
        }
    }

    pub fn role(&self) -> RoleId {
        self.role
    }

    /// True iff both the message and the emoji match the sentinel pair.
    pub fn matches(&self, message_id: MessageId, emoji: &ReactionType) -> bool {
        message_id == self.message && emoji_name(emoji) == Some(self.emoji.as_str())
    }
}

/// The comparable name of a reaction: the literal for unicode emoji, the
/// custom emoji's name otherwise.
pub fn emoji_name(emoji: &ReactionType) -> Option<&str> {
    match emoji {
        ReactionType::Unicode(name) => Some(name),
        ReactionType::Custom { name, .. } => name.as_deref(),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serenity::model::id::EmojiId;

    fn gate() -> ReactionGate {
        ReactionGate::new(&GateConfig {
            message: 555,
            emoji: "\u{1f511}".to_string(), // 🔑
            role: 777,
        })
    }

    #[test]
    fn sentinel_pair_matches() {
        let gate = gate();
        let emoji = ReactionType::Unicode("\u{1f511}".to_string());
        assert!(gate.matches(MessageId::new(555), &emoji));
    }

    #[test]
    fn wrong_message_does_not_match() {
        let gate = gate();
        let emoji = ReactionType::Unicode("\u{1f511}".to_string());
        assert!(!gate.matches(MessageId::new(556), &emoji));
    }

    #[test]
    fn wrong_emoji_does_not_match() {
        let gate = gate();
        let emoji = ReactionType::Unicode("\u{1f512}".to_string());
        assert!(!gate.matches(MessageId::new(555), &emoji));
    }

    #[test]
    fn custom_emoji_matches_by_name() {
        let gate = ReactionGate::new(&GateConfig {
            message: 555,
            emoji: "serverkey".to_string(),
            role: 777,
        });
        let emoji = ReactionType::Custom {
            animated: false,
            id: EmojiId::new(1),
            name: Some("serverkey".to_string()),
        };
        assert!(gate.matches(MessageId::new(555), &emoji));

        let nameless = ReactionType::Custom {
            animated: false,
            id: EmojiId::new(1),
            name: None,
        };
        assert!(!gate.matches(MessageId::new(555), &nameless));
    }
}
