//! Level curve: level n starts at 100·n² XP, so early levels come quickly
//! and later ones stretch out.

use steward_core::config::Rank;

pub fn level_for_xp(xp: i64) -> i64 {
    if xp <= 0 {
        return 0;
    }
    ((xp / 100) as f64).sqrt() as i64
}

pub fn xp_for_level(level: i64) -> i64 {
    100 * level * level
}

/// The highest rank whose threshold the given level has reached.
pub fn rank_for_level<'a>(ranks: &'a [Rank], level: i64) -> Option<&'a Rank> {
    ranks
        .iter()
        .filter(|r| r.level <= level)
        .max_by_key(|r| r.level)
}
