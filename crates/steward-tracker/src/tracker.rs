use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use chrono::Utc;
use dashmap::DashMap;
use rusqlite::Connection;
use steward_core::config::XpConfig;
use tracing::debug;

use crate::db::{self, XpRow};
use crate::error::Result;
use crate::level::{level_for_xp, rank_for_level};

/// In-process view of one member's engagement state.
///
/// `last_award` lives only here — the cooldown restarts when an entry is
/// evicted and reloaded, which errs on the side of awarding.
#[derive(Debug, Default, Clone)]
struct CachedMember {
    xp: i64,
    monthly_xp: i64,
    month: String,
    last_award: Option<Instant>,
}

impl From<XpRow> for CachedMember {
    fn from(row: XpRow) -> Self {
        Self {
            xp: row.xp,
            monthly_xp: row.monthly_xp,
            month: row.month,
            last_award: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LeaderboardEntry {
    pub user_id: u64,
    pub xp: i64,
    pub level: i64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemberStats {
    pub user_id: u64,
    pub xp: i64,
    pub monthly_xp: i64,
    pub level: i64,
    pub rank: Option<String>,
}

/// XP awarder. One instance per process; safe to call from concurrent
/// event handlers — dashmap gives per-member mutual exclusion on the hot
/// path and the connection mutex serialises writes.
pub struct Tracker {
    db: Arc<Mutex<Connection>>,
    cache: DashMap<u64, CachedMember>,
    /// Process-wide award multiplier, ≥ 1.
    bonus: Mutex<i64>,
    config: XpConfig,
}

impl Tracker {
    pub fn new(db: Arc<Mutex<Connection>>, config: XpConfig) -> Result<Self> {
        {
            let conn = db.lock().unwrap();
            db::init_db(&conn)?;
        }
        Ok(Self {
            db,
            cache: DashMap::new(),
            bonus: Mutex::new(1),
            config,
        })
    }

    /// Award XP for one message. Returns a level-up notification to send
    /// back to the channel when the award crosses a level threshold.
    pub fn give_xp(&self, user_id: u64) -> Result<Option<String>> {
        let month = Utc::now().format("%Y-%m").to_string();
        self.award_at(user_id, Instant::now(), &month)
    }

    fn award_at(&self, user_id: u64, now: Instant, month: &str) -> Result<Option<String>> {
        let bonus = *self.bonus.lock().unwrap();
        let cooldown = Duration::from_secs(self.config.cooldown_secs);

        let mut member = self.cached(user_id)?;
        if let Some(last) = member.last_award {
            if now.duration_since(last) < cooldown {
                return Ok(None);
            }
        }

        if member.month != month {
            member.monthly_xp = 0;
            member.month = month.to_string();
        }

        let before = level_for_xp(member.xp);
        let amount = self.config.per_message * bonus;
        member.xp += amount;
        member.monthly_xp += amount;
        member.last_award = Some(now);
        let row = XpRow {
            xp: member.xp,
            monthly_xp: member.monthly_xp,
            month: member.month.clone(),
        };
        drop(member);

        {
            let conn = self.db.lock().unwrap();
            db::upsert(&conn, user_id, &row)?;
        }

        let after = level_for_xp(row.xp);
        if after <= before {
            return Ok(None);
        }
        debug!(user_id, level = after, "level up");

        let mut note = format!("Congrats <@{user_id}>, you've reached level {after}!");
        let earned = rank_for_level(&self.config.ranks, after);
        if earned.map(|r| r.level) != rank_for_level(&self.config.ranks, before).map(|r| r.level) {
            if let Some(rank) = earned {
                note.push_str(&format!(" You've earned the rank **{}**.", rank.title));
            }
        }
        Ok(Some(note))
    }

    /// Grant extra XP outside the per-message path (admin command, event
    /// prize). Returns the member's new total.
    pub fn add_xp(&self, user_id: u64, amount: i64) -> Result<i64> {
        let mut member = self.cached(user_id)?;
        member.xp += amount;
        let row = XpRow {
            xp: member.xp,
            monthly_xp: member.monthly_xp,
            month: member.month.clone(),
        };
        drop(member);

        let conn = self.db.lock().unwrap();
        db::upsert(&conn, user_id, &row)?;
        Ok(row.xp)
    }

    pub fn set_bonus(&self, multiplier: i64) {
        *self.bonus.lock().unwrap() = multiplier.max(1);
    }

    pub fn clear_bonus(&self) {
        *self.bonus.lock().unwrap() = 1;
    }

    pub fn bonus(&self) -> i64 {
        *self.bonus.lock().unwrap()
    }

    /// Evict a departed member's cached state. Their next message (if they
    /// rejoin) reloads from the database.
    pub fn remove_from_cache(&self, user_id: u64) {
        self.cache.remove(&user_id);
    }

    /// Rebuild the cache for the given member set. Called when the guild
    /// becomes available so stale entries from before a reconnect are gone.
    pub fn refresh(&self, member_ids: &[u64]) -> Result<()> {
        self.cache.clear();
        let conn = self.db.lock().unwrap();
        for &id in member_ids {
            if let Some(row) = db::get(&conn, id)? {
                self.cache.insert(id, row.into());
            }
        }
        Ok(())
    }

    pub fn get_xp(&self, user_id: u64) -> Result<i64> {
        if let Some(member) = self.cache.get(&user_id) {
            return Ok(member.xp);
        }
        let conn = self.db.lock().unwrap();
        Ok(db::get(&conn, user_id)?.map(|r| r.xp).unwrap_or(0))
    }

    pub fn leaderboard(&self, limit: usize) -> Result<Vec<LeaderboardEntry>> {
        let conn = self.db.lock().unwrap();
        let rows = db::top(&conn, limit)?;
        Ok(rows
            .into_iter()
            .map(|(user_id, xp)| LeaderboardEntry {
                user_id,
                xp,
                level: level_for_xp(xp),
            })
            .collect())
    }

    pub fn userinfo(&self, user_id: u64) -> Result<MemberStats> {
        let (xp, monthly_xp) = if let Some(member) = self.cache.get(&user_id) {
            (member.xp, member.monthly_xp)
        } else {
            let conn = self.db.lock().unwrap();
            db::get(&conn, user_id)?
                .map(|r| (r.xp, r.monthly_xp))
                .unwrap_or((0, 0))
        };
        let level = level_for_xp(xp);
        Ok(MemberStats {
            user_id,
            xp,
            monthly_xp,
            level,
            rank: rank_for_level(&self.config.ranks, level).map(|r| r.title.clone()),
        })
    }

    /// Fetch-or-load the cache entry for a member.
    fn cached(&self, user_id: u64) -> Result<dashmap::mapref::one::RefMut<'_, u64, CachedMember>> {
        if let Some(entry) = self.cache.get_mut(&user_id) {
            return Ok(entry);
        }
        let fresh = {
            let conn = self.db.lock().unwrap();
            db::get(&conn, user_id)?.map(CachedMember::from).unwrap_or_default()
        };
        Ok(self.cache.entry(user_id).or_insert(fresh))
    }
}
