//! Follow relation persistence

use async_trait::async_trait;
use chrono::{DateTime, SubsecRound, Utc};
use rusqlite::{Connection, params};
use uuid::Uuid;

use super::{Database, timestamp_text};
use crate::visibility::FollowLookup;
use crate::{Error, Result};

fn adjust_counters(conn: &Connection, follower: Uuid, followee: Uuid, delta: i64, now: DateTime<Utc>) -> Result<()> {
    let now = timestamp_text(now);
    conn.execute(
        "UPDATE profiles SET follower_count = MAX(follower_count + ?1, 0), updated_at = ?2 WHERE user_id = ?3",
        params![delta, now, followee.to_string()],
    )?;
    conn.execute(
        "UPDATE profiles SET following_count = MAX(following_count + ?1, 0), updated_at = ?2 WHERE user_id = ?3",
        params![delta, now, follower.to_string()],
    )?;
    Ok(())
}

/// Store for the directed follower -> followee relation
#[derive(Clone)]
pub struct FollowStore {
    db: Database,
}

impl FollowStore {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    pub async fn is_following(&self, follower: Uuid, followee: Uuid) -> Result<bool> {
        self.db
            .call(move |conn| {
                let exists: bool = conn.query_row(
                    "SELECT EXISTS(SELECT 1 FROM follows WHERE follower_id = ?1 AND followee_id = ?2)",
                    params![follower.to_string(), followee.to_string()],
                    |row| row.get(0),
                )?;
                Ok(exists)
            })
            .await
    }

    /// Record that `follower` follows `followee`; returns false if it already did
    pub async fn follow(&self, follower: Uuid, followee: Uuid, now: DateTime<Utc>) -> Result<bool> {
        if follower == followee {
            return Err(Error::validation("cannot follow yourself"));
        }
        self.db
            .call(move |conn| {
                let now = now.trunc_subsecs(6);
                let tx = conn.transaction()?;
                let inserted = tx.execute(
                    "INSERT OR IGNORE INTO follows (id, follower_id, followee_id, created_at)
                     VALUES (?1, ?2, ?3, ?4)",
                    params![
                        Uuid::new_v4().to_string(),
                        follower.to_string(),
                        followee.to_string(),
                        timestamp_text(now),
                    ],
                )?;
                if inserted > 0 {
                    adjust_counters(&tx, follower, followee, 1, now)?;
                }
                tx.commit()?;
                Ok(inserted > 0)
            })
            .await
    }

    /// Remove the relation; returns false if there was nothing to remove
    pub async fn unfollow(&self, follower: Uuid, followee: Uuid, now: DateTime<Utc>) -> Result<bool> {
        self.db
            .call(move |conn| {
                let now = now.trunc_subsecs(6);
                let tx = conn.transaction()?;
                let removed = tx.execute(
                    "DELETE FROM follows WHERE follower_id = ?1 AND followee_id = ?2",
                    params![follower.to_string(), followee.to_string()],
                )?;
                if removed > 0 {
                    adjust_counters(&tx, follower, followee, -1, now)?;
                }
                tx.commit()?;
                Ok(removed > 0)
            })
            .await
    }
}

#[async_trait]
impl FollowLookup for FollowStore {
    async fn is_following(&self, viewer: Uuid, target: Uuid) -> Result<bool> {
        FollowStore::is_following(self, viewer, target).await
    }
}
