//! Profile persistence

use chrono::{DateTime, SubsecRound, Utc};
use rusqlite::{ErrorCode, OptionalExtension, Row, params};
use uuid::Uuid;

use super::{Database, timestamp_col, timestamp_text, uuid_col};
use crate::models::{NewProfile, Profile};
use crate::{Error, Result};

const PROFILE_COLUMNS: &str = "id, user_id, nickname, bio, profile_image, theme, follower_count, following_count, created_at, updated_at";

pub const DEFAULT_THEME: &str = "light";

fn profile_from_row(row: &Row<'_>) -> rusqlite::Result<Profile> {
    Ok(Profile {
        id: uuid_col(row, 0)?,
        user_id: uuid_col(row, 1)?,
        nickname: row.get(2)?,
        bio: row.get(3)?,
        profile_image: row.get(4)?,
        theme: row.get(5)?,
        follower_count: row.get(6)?,
        following_count: row.get(7)?,
        created_at: timestamp_col(row, 8)?,
        updated_at: timestamp_col(row, 9)?,
    })
}

/// Translate a unique-constraint failure on `profiles` into a conflict
fn map_insert_error(err: rusqlite::Error) -> Error {
    if let rusqlite::Error::SqliteFailure(code, Some(msg)) = &err {
        if code.code == ErrorCode::ConstraintViolation {
            if msg.contains("profiles.nickname") {
                return Error::Conflict("nickname already in use".to_string());
            }
            if msg.contains("profiles.user_id") {
                return Error::Conflict("profile already exists".to_string());
            }
        }
    }
    Error::from(err)
}

/// Store for user profiles
#[derive(Clone)]
pub struct ProfileStore {
    db: Database,
}

impl ProfileStore {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Insert a profile with zero counters and the default theme
    pub async fn create(&self, new: NewProfile, now: DateTime<Utc>) -> Result<Profile> {
        self.db
            .call(move |conn| {
                let now = now.trunc_subsecs(6);
                let profile = Profile {
                    id: Uuid::new_v4(),
                    user_id: new.user_id,
                    nickname: new.nickname,
                    bio: new.bio.unwrap_or_default(),
                    profile_image: new.profile_image.unwrap_or_default(),
                    theme: DEFAULT_THEME.to_string(),
                    follower_count: 0,
                    following_count: 0,
                    created_at: now,
                    updated_at: now,
                };

                conn.execute(
                    &format!(
                        "INSERT INTO profiles ({}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
                        PROFILE_COLUMNS
                    ),
                    params![
                        profile.id.to_string(),
                        profile.user_id.to_string(),
                        profile.nickname,
                        profile.bio,
                        profile.profile_image,
                        profile.theme,
                        profile.follower_count,
                        profile.following_count,
                        timestamp_text(profile.created_at),
                        timestamp_text(profile.updated_at),
                    ],
                )
                .map_err(map_insert_error)?;

                Ok(profile)
            })
            .await
    }

    /// Resolve a nickname to the owning user id
    pub async fn user_id_by_nickname(&self, nickname: &str) -> Result<Uuid> {
        let nickname = nickname.to_string();
        self.db
            .call(move |conn| {
                let user_id = conn
                    .query_row(
                        "SELECT user_id FROM profiles WHERE nickname = ?1",
                        params![nickname],
                        |row| uuid_col(row, 0),
                    )
                    .optional()?;
                user_id.ok_or_else(|| Error::not_found(format!("user {}", nickname)))
            })
            .await
    }

    pub async fn get_by_user_id(&self, user_id: Uuid) -> Result<Option<Profile>> {
        self.db
            .call(move |conn| {
                let profile = conn
                    .query_row(
                        &format!("SELECT {} FROM profiles WHERE user_id = ?1", PROFILE_COLUMNS),
                        params![user_id.to_string()],
                        profile_from_row,
                    )
                    .optional()?;
                Ok(profile)
            })
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_profile(nickname: &str) -> NewProfile {
        NewProfile {
            user_id: Uuid::new_v4(),
            nickname: nickname.to_string(),
            bio: None,
            profile_image: Some("https://img.example/me.png".to_string()),
        }
    }

    #[tokio::test]
    async fn test_create_and_lookup() {
        let store = ProfileStore::new(Database::in_memory().unwrap());
        let created = store.create(new_profile("alice"), Utc::now()).await.unwrap();
        assert_eq!(created.theme, "light");
        assert_eq!(created.bio, "");

        let user_id = store.user_id_by_nickname("alice").await.unwrap();
        assert_eq!(user_id, created.user_id);

        let loaded = store.get_by_user_id(created.user_id).await.unwrap().unwrap();
        assert_eq!(loaded, created);
    }

    #[tokio::test]
    async fn test_unknown_nickname() {
        let store = ProfileStore::new(Database::in_memory().unwrap());
        let err = store.user_id_by_nickname("nobody").await.unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
        assert!(store.get_by_user_id(Uuid::new_v4()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_duplicates_conflict() {
        let store = ProfileStore::new(Database::in_memory().unwrap());
        let first = store.create(new_profile("alice"), Utc::now()).await.unwrap();

        let err = store.create(new_profile("alice"), Utc::now()).await.unwrap_err();
        assert_eq!(err.to_string(), "Conflict: nickname already in use");

        let mut same_user = new_profile("alice2");
        same_user.user_id = first.user_id;
        let err = store.create(same_user, Utc::now()).await.unwrap_err();
        assert!(matches!(err, Error::Conflict(_)));
    }
}
