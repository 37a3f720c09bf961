//! Profile seeding at sign-up

use chrono::Utc;
use tracing::info;

use crate::Result;
use crate::models::{NewProfile, Profile};
use crate::store::ProfileStore;
use crate::validation::Limits;

#[derive(Clone)]
pub struct ProfileService {
    profiles: ProfileStore,
    limits: Limits,
}

impl ProfileService {
    pub fn new(profiles: ProfileStore, limits: Limits) -> Self {
        Self { profiles, limits }
    }

    /// Create the profile for a newly registered user
    pub async fn create_profile(&self, mut new: NewProfile) -> Result<Profile> {
        new.nickname = new.nickname.trim().to_string();
        self.limits.check_nickname(&new.nickname)?;

        let profile = self.profiles.create(new, Utc::now()).await?;
        info!("Created profile {} for user {}", profile.nickname, profile.user_id);
        Ok(profile)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error;
    use crate::store::Database;
    use uuid::Uuid;

    fn service() -> ProfileService {
        ProfileService::new(ProfileStore::new(Database::in_memory().unwrap()), Limits::default())
    }

    fn new_profile(nickname: &str) -> NewProfile {
        NewProfile {
            user_id: Uuid::new_v4(),
            nickname: nickname.to_string(),
            bio: Some("hello".to_string()),
            profile_image: None,
        }
    }

    #[tokio::test]
    async fn test_create_profile_trims_nickname() {
        let profile = service().create_profile(new_profile("  planet  ")).await.unwrap();
        assert_eq!(profile.nickname, "planet");
        assert_eq!(profile.bio, "hello");
        assert_eq!(profile.follower_count, 0);
    }

    #[tokio::test]
    async fn test_create_profile_rejects_bad_nickname() {
        let service = service();
        assert!(matches!(service.create_profile(new_profile("")).await, Err(Error::Validation(_))));
        assert!(matches!(
            service.create_profile(new_profile(&"x".repeat(51))).await,
            Err(Error::Validation(_))
        ));
    }

    #[tokio::test]
    async fn test_duplicate_nickname_conflicts() {
        let service = service();
        service.create_profile(new_profile("planet")).await.unwrap();
        assert!(matches!(service.create_profile(new_profile("planet")).await, Err(Error::Conflict(_))));
    }
}
