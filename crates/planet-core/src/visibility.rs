//! Visibility resolution between a viewer and an event owner

use std::sync::Arc;

use async_trait::async_trait;
use uuid::Uuid;

use crate::Result;
use crate::models::Visibility;

/// Answers whether one user follows another
#[async_trait]
pub trait FollowLookup: Send + Sync {
    async fn is_following(&self, viewer: Uuid, target: Uuid) -> Result<bool>;
}

/// Computes which visibility levels of `owner`'s events a viewer may read
#[derive(Clone)]
pub struct VisibilityResolver {
    follows: Arc<dyn FollowLookup>,
}

impl VisibilityResolver {
    pub fn new(follows: Arc<dyn FollowLookup>) -> Self {
        Self { follows }
    }

    /// Owner sees everything, followers see public and friends, everyone
    /// else (including anonymous viewers) sees public only.
    pub async fn resolve(&self, viewer: Option<Uuid>, owner: Uuid) -> Result<Vec<Visibility>> {
        let Some(viewer) = viewer else {
            return Ok(vec![Visibility::Public]);
        };
        if viewer == owner {
            return Ok(Visibility::ALL.to_vec());
        }
        if self.follows.is_following(viewer, owner).await? {
            Ok(vec![Visibility::Public, Visibility::Friends])
        } else {
            Ok(vec![Visibility::Public])
        }
    }
}
