//! Community membership ledger.
//!
//! Memberships are records keyed by (community, user). Member counts are
//! always derived by scanning those records; nothing is incremented.
//! Approval of pending applications and role succession are not handled here.

use crate::error::{NetworkError, Result};
use crate::events::{EventBus, NetworkEvent};
use crate::graph::EdgeStore;
use crate::identity::{CommunityId, UserId};
use crate::locks::KeyedLocks;
use chrono::{DateTime, Utc};
use log::debug;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Who may join without approval.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Visibility {
    /// Anyone becomes a member immediately
    Public,
    /// Joining creates a pending application
    Private,
}

/// A user's standing in a community.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MembershipRole {
    /// No record
    None,
    /// Applied to a private community, not yet approved
    PendingApproval,
    /// Regular member
    Member,
    /// Member with moderation rights
    Moderator,
    /// Member with full rights; the creator starts here
    Admin,
}

impl MembershipRole {
    /// Whether this role counts towards `member_count`.
    pub fn is_member(self) -> bool {
        matches!(
            self,
            MembershipRole::Member | MembershipRole::Moderator | MembershipRole::Admin
        )
    }
}

impl fmt::Display for MembershipRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MembershipRole::None => write!(f, "none"),
            MembershipRole::PendingApproval => write!(f, "pending-approval"),
            MembershipRole::Member => write!(f, "member"),
            MembershipRole::Moderator => write!(f, "moderator"),
            MembershipRole::Admin => write!(f, "admin"),
        }
    }
}

/// A community record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Community {
    /// Unique identifier
    pub id: CommunityId,
    /// Display name
    pub name: String,
    /// Join policy
    pub visibility: Visibility,
    /// Creator
    pub owner: UserId,
    /// Creation time
    pub created_at: DateTime<Utc>,
}

/// A stored membership record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Membership {
    /// The community
    pub community: CommunityId,
    /// The user
    pub user: UserId,
    /// Current role, never `None` once stored
    pub role: MembershipRole,
    /// Time of the last role change
    pub updated_at: DateTime<Utc>,
}

/// Result of a join attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct JoinOutcome {
    /// Role after the call
    pub role: MembershipRole,
    /// True while the membership awaits approval
    pub requires_approval: bool,
}

/// Lock key for one (community, user) membership.
#[derive(Hash)]
struct MembershipKey<'a>(&'a CommunityId, &'a UserId);

impl fmt::Display for MembershipKey<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "membership {}/{}", self.0, self.1)
    }
}

/// Join/leave workflow and derived membership views.
#[derive(Clone)]
pub struct CommunityLedger {
    store: EdgeStore,
    locks: Arc<KeyedLocks>,
    events: Arc<EventBus>,
}

impl CommunityLedger {
    /// Build a ledger over shared components.
    pub fn new(store: EdgeStore, locks: Arc<KeyedLocks>, events: Arc<EventBus>) -> Self {
        Self {
            store,
            locks,
            events,
        }
    }

    /// Create a community owned by `owner`, who becomes its first admin.
    ///
    /// # Errors
    ///
    /// [`NetworkError::InvalidInput`] for a blank name.
    pub fn create_community(
        &self,
        owner: &UserId,
        name: &str,
        visibility: Visibility,
    ) -> Result<CommunityId> {
        let name = name.trim();
        if name.is_empty() {
            return Err(NetworkError::InvalidInput {
                message: "community name must not be empty".to_string(),
            });
        }

        let now = Utc::now();
        let community = Community {
            id: CommunityId::generate(),
            name: name.to_string(),
            visibility,
            owner: owner.clone(),
            created_at: now,
        };
        debug!("Creating community: id={}, owner={owner}", community.id);

        let mut batch = self.store.batch();
        batch.put_community(&community)?;
        batch.put_membership(&Membership {
            community: community.id,
            user: owner.clone(),
            role: MembershipRole::Admin,
            updated_at: now,
        })?;
        batch.commit()?;
        Ok(community.id)
    }

    /// Look up a community.
    ///
    /// # Errors
    ///
    /// [`NetworkError::NotFound`] if it does not exist.
    pub fn community(&self, id: &CommunityId) -> Result<Community> {
        self.store.community(id)?.ok_or_else(|| NetworkError::NotFound {
            entity: "community",
            id: id.to_string(),
        })
    }

    /// Join a community.
    ///
    /// Public communities grant `Member` immediately; private ones record
    /// `PendingApproval`. An existing membership is returned unchanged.
    ///
    /// # Errors
    ///
    /// [`NetworkError::NotFound`] for an unknown community.
    pub fn join_community(&self, user: &UserId, community: &CommunityId) -> Result<JoinOutcome> {
        debug!("Join community: user={user}, community={community}");
        let record = self.community(community)?;
        let guard = self.locks.acquire(&MembershipKey(community, user))?;

        if let Some(existing) = self.store.membership(community, user)? {
            return Ok(JoinOutcome {
                role: existing.role,
                requires_approval: existing.role == MembershipRole::PendingApproval,
            });
        }

        let role = match record.visibility {
            Visibility::Public => MembershipRole::Member,
            Visibility::Private => MembershipRole::PendingApproval,
        };
        let mut batch = self.store.batch();
        batch.put_membership(&Membership {
            community: *community,
            user: user.clone(),
            role,
            updated_at: Utc::now(),
        })?;
        batch.commit()?;
        drop(guard);

        self.events.publish(match role {
            MembershipRole::PendingApproval => NetworkEvent::CommunityJoinRequested {
                community: *community,
                user: user.clone(),
            },
            _ => NetworkEvent::CommunityJoined {
                community: *community,
                user: user.clone(),
            },
        });
        Ok(JoinOutcome {
            role,
            requires_approval: role == MembershipRole::PendingApproval,
        })
    }

    /// Leave a community, whatever the current role. Idempotent.
    ///
    /// Nobody is promoted when a moderator or admin leaves.
    ///
    /// # Errors
    ///
    /// Lock and storage failures only.
    pub fn leave_community(&self, user: &UserId, community: &CommunityId) -> Result<()> {
        debug!("Leave community: user={user}, community={community}");
        let guard = self.locks.acquire(&MembershipKey(community, user))?;
        let Some(existing) = self.store.membership(community, user)? else {
            return Ok(());
        };

        let mut batch = self.store.batch();
        batch.delete_membership(community, user);
        batch.commit()?;
        drop(guard);

        self.events.publish(NetworkEvent::CommunityLeft {
            community: *community,
            user: user.clone(),
            previous_role: existing.role,
        });
        Ok(())
    }

    /// A user's role in a community (`None` without a record).
    pub fn membership(&self, user: &UserId, community: &CommunityId) -> Result<MembershipRole> {
        Ok(self
            .store
            .membership(community, user)?
            .map_or(MembershipRole::None, |m| m.role))
    }

    /// Number of members, moderators and admins. Pending applications do not count.
    pub fn member_count(&self, community: &CommunityId) -> Result<usize> {
        Ok(self
            .store
            .memberships_of_community(community)?
            .iter()
            .filter(|m| m.role.is_member())
            .count())
    }

    /// Every membership record of a community, pending ones included.
    pub fn members(&self, community: &CommunityId) -> Result<Vec<Membership>> {
        self.store.memberships_of_community(community)
    }

    /// Every community a user has a record in.
    pub fn communities_for(&self, user: &UserId) -> Result<Vec<Membership>> {
        self.store.memberships_of_user(user)
    }
}
