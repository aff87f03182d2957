//! Wedding access resolution.
//!
//! Decides what a signed-in user may do on a wedding. Precedence is
//! global admin, then the wedding's creator, then an explicit grant.
//! Grants never inherit anything from the user's global role.

use serde::Serialize;
use sqlx::SqlitePool;
use thiserror::Error;

use crate::db::{find_access, get_wedding, AccessLevel, User, Wedding, WeddingAccess, WeddingPermissions};

/// Operations guarded by wedding-level permissions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    /// Read the full wedding record
    ViewWedding,
    /// Edit details, languages, budget or milestones
    EditDetails,
    /// Create, edit or delete guests and invitations
    ManageGuests,
    ListGuests,
    ViewStats,
    ManagePhotos,
    ModerateGuestBook,
    /// Create, change or revoke access grants
    ManageAccess,
    DeleteWedding,
}

impl Operation {
    fn is_read(self) -> bool {
        matches!(
            self,
            Operation::ViewWedding | Operation::ListGuests | Operation::ViewStats
        )
    }

    fn describe(self) -> &'static str {
        match self {
            Operation::ViewWedding => "view this wedding",
            Operation::EditDetails => "edit wedding details",
            Operation::ManageGuests => "manage guests",
            Operation::ListGuests => "view the guest list",
            Operation::ViewStats => "view wedding analytics",
            Operation::ManagePhotos => "manage photos",
            Operation::ModerateGuestBook => "moderate the guest book",
            Operation::ManageAccess => "manage access to this wedding",
            Operation::DeleteWedding => "delete this wedding",
        }
    }
}

/// Effective access of a user on one wedding
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolvedAccess {
    Admin,
    Owner,
    Granted {
        level: AccessLevel,
        permissions: WeddingPermissions,
    },
    None,
}

impl ResolvedAccess {
    pub fn permissions(&self) -> WeddingPermissions {
        match self {
            ResolvedAccess::Admin | ResolvedAccess::Owner => WeddingPermissions::all(),
            ResolvedAccess::Granted { permissions, .. } => *permissions,
            ResolvedAccess::None => WeddingPermissions::none(),
        }
    }

    pub fn has_any(&self) -> bool {
        !matches!(self, ResolvedAccess::None)
    }

    /// Admin or owner, including holders of an `owner` grant
    pub fn is_owner_or_admin(&self) -> bool {
        matches!(
            self,
            ResolvedAccess::Admin
                | ResolvedAccess::Owner
                | ResolvedAccess::Granted {
                    level: AccessLevel::Owner,
                    ..
                }
        )
    }

    pub fn allows(&self, op: Operation) -> bool {
        let perms = self.permissions();
        match op {
            Operation::ViewWedding => self.has_any(),
            Operation::EditDetails => perms.can_edit_details,
            Operation::ManageGuests => perms.can_manage_guests,
            Operation::ListGuests => perms.can_manage_guests || perms.can_view_analytics,
            Operation::ViewStats => perms.can_view_analytics,
            Operation::ManagePhotos => perms.can_manage_photos,
            Operation::ModerateGuestBook => perms.can_edit_guest_book,
            Operation::ManageAccess | Operation::DeleteWedding => self.is_owner_or_admin(),
        }
    }

    pub fn level_name(&self) -> &'static str {
        match self {
            ResolvedAccess::Admin => "admin",
            ResolvedAccess::Owner => "owner",
            ResolvedAccess::Granted { level, .. } => match level {
                AccessLevel::Owner => "owner",
                AccessLevel::GuestManager => "guest_manager",
                AccessLevel::Viewer => "viewer",
            },
            ResolvedAccess::None => "none",
        }
    }
}

/// Serializable view of a resolved access, returned to clients
#[derive(Debug, Clone, Serialize)]
pub struct AccessView {
    pub wedding_id: String,
    pub access_level: &'static str,
    pub is_admin: bool,
    pub is_owner: bool,
    pub permissions: WeddingPermissions,
}

impl AccessView {
    pub fn new(wedding_id: &str, access: &ResolvedAccess) -> Self {
        Self {
            wedding_id: wedding_id.to_string(),
            access_level: access.level_name(),
            is_admin: matches!(access, ResolvedAccess::Admin),
            is_owner: access.is_owner_or_admin() && !matches!(access, ResolvedAccess::Admin),
            permissions: access.permissions(),
        }
    }
}

#[derive(Error, Debug)]
pub enum AccessError {
    #[error("Wedding not found")]
    WeddingNotFound,

    #[error("You do not have permission to {0}")]
    Forbidden(&'static str),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Resolve a user's access on a wedding from an already-loaded grant
pub fn resolve(user: &User, wedding: &Wedding, grant: Option<&WeddingAccess>) -> ResolvedAccess {
    if user.is_admin() {
        return ResolvedAccess::Admin;
    }
    if wedding.user_id == user.id {
        return ResolvedAccess::Owner;
    }
    match grant {
        Some(grant) if grant.wedding_id == wedding.id && grant.user_id == user.id => {
            let level = grant.level();
            let permissions = match level {
                AccessLevel::Owner => WeddingPermissions::all(),
                _ => grant.permissions(),
            };
            ResolvedAccess::Granted { level, permissions }
        }
        _ => ResolvedAccess::None,
    }
}

/// Resolve access, loading the user's grant when one is needed
pub async fn resolve_access(
    pool: &SqlitePool,
    user: &User,
    wedding: &Wedding,
) -> Result<ResolvedAccess, AccessError> {
    if user.is_admin() || wedding.user_id == user.id {
        return Ok(resolve(user, wedding, None));
    }
    let grant = find_access(pool, &wedding.id, &user.id).await?;
    Ok(resolve(user, wedding, grant.as_ref()))
}

/// Check an operation against a resolved access.
///
/// Users with no access at all get `WeddingNotFound` on reads of private
/// weddings so their existence is not revealed.
pub fn check(access: &ResolvedAccess, wedding: &Wedding, op: Operation) -> Result<(), AccessError> {
    if access.allows(op) {
        return Ok(());
    }
    if !access.has_any() && op.is_read() && !wedding.is_public {
        return Err(AccessError::WeddingNotFound);
    }
    Err(AccessError::Forbidden(op.describe()))
}

/// Load a wedding and require `op` on it
pub async fn authorize(
    pool: &SqlitePool,
    user: &User,
    wedding_id: &str,
    op: Operation,
) -> Result<(Wedding, ResolvedAccess), AccessError> {
    let wedding = get_wedding(pool, wedding_id)
        .await?
        .ok_or(AccessError::WeddingNotFound)?;
    let access = resolve_access(pool, user, &wedding).await?;

    if let Err(err) = check(&access, &wedding, op) {
        tracing::debug!(
            user_id = %user.id,
            wedding_id = %wedding.id,
            operation = ?op,
            access = access.level_name(),
            "Wedding access denied"
        );
        return Err(err);
    }

    Ok((wedding, access))
}
