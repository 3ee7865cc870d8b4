use crate::{error::StoreError, models::Role, repository::Repository};

/// Action
///
/// The mutating operations guarded by [`authorize`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Create,
    Edit,
    Delete,
}

impl Action {
    /// The notice shown to a caller who may not perform this action.
    pub fn denial_message(&self) -> &'static str {
        match self {
            Action::Create => {
                "You do not have permission to add images. Please contact the admin."
            }
            Action::Edit => "You do not have permission to Edit images. Please contact the admin.",
            Action::Delete => {
                "You do not have permission to Delete images. Please contact the admin."
            }
        }
    }
}

/// Denial
///
/// Terminal outcome of a failed gate check. Not retryable; the caller renders
/// `message` and nothing is mutated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Denial {
    pub action: Action,
    pub role: Role,
    pub message: &'static str,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Allowed,
    Denied(Denial),
}

impl Decision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Decision::Allowed)
    }

    pub fn into_result(self) -> Result<(), Denial> {
        match self {
            Decision::Allowed => Ok(()),
            Decision::Denied(denial) => Err(denial),
        }
    }
}

/// authorize
///
/// Pure policy: Create and Edit need any non-Guest role, Delete needs Admin.
pub fn authorize(role: Role, action: Action) -> Decision {
    let allowed = match action {
        Action::Create | Action::Edit => role != Role::Guest,
        Action::Delete => role == Role::Admin,
    };

    if allowed {
        Decision::Allowed
    } else {
        tracing::info!(?role, ?action, "authorization denied");
        Decision::Denied(Denial {
            action,
            role,
            message: action.denial_message(),
        })
    }
}

/// resolve_role
///
/// The only place a role is derived. Anonymous callers, unknown users, users without a
/// stored role and users with an unrecognised stored role are all `Guest`.
///
/// Always reads the store: a role change takes effect on the user's next request.
pub async fn resolve_role(
    repo: &dyn Repository,
    identity: Option<&str>,
) -> Result<Role, StoreError> {
    let Some(username) = identity.filter(|u| !u.is_empty()) else {
        return Ok(Role::Guest);
    };

    let Some(user) = repo.find_user_by_username(username).await? else {
        return Ok(Role::Guest);
    };

    let role = match user.role.as_deref() {
        None => Role::Guest,
        Some(stored) => stored.parse().unwrap_or_else(|e| {
            tracing::warn!("user `{}` has {}; treating as Guest", username, e);
            Role::Guest
        }),
    };

    Ok(role)
}
