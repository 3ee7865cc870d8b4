use uuid::Uuid;

use crate::{
    error::{AuthError, RegistrationError, StoreError, ValidationErrors},
    models::{NewUser, PreservedInput, Role},
    password,
    repository::Repository,
    session::{Session, SessionStore, SessionToken},
    validation::{self, validate_registration},
};

/// register
///
/// Creates an account in three ordered steps: shape validation, username lookup, insert.
/// Nothing is persisted unless every step passes. A missing role becomes `Guest`.
///
/// The lookup and the insert are separate store calls. Two concurrent registrations
/// of the same name can both pass the lookup; stores with a uniqueness constraint
/// report the loser as `UsernameTaken`, stores without one keep both rows.
pub async fn register(
    repo: &dyn Repository,
    username: Option<&str>,
    password: Option<&str>,
    role: Option<Role>,
) -> Result<Uuid, RegistrationError> {
    let input = PreservedInput {
        username: username.map(str::to_string),
        role,
    };

    if let Err(errors) = validate_registration(username, password) {
        return Err(RegistrationError::Invalid { errors, input });
    }
    let username = username.unwrap_or_default();
    let password = password.unwrap_or_default();

    if repo.find_user_by_username(username).await?.is_some() {
        tracing::info!("registration rejected: username `{}` is taken", username);
        return Err(RegistrationError::UsernameTaken { input });
    }

    let password_digest = match password::hash(password) {
        Ok(digest) => digest,
        Err(_) => {
            let mut errors = ValidationErrors::new();
            errors.add("password", validation::PASSWORD_REQUIRED);
            return Err(RegistrationError::Invalid { errors, input });
        }
    };

    let role = role.unwrap_or_default();
    let new_user = NewUser {
        username: username.to_string(),
        password_digest,
        role,
    };

    match repo.insert_user(new_user).await {
        Ok(id) => {
            tracing::info!(%id, %role, "registered user `{}`", username);
            Ok(id)
        }
        Err(StoreError::Conflict(_)) => Err(RegistrationError::UsernameTaken { input }),
        Err(e) => Err(e.into()),
    }
}

/// login
///
/// Verifies the credentials and opens a session. Unknown usernames and wrong passwords
/// fail identically with `InvalidCredentials`. A session is created only after the
/// match succeeds, so a failed attempt leaves no state behind.
pub async fn login(
    repo: &dyn Repository,
    sessions: &dyn SessionStore,
    username: &str,
    password: Option<&str>,
) -> Result<Session, AuthError> {
    let password = password
        .filter(|p| !p.is_empty())
        .ok_or(AuthError::MissingPassword)?;

    let digest = password::hash(password)?;

    let Some(user) = repo.find_user_by_credentials(username, &digest).await? else {
        tracing::warn!("failed login attempt for `{}`", username);
        return Err(AuthError::InvalidCredentials);
    };

    let token = sessions.create(&user.username).await;
    tracing::info!(session = %token, "user `{}` logged in", user.username);

    Ok(Session {
        token,
        username: user.username,
    })
}

/// logout
///
/// Destroys the server-side session if there is one. Calling it without a session, or
/// twice for the same session, is a no-op.
pub async fn logout(sessions: &dyn SessionStore, token: Option<SessionToken>) {
    if let Some(token) = token {
        sessions.destroy(token).await;
        tracing::info!(session = %token, "session closed");
    }
}
