//! Explicit per-call authentication context.

use zeroize::Zeroizing;

use crate::{certificate_state::Actor, common_models::user::User};

/// The signed-in user and their bearer token, passed into every authenticated operation.
#[derive(Clone)]
pub struct Session {
    pub user: User,
    token: Zeroizing<String>,
}

impl Session {
    pub fn new(user: User, token: impl Into<String>) -> Self {
        Self {
            user,
            token: Zeroizing::new(token.into()),
        }
    }

    pub fn token(&self) -> &str {
        self.token.as_str()
    }

    pub fn actor(&self) -> Actor {
        Actor {
            id: self.user.id.to_owned(),
            role: self.user.role,
            enabled: self.user.enabled,
        }
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("user", &self.user.id)
            .field("role", &self.user.role)
            .finish_non_exhaustive()
    }
}
