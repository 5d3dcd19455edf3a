//! Role × transition table.

use crate::{
    certificate_state::{error::TransitionError, Actor, TransitionKind},
    common_models::user::UserRole,
};

const ALL: [TransitionKind; 8] = [
    TransitionKind::Upload,
    TransitionKind::Issue,
    TransitionKind::Approve,
    TransitionKind::Reject,
    TransitionKind::Reupload,
    TransitionKind::Revoke,
    TransitionKind::UpdateExpiration,
    TransitionKind::Transfer,
];

fn allowed_roles(transition: TransitionKind) -> &'static [UserRole] {
    use UserRole::*;

    match transition {
        TransitionKind::Upload => &[User, Admin],
        TransitionKind::Issue
        | TransitionKind::Approve
        | TransitionKind::Reject
        | TransitionKind::Revoke
        | TransitionKind::UpdateExpiration => &[Admin, SuperAdmin],
        TransitionKind::Reupload => &[User],
        TransitionKind::Transfer => &[SuperAdmin],
    }
}

pub fn is_permitted(role: UserRole, transition: TransitionKind) -> bool {
    allowed_roles(transition).contains(&role)
}

/// Transitions a caller in `role` may be offered at all.
pub fn permitted_transitions(role: UserRole) -> Vec<TransitionKind> {
    ALL.into_iter()
        .filter(|transition| is_permitted(role, *transition))
        .collect()
}

pub(crate) fn ensure_permitted(
    actor: &Actor,
    transition: TransitionKind,
) -> Result<(), TransitionError> {
    if !actor.enabled {
        return Err(TransitionError::AccountDisabled(actor.id.to_owned()));
    }

    if !is_permitted(actor.role, transition) {
        return Err(TransitionError::NotPermitted {
            role: actor.role,
            transition,
        });
    }

    Ok(())
}
