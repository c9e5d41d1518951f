use crate::access::{Action, allows, resolve_note_access, resolve_report_access};
use crate::server::response::{ApiError, StoreResultExt};
use crate::store::Store;
use crate::types::{Access, Actor, ActorKind, Grant, GrantRights};

/// Fails with 403 unless the capability gate allows `action`.
pub fn require(actor: &Actor, action: Action) -> Result<(), ApiError> {
    if allows(actor, action) {
        Ok(())
    } else {
        Err(ApiError::forbidden(format!(
            "You do not have permission to {action}"
        )))
    }
}

/// Fails with 403 unless `granted` is true.
pub fn require_access(granted: bool, message: &'static str) -> Result<(), ApiError> {
    if granted {
        Ok(())
    } else {
        Err(ApiError::forbidden(message))
    }
}

// Grant rows only matter for staff, so admins, coaches and players skip the lookup.

pub fn report_access(store: &dyn Store, actor: &Actor, report_id: &str) -> Result<Access, ApiError> {
    let grants = match actor.kind {
        ActorKind::Staff { .. } => store
            .list_report_grants(report_id)
            .api_err("Failed to load report visibility")?,
        _ => Vec::new(),
    };
    Ok(resolve_report_access(actor, &grants))
}

pub fn folder_access(store: &dyn Store, actor: &Actor, folder_id: &str) -> Result<Access, ApiError> {
    let grants = match actor.kind {
        ActorKind::Staff { .. } => store
            .list_folder_grants(folder_id)
            .api_err("Failed to load folder visibility")?,
        _ => Vec::new(),
    };
    Ok(resolve_report_access(actor, &grants))
}

pub fn note_access(store: &dyn Store, actor: &Actor, note_id: &str) -> Result<Access, ApiError> {
    let viewers = match actor.kind {
        ActorKind::Staff { .. } => store
            .list_note_viewers(note_id)
            .api_err("Failed to load note access")?,
        _ => Vec::new(),
    };
    Ok(resolve_note_access(actor, &viewers))
}

/// The grant a staff member receives on an item they created.
#[must_use]
pub fn creator_grant(actor: &Actor) -> Option<Grant> {
    actor.staff_id().map(|staff_id| Grant {
        staff_id: staff_id.to_string(),
        rights: GrantRights {
            can_view: true,
            can_edit: true,
            can_delete: true,
        },
    })
}
