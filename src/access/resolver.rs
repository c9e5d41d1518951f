use crate::types::{Access, Actor, ActorKind, Grant, GrantRights};

/// Resolves what `actor` may do with an item given the item's explicit grants.
///
/// Admins and coaches bypass grants. Staff get exactly the rights of the grant
/// row keyed by their staff id, or nothing when no row exists. Players never
/// get access.
#[must_use]
pub fn resolve(actor: &Actor, grants: &[Grant]) -> Access {
    match &actor.kind {
        ActorKind::Admin | ActorKind::Coach => Access::FULL,
        ActorKind::Staff { staff_id, .. } => grants
            .iter()
            .find(|g| &g.staff_id == staff_id)
            .map(|g| rights_to_access(g.rights))
            .unwrap_or(Access::NONE),
        ActorKind::Player => Access::NONE,
    }
}

/// Resolves report or folder access, masking staff grants with the
/// report capability flags.
#[must_use]
pub fn resolve_report_access(actor: &Actor, grants: &[Grant]) -> Access {
    let granted = resolve(actor, grants);
    match &actor.kind {
        ActorKind::Staff { capabilities, .. } => granted.intersect(Access::new(
            capabilities.can_view_reports,
            capabilities.can_edit_reports,
            capabilities.can_delete_reports,
        )),
        _ => granted,
    }
}

/// Resolves coach-note access. Note grants only carry a view bit.
#[must_use]
pub fn resolve_note_access(actor: &Actor, viewers: &[String]) -> Access {
    match &actor.kind {
        ActorKind::Admin | ActorKind::Coach => Access::FULL,
        ActorKind::Staff { staff_id, .. } => {
            Access::new(viewers.iter().any(|v| v == staff_id), false, false)
        }
        ActorKind::Player => Access::NONE,
    }
}

fn rights_to_access(rights: GrantRights) -> Access {
    Access::new(rights.can_view, rights.can_edit, rights.can_delete)
}
