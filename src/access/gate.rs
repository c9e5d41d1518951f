use std::fmt;

use crate::types::{Actor, ActorKind, StaffCapabilities};

/// Non-content actions guarded by role and staff capability flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    ViewReports,
    UploadReports,
    EditReports,
    DeleteReports,
    ViewCalendar,
    ManageEvents,
    ViewPlayers,
    ManagePlayers,
    ManageTeams,
    ManageStaff,
    ShareContent,
    WriteNotes,
    ManageUsers,
    ViewAudit,
    ManageAudit,
}

impl Action {
    pub const fn as_str(self) -> &'static str {
        match self {
            Action::ViewReports => "view reports",
            Action::UploadReports => "upload reports",
            Action::EditReports => "edit reports",
            Action::DeleteReports => "delete reports",
            Action::ViewCalendar => "view the calendar",
            Action::ManageEvents => "manage events",
            Action::ViewPlayers => "view players",
            Action::ManagePlayers => "manage players",
            Action::ManageTeams => "manage teams",
            Action::ManageStaff => "manage staff",
            Action::ShareContent => "share content",
            Action::WriteNotes => "write coach notes",
            Action::ManageUsers => "manage users",
            Action::ViewAudit => "view the audit log",
            Action::ManageAudit => "purge the audit log",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Returns true if `actor` may perform `action`.
#[must_use]
pub fn allows(actor: &Actor, action: Action) -> bool {
    match &actor.kind {
        ActorKind::Admin => true,
        ActorKind::Coach => !matches!(
            action,
            Action::ManageStaff | Action::ManageUsers | Action::ViewAudit | Action::ManageAudit
        ),
        ActorKind::Staff { capabilities, .. } => staff_allows(capabilities, action),
        ActorKind::Player => matches!(action, Action::ViewCalendar),
    }
}

fn staff_allows(caps: &StaffCapabilities, action: Action) -> bool {
    match action {
        Action::ViewReports => caps.can_view_reports,
        Action::UploadReports => caps.can_upload_reports,
        Action::EditReports => caps.can_edit_reports,
        Action::DeleteReports => caps.can_delete_reports,
        Action::ViewCalendar => caps.can_view_calendar,
        Action::ManageEvents => caps.can_manage_events,
        Action::ViewPlayers => caps.can_view_players,
        Action::ManagePlayers | Action::ManageTeams => caps.can_manage_players,
        // Only admins manage staff; `can_manage_staff` is stored but grants nothing.
        Action::ManageStaff
        | Action::ShareContent
        | Action::WriteNotes
        | Action::ManageUsers
        | Action::ViewAudit
        | Action::ManageAudit => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL: [Action; 15] = [
        Action::ViewReports,
        Action::UploadReports,
        Action::EditReports,
        Action::DeleteReports,
        Action::ViewCalendar,
        Action::ManageEvents,
        Action::ViewPlayers,
        Action::ManagePlayers,
        Action::ManageTeams,
        Action::ManageStaff,
        Action::ShareContent,
        Action::WriteNotes,
        Action::ManageUsers,
        Action::ViewAudit,
        Action::ManageAudit,
    ];

    fn actor(kind: ActorKind) -> Actor {
        Actor {
            user_id: "u".to_string(),
            kind,
        }
    }

    fn staff(capabilities: StaffCapabilities) -> Actor {
        actor(ActorKind::Staff {
            staff_id: "s".to_string(),
            capabilities,
        })
    }

    #[test]
    fn test_admin_allows_everything() {
        let admin = actor(ActorKind::Admin);
        assert!(ALL.iter().all(|a| allows(&admin, *a)));
    }

    #[test]
    fn test_coach_cannot_manage_staff() {
        let coach = actor(ActorKind::Coach);
        assert!(!allows(&coach, Action::ManageStaff));
        assert!(!allows(&coach, Action::ManageUsers));
        assert!(!allows(&coach, Action::ViewAudit));
        assert!(allows(&coach, Action::ManageEvents));
        assert!(allows(&coach, Action::ShareContent));
        assert!(allows(&coach, Action::WriteNotes));
    }

    #[test]
    fn test_staff_default_deny() {
        let s = staff(StaffCapabilities::default());
        assert!(ALL.iter().all(|a| !allows(&s, *a)));
    }

    #[test]
    fn test_staff_flags_are_opt_in() {
        let s = staff(StaffCapabilities {
            can_view_calendar: true,
            can_manage_players: true,
            ..StaffCapabilities::default()
        });
        assert!(allows(&s, Action::ViewCalendar));
        assert!(allows(&s, Action::ManagePlayers));
        assert!(allows(&s, Action::ManageTeams));
        assert!(!allows(&s, Action::ManageEvents));
        assert!(!allows(&s, Action::ViewPlayers));
    }

    #[test]
    fn test_staff_never_shares_content() {
        let s = staff(StaffCapabilities {
            can_view_reports: true,
            can_upload_reports: true,
            can_edit_reports: true,
            can_delete_reports: true,
            can_view_calendar: true,
            can_manage_events: true,
            can_view_players: true,
            can_manage_players: true,
            can_manage_staff: true,
        });
        assert!(!allows(&s, Action::ShareContent));
        assert!(!allows(&s, Action::WriteNotes));
        assert!(!allows(&s, Action::ManageAudit));
    }

    #[test]
    fn test_only_admin_manages_staff() {
        let s = staff(StaffCapabilities {
            can_manage_staff: true,
            ..StaffCapabilities::default()
        });
        assert!(!allows(&s, Action::ManageStaff));
        assert!(!allows(&actor(ActorKind::Coach), Action::ManageStaff));
        assert!(allows(&actor(ActorKind::Admin), Action::ManageStaff));
    }

    #[test]
    fn test_player_only_views_calendar() {
        let p = actor(ActorKind::Player);
        for action in ALL {
            assert_eq!(allows(&p, action), action == Action::ViewCalendar);
        }
    }
}
