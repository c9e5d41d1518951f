use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    Coach,
    Staff,
    Player,
}

impl Role {
    pub const fn as_str(self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Coach => "coach",
            Role::Staff => "staff",
            Role::Player => "player",
        }
    }

    pub fn parse(s: &str) -> Option<Role> {
        match s {
            "admin" => Some(Role::Admin),
            "coach" => Some(Role::Coach),
            "staff" => Some(Role::Staff),
            "player" => Some(Role::Player),
            _ => None,
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-staff opt-in flags. Every flag defaults to false.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StaffCapabilities {
    pub can_view_reports: bool,
    pub can_upload_reports: bool,
    pub can_edit_reports: bool,
    pub can_delete_reports: bool,
    pub can_view_calendar: bool,
    pub can_manage_events: bool,
    pub can_view_players: bool,
    pub can_manage_players: bool,
    pub can_manage_staff: bool,
}

/// The view/edit/delete triple produced for one actor on one content item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Access {
    pub view: bool,
    pub edit: bool,
    pub delete: bool,
}

impl Access {
    pub const NONE: Access = Access {
        view: false,
        edit: false,
        delete: false,
    };

    pub const FULL: Access = Access {
        view: true,
        edit: true,
        delete: true,
    };

    #[must_use]
    pub const fn new(view: bool, edit: bool, delete: bool) -> Self {
        Self { view, edit, delete }
    }

    /// Keeps only the rights present in both triples.
    #[must_use]
    pub const fn intersect(self, other: Access) -> Access {
        Access {
            view: self.view && other.view,
            edit: self.edit && other.edit,
            delete: self.delete && other.delete,
        }
    }
}

/// What an authenticated caller is, resolved once per request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActorKind {
    Admin,
    Coach,
    Staff {
        staff_id: String,
        capabilities: StaffCapabilities,
    },
    Player,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Actor {
    pub user_id: String,
    pub kind: ActorKind,
}

impl Actor {
    #[must_use]
    pub fn role(&self) -> Role {
        match self.kind {
            ActorKind::Admin => Role::Admin,
            ActorKind::Coach => Role::Coach,
            ActorKind::Staff { .. } => Role::Staff,
            ActorKind::Player => Role::Player,
        }
    }

    #[must_use]
    pub fn staff_id(&self) -> Option<&str> {
        match &self.kind {
            ActorKind::Staff { staff_id, .. } => Some(staff_id),
            _ => None,
        }
    }
}
