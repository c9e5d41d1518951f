mod schema;
mod sqlite;

pub use sqlite::SqliteStore;

use chrono::{DateTime, Utc};

use crate::error::Result;
use crate::types::*;

#[derive(Debug, Clone, Default)]
pub struct EventFilter {
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
    pub team_id: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct ReportFilter {
    pub folder_id: Option<String>,
    pub player_id: Option<String>,
}

/// Store defines the database interface.
pub trait Store: Send + Sync {
    fn initialize(&self) -> Result<()>;

    // User operations
    fn create_user(&self, user: &User) -> Result<()>;
    fn get_user(&self, id: &str) -> Result<Option<User>>;
    fn get_user_by_email(&self, email: &str) -> Result<Option<User>>;
    fn list_users(&self, role: Option<Role>) -> Result<Vec<User>>;
    fn update_user(&self, user: &User) -> Result<()>;
    fn delete_user(&self, id: &str) -> Result<bool>;
    fn has_admin_user(&self) -> Result<bool>;

    // Staff operations; a staff member is a user row plus a staff row
    fn create_staff_member(&self, user: &User, staff: &Staff) -> Result<()>;
    fn get_staff(&self, id: &str) -> Result<Option<Staff>>;
    fn get_staff_by_user(&self, user_id: &str) -> Result<Option<Staff>>;
    fn list_staff(&self) -> Result<Vec<Staff>>;
    fn update_staff(&self, staff: &Staff) -> Result<()>;

    // Team operations
    fn create_team(&self, team: &Team) -> Result<()>;
    fn get_team(&self, id: &str) -> Result<Option<Team>>;
    fn get_team_by_name(&self, name: &str) -> Result<Option<Team>>;
    fn list_teams(&self) -> Result<Vec<Team>>;
    fn update_team(&self, team: &Team) -> Result<()>;
    fn delete_team(&self, id: &str) -> Result<bool>;

    // Player operations; `login` is created in the same transaction
    fn create_player(&self, player: &Player, login: Option<&User>) -> Result<()>;
    fn get_player(&self, id: &str) -> Result<Option<Player>>;
    fn list_players(&self, team_id: Option<&str>) -> Result<Vec<Player>>;
    /// Also moves the linked login, if any, to the player's email.
    fn update_player(&self, player: &Player) -> Result<()>;
    fn set_player_avatar(&self, id: &str, avatar: Option<&StoredFile>) -> Result<()>;
    fn delete_player(&self, id: &str) -> Result<bool>;

    // Event operations
    fn create_event(&self, event: &Event) -> Result<()>;
    fn get_event(&self, id: &str) -> Result<Option<Event>>;
    fn list_events(&self, filter: &EventFilter) -> Result<Vec<Event>>;
    fn update_event(&self, event: &Event) -> Result<()>;
    fn delete_event(&self, id: &str) -> Result<bool>;

    // Report folder operations
    /// Creates the folder and, when given, the creator's grant in one transaction.
    fn create_folder(&self, folder: &ReportFolder, creator: Option<&Grant>) -> Result<()>;
    fn get_folder(&self, id: &str) -> Result<Option<ReportFolder>>;
    fn list_folders(&self) -> Result<Vec<ReportFolder>>;
    fn update_folder(&self, folder: &ReportFolder) -> Result<()>;
    fn delete_folder(&self, id: &str) -> Result<bool>;

    // Report operations
    /// Creates the report and, when given, the creator's grant in one transaction.
    fn create_report(&self, report: &Report, creator: Option<&Grant>) -> Result<()>;
    fn get_report(&self, id: &str) -> Result<Option<Report>>;
    fn list_reports(&self, filter: &ReportFilter) -> Result<Vec<Report>>;
    fn update_report(&self, report: &Report) -> Result<()>;
    fn delete_report(&self, id: &str) -> Result<bool>;

    // Visibility grants; replace_* swaps the whole set atomically
    fn list_report_grants(&self, report_id: &str) -> Result<Vec<Grant>>;
    fn replace_report_grants(&self, report_id: &str, grants: &[Grant]) -> Result<()>;
    fn list_folder_grants(&self, folder_id: &str) -> Result<Vec<Grant>>;
    fn replace_folder_grants(&self, folder_id: &str, grants: &[Grant]) -> Result<()>;

    // Coach note operations
    fn create_note(&self, note: &CoachNote) -> Result<()>;
    fn get_note(&self, id: &str) -> Result<Option<CoachNote>>;
    fn list_notes(&self, player_id: Option<&str>) -> Result<Vec<CoachNote>>;
    fn update_note(&self, note: &CoachNote) -> Result<()>;
    fn delete_note(&self, id: &str) -> Result<bool>;
    fn list_note_viewers(&self, note_id: &str) -> Result<Vec<String>>;
    fn replace_note_viewers(&self, note_id: &str, staff_ids: &[String]) -> Result<()>;

    // File access log (append-only)
    fn create_access_log(&self, entry: &FileAccessLog) -> Result<()>;
    fn list_access_logs(
        &self,
        filter: &AccessLogFilter,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<FileAccessLog>>;
    fn count_access_logs(&self, filter: &AccessLogFilter) -> Result<i64>;
    fn delete_access_logs_before(&self, cutoff: &DateTime<Utc>) -> Result<usize>;
}
