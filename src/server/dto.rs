use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::types::{
    Access, EventKind, FileAction, FileType, Grant, Role, Staff, StaffCapabilities, User,
};

// Auth

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub remember_me: bool,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub token: String,
    pub expires_at: DateTime<Utc>,
    pub user: User,
}

#[derive(Debug, Serialize)]
pub struct MeResponse {
    pub user: User,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub staff: Option<Staff>,
}

// Users

#[derive(Debug, Deserialize)]
pub struct ListUsersParams {
    pub role: Option<Role>,
}

#[derive(Debug, Deserialize)]
pub struct CreateUserRequest {
    pub email: String,
    pub name: String,
    pub password: String,
    pub role: Role,
    /// Only used when `role` is staff.
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub capabilities: StaffCapabilities,
}

/// Role cannot change after creation.
#[derive(Debug, Default, Deserialize)]
pub struct UpdateUserRequest {
    pub email: Option<String>,
    pub name: Option<String>,
    pub password: Option<String>,
}

// Staff

#[derive(Debug, Deserialize)]
pub struct CreateStaffRequest {
    pub email: String,
    pub name: String,
    pub password: String,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub capabilities: StaffCapabilities,
}

#[derive(Debug, Serialize)]
pub struct StaffMember {
    #[serde(flatten)]
    pub staff: Staff,
    pub email: String,
    pub name: String,
}

// Teams

#[derive(Debug, Deserialize)]
pub struct CreateTeamRequest {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct UpdateTeamRequest {
    pub name: Option<String>,
    pub description: Option<String>,
}

// Players

#[derive(Debug, Deserialize)]
pub struct ListPlayersParams {
    pub team_id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CreatePlayerRequest {
    pub first_name: String,
    pub last_name: String,
    #[serde(default)]
    pub email: Option<String>,
    /// When set, a player login is created with `email` and this password.
    #[serde(default)]
    pub password: Option<String>,
    #[serde(default)]
    pub team_id: Option<String>,
    #[serde(default)]
    pub position: Option<String>,
    #[serde(default)]
    pub jersey_number: Option<i32>,
    #[serde(default)]
    pub date_of_birth: Option<NaiveDate>,
    #[serde(default)]
    pub wellness_id: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct UpdatePlayerRequest {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub team_id: Option<String>,
    pub position: Option<String>,
    pub jersey_number: Option<i32>,
    pub date_of_birth: Option<NaiveDate>,
    pub wellness_id: Option<String>,
}

// Events

#[derive(Debug, Deserialize)]
pub struct ListEventsParams {
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
    pub team_id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CreateEventRequest {
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    pub kind: EventKind,
    #[serde(default)]
    pub location: Option<String>,
    pub starts_at: DateTime<Utc>,
    pub ends_at: DateTime<Utc>,
    #[serde(default)]
    pub team_id: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct UpdateEventRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub kind: Option<EventKind>,
    pub location: Option<String>,
    pub starts_at: Option<DateTime<Utc>>,
    pub ends_at: Option<DateTime<Utc>>,
    pub team_id: Option<String>,
}

// Folders and reports

#[derive(Debug, Deserialize)]
pub struct CreateFolderRequest {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct UpdateFolderRequest {
    pub name: Option<String>,
    pub description: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ListReportsParams {
    pub folder_id: Option<String>,
    pub player_id: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct UpdateReportRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub folder_id: Option<String>,
    pub player_id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ReplaceGrantsRequest {
    pub grants: Vec<Grant>,
}

/// An item together with what the caller may do with it.
#[derive(Debug, Serialize)]
pub struct WithAccess<T: Serialize> {
    #[serde(flatten)]
    pub item: T,
    pub access: Access,
}

// Notes

#[derive(Debug, Deserialize)]
pub struct ListNotesParams {
    pub player_id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CreateNoteRequest {
    #[serde(default)]
    pub player_id: Option<String>,
    pub title: String,
    pub body: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct UpdateNoteRequest {
    pub player_id: Option<String>,
    pub title: Option<String>,
    pub body: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct NoteAccessRequest {
    pub staff_ids: Vec<String>,
}

// Audit

#[derive(Debug, Deserialize)]
pub struct AuditQuery {
    pub limit: Option<i64>,
    pub offset: Option<i64>,
    pub action: Option<FileAction>,
    #[serde(rename = "fileType")]
    pub file_type: Option<FileType>,
    pub from: Option<String>,
    pub to: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct PurgeAuditQuery {
    #[serde(rename = "olderThan")]
    pub older_than: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct PurgeAuditResponse {
    pub deleted: usize,
}
