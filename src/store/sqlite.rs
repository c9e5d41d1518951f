use std::path::Path;
use std::sync::Mutex;

use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};
use rusqlite::types::Value;
use rusqlite::{Connection, OptionalExtension, Row, params, params_from_iter};

use super::schema::SCHEMA;
use super::{EventFilter, ReportFilter, Store};
use crate::error::{Error, Result};
use crate::types::*;

pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    pub fn new<P: AsRef<Path>>(db_path: P) -> Result<Self> {
        let conn = Connection::open(db_path)?;

        conn.pragma_update(None, "foreign_keys", "ON")?;
        conn.pragma_update(None, "journal_mode", "WAL")?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn conn(&self) -> std::sync::MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Returns a guard to the underlying database connection.
    /// This allows consuming applications to execute custom SQL.
    pub fn connection(&self) -> std::sync::MutexGuard<'_, Connection> {
        self.conn()
    }
}

fn parse_datetime(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .or_else(|_| {
            // Handle SQLite's default datetime format: "YYYY-MM-DD HH:MM:SS"
            chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S").map(|ndt| ndt.and_utc())
        })
        .unwrap_or_else(|e| {
            tracing::error!("Invalid datetime in database: '{}' - {}", s, e);
            Utc::now()
        })
}

/// Fixed-width UTC timestamps so that text comparison in SQL is chronological.
fn format_datetime(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn format_date(d: &NaiveDate) -> String {
    d.format("%Y-%m-%d").to_string()
}

fn parse_date(s: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").ok()
}

fn parse_enum<T>(idx: usize, value: &str, parse: fn(&str) -> Option<T>) -> rusqlite::Result<T> {
    parse(value).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            idx,
            rusqlite::types::Type::Text,
            format!("unexpected value '{value}'").into(),
        )
    })
}

/// Maps constraint failures on writes to domain errors.
fn write_err(e: rusqlite::Error) -> Error {
    if let rusqlite::Error::SqliteFailure(err, _) = &e {
        match err.extended_code {
            rusqlite::ffi::SQLITE_CONSTRAINT_FOREIGNKEY => return Error::ReferentialIntegrity,
            rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE
            | rusqlite::ffi::SQLITE_CONSTRAINT_PRIMARYKEY => return Error::AlreadyExists,
            _ => {}
        }
    }
    Error::Database(e)
}

fn expect_updated(rows: usize) -> Result<()> {
    if rows == 0 {
        return Err(Error::NotFound);
    }
    Ok(())
}

const USER_COLUMNS: &str = "id, email, name, password_hash, role, created_at, updated_at";

fn user_from_row(row: &Row<'_>) -> rusqlite::Result<User> {
    Ok(User {
        id: row.get(0)?,
        email: row.get(1)?,
        name: row.get(2)?,
        password_hash: row.get(3)?,
        role: parse_enum(4, &row.get::<_, String>(4)?, Role::parse)?,
        created_at: parse_datetime(&row.get::<_, String>(5)?),
        updated_at: parse_datetime(&row.get::<_, String>(6)?),
    })
}

const STAFF_COLUMNS: &str = "id, user_id, title, can_view_reports, can_upload_reports, \
     can_edit_reports, can_delete_reports, can_view_calendar, can_manage_events, \
     can_view_players, can_manage_players, can_manage_staff, created_at, updated_at";

fn staff_from_row(row: &Row<'_>) -> rusqlite::Result<Staff> {
    Ok(Staff {
        id: row.get(0)?,
        user_id: row.get(1)?,
        title: row.get(2)?,
        capabilities: StaffCapabilities {
            can_view_reports: row.get(3)?,
            can_upload_reports: row.get(4)?,
            can_edit_reports: row.get(5)?,
            can_delete_reports: row.get(6)?,
            can_view_calendar: row.get(7)?,
            can_manage_events: row.get(8)?,
            can_view_players: row.get(9)?,
            can_manage_players: row.get(10)?,
            can_manage_staff: row.get(11)?,
        },
        created_at: parse_datetime(&row.get::<_, String>(12)?),
        updated_at: parse_datetime(&row.get::<_, String>(13)?),
    })
}

const TEAM_COLUMNS: &str = "id, name, description, created_at, updated_at";

fn team_from_row(row: &Row<'_>) -> rusqlite::Result<Team> {
    Ok(Team {
        id: row.get(0)?,
        name: row.get(1)?,
        description: row.get(2)?,
        created_at: parse_datetime(&row.get::<_, String>(3)?),
        updated_at: parse_datetime(&row.get::<_, String>(4)?),
    })
}

const PLAYER_COLUMNS: &str = "id, user_id, team_id, first_name, last_name, email, position, \
     jersey_number, date_of_birth, avatar_file_name, avatar_stored_name, avatar_mime_type, \
     avatar_size_bytes, avatar_sha256, wellness_id, created_at, updated_at";

fn player_from_row(row: &Row<'_>) -> rusqlite::Result<Player> {
    let avatar = match row.get::<_, Option<String>>(10)? {
        Some(stored_name) => Some(StoredFile {
            file_name: row.get::<_, Option<String>>(9)?.unwrap_or_default(),
            stored_name,
            mime_type: row.get::<_, Option<String>>(11)?.unwrap_or_default(),
            size_bytes: row.get::<_, Option<i64>>(12)?.unwrap_or_default(),
            sha256: row.get::<_, Option<String>>(13)?.unwrap_or_default(),
        }),
        None => None,
    };

    Ok(Player {
        id: row.get(0)?,
        user_id: row.get(1)?,
        team_id: row.get(2)?,
        first_name: row.get(3)?,
        last_name: row.get(4)?,
        email: row.get(5)?,
        position: row.get(6)?,
        jersey_number: row.get(7)?,
        date_of_birth: row
            .get::<_, Option<String>>(8)?
            .and_then(|s| parse_date(&s)),
        avatar,
        wellness_id: row.get(14)?,
        created_at: parse_datetime(&row.get::<_, String>(15)?),
        updated_at: parse_datetime(&row.get::<_, String>(16)?),
    })
}

const EVENT_COLUMNS: &str = "id, title, description, kind, location, starts_at, ends_at, \
     team_id, created_by, created_at, updated_at";

fn event_from_row(row: &Row<'_>) -> rusqlite::Result<Event> {
    Ok(Event {
        id: row.get(0)?,
        title: row.get(1)?,
        description: row.get(2)?,
        kind: parse_enum(3, &row.get::<_, String>(3)?, EventKind::parse)?,
        location: row.get(4)?,
        starts_at: parse_datetime(&row.get::<_, String>(5)?),
        ends_at: parse_datetime(&row.get::<_, String>(6)?),
        team_id: row.get(7)?,
        created_by: row.get(8)?,
        created_at: parse_datetime(&row.get::<_, String>(9)?),
        updated_at: parse_datetime(&row.get::<_, String>(10)?),
    })
}

const FOLDER_COLUMNS: &str = "id, name, description, created_by, created_at, updated_at";

fn folder_from_row(row: &Row<'_>) -> rusqlite::Result<ReportFolder> {
    Ok(ReportFolder {
        id: row.get(0)?,
        name: row.get(1)?,
        description: row.get(2)?,
        created_by: row.get(3)?,
        created_at: parse_datetime(&row.get::<_, String>(4)?),
        updated_at: parse_datetime(&row.get::<_, String>(5)?),
    })
}

const REPORT_COLUMNS: &str = "id, folder_id, player_id, title, description, file_name, \
     stored_name, mime_type, size_bytes, sha256, author_id, created_at, updated_at";

fn report_from_row(row: &Row<'_>) -> rusqlite::Result<Report> {
    Ok(Report {
        id: row.get(0)?,
        folder_id: row.get(1)?,
        player_id: row.get(2)?,
        title: row.get(3)?,
        description: row.get(4)?,
        file: StoredFile {
            file_name: row.get(5)?,
            stored_name: row.get(6)?,
            mime_type: row.get(7)?,
            size_bytes: row.get(8)?,
            sha256: row.get(9)?,
        },
        author_id: row.get(10)?,
        created_at: parse_datetime(&row.get::<_, String>(11)?),
        updated_at: parse_datetime(&row.get::<_, String>(12)?),
    })
}

const NOTE_COLUMNS: &str = "id, player_id, title, body, author_id, created_at, updated_at";

fn note_from_row(row: &Row<'_>) -> rusqlite::Result<CoachNote> {
    Ok(CoachNote {
        id: row.get(0)?,
        player_id: row.get(1)?,
        title: row.get(2)?,
        body: row.get(3)?,
        author_id: row.get(4)?,
        created_at: parse_datetime(&row.get::<_, String>(5)?),
        updated_at: parse_datetime(&row.get::<_, String>(6)?),
    })
}

fn grant_from_row(row: &Row<'_>) -> rusqlite::Result<Grant> {
    Ok(Grant {
        staff_id: row.get(0)?,
        rights: GrantRights {
            can_view: row.get(1)?,
            can_edit: row.get(2)?,
            can_delete: row.get(3)?,
        },
    })
}

const ACCESS_LOG_COLUMNS: &str =
    "id, user_id, file_type, file_id, file_name, action, ip, user_agent, created_at";

fn access_log_from_row(row: &Row<'_>) -> rusqlite::Result<FileAccessLog> {
    Ok(FileAccessLog {
        id: row.get(0)?,
        user_id: row.get(1)?,
        file_type: parse_enum(2, &row.get::<_, String>(2)?, FileType::parse)?,
        file_id: row.get(3)?,
        file_name: row.get(4)?,
        action: parse_enum(5, &row.get::<_, String>(5)?, FileAction::parse)?,
        ip: row.get(6)?,
        user_agent: row.get(7)?,
        created_at: parse_datetime(&row.get::<_, String>(8)?),
    })
}

fn access_log_where(filter: &AccessLogFilter) -> (String, Vec<Value>) {
    let mut clauses = Vec::new();
    let mut values = Vec::new();

    if let Some(action) = filter.action {
        clauses.push("action = ?");
        values.push(Value::Text(action.as_str().to_string()));
    }
    if let Some(file_type) = filter.file_type {
        clauses.push("file_type = ?");
        values.push(Value::Text(file_type.as_str().to_string()));
    }
    if let Some(from) = &filter.from {
        clauses.push("created_at >= ?");
        values.push(Value::Text(format_datetime(from)));
    }
    if let Some(to) = &filter.to {
        clauses.push("created_at <= ?");
        values.push(Value::Text(format_datetime(to)));
    }

    if clauses.is_empty() {
        (String::new(), values)
    } else {
        (format!(" WHERE {}", clauses.join(" AND ")), values)
    }
}

/// Grant join tables, keyed by the item they belong to.
#[derive(Clone, Copy)]
enum GrantTable {
    Report,
    Folder,
}

impl GrantTable {
    const fn insert_sql(self) -> &'static str {
        match self {
            GrantTable::Report => {
                "INSERT INTO report_visibility (report_id, staff_id, can_view, can_edit, can_delete)
                 VALUES (?1, ?2, ?3, ?4, ?5)"
            }
            GrantTable::Folder => {
                "INSERT INTO report_folder_visibility (folder_id, staff_id, can_view, can_edit, can_delete)
                 VALUES (?1, ?2, ?3, ?4, ?5)"
            }
        }
    }
}

fn insert_grants(conn: &Connection, table: GrantTable, item_id: &str, grants: &[Grant]) -> Result<()> {
    for grant in grants {
        conn.execute(
            table.insert_sql(),
            params![
                item_id,
                grant.staff_id,
                grant.rights.can_view,
                grant.rights.can_edit,
                grant.rights.can_delete,
            ],
        )
        .map_err(write_err)?;
    }
    Ok(())
}

fn insert_user(conn: &Connection, user: &User) -> Result<()> {
    conn.execute(
        "INSERT INTO users (id, email, name, password_hash, role, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        params![
            user.id,
            user.email,
            user.name,
            user.password_hash,
            user.role.as_str(),
            format_datetime(&user.created_at),
            format_datetime(&user.updated_at),
        ],
    )
    .map_err(write_err)?;
    Ok(())
}

impl Store for SqliteStore {
    fn initialize(&self) -> Result<()> {
        self.conn().execute_batch(SCHEMA)?;
        Ok(())
    }

    // User operations

    fn create_user(&self, user: &User) -> Result<()> {
        insert_user(&self.conn(), user)
    }

    fn get_user(&self, id: &str) -> Result<Option<User>> {
        self.conn()
            .query_row(
                &format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?1"),
                params![id],
                user_from_row,
            )
            .optional()
            .map_err(Error::from)
    }

    fn get_user_by_email(&self, email: &str) -> Result<Option<User>> {
        self.conn()
            .query_row(
                &format!("SELECT {USER_COLUMNS} FROM users WHERE email = ?1 COLLATE NOCASE"),
                params![email],
                user_from_row,
            )
            .optional()
            .map_err(Error::from)
    }

    fn list_users(&self, role: Option<Role>) -> Result<Vec<User>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(&format!(
            "SELECT {USER_COLUMNS} FROM users
             WHERE (?1 IS NULL OR role = ?1) ORDER BY name, id"
        ))?;

        let rows = stmt.query_map(params![role.map(Role::as_str)], user_from_row)?;

        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Error::from)
    }

    fn update_user(&self, user: &User) -> Result<()> {
        let rows = self
            .conn()
            .execute(
                "UPDATE users SET email = ?1, name = ?2, password_hash = ?3, updated_at = ?4
                 WHERE id = ?5",
                params![
                    user.email,
                    user.name,
                    user.password_hash,
                    format_datetime(&Utc::now()),
                    user.id
                ],
            )
            .map_err(write_err)?;
        expect_updated(rows)
    }

    fn delete_user(&self, id: &str) -> Result<bool> {
        let rows = self
            .conn()
            .execute("DELETE FROM users WHERE id = ?1", params![id])
            .map_err(write_err)?;
        Ok(rows > 0)
    }

    fn has_admin_user(&self) -> Result<bool> {
        let count: i64 = self.conn().query_row(
            "SELECT COUNT(*) FROM users WHERE role = 'admin'",
            [],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }

    // Staff operations

    fn create_staff_member(&self, user: &User, staff: &Staff) -> Result<()> {
        let mut conn = self.conn();
        let tx = conn.transaction()?;

        insert_user(&tx, user)?;

        let caps = &staff.capabilities;
        tx.execute(
            &format!("INSERT INTO staff ({STAFF_COLUMNS}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)"),
            params![
                staff.id,
                staff.user_id,
                staff.title,
                caps.can_view_reports,
                caps.can_upload_reports,
                caps.can_edit_reports,
                caps.can_delete_reports,
                caps.can_view_calendar,
                caps.can_manage_events,
                caps.can_view_players,
                caps.can_manage_players,
                caps.can_manage_staff,
                format_datetime(&staff.created_at),
                format_datetime(&staff.updated_at),
            ],
        )
        .map_err(write_err)?;

        tx.commit()?;
        Ok(())
    }

    fn get_staff(&self, id: &str) -> Result<Option<Staff>> {
        self.conn()
            .query_row(
                &format!("SELECT {STAFF_COLUMNS} FROM staff WHERE id = ?1"),
                params![id],
                staff_from_row,
            )
            .optional()
            .map_err(Error::from)
    }

    fn get_staff_by_user(&self, user_id: &str) -> Result<Option<Staff>> {
        self.conn()
            .query_row(
                &format!("SELECT {STAFF_COLUMNS} FROM staff WHERE user_id = ?1"),
                params![user_id],
                staff_from_row,
            )
            .optional()
            .map_err(Error::from)
    }

    fn list_staff(&self) -> Result<Vec<Staff>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(&format!(
            "SELECT {STAFF_COLUMNS} FROM staff ORDER BY created_at, id"
        ))?;

        let rows = stmt.query_map([], staff_from_row)?;

        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Error::from)
    }

    fn update_staff(&self, staff: &Staff) -> Result<()> {
        let caps = &staff.capabilities;
        let rows = self.conn().execute(
            "UPDATE staff SET title = ?1, can_view_reports = ?2, can_upload_reports = ?3,
                can_edit_reports = ?4, can_delete_reports = ?5, can_view_calendar = ?6,
                can_manage_events = ?7, can_view_players = ?8, can_manage_players = ?9,
                can_manage_staff = ?10, updated_at = ?11
             WHERE id = ?12",
            params![
                staff.title,
                caps.can_view_reports,
                caps.can_upload_reports,
                caps.can_edit_reports,
                caps.can_delete_reports,
                caps.can_view_calendar,
                caps.can_manage_events,
                caps.can_view_players,
                caps.can_manage_players,
                caps.can_manage_staff,
                format_datetime(&Utc::now()),
                staff.id,
            ],
        )?;
        expect_updated(rows)
    }

    // Team operations

    fn create_team(&self, team: &Team) -> Result<()> {
        self.conn()
            .execute(
                "INSERT INTO teams (id, name, description, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    team.id,
                    team.name,
                    team.description,
                    format_datetime(&team.created_at),
                    format_datetime(&team.updated_at),
                ],
            )
            .map_err(write_err)?;
        Ok(())
    }

    fn get_team(&self, id: &str) -> Result<Option<Team>> {
        self.conn()
            .query_row(
                &format!("SELECT {TEAM_COLUMNS} FROM teams WHERE id = ?1"),
                params![id],
                team_from_row,
            )
            .optional()
            .map_err(Error::from)
    }

    fn get_team_by_name(&self, name: &str) -> Result<Option<Team>> {
        self.conn()
            .query_row(
                &format!("SELECT {TEAM_COLUMNS} FROM teams WHERE name = ?1"),
                params![name],
                team_from_row,
            )
            .optional()
            .map_err(Error::from)
    }

    fn list_teams(&self) -> Result<Vec<Team>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(&format!("SELECT {TEAM_COLUMNS} FROM teams ORDER BY name"))?;

        let rows = stmt.query_map([], team_from_row)?;

        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Error::from)
    }

    fn update_team(&self, team: &Team) -> Result<()> {
        let rows = self
            .conn()
            .execute(
                "UPDATE teams SET name = ?1, description = ?2, updated_at = ?3 WHERE id = ?4",
                params![
                    team.name,
                    team.description,
                    format_datetime(&Utc::now()),
                    team.id
                ],
            )
            .map_err(write_err)?;
        expect_updated(rows)
    }

    fn delete_team(&self, id: &str) -> Result<bool> {
        let rows = self
            .conn()
            .execute("DELETE FROM teams WHERE id = ?1", params![id])?;
        Ok(rows > 0)
    }

    // Player operations

    fn create_player(&self, player: &Player, login: Option<&User>) -> Result<()> {
        let mut conn = self.conn();
        let tx = conn.transaction()?;

        if let Some(user) = login {
            insert_user(&tx, user)?;
        }

        tx.execute(
            "INSERT INTO players (id, user_id, team_id, first_name, last_name, email, position,
                jersey_number, date_of_birth, wellness_id, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
            params![
                player.id,
                player.user_id,
                player.team_id,
                player.first_name,
                player.last_name,
                player.email,
                player.position,
                player.jersey_number,
                player.date_of_birth.as_ref().map(format_date),
                player.wellness_id,
                format_datetime(&player.created_at),
                format_datetime(&player.updated_at),
            ],
        )
        .map_err(write_err)?;

        tx.commit()?;
        Ok(())
    }

    fn get_player(&self, id: &str) -> Result<Option<Player>> {
        self.conn()
            .query_row(
                &format!("SELECT {PLAYER_COLUMNS} FROM players WHERE id = ?1"),
                params![id],
                player_from_row,
            )
            .optional()
            .map_err(Error::from)
    }

    fn list_players(&self, team_id: Option<&str>) -> Result<Vec<Player>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(&format!(
            "SELECT {PLAYER_COLUMNS} FROM players
             WHERE (?1 IS NULL OR team_id = ?1) ORDER BY last_name, first_name, id"
        ))?;

        let rows = stmt.query_map(params![team_id], player_from_row)?;

        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Error::from)
    }

    fn update_player(&self, player: &Player) -> Result<()> {
        let mut conn = self.conn();
        let tx = conn.transaction()?;
        let now = format_datetime(&Utc::now());

        let rows = tx
            .execute(
                "UPDATE players SET team_id = ?1, first_name = ?2, last_name = ?3, email = ?4,
                    position = ?5, jersey_number = ?6, date_of_birth = ?7, wellness_id = ?8,
                    updated_at = ?9
                 WHERE id = ?10",
                params![
                    player.team_id,
                    player.first_name,
                    player.last_name,
                    player.email,
                    player.position,
                    player.jersey_number,
                    player.date_of_birth.as_ref().map(format_date),
                    player.wellness_id,
                    now,
                    player.id,
                ],
            )
            .map_err(write_err)?;
        expect_updated(rows)?;

        if let (Some(user_id), Some(email)) = (&player.user_id, &player.email) {
            tx.execute(
                "UPDATE users SET email = ?1, updated_at = ?2 WHERE id = ?3 AND email <> ?1",
                params![email, now, user_id],
            )
            .map_err(write_err)?;
        }

        tx.commit()?;
        Ok(())
    }

    fn set_player_avatar(&self, id: &str, avatar: Option<&StoredFile>) -> Result<()> {
        let rows = self.conn().execute(
            "UPDATE players SET avatar_file_name = ?1, avatar_stored_name = ?2,
                avatar_mime_type = ?3, avatar_size_bytes = ?4, avatar_sha256 = ?5,
                updated_at = ?6
             WHERE id = ?7",
            params![
                avatar.map(|a| &a.file_name),
                avatar.map(|a| &a.stored_name),
                avatar.map(|a| &a.mime_type),
                avatar.map(|a| a.size_bytes),
                avatar.map(|a| &a.sha256),
                format_datetime(&Utc::now()),
                id,
            ],
        )?;
        expect_updated(rows)
    }

    fn delete_player(&self, id: &str) -> Result<bool> {
        let rows = self
            .conn()
            .execute("DELETE FROM players WHERE id = ?1", params![id])?;
        Ok(rows > 0)
    }

    // Event operations

    fn create_event(&self, event: &Event) -> Result<()> {
        self.conn()
            .execute(
                &format!(
                    "INSERT INTO events ({EVENT_COLUMNS})
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)"
                ),
                params![
                    event.id,
                    event.title,
                    event.description,
                    event.kind.as_str(),
                    event.location,
                    format_datetime(&event.starts_at),
                    format_datetime(&event.ends_at),
                    event.team_id,
                    event.created_by,
                    format_datetime(&event.created_at),
                    format_datetime(&event.updated_at),
                ],
            )
            .map_err(write_err)?;
        Ok(())
    }

    fn get_event(&self, id: &str) -> Result<Option<Event>> {
        self.conn()
            .query_row(
                &format!("SELECT {EVENT_COLUMNS} FROM events WHERE id = ?1"),
                params![id],
                event_from_row,
            )
            .optional()
            .map_err(Error::from)
    }

    fn list_events(&self, filter: &EventFilter) -> Result<Vec<Event>> {
        let conn = self.conn();
        // An event overlapping [from, to] is returned, not only ones starting inside it.
        let mut stmt = conn.prepare(&format!(
            "SELECT {EVENT_COLUMNS} FROM events
             WHERE (?1 IS NULL OR ends_at >= ?1)
               AND (?2 IS NULL OR starts_at <= ?2)
               AND (?3 IS NULL OR team_id = ?3)
             ORDER BY starts_at, id"
        ))?;

        let rows = stmt.query_map(
            params![
                filter.from.as_ref().map(format_datetime),
                filter.to.as_ref().map(format_datetime),
                filter.team_id,
            ],
            event_from_row,
        )?;

        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Error::from)
    }

    fn update_event(&self, event: &Event) -> Result<()> {
        let rows = self
            .conn()
            .execute(
                "UPDATE events SET title = ?1, description = ?2, kind = ?3, location = ?4,
                    starts_at = ?5, ends_at = ?6, team_id = ?7, updated_at = ?8
                 WHERE id = ?9",
                params![
                    event.title,
                    event.description,
                    event.kind.as_str(),
                    event.location,
                    format_datetime(&event.starts_at),
                    format_datetime(&event.ends_at),
                    event.team_id,
                    format_datetime(&Utc::now()),
                    event.id,
                ],
            )
            .map_err(write_err)?;
        expect_updated(rows)
    }

    fn delete_event(&self, id: &str) -> Result<bool> {
        let rows = self
            .conn()
            .execute("DELETE FROM events WHERE id = ?1", params![id])?;
        Ok(rows > 0)
    }

    // Report folder operations

    fn create_folder(&self, folder: &ReportFolder, creator: Option<&Grant>) -> Result<()> {
        let mut conn = self.conn();
        let tx = conn.transaction()?;

        tx.execute(
            &format!("INSERT INTO report_folders ({FOLDER_COLUMNS}) VALUES (?1, ?2, ?3, ?4, ?5, ?6)"),
            params![
                folder.id,
                folder.name,
                folder.description,
                folder.created_by,
                format_datetime(&folder.created_at),
                format_datetime(&folder.updated_at),
            ],
        )
        .map_err(write_err)?;

        if let Some(grant) = creator {
            insert_grants(&tx, GrantTable::Folder, &folder.id, std::slice::from_ref(grant))?;
        }

        tx.commit()?;
        Ok(())
    }

    fn get_folder(&self, id: &str) -> Result<Option<ReportFolder>> {
        self.conn()
            .query_row(
                &format!("SELECT {FOLDER_COLUMNS} FROM report_folders WHERE id = ?1"),
                params![id],
                folder_from_row,
            )
            .optional()
            .map_err(Error::from)
    }

    fn list_folders(&self) -> Result<Vec<ReportFolder>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(&format!(
            "SELECT {FOLDER_COLUMNS} FROM report_folders ORDER BY name, id"
        ))?;

        let rows = stmt.query_map([], folder_from_row)?;

        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Error::from)
    }

    fn update_folder(&self, folder: &ReportFolder) -> Result<()> {
        let rows = self.conn().execute(
            "UPDATE report_folders SET name = ?1, description = ?2, updated_at = ?3 WHERE id = ?4",
            params![
                folder.name,
                folder.description,
                format_datetime(&Utc::now()),
                folder.id
            ],
        )?;
        expect_updated(rows)
    }

    fn delete_folder(&self, id: &str) -> Result<bool> {
        let rows = self
            .conn()
            .execute("DELETE FROM report_folders WHERE id = ?1", params![id])?;
        Ok(rows > 0)
    }

    // Report operations

    fn create_report(&self, report: &Report, creator: Option<&Grant>) -> Result<()> {
        let mut conn = self.conn();
        let tx = conn.transaction()?;

        tx.execute(
            &format!(
                "INSERT INTO reports ({REPORT_COLUMNS})
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)"
            ),
            params![
                report.id,
                report.folder_id,
                report.player_id,
                report.title,
                report.description,
                report.file.file_name,
                report.file.stored_name,
                report.file.mime_type,
                report.file.size_bytes,
                report.file.sha256,
                report.author_id,
                format_datetime(&report.created_at),
                format_datetime(&report.updated_at),
            ],
        )
        .map_err(write_err)?;

        if let Some(grant) = creator {
            insert_grants(&tx, GrantTable::Report, &report.id, std::slice::from_ref(grant))?;
        }

        tx.commit()?;
        Ok(())
    }

    fn get_report(&self, id: &str) -> Result<Option<Report>> {
        self.conn()
            .query_row(
                &format!("SELECT {REPORT_COLUMNS} FROM reports WHERE id = ?1"),
                params![id],
                report_from_row,
            )
            .optional()
            .map_err(Error::from)
    }

    fn list_reports(&self, filter: &ReportFilter) -> Result<Vec<Report>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(&format!(
            "SELECT {REPORT_COLUMNS} FROM reports
             WHERE (?1 IS NULL OR folder_id = ?1)
               AND (?2 IS NULL OR player_id = ?2)
             ORDER BY created_at DESC, id"
        ))?;

        let rows = stmt.query_map(params![filter.folder_id, filter.player_id], report_from_row)?;

        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Error::from)
    }

    fn update_report(&self, report: &Report) -> Result<()> {
        let rows = self
            .conn()
            .execute(
                "UPDATE reports SET folder_id = ?1, player_id = ?2, title = ?3, description = ?4,
                    updated_at = ?5
                 WHERE id = ?6",
                params![
                    report.folder_id,
                    report.player_id,
                    report.title,
                    report.description,
                    format_datetime(&Utc::now()),
                    report.id,
                ],
            )
            .map_err(write_err)?;
        expect_updated(rows)
    }

    fn delete_report(&self, id: &str) -> Result<bool> {
        let rows = self
            .conn()
            .execute("DELETE FROM reports WHERE id = ?1", params![id])?;
        Ok(rows > 0)
    }

    // Visibility grants

    fn list_report_grants(&self, report_id: &str) -> Result<Vec<Grant>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(
            "SELECT staff_id, can_view, can_edit, can_delete
             FROM report_visibility WHERE report_id = ?1 ORDER BY staff_id",
        )?;

        let rows = stmt.query_map(params![report_id], grant_from_row)?;

        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Error::from)
    }

    fn replace_report_grants(&self, report_id: &str, grants: &[Grant]) -> Result<()> {
        let mut conn = self.conn();
        let tx = conn.transaction()?;

        tx.execute(
            "DELETE FROM report_visibility WHERE report_id = ?1",
            params![report_id],
        )?;

        insert_grants(&tx, GrantTable::Report, report_id, grants)?;

        tx.commit()?;
        Ok(())
    }

    fn list_folder_grants(&self, folder_id: &str) -> Result<Vec<Grant>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(
            "SELECT staff_id, can_view, can_edit, can_delete
             FROM report_folder_visibility WHERE folder_id = ?1 ORDER BY staff_id",
        )?;

        let rows = stmt.query_map(params![folder_id], grant_from_row)?;

        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Error::from)
    }

    fn replace_folder_grants(&self, folder_id: &str, grants: &[Grant]) -> Result<()> {
        let mut conn = self.conn();
        let tx = conn.transaction()?;

        tx.execute(
            "DELETE FROM report_folder_visibility WHERE folder_id = ?1",
            params![folder_id],
        )?;

        insert_grants(&tx, GrantTable::Folder, folder_id, grants)?;

        tx.commit()?;
        Ok(())
    }

    // Coach note operations

    fn create_note(&self, note: &CoachNote) -> Result<()> {
        self.conn()
            .execute(
                &format!("INSERT INTO coach_notes ({NOTE_COLUMNS}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)"),
                params![
                    note.id,
                    note.player_id,
                    note.title,
                    note.body,
                    note.author_id,
                    format_datetime(&note.created_at),
                    format_datetime(&note.updated_at),
                ],
            )
            .map_err(write_err)?;
        Ok(())
    }

    fn get_note(&self, id: &str) -> Result<Option<CoachNote>> {
        self.conn()
            .query_row(
                &format!("SELECT {NOTE_COLUMNS} FROM coach_notes WHERE id = ?1"),
                params![id],
                note_from_row,
            )
            .optional()
            .map_err(Error::from)
    }

    fn list_notes(&self, player_id: Option<&str>) -> Result<Vec<CoachNote>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(&format!(
            "SELECT {NOTE_COLUMNS} FROM coach_notes
             WHERE (?1 IS NULL OR player_id = ?1) ORDER BY created_at DESC, id"
        ))?;

        let rows = stmt.query_map(params![player_id], note_from_row)?;

        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Error::from)
    }

    fn update_note(&self, note: &CoachNote) -> Result<()> {
        let rows = self
            .conn()
            .execute(
                "UPDATE coach_notes SET player_id = ?1, title = ?2, body = ?3, updated_at = ?4
                 WHERE id = ?5",
                params![
                    note.player_id,
                    note.title,
                    note.body,
                    format_datetime(&Utc::now()),
                    note.id
                ],
            )
            .map_err(write_err)?;
        expect_updated(rows)
    }

    fn delete_note(&self, id: &str) -> Result<bool> {
        let rows = self
            .conn()
            .execute("DELETE FROM coach_notes WHERE id = ?1", params![id])?;
        Ok(rows > 0)
    }

    fn list_note_viewers(&self, note_id: &str) -> Result<Vec<String>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(
            "SELECT staff_id FROM coach_note_staff_access
             WHERE note_id = ?1 AND can_view = 1 ORDER BY staff_id",
        )?;

        let rows = stmt.query_map(params![note_id], |row| row.get(0))?;

        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Error::from)
    }

    fn replace_note_viewers(&self, note_id: &str, staff_ids: &[String]) -> Result<()> {
        let mut conn = self.conn();
        let tx = conn.transaction()?;

        tx.execute(
            "DELETE FROM coach_note_staff_access WHERE note_id = ?1",
            params![note_id],
        )?;

        for staff_id in staff_ids {
            tx.execute(
                "INSERT INTO coach_note_staff_access (note_id, staff_id, can_view)
                 VALUES (?1, ?2, 1)",
                params![note_id, staff_id],
            )
            .map_err(write_err)?;
        }

        tx.commit()?;
        Ok(())
    }

    // File access log

    fn create_access_log(&self, entry: &FileAccessLog) -> Result<()> {
        self.conn().execute(
            &format!(
                "INSERT INTO file_access_logs ({ACCESS_LOG_COLUMNS})
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)"
            ),
            params![
                entry.id,
                entry.user_id,
                entry.file_type.as_str(),
                entry.file_id,
                entry.file_name,
                entry.action.as_str(),
                entry.ip,
                entry.user_agent,
                format_datetime(&entry.created_at),
            ],
        )?;
        Ok(())
    }

    fn list_access_logs(
        &self,
        filter: &AccessLogFilter,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<FileAccessLog>> {
        let (where_clause, mut values) = access_log_where(filter);
        values.push(Value::Integer(limit));
        values.push(Value::Integer(offset));

        let conn = self.conn();
        let mut stmt = conn.prepare(&format!(
            "SELECT {ACCESS_LOG_COLUMNS} FROM file_access_logs{where_clause}
             ORDER BY created_at DESC, id LIMIT ? OFFSET ?"
        ))?;

        let rows = stmt.query_map(params_from_iter(values), access_log_from_row)?;

        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Error::from)
    }

    fn count_access_logs(&self, filter: &AccessLogFilter) -> Result<i64> {
        let (where_clause, values) = access_log_where(filter);
        let count = self.conn().query_row(
            &format!("SELECT COUNT(*) FROM file_access_logs{where_clause}"),
            params_from_iter(values),
            |row| row.get(0),
        )?;
        Ok(count)
    }

    fn delete_access_logs_before(&self, cutoff: &DateTime<Utc>) -> Result<usize> {
        let rows = self.conn().execute(
            "DELETE FROM file_access_logs WHERE created_at < ?1",
            params![format_datetime(cutoff)],
        )?;
        Ok(rows)
    }
}
