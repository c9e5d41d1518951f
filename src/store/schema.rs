pub const SCHEMA: &str = r#"
-- Login accounts; role drives default access
CREATE TABLE IF NOT EXISTS users (
    id TEXT PRIMARY KEY,
    email TEXT NOT NULL UNIQUE,
    name TEXT NOT NULL,
    password_hash TEXT NOT NULL,
    role TEXT NOT NULL CHECK (role IN ('admin', 'coach', 'staff', 'player')),
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

-- One row per STAFF user; every capability is opt-in
CREATE TABLE IF NOT EXISTS staff (
    id TEXT PRIMARY KEY,
    user_id TEXT NOT NULL UNIQUE REFERENCES users(id) ON DELETE CASCADE,
    title TEXT,
    can_view_reports INTEGER NOT NULL DEFAULT 0,
    can_upload_reports INTEGER NOT NULL DEFAULT 0,
    can_edit_reports INTEGER NOT NULL DEFAULT 0,
    can_delete_reports INTEGER NOT NULL DEFAULT 0,
    can_view_calendar INTEGER NOT NULL DEFAULT 0,
    can_manage_events INTEGER NOT NULL DEFAULT 0,
    can_view_players INTEGER NOT NULL DEFAULT 0,
    can_manage_players INTEGER NOT NULL DEFAULT 0,
    can_manage_staff INTEGER NOT NULL DEFAULT 0,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS teams (
    id TEXT PRIMARY KEY,
    name TEXT NOT NULL UNIQUE,
    description TEXT,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS players (
    id TEXT PRIMARY KEY,
    user_id TEXT UNIQUE REFERENCES users(id) ON DELETE SET NULL,
    team_id TEXT REFERENCES teams(id) ON DELETE SET NULL,
    first_name TEXT NOT NULL,
    last_name TEXT NOT NULL,
    email TEXT,
    position TEXT,
    jersey_number INTEGER,
    date_of_birth TEXT,

    -- Avatar file metadata (content lives under uploads/avatars)
    avatar_file_name TEXT,
    avatar_stored_name TEXT,
    avatar_mime_type TEXT,
    avatar_size_bytes INTEGER,
    avatar_sha256 TEXT,

    -- Identity in the external wellness survey service
    wellness_id TEXT,

    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS events (
    id TEXT PRIMARY KEY,
    title TEXT NOT NULL,
    description TEXT,
    kind TEXT NOT NULL,
    location TEXT,
    starts_at TEXT NOT NULL,
    ends_at TEXT NOT NULL,
    team_id TEXT REFERENCES teams(id) ON DELETE SET NULL,
    created_by TEXT NOT NULL REFERENCES users(id),
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS report_folders (
    id TEXT PRIMARY KEY,
    name TEXT NOT NULL,
    description TEXT,
    created_by TEXT NOT NULL REFERENCES users(id),
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS reports (
    id TEXT PRIMARY KEY,
    folder_id TEXT REFERENCES report_folders(id) ON DELETE SET NULL,
    player_id TEXT REFERENCES players(id) ON DELETE SET NULL,
    title TEXT NOT NULL,
    description TEXT,
    file_name TEXT NOT NULL,
    stored_name TEXT NOT NULL,
    mime_type TEXT NOT NULL,
    size_bytes INTEGER NOT NULL,
    sha256 TEXT NOT NULL,
    author_id TEXT NOT NULL REFERENCES users(id),
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

-- Per-staff grants; rows die with their item and with their grantee
CREATE TABLE IF NOT EXISTS report_visibility (
    report_id TEXT NOT NULL REFERENCES reports(id) ON DELETE CASCADE,
    staff_id TEXT NOT NULL REFERENCES staff(id) ON DELETE CASCADE,
    can_view INTEGER NOT NULL DEFAULT 0,
    can_edit INTEGER NOT NULL DEFAULT 0,
    can_delete INTEGER NOT NULL DEFAULT 0,
    PRIMARY KEY (report_id, staff_id)
);

CREATE TABLE IF NOT EXISTS report_folder_visibility (
    folder_id TEXT NOT NULL REFERENCES report_folders(id) ON DELETE CASCADE,
    staff_id TEXT NOT NULL REFERENCES staff(id) ON DELETE CASCADE,
    can_view INTEGER NOT NULL DEFAULT 0,
    can_edit INTEGER NOT NULL DEFAULT 0,
    can_delete INTEGER NOT NULL DEFAULT 0,
    PRIMARY KEY (folder_id, staff_id)
);

CREATE TABLE IF NOT EXISTS coach_notes (
    id TEXT PRIMARY KEY,
    player_id TEXT REFERENCES players(id) ON DELETE CASCADE,
    title TEXT NOT NULL,
    body TEXT NOT NULL,
    author_id TEXT NOT NULL REFERENCES users(id),
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS coach_note_staff_access (
    note_id TEXT NOT NULL REFERENCES coach_notes(id) ON DELETE CASCADE,
    staff_id TEXT NOT NULL REFERENCES staff(id) ON DELETE CASCADE,
    can_view INTEGER NOT NULL DEFAULT 1,
    PRIMARY KEY (note_id, staff_id)
);

-- Append-only; rows are never updated
CREATE TABLE IF NOT EXISTS file_access_logs (
    id TEXT PRIMARY KEY,
    user_id TEXT NOT NULL,
    file_type TEXT NOT NULL,
    file_id TEXT NOT NULL,
    file_name TEXT NOT NULL,
    action TEXT NOT NULL,
    ip TEXT,
    user_agent TEXT,
    created_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_players_team ON players(team_id);
CREATE INDEX IF NOT EXISTS idx_events_starts_at ON events(starts_at);
CREATE INDEX IF NOT EXISTS idx_events_team ON events(team_id);
CREATE INDEX IF NOT EXISTS idx_reports_folder ON reports(folder_id);
CREATE INDEX IF NOT EXISTS idx_reports_player ON reports(player_id);
CREATE INDEX IF NOT EXISTS idx_report_visibility_staff ON report_visibility(staff_id);
CREATE INDEX IF NOT EXISTS idx_folder_visibility_staff ON report_folder_visibility(staff_id);
CREATE INDEX IF NOT EXISTS idx_note_access_staff ON coach_note_staff_access(staff_id);
CREATE INDEX IF NOT EXISTS idx_coach_notes_player ON coach_notes(player_id);
CREATE INDEX IF NOT EXISTS idx_access_logs_created ON file_access_logs(created_at);
"#;
