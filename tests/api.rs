//! HTTP API tests. Each test drives the router in-process against its own
//! temp data directory.

mod common;

use std::path::Path;

use axum::http::{Method, StatusCode, header};
use chrono::{Duration, TimeZone, Utc};
use serde_json::json;
use uuid::Uuid;

use clubhouse::store::ReportFilter;
use clubhouse::types::{
    FileAccessLog, FileAction, FileType, Grant, GrantRights, Player, Report, ReportFolder, Role,
    StaffCapabilities, StoredFile,
};
use common::{PASSWORD, TestApp};

fn count_files(dir: &Path) -> usize {
    let Ok(entries) = std::fs::read_dir(dir) else {
        return 0;
    };
    entries
        .flatten()
        .map(|entry| {
            let path = entry.path();
            if path.is_dir() { count_files(&path) } else { 1 }
        })
        .sum()
}

fn report_caps() -> StaffCapabilities {
    StaffCapabilities {
        can_view_reports: true,
        can_edit_reports: true,
        can_delete_reports: true,
        ..StaffCapabilities::default()
    }
}

fn seed_folder(app: &TestApp, created_by: &str, name: &str) -> ReportFolder {
    let now = Utc::now();
    let folder = ReportFolder {
        id: Uuid::new_v4().to_string(),
        name: name.to_string(),
        description: None,
        created_by: created_by.to_string(),
        created_at: now,
        updated_at: now,
    };
    app.store().create_folder(&folder, None).expect("create folder");
    folder
}

fn seed_report(app: &TestApp, author_id: &str, title: &str) -> Report {
    let now = Utc::now();
    let report = Report {
        id: Uuid::new_v4().to_string(),
        folder_id: None,
        player_id: None,
        title: title.to_string(),
        description: None,
        file: StoredFile {
            file_name: "scan.pdf".to_string(),
            stored_name: Uuid::new_v4().to_string(),
            mime_type: "application/pdf".to_string(),
            size_bytes: 4,
            sha256: "00".repeat(32),
        },
        author_id: author_id.to_string(),
        created_at: now,
        updated_at: now,
    };
    app.store().create_report(&report, None).expect("create report");
    report
}

fn view_only(staff_id: &str) -> Grant {
    Grant {
        staff_id: staff_id.to_string(),
        rights: GrantRights {
            can_view: true,
            ..GrantRights::default()
        },
    }
}

// Session

#[tokio::test]
async fn test_login_and_me() {
    let app = TestApp::new();
    let coach = app.seed_with_password(Role::Coach, "coach@club.org");

    let resp = app
        .call(
            Method::POST,
            "/api/v1/auth/login",
            None,
            Some(json!({"email": "COACH@club.org", "password": PASSWORD})),
        )
        .await;
    assert_eq!(resp.status, StatusCode::OK);
    let body = resp.json();
    let token = body["data"]["token"].as_str().expect("token").to_string();
    assert_eq!(body["data"]["user"]["id"], coach.id.as_str());
    assert!(body["data"]["user"].get("password_hash").is_none());

    let resp = app.get("/api/v1/auth/me", &token).await;
    assert_eq!(resp.status, StatusCode::OK);
    let body = resp.json();
    assert_eq!(body["data"]["user"]["email"], "coach@club.org");
    assert_eq!(body["data"]["user"]["role"], "coach");
}

#[tokio::test]
async fn test_login_rejects_wrong_password() {
    let app = TestApp::new();
    app.seed_with_password(Role::Admin, "admin@club.org");

    let resp = app
        .call(
            Method::POST,
            "/api/v1/auth/login",
            None,
            Some(json!({"email": "admin@club.org", "password": "not-the-password"})),
        )
        .await;
    assert_eq!(resp.status, StatusCode::UNAUTHORIZED);
    assert_eq!(resp.json()["error"], "unauthorized");

    let resp = app
        .call(
            Method::POST,
            "/api/v1/auth/login",
            None,
            Some(json!({"email": "nobody@club.org", "password": PASSWORD})),
        )
        .await;
    assert_eq!(resp.status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_bad_tokens_get_challenge() {
    let app = TestApp::new();
    let (admin, _) = app.seed(Role::Admin, "admin@club.org");

    let resp = app.call(Method::GET, "/api/v1/auth/me", None, None).await;
    assert_eq!(resp.status, StatusCode::UNAUTHORIZED);
    assert!(resp.headers.contains_key(header::WWW_AUTHENTICATE));

    let resp = app.get("/api/v1/auth/me", "not.a.jwt").await;
    assert_eq!(resp.status, StatusCode::UNAUTHORIZED);
    assert_eq!(resp.json()["message"], "Invalid token");

    let (expired, _) = app
        .state
        .tokens
        .issue(&admin.id, Role::Admin, Duration::hours(-1))
        .unwrap();
    let resp = app.get("/api/v1/auth/me", &expired).await;
    assert_eq!(resp.status, StatusCode::UNAUTHORIZED);
    assert_eq!(resp.json()["message"], "Token expired");
    assert_eq!(
        resp.headers[header::WWW_AUTHENTICATE],
        "Bearer realm=\"clubhouse\""
    );
}

#[tokio::test]
async fn test_token_for_deleted_user_is_rejected() {
    let app = TestApp::new();
    let (user, token) = app.seed(Role::Coach, "gone@club.org");
    app.store().delete_user(&user.id).unwrap();

    let resp = app.get("/api/v1/auth/me", &token).await;
    assert_eq!(resp.status, StatusCode::UNAUTHORIZED);
}

// Visibility

#[tokio::test]
async fn test_staff_view_only_folder() {
    let app = TestApp::new();
    let (admin, _) = app.seed(Role::Admin, "admin@club.org");
    let (_, staff, staff_token) = app.seed_staff("physio@club.org", report_caps());

    let shared = seed_folder(&app, &admin.id, "Medical");
    seed_folder(&app, &admin.id, "Scouting");
    app.store()
        .replace_folder_grants(&shared.id, &[view_only(&staff.id)])
        .unwrap();

    let resp = app.get("/api/v1/folders", &staff_token).await;
    assert_eq!(resp.status, StatusCode::OK);
    let body = resp.json();
    let folders = body["data"].as_array().unwrap();
    assert_eq!(folders.len(), 1);
    assert_eq!(folders[0]["id"], shared.id.as_str());
    assert_eq!(folders[0]["access"], json!({"view": true, "edit": false, "delete": false}));

    let resp = app
        .call(
            Method::PATCH,
            &format!("/api/v1/folders/{}", shared.id),
            Some(&staff_token),
            Some(json!({"name": "Renamed"})),
        )
        .await;
    assert_eq!(resp.status, StatusCode::FORBIDDEN);
    assert_eq!(resp.json()["error"], "forbidden");

    let resp = app
        .call(
            Method::PUT,
            &format!("/api/v1/folders/{}", shared.id),
            Some(&staff_token),
            Some(json!({"name": "Renamed"})),
        )
        .await;
    assert_eq!(resp.status, StatusCode::FORBIDDEN);
    assert_eq!(app.store().get_folder(&shared.id).unwrap().unwrap().name, "Medical");
}

#[tokio::test]
async fn test_folder_put_edits_metadata() {
    let app = TestApp::new();
    let (admin, _) = app.seed(Role::Admin, "admin@club.org");
    let (_, coach_token) = app.seed(Role::Coach, "coach@club.org");
    let folder = seed_folder(&app, &admin.id, "Medical");

    let resp = app
        .call(
            Method::PUT,
            &format!("/api/v1/folders/{}", folder.id),
            Some(&coach_token),
            Some(json!({"name": "Physio"})),
        )
        .await;
    assert_eq!(resp.status, StatusCode::OK);
    assert_eq!(app.store().get_folder(&folder.id).unwrap().unwrap().name, "Physio");
}

#[tokio::test]
async fn test_player_is_denied_content() {
    let app = TestApp::new();
    let (admin, _) = app.seed(Role::Admin, "admin@club.org");
    let (_, player_token) = app.seed(Role::Player, "player@club.org");
    let folder = seed_folder(&app, &admin.id, "Medical");
    let report = seed_report(&app, &admin.id, "Knee MRI");

    let resp = app.get("/api/v1/reports", &player_token).await;
    assert_eq!(resp.status, StatusCode::FORBIDDEN);

    let resp = app
        .get(&format!("/api/v1/folders/{}", folder.id), &player_token)
        .await;
    assert_eq!(resp.status, StatusCode::FORBIDDEN);

    let resp = app
        .get(&format!("/api/v1/reports/{}/download", report.id), &player_token)
        .await;
    assert_eq!(resp.status, StatusCode::FORBIDDEN);

    let resp = app.get("/api/v1/events", &player_token).await;
    assert_eq!(resp.status, StatusCode::OK);
}

#[tokio::test]
async fn test_visibility_replace_with_unknown_staff_keeps_old_grants() {
    let app = TestApp::new();
    let (admin, admin_token) = app.seed(Role::Admin, "admin@club.org");
    let (_, staff, _) = app.seed_staff("physio@club.org", report_caps());
    let report = seed_report(&app, &admin.id, "Knee MRI");
    app.store()
        .replace_report_grants(&report.id, &[view_only(&staff.id)])
        .unwrap();

    let uri = format!("/api/v1/reports/{}/visibility", report.id);
    let resp = app
        .call(
            Method::PUT,
            &uri,
            Some(&admin_token),
            Some(json!({"grants": [
                {"staff_id": staff.id, "can_view": true, "can_edit": true},
                {"staff_id": "no-such-staff", "can_view": true},
            ]})),
        )
        .await;
    assert_eq!(resp.status, StatusCode::BAD_REQUEST);

    let resp = app.get(&uri, &admin_token).await;
    assert_eq!(resp.status, StatusCode::OK);
    assert_eq!(
        resp.json()["data"],
        json!([{"staff_id": staff.id, "can_view": true, "can_edit": false, "can_delete": false}])
    );
}

#[tokio::test]
async fn test_duplicate_grantee_is_rejected() {
    let app = TestApp::new();
    let (admin, admin_token) = app.seed(Role::Admin, "admin@club.org");
    let (_, staff, _) = app.seed_staff("physio@club.org", report_caps());
    let folder = seed_folder(&app, &admin.id, "Medical");

    let resp = app
        .call(
            Method::PUT,
            &format!("/api/v1/folders/{}/visibility", folder.id),
            Some(&admin_token),
            Some(json!({"grants": [
                {"staff_id": staff.id, "can_view": true},
                {"staff_id": staff.id, "can_edit": true},
            ]})),
        )
        .await;
    assert_eq!(resp.status, StatusCode::BAD_REQUEST);
    assert!(app.store().list_folder_grants(&folder.id).unwrap().is_empty());
}

#[tokio::test]
async fn test_note_access_is_read_only_for_staff() {
    let app = TestApp::new();
    let (_, coach_token) = app.seed(Role::Coach, "coach@club.org");
    let (_, staff, staff_token) = app.seed_staff("analyst@club.org", StaffCapabilities::default());

    let resp = app
        .call(
            Method::POST,
            "/api/v1/notes",
            Some(&coach_token),
            Some(json!({"title": "Set pieces", "body": "Near post runs."})),
        )
        .await;
    assert_eq!(resp.status, StatusCode::CREATED);
    let note_id = resp.json()["data"]["id"].as_str().unwrap().to_string();
    let note_uri = format!("/api/v1/notes/{note_id}");

    let resp = app.get(&note_uri, &staff_token).await;
    assert_eq!(resp.status, StatusCode::FORBIDDEN);
    let resp = app.get("/api/v1/notes", &staff_token).await;
    assert_eq!(resp.json()["data"], json!([]));

    let resp = app
        .call(
            Method::PUT,
            &format!("{note_uri}/access"),
            Some(&coach_token),
            Some(json!({"staff_ids": [staff.id]})),
        )
        .await;
    assert_eq!(resp.status, StatusCode::OK);

    let resp = app.get(&note_uri, &staff_token).await;
    assert_eq!(resp.status, StatusCode::OK);
    assert_eq!(resp.json()["data"]["access"]["edit"], false);

    let resp = app
        .call(
            Method::PATCH,
            &note_uri,
            Some(&staff_token),
            Some(json!({"body": "Far post instead."})),
        )
        .await;
    assert_eq!(resp.status, StatusCode::FORBIDDEN);

    let resp = app
        .call(
            Method::POST,
            "/api/v1/notes",
            Some(&staff_token),
            Some(json!({"title": "Mine", "body": "Staff cannot write notes."})),
        )
        .await;
    assert_eq!(resp.status, StatusCode::FORBIDDEN);
}

// Uploads

#[tokio::test]
async fn test_oversized_upload_writes_nothing() {
    let app = TestApp::new();
    let (_, admin_token) = app.seed(Role::Admin, "admin@club.org");

    let data = vec![0u8; 51 * 1024 * 1024];
    let resp = app
        .upload(
            "/api/v1/reports",
            &admin_token,
            "huge.bin",
            "application/octet-stream",
            &data,
            &[("title", "Too big")],
        )
        .await;
    assert_eq!(resp.status, StatusCode::PAYLOAD_TOO_LARGE);
    assert_eq!(resp.json()["error"], "payload_too_large");

    assert_eq!(count_files(&app.temp_dir.path().join("uploads")), 0);
    assert!(
        app.store()
            .list_reports(&ReportFilter::default())
            .unwrap()
            .is_empty()
    );
}

#[tokio::test]
async fn test_upload_limit_follows_config() {
    let app = TestApp::with_config(|config| config.max_upload_bytes = 1024);
    let (_, admin_token) = app.seed(Role::Admin, "admin@club.org");

    let resp = app
        .upload("/api/v1/reports", &admin_token, "a.txt", "text/plain", &[b'a'; 1025], &[])
        .await;
    assert_eq!(resp.status, StatusCode::PAYLOAD_TOO_LARGE);

    let resp = app
        .upload("/api/v1/reports", &admin_token, "a.txt", "text/plain", &[b'a'; 1024], &[])
        .await;
    assert_eq!(resp.status, StatusCode::CREATED);
    assert_eq!(resp.json()["data"]["title"], "a.txt");
}

#[tokio::test]
async fn test_upload_download_is_audited() {
    let app = TestApp::new();
    let (_, admin_token) = app.seed(Role::Admin, "admin@club.org");
    let contents = b"%PDF-1.4 hamstring assessment";

    let resp = app
        .upload(
            "/api/v1/reports",
            &admin_token,
            "hamstring.pdf",
            "application/pdf",
            contents,
            &[("title", "Hamstring assessment")],
        )
        .await;
    assert_eq!(resp.status, StatusCode::CREATED);
    let body = resp.json();
    let report_id = body["data"]["id"].as_str().unwrap().to_string();
    assert_eq!(body["data"]["file"]["size_bytes"], contents.len());
    assert!(body["data"]["file"].get("stored_name").is_none());

    let resp = app
        .get(&format!("/api/v1/reports/{report_id}/download"), &admin_token)
        .await;
    assert_eq!(resp.status, StatusCode::OK);
    assert_eq!(resp.body, contents);
    assert_eq!(resp.headers[header::CONTENT_TYPE], "application/pdf");
    assert_eq!(
        resp.headers[header::CONTENT_DISPOSITION],
        "attachment; filename=\"hamstring.pdf\""
    );

    for action in ["upload", "download"] {
        let resp = app
            .get(&format!("/api/v1/audit?action={action}"), &admin_token)
            .await;
        assert_eq!(resp.status, StatusCode::OK);
        let body = resp.json();
        assert_eq!(body["total"], 1, "one {action} entry");
        assert_eq!(body["data"][0]["file_id"], report_id.as_str());
        assert_eq!(body["data"][0]["file_type"], "report");
    }

    let resp = app
        .call(
            Method::DELETE,
            &format!("/api/v1/reports/{report_id}"),
            Some(&admin_token),
            None,
        )
        .await;
    assert_eq!(resp.status, StatusCode::NO_CONTENT);
    assert_eq!(count_files(&app.temp_dir.path().join("uploads")), 0);
}

// Audit

#[tokio::test]
async fn test_audit_purge_older_than() {
    let app = TestApp::new();
    let (admin, admin_token) = app.seed(Role::Admin, "admin@club.org");
    let (_, coach_token) = app.seed(Role::Coach, "coach@club.org");

    for (id, created_at) in [
        ("old", Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap()),
        ("edge", Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap()),
        ("new", Utc.with_ymd_and_hms(2026, 2, 1, 12, 0, 0).unwrap()),
    ] {
        app.store()
            .create_access_log(&FileAccessLog {
                id: id.to_string(),
                user_id: admin.id.clone(),
                file_type: FileType::Report,
                file_id: "r1".to_string(),
                file_name: "scan.pdf".to_string(),
                action: FileAction::View,
                ip: None,
                user_agent: None,
                created_at,
            })
            .unwrap();
    }

    let resp = app
        .call(Method::DELETE, "/api/v1/audit", Some(&coach_token), None)
        .await;
    assert_eq!(resp.status, StatusCode::FORBIDDEN);

    let resp = app
        .call(Method::DELETE, "/api/v1/audit", Some(&admin_token), None)
        .await;
    assert_eq!(resp.status, StatusCode::BAD_REQUEST);

    let resp = app
        .call(
            Method::DELETE,
            "/api/v1/audit?olderThan=2026-01-01",
            Some(&admin_token),
            None,
        )
        .await;
    assert_eq!(resp.status, StatusCode::OK);
    assert_eq!(resp.json()["data"]["deleted"], 1);

    let resp = app.get("/api/v1/audit?limit=1", &admin_token).await;
    let body = resp.json();
    assert_eq!(body["total"], 2);
    assert_eq!(body["limit"], 1);
    assert_eq!(body["data"][0]["id"], "new");

    let resp = app
        .get("/api/v1/audit?from=2026-01-01&to=2026-01-01", &admin_token)
        .await;
    assert_eq!(resp.json()["total"], 1);
}

// Roster

#[tokio::test]
async fn test_wellness_unavailable_without_service() {
    let app = TestApp::new();
    let (_, coach_token) = app.seed(Role::Coach, "coach@club.org");
    let now = Utc::now();
    let player = Player {
        id: Uuid::new_v4().to_string(),
        user_id: None,
        team_id: None,
        first_name: "Sam".to_string(),
        last_name: "Keeper".to_string(),
        email: None,
        position: Some("GK".to_string()),
        jersey_number: Some(1),
        date_of_birth: None,
        avatar: None,
        wellness_id: Some("w-1".to_string()),
        created_at: now,
        updated_at: now,
    };
    app.store().create_player(&player, None).unwrap();

    let resp = app
        .get(&format!("/api/v1/players/{}/wellness", player.id), &coach_token)
        .await;
    assert_eq!(resp.status, StatusCode::OK);
    assert_eq!(resp.json()["data"]["available"], false);
}

#[tokio::test]
async fn test_staff_capabilities_gate_roster() {
    let app = TestApp::new();
    let (_, admin_token) = app.seed(Role::Admin, "admin@club.org");
    let (_, staff, staff_token) = app.seed_staff("kit@club.org", StaffCapabilities::default());

    let resp = app.get("/api/v1/players", &staff_token).await;
    assert_eq!(resp.status, StatusCode::FORBIDDEN);

    let resp = app
        .call(
            Method::PUT,
            &format!("/api/v1/staff/{}/capabilities", staff.id),
            Some(&admin_token),
            Some(json!({"can_view_players": true})),
        )
        .await;
    assert_eq!(resp.status, StatusCode::OK);

    let resp = app.get("/api/v1/players", &staff_token).await;
    assert_eq!(resp.status, StatusCode::OK);

    let resp = app
        .call(
            Method::POST,
            "/api/v1/teams",
            Some(&staff_token),
            Some(json!({"name": "Under 21"})),
        )
        .await;
    assert_eq!(resp.status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_coach_cannot_manage_staff() {
    let app = TestApp::new();
    let (_, coach_token) = app.seed(Role::Coach, "coach@club.org");
    let (_, staff, _) = app.seed_staff("kit@club.org", StaffCapabilities::default());

    let resp = app.get("/api/v1/staff", &coach_token).await;
    assert_eq!(resp.status, StatusCode::FORBIDDEN);

    let resp = app
        .call(
            Method::PUT,
            &format!("/api/v1/staff/{}/capabilities", staff.id),
            Some(&coach_token),
            Some(json!({"can_view_reports": true})),
        )
        .await;
    assert_eq!(resp.status, StatusCode::FORBIDDEN);
    let stored = app.store().get_staff(&staff.id).unwrap().unwrap();
    assert_eq!(stored.capabilities, StaffCapabilities::default());
}

#[tokio::test]
async fn test_staff_cannot_raise_own_capabilities() {
    let app = TestApp::new();
    let caps = StaffCapabilities {
        can_manage_staff: true,
        ..StaffCapabilities::default()
    };
    let (_, staff, staff_token) = app.seed_staff("ops@club.org", caps);

    let resp = app
        .call(
            Method::PUT,
            &format!("/api/v1/staff/{}/capabilities", staff.id),
            Some(&staff_token),
            Some(json!({
                "can_view_reports": true,
                "can_upload_reports": true,
                "can_edit_reports": true,
                "can_delete_reports": true,
                "can_view_calendar": true,
                "can_manage_events": true,
                "can_view_players": true,
                "can_manage_players": true,
                "can_manage_staff": true
            })),
        )
        .await;
    assert_eq!(resp.status, StatusCode::FORBIDDEN);
    assert_eq!(resp.json()["error"], "forbidden");

    let resp = app.get("/api/v1/reports", &staff_token).await;
    assert_eq!(resp.status, StatusCode::FORBIDDEN);

    let resp = app
        .call(
            Method::POST,
            "/api/v1/staff",
            Some(&staff_token),
            Some(json!({
                "email": "crony@club.org",
                "name": "Crony",
                "password": "longenough",
                "capabilities": {"can_view_reports": true}
            })),
        )
        .await;
    assert_eq!(resp.status, StatusCode::FORBIDDEN);

    let stored = app.store().get_staff(&staff.id).unwrap().unwrap();
    assert_eq!(stored.capabilities, caps);
    assert!(
        app.store()
            .get_user_by_email("crony@club.org")
            .unwrap()
            .is_none()
    );
}

#[tokio::test]
async fn test_player_update_clears_team_and_moves_login() {
    let app = TestApp::new();
    let (_, coach_token) = app.seed(Role::Coach, "coach@club.org");

    let resp = app
        .call(
            Method::POST,
            "/api/v1/teams",
            Some(&coach_token),
            Some(json!({"name": "Under 21"})),
        )
        .await;
    assert_eq!(resp.status, StatusCode::CREATED);
    let team_id = resp.json()["data"]["id"].as_str().unwrap().to_string();

    let resp = app
        .call(
            Method::POST,
            "/api/v1/players",
            Some(&coach_token),
            Some(json!({
                "first_name": "Ada",
                "last_name": "Stone",
                "email": "ada@club.org",
                "password": PASSWORD,
                "team_id": team_id
            })),
        )
        .await;
    assert_eq!(resp.status, StatusCode::CREATED);
    let player_id = resp.json()["data"]["id"].as_str().unwrap().to_string();

    let resp = app
        .call(
            Method::PATCH,
            &format!("/api/v1/players/{player_id}"),
            Some(&coach_token),
            Some(json!({"team_id": "", "email": "ada.stone@club.org"})),
        )
        .await;
    assert_eq!(resp.status, StatusCode::OK);
    assert!(resp.json()["data"]["team_id"].is_null());

    let player: Player = app.store().get_player(&player_id).unwrap().unwrap();
    assert_eq!(player.team_id, None);
    let login = app
        .store()
        .get_user(player.user_id.as_deref().unwrap())
        .unwrap()
        .unwrap();
    assert_eq!(login.email, "ada.stone@club.org");

    let resp = app
        .call(
            Method::POST,
            "/api/v1/auth/login",
            None,
            Some(json!({"email": "ada.stone@club.org", "password": PASSWORD})),
        )
        .await;
    assert_eq!(resp.status, StatusCode::OK);

    let resp = app
        .call(
            Method::PATCH,
            &format!("/api/v1/players/{player_id}"),
            Some(&coach_token),
            Some(json!({"email": "coach@club.org"})),
        )
        .await;
    assert_eq!(resp.status, StatusCode::CONFLICT);
}
