use crate::server::response::{ApiError, StoreResultExt};
use crate::store::Store;

const MAX_EMAIL_LEN: usize = 254;
const MAX_NAME_LEN: usize = 100;
const MAX_TITLE_LEN: usize = 200;
const MIN_PASSWORD_LEN: usize = 8;
const MAX_FILE_NAME_LEN: usize = 255;

fn validate_text(value: &str, entity: &str, max_len: usize) -> Result<(), ApiError> {
    if value.trim().is_empty() {
        return Err(ApiError::bad_request(format!("{entity} cannot be empty")));
    }
    if value.chars().count() > max_len {
        return Err(ApiError::bad_request(format!(
            "{entity} cannot exceed {max_len} characters"
        )));
    }
    Ok(())
}

pub fn validate_email(email: &str) -> Result<(), ApiError> {
    validate_text(email, "Email", MAX_EMAIL_LEN)?;
    let valid = match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && domain.contains('.')
                && !domain.starts_with('.')
                && !domain.ends_with('.')
                && !email.chars().any(char::is_whitespace)
        }
        None => false,
    };
    if !valid {
        return Err(ApiError::bad_request("Email address is not valid"));
    }
    Ok(())
}

pub fn validate_name(name: &str, entity: &str) -> Result<(), ApiError> {
    validate_text(name, &format!("{entity} name"), MAX_NAME_LEN)
}

pub fn validate_title(title: &str) -> Result<(), ApiError> {
    validate_text(title, "Title", MAX_TITLE_LEN)
}

pub fn validate_password(password: &str) -> Result<(), ApiError> {
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(ApiError::bad_request(format!(
            "Password must be at least {MIN_PASSWORD_LEN} characters"
        )));
    }
    Ok(())
}

/// Fails with 400 when `team_id` names a team that does not exist.
pub fn validate_team_ref(store: &dyn Store, team_id: Option<&str>) -> Result<(), ApiError> {
    if let Some(team_id) = team_id {
        store
            .get_team(team_id)
            .api_err("Failed to check team")?
            .ok_or_else(|| ApiError::bad_request("Team does not exist"))?;
    }
    Ok(())
}

/// An empty string in an update clears an optional link.
#[must_use]
pub fn link(value: String) -> Option<String> {
    let value = value.trim();
    if value.is_empty() {
        None
    } else {
        Some(value.to_string())
    }
}

/// Reduces a client-supplied file name to a safe display name.
#[must_use]
pub fn sanitize_file_name(name: &str) -> String {
    let base = name.rsplit(['/', '\\']).next().unwrap_or_default();
    let cleaned: String = base
        .chars()
        .filter(|c| !c.is_control() && *c != '"')
        .take(MAX_FILE_NAME_LEN)
        .collect();
    let cleaned = cleaned.trim();
    if cleaned.is_empty() || cleaned == "." || cleaned == ".." {
        "upload".to_string()
    } else {
        cleaned.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_email() {
        assert!(validate_email("coach@club.org").is_ok());
        assert!(validate_email("coach").is_err());
        assert!(validate_email("@club.org").is_err());
        assert!(validate_email("coach@club").is_err());
        assert!(validate_email("co ach@club.org").is_err());
        assert!(validate_email("").is_err());
    }

    #[test]
    fn test_validate_name_and_title() {
        assert!(validate_name("First Team", "Team").is_ok());
        assert!(validate_name("   ", "Team").is_err());
        assert!(validate_name(&"a".repeat(101), "Team").is_err());
        assert!(validate_title(&"a".repeat(200)).is_ok());
        assert!(validate_title(&"a".repeat(201)).is_err());
    }

    #[test]
    fn test_validate_password() {
        assert!(validate_password("longenough").is_ok());
        assert!(validate_password("short").is_err());
    }

    #[test]
    fn test_empty_link_clears() {
        assert_eq!(link(String::new()), None);
        assert_eq!(link("  ".to_string()), None);
        assert_eq!(link(" team-1 ".to_string()), Some("team-1".to_string()));
    }

    #[test]
    fn test_sanitize_file_name() {
        assert_eq!(sanitize_file_name("report.pdf"), "report.pdf");
        assert_eq!(sanitize_file_name("../../etc/passwd"), "passwd");
        assert_eq!(sanitize_file_name("C:\\scans\\knee \"mri\".png"), "knee mri.png");
        assert_eq!(sanitize_file_name(".."), "upload");
        assert_eq!(sanitize_file_name(""), "upload");
    }
}
