use crate::error::WorkflowError;

pub const USER_FIRST_NAME_MIN: usize = 2;
pub const USER_FIRST_NAME_MAX: usize = 50;
pub const USER_LAST_NAME_MIN: usize = 2;
pub const USER_LAST_NAME_MAX: usize = 50;

pub const TEAM_NAME_MIN: usize = 3;
pub const TEAM_NAME_MAX: usize = 100;

pub const JOB_TITLE_MIN: usize = 5;
pub const JOB_TITLE_MAX: usize = 100;
pub const JOB_DESCRIPTION_MIN: usize = 10;
pub const JOB_DESCRIPTION_MAX: usize = 1000;

pub const APPLICANT_EMAIL_MIN: usize = 5;
pub const APPLICANT_EMAIL_MAX: usize = 100;

pub const PASSWORD_MIN: usize = 8;

pub fn validate_length(
    field: &'static str,
    value: &str,
    min: usize,
    max: usize,
) -> Result<(), WorkflowError> {
    let len = value.trim().chars().count();
    if len < min || len > max {
        return Err(WorkflowError::validation(format!(
            "{field} must be between {min} and {max} characters"
        )));
    }
    Ok(())
}

pub fn validate_email(email: &str) -> Result<(), WorkflowError> {
    let email = email.trim();
    validate_length("email", email, APPLICANT_EMAIL_MIN, APPLICANT_EMAIL_MAX)?;

    let valid = match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && !domain.is_empty()
                && domain.contains('.')
                && !domain.starts_with('.')
                && !domain.ends_with('.')
        }
        None => false,
    };

    if !valid {
        return Err(WorkflowError::validation("email address is not valid"));
    }
    Ok(())
}

pub fn validate_resume_url(url: &str) -> Result<(), WorkflowError> {
    let url = url.trim();
    let valid = url
        .strip_prefix("https://")
        .or_else(|| url.strip_prefix("http://"))
        .is_some_and(|rest| !rest.is_empty());

    if !valid {
        return Err(WorkflowError::validation(
            "resume URL must be an http(s) address",
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_plain_addresses() {
        assert!(validate_email("casey@example.com").is_ok());
        assert!(validate_email("  casey@example.com  ").is_ok());
    }

    #[test]
    fn rejects_malformed_addresses() {
        assert!(validate_email("caseyexample.com").is_err());
        assert!(validate_email("casey@").is_err());
        assert!(validate_email("@example.com").is_err());
        assert!(validate_email("casey@nodomain").is_err());
        assert!(validate_email("a@b").is_err());
    }

    #[test]
    fn resume_url_requires_http_scheme() {
        assert!(validate_resume_url("https://files.example.com/cv.pdf").is_ok());
        assert!(validate_resume_url("http://files.example.com/cv.pdf").is_ok());
        assert!(validate_resume_url("ftp://files.example.com/cv.pdf").is_err());
        assert!(validate_resume_url("https://").is_err());
        assert!(validate_resume_url("").is_err());
    }
}
