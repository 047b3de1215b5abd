use thiserror::Error;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("HTTP request failed: {0}")]
    RequestFailed(#[from] reqwest::Error),

    /// Any status other than the one the operation expects. The body is kept
    /// verbatim so it can be shown to the user as diagnostic text.
    #[error("Error: {status}\n{body}")]
    UnexpectedStatus { status: u16, body: String },

    #[error("No issue matched {jql}")]
    NoMatchingIssue { jql: String },

    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("Invalid response format: {0}")]
    InvalidResponse(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl ApiError {
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::UnexpectedStatus { status, .. } => Some(*status),
            ApiError::RequestFailed(err) => err.status().map(|s| s.as_u16()),
            _ => None,
        }
    }

    pub fn suggestion(&self) -> Option<&str> {
        match self {
            ApiError::UnexpectedStatus { status: 401, .. } => {
                Some("Verify the credentials in JIRA_USER / JIRA_PASS or the active profile")
            }
            ApiError::UnexpectedStatus { status: 403, .. } => {
                Some("The account lacks permission for this issue or field")
            }
            ApiError::UnexpectedStatus { status: 404, .. } => {
                Some("Check the host and that the issue still exists")
            }
            ApiError::UnexpectedStatus { status: 400, .. } => {
                Some("Review the field name and value; the query or update was rejected")
            }
            ApiError::NoMatchingIssue { .. } => Some("Check the search field and value"),
            ApiError::RequestFailed(_) => Some("Check your network connection and the Jira host"),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, ApiError>;
