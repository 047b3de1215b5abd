use jira_update_api::error::ApiError;
use jira_update_api::ApiClient;
use jira_update_config::DisplayField;
use jira_update_output::OutputRenderer;

pub struct JiraContext<'a> {
    pub client: ApiClient,
    pub renderer: &'a OutputRenderer,
    pub display_fields: Vec<DisplayField>,
}

/// How a flow ended. Request-level failures are reported as they happen and
/// only turn into `Failed` here; local errors (unreadable files, ...) are
/// returned as `Err` instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Success,
    Failed,
}

impl Outcome {
    pub fn from_failures(failures: usize) -> Self {
        if failures == 0 {
            Outcome::Success
        } else {
            Outcome::Failed
        }
    }
}

/// Prints the failure to stdout (status code and response body for HTTP
/// errors) plus a hint when one applies.
pub fn report_failure(err: &ApiError) {
    tracing::warn!(status = ?err.status(), "Request failed");
    println!("{err}");
    if let Some(hint) = err.suggestion() {
        println!("Hint: {hint}");
    }
}
