use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use jira_update_api::error::Result as ApiResult;
use jira_update_api::{ApiClient, Attachment};
use tokio::fs;

use super::issues::locate_issue;
use super::utils::{report_failure, JiraContext, Outcome};
use crate::query::SearchQuery;

/// Downloads every attachment of the first issue matching `query` into
/// `dir`. A failed attachment is reported and the rest still download.
pub async fn download_attachments(
    ctx: &JiraContext<'_>,
    query: &SearchQuery,
    dir: &Path,
) -> Result<Outcome> {
    let issue = match locate_issue(&ctx.client, query).await {
        Ok(issue) => issue,
        Err(err) => {
            report_failure(&err);
            return Ok(Outcome::Failed);
        }
    };

    let attachments = match issue.attachments() {
        Ok(attachments) => attachments,
        Err(err) => {
            report_failure(&err);
            return Ok(Outcome::Failed);
        }
    };

    if attachments.is_empty() {
        println!("{} has no attachments", issue.key);
        return Ok(Outcome::Success);
    }

    fs::create_dir_all(dir)
        .await
        .with_context(|| format!("Failed to create directory {}", dir.display()))?;

    let mut failures = 0;
    for attachment in &attachments {
        println!("{}: {}", attachment.filename, attachment.content);
        match store_attachment(&ctx.client, dir, attachment).await {
            Ok(bytes) => {
                tracing::info!(file = %attachment.filename, bytes, "Attachment saved");
            }
            Err(err) => {
                report_failure(&err);
                failures += 1;
            }
        }
    }

    println!(
        "Downloaded {} of {} attachments from {} to {}",
        attachments.len() - failures,
        attachments.len(),
        issue.key,
        dir.display()
    );

    Ok(Outcome::from_failures(failures))
}

/// Streams one attachment to `dir/<filename>`. The file is created before
/// the request, so it exists (possibly empty) even when the download fails.
pub async fn store_attachment(
    client: &ApiClient,
    dir: &Path,
    attachment: &Attachment,
) -> ApiResult<u64> {
    let target = attachment_path(dir, &attachment.filename);
    let mut file = fs::File::create(&target).await?;
    client.download(&attachment.content, &mut file).await
}

/// Only the last path component of the server-supplied name is used.
pub fn attachment_path(dir: &Path, filename: &str) -> PathBuf {
    let name = Path::new(filename)
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_else(|| "attachment".into());
    dir.join(name)
}
