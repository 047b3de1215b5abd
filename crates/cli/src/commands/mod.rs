pub mod attachments;
pub mod bulk;
pub mod issues;
pub mod utils;

use std::path::PathBuf;

use anyhow::{bail, Result};
use clap::Args;

use crate::query::SearchQuery;
use issues::FieldUpdate;
use utils::{JiraContext, Outcome};

#[derive(Args, Debug, Clone, Default)]
pub struct FlowArgs {
    /// Field value to search with
    #[arg(short = 'k', long)]
    pub search_value: Option<String>,

    /// Field to search with
    #[arg(short = 's', long, default_value = "key")]
    pub search_field: String,

    /// Field to update
    #[arg(short = 'n', long)]
    pub update_field_name: Option<String>,

    /// New value for the updated field (needs --update-field-name and --search-value)
    #[arg(short = 'v', long)]
    pub update_field_value: Option<String>,

    /// CSV of `search_field,search_value,update_field,update_value` rows
    #[arg(short = 'f', long, value_name = "FILE")]
    pub input_file: Option<PathBuf>,

    /// Download the attachments of the issue found with --search-value into DIR
    #[arg(short = 'a', long, value_name = "DIR")]
    pub attachments: Option<PathBuf>,

    /// Print the planned bulk updates without sending them
    #[arg(long)]
    pub dry_run: bool,

    /// Show a progress bar during bulk updates
    #[arg(long)]
    pub progress: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Flow {
    DownloadAttachments { query: SearchQuery, dir: PathBuf },
    BulkUpdate { file: PathBuf, dry_run: bool, progress: bool },
    Update(FieldUpdate),
    Find(SearchQuery),
}

impl Flow {
    /// Picks the single flow to run. Attachments win over a bulk file,
    /// which wins over a single update, which wins over a plain search.
    /// Flags a flow needs are only checked when that flow is the one
    /// picked, so an incomplete attachments or update request never blocks
    /// a bulk file.
    pub fn select(args: &FlowArgs) -> Result<Option<Flow>> {
        let query = args
            .search_value
            .as_ref()
            .map(|value| SearchQuery::new(args.search_field.clone(), value.clone()));

        if let (Some(dir), Some(query)) = (&args.attachments, &query) {
            return Ok(Some(Flow::DownloadAttachments {
                query: query.clone(),
                dir: dir.clone(),
            }));
        }

        if let Some(file) = &args.input_file {
            return Ok(Some(Flow::BulkUpdate {
                file: file.clone(),
                dry_run: args.dry_run,
                progress: args.progress,
            }));
        }

        if args.attachments.is_some() {
            bail!("--attachments needs --search-value");
        }

        if let Some(value) = &args.update_field_value {
            let (Some(name), Some(query)) = (&args.update_field_name, &query) else {
                bail!("--update-field-value needs both --update-field-name and --search-value");
            };
            return Ok(Some(Flow::Update(FieldUpdate {
                query: query.clone(),
                field_name: name.clone(),
                field_value: value.clone(),
            })));
        }

        Ok(query.map(Flow::Find))
    }
}

pub async fn execute(flow: Flow, ctx: &JiraContext<'_>) -> Result<Outcome> {
    match flow {
        Flow::DownloadAttachments { query, dir } => {
            attachments::download_attachments(ctx, &query, &dir).await
        }
        Flow::BulkUpdate {
            file,
            dry_run,
            progress,
        } => bulk::bulk_update(ctx, &file, dry_run, progress).await,
        Flow::Update(update) => Ok(issues::update_one(ctx, &update).await),
        Flow::Find(query) => issues::find_issue(ctx, &query).await,
    }
}
