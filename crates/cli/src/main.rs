mod commands;
mod query;

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{anyhow, Context, Result};
use clap::{CommandFactory, Parser};
use commands::utils::{JiraContext, Outcome};
use commands::{Flow, FlowArgs};
use jira_update_api::ApiClient;
use jira_update_config::{Config, Connection, Overrides};
use jira_update_output::{OutputFormat, OutputRenderer};
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser, Debug)]
#[command(
    name = "jira-update",
    version,
    about = "Find Jira issues, update a field on one or many, and download attachments",
    long_about = None
)]
struct Cli {
    /// Profile to use from config file
    #[arg(short, long)]
    profile: Option<String>,

    /// Path to config file (defaults to ~/.jira-update/config.yaml)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Output format for command results
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    output: OutputFormat,

    /// Enable verbose logging
    #[arg(long)]
    debug: bool,

    #[command(flatten)]
    flow: FlowArgs,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<ExitCode> {
    if std::env::args_os().len() <= 1 {
        Cli::command().print_help()?;
        println!();
        return Ok(ExitCode::SUCCESS);
    }

    let cli = Cli::parse();
    init_tracing(cli.debug)?;

    let Some(flow) = Flow::select(&cli.flow)? else {
        tracing::info!("Nothing to do: no search value or input file given");
        return Ok(ExitCode::SUCCESS);
    };

    let config = Config::load(cli.config.as_ref())?;
    let profile = config.resolve_profile(cli.profile.as_deref())?;
    let connection = Connection::resolve(Overrides::from_env(), profile)?;

    let renderer = OutputRenderer::new(cli.output);
    let ctx = JiraContext {
        client: build_client(&connection)?,
        renderer: &renderer,
        display_fields: connection.display_fields.clone(),
    };

    let outcome = commands::execute(flow, &ctx).await?;
    Ok(match outcome {
        Outcome::Success => ExitCode::SUCCESS,
        Outcome::Failed => ExitCode::FAILURE,
    })
}

fn init_tracing(debug: bool) -> Result<()> {
    let default = if debug {
        "info,jira_update=debug,jira_update_api=debug,jira_update_bulk=debug"
    } else {
        "warn"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|err| anyhow!("failed to initialize logger: {err}"))
}

fn build_client(connection: &Connection) -> Result<ApiClient> {
    let password = match &connection.password {
        Some(password) => password.clone(),
        None => rpassword::prompt_password(format!(
            "Password for {}@{}: ",
            connection.username, connection.host
        ))
        .context("Failed to read password")?,
    };

    let mut client = ApiClient::new(&connection.host)
        .with_context(|| format!("Invalid Jira host '{}'", connection.host))?
        .with_basic_auth(connection.username.clone(), password);

    if let Some(timeout) = connection.timeout {
        client = client.with_timeout(timeout)?;
    }

    tracing::debug!(base_url = %client.base_url(), user = %connection.username, "Client ready");
    Ok(client)
}
