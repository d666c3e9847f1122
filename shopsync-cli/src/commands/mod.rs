pub mod git;
pub mod init;
pub mod list;
pub mod publish;
pub mod pull;
pub mod push;
pub mod serve;

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::Args;
use colored::{ColoredString, Colorize};

use shopsync_api::Client;
use shopsync_core::{config, Theme};
use shopsync_sync::{Action, BatchReport, LocalFileIndex, SyncContext, SyncOptions};

/// Options accepted by every subcommand.
#[derive(Args, Debug)]
pub struct Globals {
    /// Log at debug level.
    #[arg(long, global = true)]
    pub debug: bool,

    /// Log at info level.
    #[arg(long, short = 'v', global = true)]
    pub verbose: bool,

    /// Where the store files live locally.
    #[arg(long, global = true, value_name = "DIR", default_value = "./shopify")]
    pub output_dir: PathBuf,

    /// Credentials section of ~/.shopsync/config.yaml.
    #[arg(long, global = true, value_name = "NAME")]
    pub section: Option<String>,
}

/// Resolved credentials plus the pieces every sync needs.
#[derive(Debug)]
pub struct Session {
    pub client: Client,
    pub index: LocalFileIndex,
    pub root: PathBuf,
}

impl Globals {
    pub fn session(&self) -> Result<Session> {
        let config = config::load(self.section.as_deref())
            .context("failed to load store credentials")?;
        let client = Client::new(&config).context("failed to build the API client")?;
        Ok(Session {
            client,
            index: LocalFileIndex::new(),
            root: self.output_dir.clone(),
        })
    }
}

impl Session {
    pub fn context(&self, options: SyncOptions) -> SyncContext<'_> {
        SyncContext::new(&self.client, &self.index, self.root.clone(), options)
    }

    /// The theme named by `selector`, or the published theme when absent.
    pub async fn theme(&self, selector: Option<&str>) -> Result<Theme> {
        self.client
            .find_theme(selector)
            .await
            .context("failed to list themes")?
            .with_context(|| match selector {
                Some(name) => format!("theme '{name}' not found"),
                None => "the store has no published theme".to_string(),
            })
    }
}

fn label(action: Action) -> ColoredString {
    let text = format!("{:<6}", action.to_string());
    match action {
        Action::Fetch => text.normal(),
        Action::Save => text.cyan(),
        Action::Create => text.green(),
        Action::Update => text.yellow(),
        Action::Delete => text.red(),
    }
}

/// One line per action, failures on stderr.
pub fn print_report(report: &BatchReport) {
    let prefix = if report.dry_run { "[dry-run] " } else { "" };
    for outcome in &report.outcomes {
        match &outcome.error {
            None => println!("{prefix}{} {}", label(outcome.action), outcome.target),
            Some(err) => eprintln!(
                "{prefix}{} {} {}",
                label(outcome.action),
                outcome.target,
                format!("✗ {err}").red()
            ),
        }
    }
}

/// Print the report and turn any failure into the command's error.
pub fn finish(report: &BatchReport) -> Result<()> {
    print_report(report);
    let failed = report.failures().count();
    if failed > 0 {
        bail!("{failed} action(s) failed");
    }
    if report.is_empty() {
        let prefix = if report.dry_run { "[dry-run] " } else { "" };
        println!("{prefix}{} nothing to do", "✓".green().bold());
    }
    Ok(())
}
