//! `shopsync serve`: live sync into an ephemeral development theme.

use anyhow::{bail, Context, Result};
use clap::Args;
use colored::Colorize;

use shopsync_core::{Theme, ThemeRole};
use shopsync_sync::SyncOptions;

use super::{git, print_report, Globals, Session};

/// Arguments for `shopsync serve`.
#[derive(Args, Debug)]
pub struct ServeArgs {
    /// Name of the development theme (defaults to `[DEV] user@host/branch`).
    /// A theme created for the session is deleted on exit; one that already
    /// existed is left in place.
    #[arg(long)]
    pub theme: Option<String>,

    /// Leave the git branch out of the default theme name.
    #[arg(long)]
    pub no_git: bool,
}

/// `[DEV] user@host`, plus `/branch` when a branch is given.
pub fn dev_theme_name(user: &str, host: &str, branch: Option<&str>) -> String {
    let mut name = format!("[DEV] {user}@{host}");
    if let Some(branch) = branch.map(str::trim).filter(|b| !b.is_empty()) {
        name.push('/');
        name.push_str(branch);
    }
    name
}

/// The theme a session develops against, and whether the session made it.
#[derive(Debug)]
struct DevTheme {
    theme: Theme,
    created: bool,
}

impl DevTheme {
    /// Only themes made by this session are removed on exit.
    fn delete_on_exit(&self) -> bool {
        self.created
    }
}

fn hostname() -> String {
    whoami::fallible::hostname().unwrap_or_else(|_| whoami::devicename())
}

impl ServeArgs {
    fn theme_name(&self, globals: &Globals) -> String {
        if let Some(name) = &self.theme {
            return name.clone();
        }
        let branch = if self.no_git {
            None
        } else {
            git::branch(&globals.output_dir)
        };
        dev_theme_name(&whoami::username(), &hostname(), branch.as_deref())
    }

    pub async fn run(self, globals: &Globals) -> Result<()> {
        let session = globals.session()?;
        let name = self.theme_name(globals);

        println!("Initializing local environment:");
        let dev = ensure_dev_theme(&session, &name).await?;
        let theme = &dev.theme;
        if theme.is_main() {
            bail!("developing on a published theme is not supported");
        }

        println!("... watching {}", session.root.display());
        println!(
            "... preview: {}/?preview_theme_id={}",
            session.client.base(),
            theme.id
        );
        println!("Press ^C to exit.");

        let ctx = session.context(SyncOptions::default());
        let shutdown = async {
            let _ = tokio::signal::ctrl_c().await;
        };
        let result = shopsync_live::run(&ctx, theme, shutdown, print_report).await;

        if dev.delete_on_exit() {
            println!("... cleanup \"{name}\"");
            session
                .client
                .delete_theme(theme.id)
                .await
                .with_context(|| format!("failed to delete theme '{name}'"))?;
        } else {
            println!("... leaving \"{name}\" in place");
        }
        result.context("live sync failed")?;
        println!("{} done", "✓".green().bold());
        Ok(())
    }
}

async fn ensure_dev_theme(session: &Session, name: &str) -> Result<DevTheme> {
    if let Some(theme) = session
        .client
        .find_theme(Some(name))
        .await
        .context("failed to list themes")?
    {
        println!("... reusing \"{name}\"");
        return Ok(DevTheme {
            theme,
            created: false,
        });
    }
    println!("... creating \"{name}\"");
    let theme = session
        .client
        .create_theme(name, ThemeRole::Development, None)
        .await
        .with_context(|| format!("failed to create theme '{name}'"))?
        .with_context(|| format!("store returned no theme after creating '{name}'"))?;
    Ok(DevTheme {
        theme,
        created: true,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dev_theme_name_appends_branch_when_known() {
        assert_eq!(dev_theme_name("ana", "box", None), "[DEV] ana@box");
        assert_eq!(
            dev_theme_name("ana", "box", Some("feature/cart\n")),
            "[DEV] ana@box/feature/cart"
        );
        assert_eq!(dev_theme_name("ana", "box", Some("  ")), "[DEV] ana@box");
    }

    #[test]
    fn only_session_created_themes_are_deleted_on_exit() {
        let theme = Theme {
            id: 9,
            name: "shared".into(),
            handle: "shared".into(),
            role: ThemeRole::Development,
            created_at: None,
            updated_at: None,
            theme_store_id: None,
        };
        let reused = DevTheme {
            theme: theme.clone(),
            created: false,
        };
        assert!(!reused.delete_on_exit());
        let fresh = DevTheme {
            theme,
            created: true,
        };
        assert!(fresh.delete_on_exit());
    }
}
