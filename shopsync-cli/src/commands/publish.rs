//! `shopsync publish --theme <name>`

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;

use shopsync_core::ThemeRole;

use super::Globals;

/// Arguments for `shopsync publish`.
#[derive(Args, Debug)]
pub struct PublishArgs {
    /// Theme to make the published one.
    #[arg(long)]
    pub theme: String,
}

impl PublishArgs {
    pub async fn run(self, globals: &Globals) -> Result<()> {
        let session = globals.session()?;
        let theme = session.theme(Some(self.theme.as_str())).await?;
        if theme.is_main() {
            println!("'{}' is already published", theme.handle);
            return Ok(());
        }
        session
            .client
            .update_theme(theme.id, None, Some(ThemeRole::Main))
            .await
            .with_context(|| format!("failed to publish '{}'", theme.handle))?;
        println!("{} published '{}'", "✓".green().bold(), theme.handle);
        Ok(())
    }
}
