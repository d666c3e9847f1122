//! `shopsync list`: themes, or the remote records of one kind.

use std::str::FromStr;

use anyhow::{Context, Result};
use clap::Args;
use tabled::{settings::Style, Table, Tabled};

use shopsync_core::Theme;
use shopsync_sync::{pipeline, ResourceKind};

use super::{Globals, Session};

/// What `list` prints.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListTarget {
    Themes,
    Kind(ResourceKind),
}

impl FromStr for ListTarget {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        if s.trim().eq_ignore_ascii_case("themes") {
            return Ok(Self::Themes);
        }
        s.parse().map(Self::Kind)
    }
}

/// Arguments for `shopsync list`.
#[derive(Args, Debug)]
pub struct ListArgs {
    /// themes, assets, pages, blogs, menus, scripts or redirects. Without it,
    /// themes are listed, or every kind when `--theme` is given.
    pub what: Option<ListTarget>,

    /// Theme whose assets are listed (defaults to the published theme).
    #[arg(long)]
    pub theme: Option<String>,
}

#[derive(Tabled)]
struct ThemeRow {
    #[tabled(rename = "theme")]
    handle: String,
    #[tabled(rename = "name")]
    name: String,
    #[tabled(rename = "id")]
    id: u64,
    #[tabled(rename = "role")]
    role: String,
}

impl From<Theme> for ThemeRow {
    fn from(theme: Theme) -> Self {
        let handle = if theme.is_main() {
            format!("{} (ACTIVE)", theme.handle)
        } else {
            theme.handle.clone()
        };
        Self {
            handle,
            name: theme.name,
            id: theme.id,
            role: theme.role.to_string(),
        }
    }
}

impl ListArgs {
    pub async fn run(self, globals: &Globals) -> Result<()> {
        let session = globals.session()?;
        let kinds = match self.what {
            Some(ListTarget::Themes) => return print_themes(&session).await,
            None if self.theme.is_none() => return print_themes(&session).await,
            Some(ListTarget::Kind(kind)) => vec![kind],
            None => ResourceKind::ALL.to_vec(),
        };

        let theme = if kinds.contains(&ResourceKind::Assets) {
            Some(session.theme(self.theme.as_deref()).await?)
        } else {
            None
        };
        for kind in kinds {
            let lines = pipeline::list(&session.client, theme.as_ref(), kind)
                .await
                .with_context(|| format!("failed to list {kind}"))?;
            for line in lines {
                println!("{line}");
            }
        }
        Ok(())
    }
}

async fn print_themes(session: &Session) -> Result<()> {
    let themes = session
        .client
        .list_themes()
        .await
        .context("failed to list themes")?;
    if themes.is_empty() {
        println!("No themes found.");
        return Ok(());
    }
    let rows: Vec<ThemeRow> = themes.into_iter().map(ThemeRow::from).collect();
    let mut table = Table::new(rows);
    table.with(Style::rounded());
    println!("{table}");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn list_targets_parse_themes_and_kinds() {
        assert_eq!("themes".parse::<ListTarget>(), Ok(ListTarget::Themes));
        assert_eq!(
            "Redirects".parse::<ListTarget>(),
            Ok(ListTarget::Kind(ResourceKind::Redirects))
        );
        assert!("products".parse::<ListTarget>().is_err());
    }
}
