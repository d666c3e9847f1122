//! Resource kinds selectable per invocation.

use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ResourceKind {
    Assets,
    Menus,
    Pages,
    Blogs,
    Scripts,
    Redirects,
}

impl ResourceKind {
    pub const ALL: [ResourceKind; 6] = [
        ResourceKind::Assets,
        ResourceKind::Menus,
        ResourceKind::Pages,
        ResourceKind::Blogs,
        ResourceKind::Scripts,
        ResourceKind::Redirects,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ResourceKind::Assets => "assets",
            ResourceKind::Menus => "menus",
            ResourceKind::Pages => "pages",
            ResourceKind::Blogs => "blogs",
            ResourceKind::Scripts => "scripts",
            ResourceKind::Redirects => "redirects",
        }
    }

    /// Menus can only be pulled.
    pub fn supports_push(self) -> bool {
        self != ResourceKind::Menus
    }

    /// Redirects carry no timestamps, so they cannot be replayed at a time.
    pub fn supports_filter(self) -> bool {
        self != ResourceKind::Redirects
    }

    /// The explicit selection, or every kind when empty.
    pub fn or_all(kinds: &[ResourceKind]) -> Vec<ResourceKind> {
        if kinds.is_empty() {
            Self::ALL.to_vec()
        } else {
            let mut kinds = kinds.to_vec();
            kinds.sort();
            kinds.dedup();
            kinds
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ResourceKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|k| k.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| {
                let names: Vec<_> = Self::ALL.iter().map(|k| k.as_str()).collect();
                format!("unknown resource kind '{s}' (expected one of: {})", names.join(", "))
            })
    }
}
