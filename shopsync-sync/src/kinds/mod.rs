//! Per-kind reconciliation.
//!
//! | kind      | local layout                          | push |
//! |-----------|---------------------------------------|------|
//! | assets    | `theme/<key>`                         | yes  |
//! | menus     | `menus/<handle>.md`                   | no   |
//! | pages     | `pages/[drafts/]<handle>.{json,html}` | yes  |
//! | blogs     | `blogs/<blog>/[drafts/]<handle>.*`    | yes  |
//! | scripts   | `scripts.csv`                         | yes  |
//! | redirects | `redirects.csv`                       | yes  |

pub mod assets;
pub mod blogs;
pub mod documents;
pub mod menus;
pub mod pages;
pub mod tables;
