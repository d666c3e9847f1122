use std::collections::{BTreeSet, HashMap};
use std::fs;
use std::future::Future;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::Duration;

use notify::{recommended_watcher, Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use sha2::{Digest, Sha256};
use tokio::sync::mpsc;
use tokio::time::{sleep_until, Instant};

use shopsync_api::AssetPayload;
use shopsync_core::Theme;
use shopsync_sync::index::relative_key;
use shopsync_sync::{pipeline, Action, BatchReport, ResourceKind, SyncContext, SyncError, THEME_DIR, THEME_DIRS};

use crate::error::{io_err, LiveError};

/// Quiet period after the last filesystem event before pending files are sent.
pub const DEBOUNCE_WINDOW: Duration = Duration::from_millis(100);

/// Collects changed keys; every new event pushes the deadline back.
#[derive(Debug)]
pub struct Debouncer {
    window: Duration,
    pending: BTreeSet<String>,
    deadline: Option<Instant>,
}

impl Debouncer {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            pending: BTreeSet::new(),
            deadline: None,
        }
    }

    pub fn note(&mut self, key: String, now: Instant) {
        self.pending.insert(key);
        self.deadline = Some(now + self.window);
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    pub fn is_due(&self, now: Instant) -> bool {
        self.deadline.is_some_and(|d| now >= d)
    }

    pub fn take(&mut self) -> BTreeSet<String> {
        self.deadline = None;
        std::mem::take(&mut self.pending)
    }
}

/// Last uploaded SHA-256 per theme key.
#[derive(Debug, Default)]
pub struct ContentIndex {
    hashes: HashMap<String, String>,
}

impl ContentIndex {
    pub fn sha256_hex(bytes: &[u8]) -> String {
        let mut h = Sha256::new();
        h.update(bytes);
        hex::encode(h.finalize())
    }

    /// Hash every listed key under `dir`.
    pub fn build(dir: &Path, keys: impl IntoIterator<Item = String>) -> Result<Self, LiveError> {
        let mut hashes = HashMap::new();
        for key in keys {
            let path = dir.join(&key);
            let bytes = fs::read(&path).map_err(|e| io_err(&path, e))?;
            hashes.insert(key, Self::sha256_hex(&bytes));
        }
        Ok(Self { hashes })
    }

    pub fn is_changed(&self, key: &str, hash: &str) -> bool {
        self.hashes.get(key).map(String::as_str) != Some(hash)
    }

    pub fn record(&mut self, key: String, hash: String) {
        self.hashes.insert(key, hash);
    }

    pub fn len(&self) -> usize {
        self.hashes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hashes.is_empty()
    }
}

fn is_theme_key(key: &str) -> bool {
    key.split('/')
        .next()
        .is_some_and(|top| THEME_DIRS.contains(&top))
        && key.contains('/')
}

/// A theme kept in step with the local tree.
#[derive(Debug)]
pub struct LiveSession<'a> {
    ctx: SyncContext<'a>,
    theme: Theme,
    dir: PathBuf,
    index: ContentIndex,
}

impl<'a> LiveSession<'a> {
    /// Push everything once, then remember what was sent.
    pub async fn start(ctx: &SyncContext<'a>, theme: &Theme) -> Result<(Self, BatchReport), LiveError> {
        let report = pipeline::push(ctx, Some(theme), &[ResourceKind::Assets]).await;
        let dir = ctx.root.join(THEME_DIR);
        let keys = ctx.index.list_files(&dir, &THEME_DIRS)?;
        let index = ContentIndex::build(&dir, keys)?;
        tracing::info!(theme = %theme.handle, files = index.len(), "initial push done");
        Ok((
            Self {
                ctx: ctx.clone(),
                theme: theme.clone(),
                dir,
                index,
            },
            report,
        ))
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Upload each pending key that is watched, not ignored, still present
    /// and different from what was last sent. Deletions are not propagated.
    pub async fn apply(&mut self, keys: BTreeSet<String>) -> BatchReport {
        let mut report = self.ctx.report();
        for key in keys {
            if !is_theme_key(&key) {
                continue;
            }
            match self.ctx.index.is_ignored(&self.dir, &key) {
                Ok(true) => {
                    tracing::debug!(key = %key, "ignored");
                    continue;
                }
                Ok(false) => {}
                Err(err) => {
                    report.record(Action::Update, key, Err(err));
                    continue;
                }
            }
            let path = self.dir.join(&key);
            let bytes = match fs::read(&path) {
                Ok(bytes) => bytes,
                Err(err) if err.kind() == ErrorKind::NotFound => {
                    tracing::debug!(key = %key, "vanished before upload");
                    continue;
                }
                Err(source) => {
                    report.record(Action::Update, key, Err(SyncError::Io { path, source }));
                    continue;
                }
            };
            let hash = ContentIndex::sha256_hex(&bytes);
            if !self.index.is_changed(&key, &hash) {
                continue;
            }
            let result = if self.ctx.options.dry_run {
                Ok(())
            } else {
                self.ctx
                    .client
                    .put_asset(self.theme.id, &key, &AssetPayload::from_bytes(bytes))
                    .await
                    .map(|_| ())
                    .map_err(SyncError::from)
            };
            if result.is_ok() {
                self.index.record(key.clone(), hash);
            }
            report.record(Action::Update, key, result);
        }
        report
    }
}

async fn wait_until(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}

fn is_relevant_event_kind(kind: &EventKind) -> bool {
    matches!(kind, EventKind::Create(_) | EventKind::Modify(_))
}

/// Push the theme, then watch `<root>/theme` and upload edits until
/// `shutdown` resolves. Every report (initial and per burst) goes to
/// `on_report`.
pub async fn run<F, R>(ctx: &SyncContext<'_>, theme: &Theme, shutdown: F, mut on_report: R) -> Result<(), LiveError>
where
    F: Future<Output = ()>,
    R: FnMut(&BatchReport),
{
    let (mut session, initial) = LiveSession::start(ctx, theme).await?;
    on_report(&initial);

    let dir = session.dir().to_path_buf();
    fs::create_dir_all(&dir).map_err(|e| io_err(&dir, e))?;
    // Events arrive with resolved paths (e.g. /private/var/... on macOS).
    let watch_root = fs::canonicalize(&dir).unwrap_or(dir);

    let (event_tx, mut event_rx) = mpsc::unbounded_channel::<notify::Result<Event>>();
    let mut watcher: RecommendedWatcher = recommended_watcher(move |event| {
        let _ = event_tx.send(event);
    })?;
    watcher.watch(&watch_root, RecursiveMode::Recursive)?;
    tracing::info!(dir = %watch_root.display(), theme = %theme.handle, "watching for changes");

    let mut debounce = Debouncer::new(DEBOUNCE_WINDOW);
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            _ = &mut shutdown => break,
            event = event_rx.recv() => {
                let Some(event) = event else { break };
                let event = match event {
                    Ok(event) => event,
                    Err(err) => {
                        tracing::warn!(error = %err, "watcher event error");
                        continue;
                    }
                };
                if !is_relevant_event_kind(&event.kind) {
                    continue;
                }
                for path in event.paths {
                    if let Some(key) = relative_key(&watch_root, &path) {
                        debounce.note(key, Instant::now());
                    }
                }
            }
            _ = wait_until(debounce.deadline()) => {
                let keys = debounce.take();
                let report = session.apply(keys).await;
                if !report.is_empty() {
                    on_report(&report);
                }
            }
        }
    }

    tracing::info!(theme = %theme.handle, "live sync stopped");
    Ok(())
}
