use crate::error::SetupError;
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use std::path::{Path, PathBuf};
use tokio::sync::mpsc;

/// A single modified path reported by the filesystem.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeEvent {
    pub path: PathBuf,
}

impl ChangeEvent {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

/// Keeps the OS watcher alive. Dropping it stops watching and closes the
/// event stream.
pub struct WatchHandle {
    _watcher: RecommendedWatcher,
}

const CHANNEL_CAPACITY: usize = 256;

/// Start watching `root` (non-recursively).
///
/// notify delivers events on its own thread; they are flattened into one
/// `ChangeEvent` per path and forwarded into a tokio channel in arrival order.
pub fn watch(root: &Path) -> Result<(WatchHandle, mpsc::Receiver<ChangeEvent>), SetupError> {
    let unwatchable = |e: notify::Error| SetupError::Unwatchable {
        path: root.to_path_buf(),
        source: e,
    };

    let (tx, rx) = mpsc::channel::<ChangeEvent>(CHANNEL_CAPACITY);
    let mut watcher = notify::recommended_watcher(move |res: notify::Result<Event>| match res {
        Ok(event) => {
            for change in to_change_events(event) {
                // Receiver gone means the supervisor is shutting down.
                if tx.blocking_send(change).is_err() {
                    return;
                }
            }
        }
        Err(err) => {
            tracing::warn!(error = %err, "watch error");
        }
    })
    .map_err(unwatchable)?;
    watcher
        .watch(root, RecursiveMode::NonRecursive)
        .map_err(unwatchable)?;

    tracing::debug!(root = %root.display(), "watching");
    Ok((WatchHandle { _watcher: watcher }, rx))
}

/// Flatten a notify event into change events, dropping kinds that do not
/// represent a modification. `Any` is what some backends report when they
/// cannot tell what changed, so it counts.
fn to_change_events(event: Event) -> Vec<ChangeEvent> {
    match event.kind {
        EventKind::Create(_) | EventKind::Modify(_) | EventKind::Remove(_) | EventKind::Any => {
            event.paths.into_iter().map(ChangeEvent::new).collect()
        }
        EventKind::Access(_) | EventKind::Other => Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use notify::event::{AccessKind, CreateKind, ModifyKind, RemoveKind};
    use std::time::Duration;

    #[test]
    fn test_modify_event_yields_each_path() {
        let event = Event::new(EventKind::Modify(ModifyKind::Any))
            .add_path(PathBuf::from("/a/one"))
            .add_path(PathBuf::from("/a/two"));
        assert_eq!(
            to_change_events(event),
            vec![ChangeEvent::new("/a/one"), ChangeEvent::new("/a/two")]
        );
    }

    #[test]
    fn test_create_and_remove_are_changes() {
        let created = Event::new(EventKind::Create(CreateKind::File)).add_path("/a/x".into());
        let removed = Event::new(EventKind::Remove(RemoveKind::File)).add_path("/a/x".into());
        assert_eq!(to_change_events(created).len(), 1);
        assert_eq!(to_change_events(removed).len(), 1);
    }

    #[test]
    fn test_unclassified_change_counts() {
        let event = Event::new(EventKind::Any).add_path("/a/x".into());
        assert_eq!(to_change_events(event), vec![ChangeEvent::new("/a/x")]);
    }

    #[test]
    fn test_access_is_ignored() {
        let event = Event::new(EventKind::Access(AccessKind::Any)).add_path("/a/x".into());
        assert!(to_change_events(event).is_empty());
    }

    #[test]
    fn test_unwatchable_path_is_setup_error() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("gone");
        let err = watch(&missing).err().unwrap();
        assert!(matches!(err, SetupError::Unwatchable { .. }));
    }

    #[tokio::test]
    async fn test_write_in_watched_dir_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().canonicalize().unwrap();
        let (_handle, mut rx) = watch(&root).unwrap();

        let file = root.join("touched");
        std::fs::write(&file, b"hello").unwrap();

        let event = tokio::time::timeout(Duration::from_secs(5), async {
            loop {
                match rx.recv().await {
                    Some(e) if e.path == file => return Some(e),
                    Some(_) => continue,
                    None => return None,
                }
            }
        })
        .await
        .unwrap();
        assert_eq!(event, Some(ChangeEvent::new(file)));
    }
}
