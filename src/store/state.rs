use crate::store::types::{Download, GlobalStat, StoreEvent};
use crate::store::view::{derive_list, derive_selected};
use parking_lot::RwLock;
use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::broadcast;

const EVENT_CAPACITY: usize = 64;

#[derive(Debug, Default)]
struct StoreInner {
    raw: Vec<Download>,
    stat: GlobalStat,
    filter: String,
    selection: HashSet<String>,
    revision: u64,
}

/// Latest daemon snapshot plus the user's filter and selection.
///
/// Cloning shares the underlying state. Views are computed on every read so
/// they always reflect the current raw list, filter and selection together.
#[derive(Clone)]
pub struct DownloadStore {
    inner: Arc<RwLock<StoreInner>>,
    events: broadcast::Sender<StoreEvent>,
}

impl Default for DownloadStore {
    fn default() -> Self {
        Self::new()
    }
}

impl DownloadStore {
    pub fn new() -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            inner: Arc::new(RwLock::new(StoreInner::default())),
            events,
        }
    }

    /// Replace stats and the raw list wholesale. Selected gids that no longer
    /// exist are dropped.
    pub fn replace(&self, stat: GlobalStat, downloads: Vec<Download>) -> u64 {
        let (revision, count) = {
            let mut inner = self.inner.write();
            let present: HashSet<&str> = downloads.iter().map(|d| d.gid.as_str()).collect();
            inner.selection.retain(|gid| present.contains(gid.as_str()));
            inner.stat = stat;
            inner.raw = downloads;
            inner.revision += 1;
            (inner.revision, inner.raw.len())
        };

        self.publish(StoreEvent::Replaced {
            revision,
            downloads: count,
        });
        revision
    }

    /// Change the filter text. No event is sent when it is unchanged.
    pub fn set_filter(&self, filter: impl Into<String>) {
        let filter = filter.into();
        {
            let mut inner = self.inner.write();
            if inner.filter == filter {
                return;
            }
            inner.filter = filter.clone();
        }
        self.publish(StoreEvent::FilterChanged(filter));
    }

    /// Current filter text
    pub fn filter(&self) -> String {
        self.inner.read().filter.clone()
    }

    /// Add `gid` to the selection. Unknown gids are ignored.
    pub fn select(&self, gid: &str) {
        self.update_selection(|inner| {
            if inner.raw.iter().any(|d| d.gid == gid) {
                inner.selection.insert(gid.to_string());
            }
        });
    }

    /// Drop `gid` from the selection
    pub fn deselect(&self, gid: &str) {
        self.update_selection(|inner| {
            inner.selection.remove(gid);
        });
    }

    /// Flip `gid` in or out of the selection
    pub fn toggle(&self, gid: &str) {
        self.update_selection(|inner| {
            if !inner.selection.remove(gid) && inner.raw.iter().any(|d| d.gid == gid) {
                inner.selection.insert(gid.to_string());
            }
        });
    }

    /// Make `gid` the only selected download.
    pub fn select_only(&self, gid: &str) {
        self.update_selection(|inner| {
            inner.selection.clear();
            if inner.raw.iter().any(|d| d.gid == gid) {
                inner.selection.insert(gid.to_string());
            }
        });
    }

    /// Select every download the current filter lets through.
    pub fn select_all_visible(&self) {
        self.update_selection(|inner| {
            let visible = derive_list(&inner.raw, &inner.filter);
            inner.selection.extend(visible.into_iter().map(|d| d.gid));
        });
    }

    /// Empty the selection
    pub fn clear_selection(&self) {
        self.update_selection(|inner| inner.selection.clear());
    }

    /// Raw selection set, which may include gids hidden by the filter.
    pub fn selection(&self) -> HashSet<String> {
        self.inner.read().selection.clone()
    }

    /// Filtered list, gid descending
    pub fn download_list(&self) -> Vec<Download> {
        let inner = self.inner.read();
        derive_list(&inner.raw, &inner.filter)
    }

    /// Selected entries of [`download_list`](Self::download_list)
    pub fn selected_downloads(&self) -> Vec<Download> {
        let inner = self.inner.read();
        derive_selected(&derive_list(&inner.raw, &inner.filter), &inner.selection)
    }

    /// Stats from the last applied poll
    pub fn global_stat(&self) -> GlobalStat {
        self.inner.read().stat
    }

    /// Unfiltered list in the order the daemon returned it
    pub fn raw_downloads(&self) -> Vec<Download> {
        self.inner.read().raw.clone()
    }

    /// Raw download with `gid`, filtered out or not
    pub fn find(&self, gid: &str) -> Option<Download> {
        self.inner.read().raw.iter().find(|d| d.gid == gid).cloned()
    }

    /// Number of snapshots applied so far
    pub fn revision(&self) -> u64 {
        self.inner.read().revision
    }

    /// Receiver for store change events
    pub fn subscribe(&self) -> broadcast::Receiver<StoreEvent> {
        self.events.subscribe()
    }

    fn update_selection<F>(&self, apply: F)
    where
        F: FnOnce(&mut StoreInner),
    {
        let (changed, selected) = {
            let mut inner = self.inner.write();
            let before = inner.selection.clone();
            apply(&mut inner);
            (inner.selection != before, inner.selection.len())
        };

        if changed {
            self.publish(StoreEvent::SelectionChanged { selected });
        }
    }

    fn publish(&self, event: StoreEvent) {
        // No subscribers is fine
        let _ = self.events.send(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::types::DownloadStatus;

    fn download(gid: &str, path: &str) -> Download {
        Download::new(gid, DownloadStatus::Active).with_path(path)
    }

    fn seeded() -> DownloadStore {
        let store = DownloadStore::new();
        store.replace(
            GlobalStat::default(),
            vec![
                download("a2", "/downloads/alpha.iso"),
                download("a1", "/downloads/beta.iso"),
                download("b1", "/downloads/Alpha-2.iso"),
            ],
        );
        store
    }

    fn gids(list: &[Download]) -> Vec<String> {
        list.iter().map(|d| d.gid.clone()).collect()
    }

    #[test]
    fn test_list_is_sorted_view_of_raw() {
        let store = seeded();
        assert_eq!(gids(&store.download_list()), vec!["b1", "a2", "a1"]);
        assert_eq!(gids(&store.raw_downloads()), vec!["a2", "a1", "b1"]);
    }

    #[test]
    fn test_filter_applies_on_read() {
        let store = seeded();
        store.set_filter("alpha");
        assert_eq!(gids(&store.download_list()), vec!["b1", "a2"]);
        store.set_filter("");
        assert_eq!(store.download_list().len(), 3);
    }

    #[test]
    fn test_selection_intersects_view() {
        let store = seeded();
        store.select("a1");
        store.select("a2");
        store.set_filter("alpha");

        assert_eq!(gids(&store.selected_downloads()), vec!["a2"]);
        assert_eq!(store.selection().len(), 2);
    }

    #[test]
    fn test_select_unknown_gid_is_noop() {
        let store = seeded();
        store.select("ffff");
        store.toggle("eeee");
        assert!(store.selection().is_empty());
    }

    #[test]
    fn test_toggle_and_select_only() {
        let store = seeded();
        store.toggle("a1");
        store.toggle("b1");
        assert_eq!(store.selection().len(), 2);
        store.toggle("a1");
        assert!(!store.selection().contains("a1"));

        store.select_only("a2");
        assert_eq!(gids(&store.selected_downloads()), vec!["a2"]);

        store.deselect("a2");
        assert!(store.selected_downloads().is_empty());
    }

    #[test]
    fn test_select_all_visible_respects_filter() {
        let store = seeded();
        store.set_filter("beta");
        store.select_all_visible();
        store.set_filter("");
        assert_eq!(gids(&store.selected_downloads()), vec!["a1"]);

        store.clear_selection();
        assert!(store.selection().is_empty());
    }

    #[test]
    fn test_replace_prunes_stale_selection() {
        let store = seeded();
        store.select("a1");
        store.select("b1");

        store.replace(GlobalStat::default(), vec![download("b1", "/downloads/Alpha-2.iso")]);

        assert_eq!(store.selection().len(), 1);
        assert!(store.find("a1").is_none());
        assert_eq!(store.revision(), 2);
    }

    #[tokio::test]
    async fn test_events_are_published() {
        let store = DownloadStore::new();
        let mut events = store.subscribe();

        store.replace(
            GlobalStat {
                num_active: 1,
                ..Default::default()
            },
            vec![download("a1", "/x")],
        );
        store.select("a1");
        store.set_filter("x");
        store.set_filter("x");

        assert_eq!(
            events.recv().await.unwrap(),
            StoreEvent::Replaced {
                revision: 1,
                downloads: 1
            }
        );
        assert_eq!(
            events.recv().await.unwrap(),
            StoreEvent::SelectionChanged { selected: 1 }
        );
        assert_eq!(
            events.recv().await.unwrap(),
            StoreEvent::FilterChanged("x".into())
        );
        assert!(events.try_recv().is_err());
        assert_eq!(store.global_stat().num_active, 1);
    }
}
