//! Pure projections of the raw download list.

use crate::store::types::Download;
use std::cmp::Ordering;
use std::collections::HashSet;

/// Order downloads by gid, newest-looking first. Gids compare byte-wise, so
/// the ordering never depends on locale.
pub fn compare_gid_desc(a: &Download, b: &Download) -> Ordering {
    b.gid.as_bytes().cmp(a.gid.as_bytes())
}

/// Sort `raw` by gid descending and, when `filter` is non-empty, keep only
/// downloads whose first file path contains it (case-insensitive). Downloads
/// without a path are dropped only while filtering.
pub fn derive_list(raw: &[Download], filter: &str) -> Vec<Download> {
    let needle = filter.to_lowercase();
    let mut list: Vec<Download> = raw
        .iter()
        .filter(|d| {
            needle.is_empty()
                || d.primary_path()
                    .is_some_and(|path| path.to_lowercase().contains(&needle))
        })
        .cloned()
        .collect();
    list.sort_by(compare_gid_desc);
    list
}

/// Members of `list` whose gid is selected, in list order.
pub fn derive_selected(list: &[Download], selection: &HashSet<String>) -> Vec<Download> {
    list.iter()
        .filter(|d| selection.contains(&d.gid))
        .cloned()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::types::DownloadStatus;

    fn download(gid: &str, path: &str) -> Download {
        Download::new(gid, DownloadStatus::Active).with_path(path)
    }

    fn gids(list: &[Download]) -> Vec<&str> {
        list.iter().map(|d| d.gid.as_str()).collect()
    }

    #[test]
    fn test_sorted_by_gid_descending() {
        let raw = vec![download("a2", "/x"), download("a1", "/y"), download("b1", "/z")];
        let list = derive_list(&raw, "");
        assert_eq!(gids(&list), vec!["b1", "a2", "a1"]);
    }

    #[test]
    fn test_empty_filter_keeps_everything() {
        let raw = vec![
            download("01", "/downloads/a.iso"),
            Download::new("02", DownloadStatus::Waiting),
            download("03", ""),
        ];
        assert_eq!(derive_list(&raw, "").len(), raw.len());
    }

    #[test]
    fn test_filter_is_case_insensitive_substring() {
        let raw = vec![
            download("01", "/downloads/Ubuntu-24.04.iso"),
            download("02", "/downloads/debian.iso"),
            download("03", "/downloads/ubuntu-server.iso"),
        ];
        let list = derive_list(&raw, "UBUNTU");
        assert_eq!(gids(&list), vec!["03", "01"]);
        for d in &list {
            assert!(d.primary_path().unwrap().to_lowercase().contains("ubuntu"));
        }
    }

    #[test]
    fn test_filter_drops_downloads_without_path() {
        let raw = vec![
            Download::new("01", DownloadStatus::Waiting),
            download("02", ""),
            download("03", "/downloads/a.iso"),
        ];
        assert_eq!(gids(&derive_list(&raw, "a")), vec!["03"]);
    }

    #[test]
    fn test_collation_is_bytewise() {
        let raw = vec![download("B", "/1"), download("a", "/2"), download("A", "/3")];
        assert_eq!(gids(&derive_list(&raw, "")), vec!["a", "B", "A"]);
    }

    #[test]
    fn test_selected_is_subset_of_list() {
        let raw = vec![
            download("01", "/downloads/keep.iso"),
            download("02", "/downloads/other.iso"),
        ];
        let list = derive_list(&raw, "keep");
        let selection: HashSet<String> = ["01", "02"].iter().map(|s| s.to_string()).collect();

        let selected = derive_selected(&list, &selection);
        assert_eq!(gids(&selected), vec!["01"]);
        assert!(selected.iter().all(|s| list.iter().any(|d| d.gid == s.gid)));
    }
}
