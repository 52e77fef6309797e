use std::collections::HashSet;

use crate::types::{UrlMap, WeightMode};

/// Path tail of a URL or file path, without query string or fragment.
///
/// Tails with no extension (files served by id, like `get_files/file?file_id=7`) keep
/// their query so distinct files stay distinct. Reddit video renditions are all named
/// `DASH_<res>.mp4`, so those keep their parent directory, which holds the video id.
pub fn file_name(url: &str) -> &str {
    let url = &url[..url.find('#').unwrap_or(url.len())];
    let query = url.find('?');
    let path = url[..query.unwrap_or(url.len())].trim_end_matches('/');
    let mut start = path.rfind(['/', '\\']).map_or(0, |i| i + 1);
    if start > 0 && path[start..].starts_with("DASH_") {
        start = path[..start - 1].rfind(['/', '\\']).map_or(0, |i| i + 1);
    }
    let tail = &path[start..];
    if query.is_some() && !tail.contains('.') { &url[start..] } else { tail }
}

/// Fold a page of URLs into a copy of `prior`. Duplicates are detected by file name.
///
/// By-source weighting appends into the bucket keyed by `source`; by-item weighting
/// makes every new URL its own bucket pointing back at `source`.
pub fn merge(prior: &UrlMap, urls: &[String], source: &str, weight: WeightMode) -> UrlMap {
    merge_counted(prior, urls, source, weight).0
}

/// Like [`merge`], also returning the URLs that were actually added.
pub fn merge_counted(prior: &UrlMap, urls: &[String], source: &str, weight: WeightMode) -> (UrlMap, Vec<String>) {
    let mut map = prior.clone();
    let mut added = Vec::new();
    match weight {
        WeightMode::Source => {
            let bucket = map.entry(source.to_string()).or_default();
            let mut seen: HashSet<String> = bucket.iter().map(|u| file_name(u).to_string()).collect();
            for url in urls {
                if seen.insert(file_name(url).to_string()) {
                    bucket.push(url.clone());
                    added.push(url.clone());
                }
            }
        }
        WeightMode::Item => {
            let mut seen: HashSet<String> = map.keys().map(|k| file_name(k).to_string()).collect();
            for url in urls {
                if seen.insert(file_name(url).to_string()) {
                    map.insert(url.clone(), vec![source.to_string()]);
                    added.push(url.clone());
                }
            }
        }
    }
    (map, added)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn v(items: &[&str]) -> Vec<String> { items.iter().map(|s| s.to_string()).collect() }

    #[test]
    fn file_name_strips_query_and_path() {
        assert_eq!(file_name("https://cdn.example/a/b/c.jpg?w=100#x"), "c.jpg");
        assert_eq!(file_name("C:\\pics\\d.png"), "d.png");
        assert_eq!(file_name("plain.gif"), "plain.gif");
        assert_eq!(file_name("http://h:1/get_files/file?file_id=7&ext=.jpg"), "file?file_id=7&ext=.jpg");
    }

    #[test]
    fn reddit_renditions_keep_their_video_id() {
        assert_eq!(file_name("https://v.redd.it/aaa/DASH_720.mp4"), "aaa/DASH_720.mp4");
        let merged = merge(
            &UrlMap::new(),
            &v(&["https://v.redd.it/aaa/DASH_720.mp4", "https://v.redd.it/bbb/DASH_720.mp4", "https://v.redd.it/aaa/DASH_720.mp4"]),
            "src1",
            WeightMode::Source,
        );
        assert_eq!(merged["src1"].len(), 2);
    }

    #[test]
    fn by_source_skips_known_files() {
        let mut prior = UrlMap::new();
        prior.insert("src1".into(), v(&["a.jpg"]));
        let merged = merge(&prior, &v(&["a.jpg", "b.jpg"]), "src1", WeightMode::Source);
        assert_eq!(merged["src1"], v(&["a.jpg", "b.jpg"]));
        assert_eq!(prior["src1"], v(&["a.jpg"]), "prior map must not change");
    }

    #[test]
    fn by_source_dedups_across_hosts() {
        let merged = merge(&UrlMap::new(), &v(&["https://a/x.jpg?1", "https://b/x.jpg"]), "s", WeightMode::Source);
        assert_eq!(merged["s"], v(&["https://a/x.jpg?1"]));
    }

    #[test]
    fn by_item_uses_media_urls_as_keys() {
        let mut prior = UrlMap::new();
        prior.insert("https://h/a.jpg".into(), v(&["other"]));
        let merged = merge(&prior, &v(&["https://z/a.jpg", "https://h/b.jpg"]), "src", WeightMode::Item);
        assert_eq!(merged.len(), 2);
        assert_eq!(merged["https://h/b.jpg"], v(&["src"]));
        assert!(!merged.contains_key("https://z/a.jpg"));
    }

    #[test]
    fn merging_twice_is_idempotent() {
        let page = v(&["a.jpg", "b.webm", "a.jpg"]);
        for mode in [WeightMode::Source, WeightMode::Item] {
            let once = merge(&UrlMap::new(), &page, "src", mode);
            let twice = merge(&once, &page, "src", mode);
            assert_eq!(once, twice);
        }
    }

    #[test]
    fn counted_merge_reports_additions() {
        let (_, added) = merge_counted(&UrlMap::new(), &v(&["a.jpg", "a.jpg", "b.jpg"]), "s", WeightMode::Source);
        assert_eq!(added, v(&["a.jpg", "b.jpg"]));
    }
}
