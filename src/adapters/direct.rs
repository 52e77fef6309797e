use async_trait::async_trait;
use quick_xml::events::{BytesStart, Event};
use quick_xml::reader::Reader;
use url::Url;

use super::list::read_text;
use super::{FetchContext, Page, SiteAdapter};
use crate::classify::SiteType;
use crate::error::{Result, ScrapeError};
use crate::types::{ContinuationToken, Cursor, LibrarySource};

/// A source that is itself a single media file.
pub struct DirectAdapter {
    site: SiteType,
}

impl DirectAdapter {
    pub const VIDEO: DirectAdapter = DirectAdapter { site: SiteType::Video };
    pub const AUDIO: DirectAdapter = DirectAdapter { site: SiteType::Audio };
}

#[async_trait]
impl SiteAdapter for DirectAdapter {
    fn site(&self) -> SiteType { self.site }

    // Audio never passes an image/video filter but is still playable.
    fn filtered(&self) -> bool { self.site != SiteType::Audio }

    async fn fetch_page(&self, _cx: &FetchContext<'_>, source: &LibrarySource, token: &mut ContinuationToken) -> Result<Page> {
        token.next = Cursor::Exhausted;
        Ok(Page::of(vec![source.url.trim().to_string()]))
    }
}

/// `.m3u`, `.m3u8`, `.pls`, `.asx` and `.xspf` playlists.
pub struct PlaylistAdapter;

fn playlist_entries(location: &str, text: &str) -> Result<Vec<String>> {
    let lower = location.to_ascii_lowercase();
    let raw = if lower.ends_with(".pls") {
        text.lines()
            .filter_map(|l| l.trim().split_once('='))
            .filter(|(k, _)| k.to_ascii_lowercase().starts_with("file"))
            .map(|(_, v)| v.trim().to_string())
            .collect()
    } else if lower.ends_with(".asx") || lower.ends_with(".xspf") {
        xml_entries(location, text)?
    } else {
        text.lines()
            .map(str::trim)
            .filter(|l| !l.is_empty() && !l.starts_with('#'))
            .map(str::to_string)
            .collect()
    };
    // Relative entries are relative to the playlist itself.
    let base = Url::parse(location).ok();
    Ok(raw
        .into_iter()
        .map(|e| match (&base, Url::parse(&e)) {
            (_, Ok(_)) => e,
            (Some(b), Err(_)) => b.join(&e).map(|u| u.to_string()).unwrap_or(e),
            (None, Err(_)) => e,
        })
        .collect())
}

fn href_of(e: &BytesStart<'_>) -> Option<String> {
    e.attributes()
        .flatten()
        .find(|a| a.key.local_name().as_ref().eq_ignore_ascii_case(b"href"))
        .and_then(|a| a.unescape_value().ok().map(|v| v.into_owned()))
}

// <ref href=".."/> entries (ASX) and <location>..</location> entries (XSPF).
fn xml_entries(location: &str, text: &str) -> Result<Vec<String>> {
    let mut reader = Reader::from_str(text);
    reader.config_mut().trim_text(true);
    let mut out = Vec::new();
    let mut in_location = false;
    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => {
                let name = e.local_name();
                if name.as_ref().eq_ignore_ascii_case(b"location") {
                    in_location = true;
                } else if name.as_ref().eq_ignore_ascii_case(b"ref") {
                    out.extend(href_of(&e));
                }
            }
            Ok(Event::Empty(e)) if e.local_name().as_ref().eq_ignore_ascii_case(b"ref") => out.extend(href_of(&e)),
            Ok(Event::Text(t)) if in_location => {
                let v = t.unescape().map_err(|e| ScrapeError::parse(location, e.to_string()))?;
                out.push(v.trim().to_string());
            }
            Ok(Event::End(_)) => in_location = false,
            Ok(Event::Eof) => break,
            Err(e) => return Err(ScrapeError::parse(location, e.to_string())),
            _ => {}
        }
    }
    Ok(out)
}

#[async_trait]
impl SiteAdapter for PlaylistAdapter {
    fn site(&self) -> SiteType { SiteType::Playlist }

    async fn fetch_page(&self, cx: &FetchContext<'_>, source: &LibrarySource, token: &mut ContinuationToken) -> Result<Page> {
        let location = source.url.trim();
        let text = read_text(cx, location).await?;
        let entries = playlist_entries(location, &text)?;
        token.next = Cursor::Exhausted;
        Ok(Page::of(entries))
    }
}
