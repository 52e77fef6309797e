use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::filter::{is_audio, is_playlist, is_video};

/// Site family a source URL belongs to. Derived from the URL on demand, never stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SiteType {
    List,
    Local,
    Video,
    Audio,
    Playlist,
    Tumblr,
    Reddit,
    ImageFap,
    Imgur,
    Twitter,
    Instagram,
    Danbooru,
    Gelbooru2,
    E621,
    Gelbooru1,
    EHentai,
    Bdsmlr,
    Hydrus,
    Luscious,
    Piwigo,
    RedGifs,
}

impl SiteType {
    /// Every site type, in the order [`classify`] tries them.
    pub const ALL: [SiteType; 21] = [
        SiteType::Audio, SiteType::Video, SiteType::Playlist,
        SiteType::Tumblr, SiteType::Reddit, SiteType::ImageFap, SiteType::Imgur, SiteType::Twitter,
        SiteType::Instagram, SiteType::Danbooru, SiteType::Gelbooru2, SiteType::E621, SiteType::Gelbooru1,
        SiteType::EHentai, SiteType::Bdsmlr, SiteType::Hydrus, SiteType::Luscious, SiteType::Piwigo,
        SiteType::RedGifs, SiteType::List, SiteType::Local,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            SiteType::List => "list",
            SiteType::Local => "local",
            SiteType::Video => "video",
            SiteType::Audio => "audio",
            SiteType::Playlist => "playlist",
            SiteType::Tumblr => "tumblr",
            SiteType::Reddit => "reddit",
            SiteType::ImageFap => "imagefap",
            SiteType::Imgur => "imgur",
            SiteType::Twitter => "twitter",
            SiteType::Instagram => "instagram",
            SiteType::Danbooru => "danbooru",
            SiteType::Gelbooru2 => "gelbooru2",
            SiteType::E621 => "e621",
            SiteType::Gelbooru1 => "gelbooru1",
            SiteType::EHentai => "ehentai",
            SiteType::Bdsmlr => "bdsmlr",
            SiteType::Hydrus => "hydrus",
            SiteType::Luscious => "luscious",
            SiteType::Piwigo => "piwigo",
            SiteType::RedGifs => "redgifs",
        }
    }
}

impl std::fmt::Display for SiteType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result { f.write_str(self.name()) }
}

fn re(pattern: &str) -> Regex {
    Regex::new(pattern).unwrap_or_else(|e| panic!("bad site pattern {pattern}: {e}"))
}

// Order matters: furry.booru.org must hit gelbooru2 before the *.booru.org catch-all.
static SITE_PATTERNS: Lazy<Vec<(SiteType, Regex)>> = Lazy::new(|| {
    vec![
        (SiteType::Tumblr, re(r"^https?://([^.]*|(66\.media))\.tumblr\.com")),
        (SiteType::Reddit, re(r"^https?://(www\.|old\.)?reddit\.com/")),
        (SiteType::ImageFap, re(r"^https?://(www\.)?imagefap\.com/")),
        (SiteType::Imgur, re(r"^https?://(www\.|m\.)?imgur\.com/")),
        (SiteType::Twitter, re(r"^https?://(www\.|mobile\.)?(twitter|x)\.com/")),
        (SiteType::Instagram, re(r"^https?://(www\.)?instagram\.com/")),
        (SiteType::Danbooru, re(r"^https?://(www\.)?(lolibooru\.moe|hypnohub\.net|danbooru\.donmai\.us)/")),
        (SiteType::Gelbooru2, re(r"^https?://(www\.)?(gelbooru\.com|furry\.booru\.org|rule34\.xxx|realbooru\.com)/")),
        (SiteType::E621, re(r"^https?://(www\.)?e621\.net/")),
        (SiteType::Gelbooru1, re(r"^https?://(www\.)?([^/]*\.booru\.org|idol\.sankakucomplex\.com)/")),
        (SiteType::EHentai, re(r"^https?://(www\.)?e-hentai\.org/g/")),
        (SiteType::Bdsmlr, re(r"^https?://[^.]*\.bdsmlr\.com")),
        (SiteType::Hydrus, re(r"^https?://[\w.]+:\d+/get_files/search_files")),
        (SiteType::Luscious, re(r"^https?://(www\.)?(members\.)?luscious\.net/")),
        (SiteType::Piwigo, re(r"^https?://[^/]*/(piwigo/)?(picture|index)\.php")),
        (SiteType::RedGifs, re(r"^https?://(www\.|v3\.)?redgifs\.com/")),
    ]
});

static LIST_PATTERN: Lazy<Regex> = Lazy::new(|| re(r"(^https?://)|(\.txt$)"));

/// Map a source URL onto its site family. First match wins.
pub fn classify(url: &str) -> SiteType {
    let url = url.trim();
    if is_audio(url, true) { return SiteType::Audio; }
    if is_video(url, true) { return SiteType::Video; }
    if is_playlist(url, true) { return SiteType::Playlist; }
    if let Some((site, _)) = SITE_PATTERNS.iter().find(|(_, pattern)| pattern.is_match(url)) {
        return *site;
    }
    if LIST_PATTERN.is_match(url) { SiteType::List } else { SiteType::Local }
}
