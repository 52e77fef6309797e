use serde::{Deserialize, Serialize};

pub const IMAGE_EXTENSIONS: &[&str] = &[".gif", ".png", ".jpeg", ".jpg", ".webp", ".tiff", ".svg"];
pub const VIDEO_EXTENSIONS: &[&str] = &[".mp4", ".mkv", ".webm", ".ogv", ".mov", ".m4v"];
pub const AUDIO_EXTENSIONS: &[&str] = &[".mp3", ".m4a", ".wav", ".ogg"];
pub const PLAYLIST_EXTENSIONS: &[&str] = &[".asx", ".m3u8", ".m3u", ".pls", ".xspf"];

/// Which kinds of media a slideshow wants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    #[default]
    Any,
    Stills,
    Images,
    Animated,
    Videos,
}

impl std::str::FromStr for Category {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "any" => Ok(Category::Any),
            "stills" => Ok(Category::Stills),
            "images" => Ok(Category::Images),
            "animated" => Ok(Category::Animated),
            "videos" => Ok(Category::Videos),
            other => Err(format!("unknown filter category: {other}")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaKind {
    Image,
    Video,
    Audio,
    Playlist,
}

// strict: extension must end the URL; loose: it may appear anywhere (CDN query strings)
fn has_extension(url: &str, table: &[&str], strict: bool) -> bool {
    let lower = url.to_ascii_lowercase();
    table.iter().any(|ext| if strict { lower.ends_with(ext) } else { lower.contains(ext) })
}

pub fn is_image(url: &str, strict: bool) -> bool { has_extension(url, IMAGE_EXTENSIONS, strict) }
pub fn is_video(url: &str, strict: bool) -> bool { has_extension(url, VIDEO_EXTENSIONS, strict) }
pub fn is_audio(url: &str, strict: bool) -> bool { has_extension(url, AUDIO_EXTENSIONS, strict) }
pub fn is_playlist(url: &str, strict: bool) -> bool { has_extension(url, PLAYLIST_EXTENSIONS, strict) }

fn is_gif(url: &str, strict: bool) -> bool { has_extension(url, &[".gif"], strict) }

pub fn media_kind(url: &str, strict: bool) -> Option<MediaKind> {
    if is_video(url, strict) { return Some(MediaKind::Video); }
    if is_image(url, strict) { return Some(MediaKind::Image); }
    if is_audio(url, strict) { return Some(MediaKind::Audio); }
    if is_playlist(url, strict) { return Some(MediaKind::Playlist); }
    None
}

pub fn is_playable(category: Category, url: &str, strict: bool) -> bool {
    match category {
        Category::Any => is_image(url, strict) || is_video(url, strict),
        Category::Images => is_image(url, strict) && !is_video(url, strict),
        Category::Stills => is_image(url, strict) && !is_gif(url, strict) && !is_video(url, strict),
        Category::Animated => is_gif(url, strict) || is_video(url, strict),
        Category::Videos => is_video(url, strict),
    }
}

/// Keep only the URLs playable under `category`, preserving order.
pub fn filter(category: Category, urls: &[String], strict: bool) -> Vec<String> {
    urls.iter().filter(|u| is_playable(category, u, strict)).cloned().collect()
}
