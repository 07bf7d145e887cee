//! Source URL resolution.
//!
//! Turns an arbitrary URL into a stable `(kind, external_id)` pair before
//! any I/O happens. Pure: no network, no database, no side effects.

use crate::database::MediaKind;
use crate::error::AppError;
use regex::Regex;
use std::sync::OnceLock;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedSource {
    pub kind: MediaKind,
    pub external_id: String,
    /// Playlist/feed reference that hints at the owning channel, when the
    /// URL carries one.
    pub channel_hint: Option<String>,
}

fn video_patterns() -> &'static [Regex] {
    static PATTERNS: OnceLock<Vec<Regex>> = OnceLock::new();
    PATTERNS.get_or_init(|| {
        [
            r"(?:youtube\.com|youtube-nocookie\.com)/watch\?(?:[^#]*&)?v=([A-Za-z0-9_-]{6,})",
            r"youtu\.be/([A-Za-z0-9_-]{6,})",
            r"youtube\.com/shorts/([A-Za-z0-9_-]{6,})",
            r"youtube\.com/embed/([A-Za-z0-9_-]{6,})",
        ]
        .iter()
        .map(|p| Regex::new(p).expect("static pattern"))
        .collect()
    })
}

fn playlist_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"[?&]list=([A-Za-z0-9_-]+)").expect("static pattern"))
}

const AUDIO_EXTENSIONS: &[&str] = &[".mp3", ".m4a", ".ogg", ".wav"];

/// Resolve a raw URL to a media kind and stable external identifier.
///
/// Video URLs resolve to the platform video id; podcast URLs (direct audio
/// files or feed references) resolve to the normalized URL itself, with
/// query string and fragment stripped so re-adds of the same enclosure
/// dedupe.
pub fn resolve(url: &str) -> Result<ResolvedSource, AppError> {
    let trimmed = url.trim();
    if trimmed.is_empty() {
        return Err(AppError::Validation("empty url".into()));
    }
    if !trimmed.starts_with("http://") && !trimmed.starts_with("https://") {
        return Err(AppError::UnrecognizedSource(trimmed.to_string()));
    }

    for re in video_patterns() {
        if let Some(caps) = re.captures(trimmed) {
            let channel_hint = playlist_pattern()
                .captures(trimmed)
                .map(|c| c[1].to_string());
            return Ok(ResolvedSource {
                kind: MediaKind::Video,
                external_id: caps[1].to_string(),
                channel_hint,
            });
        }
    }

    // Podcast sources key on the URL itself, minus query and fragment.
    let bare = trimmed
        .split('#')
        .next()
        .unwrap_or(trimmed)
        .split('?')
        .next()
        .unwrap_or(trimmed);
    let path = bare.to_ascii_lowercase();

    if AUDIO_EXTENSIONS.iter().any(|ext| path.ends_with(ext)) {
        return Ok(ResolvedSource {
            kind: MediaKind::Podcast,
            external_id: bare.to_string(),
            channel_hint: None,
        });
    }
    if path.ends_with(".rss") || path.ends_with(".xml") || path.contains("/feed") {
        return Ok(ResolvedSource {
            kind: MediaKind::Podcast,
            external_id: bare.to_string(),
            channel_hint: Some(bare.to_string()),
        });
    }

    Err(AppError::UnrecognizedSource(trimmed.to_string()))
}
