//! Pure URL helpers for catalog artwork and trailers.

use crate::models::Video;

pub const IMAGE_BASE: &str = "https://image.tmdb.org/t/p";
pub const PLACEHOLDER_IMAGE: &str = "https://via.placeholder.com/500x750?text=No+Image";
const YOUTUBE_EMBED: &str = "https://www.youtube.com/embed";
const TRAILER_SITE: &str = "YouTube";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ImageSize {
    W92,
    W185,
    #[default]
    W500,
    W780,
    H632,
    Original,
}

impl ImageSize {
    pub fn as_str(&self) -> &'static str {
        match self {
            ImageSize::W92 => "w92",
            ImageSize::W185 => "w185",
            ImageSize::W500 => "w500",
            ImageSize::W780 => "w780",
            ImageSize::H632 => "h632",
            ImageSize::Original => "original",
        }
    }
}

/// Fully qualified artwork URL for an opaque path, or the placeholder when
/// the item has no artwork.
pub fn image_url(path: Option<&str>, size: ImageSize) -> String {
    match path {
        Some(p) if !p.is_empty() => format!("{IMAGE_BASE}/{}{p}", size.as_str()),
        _ => PLACEHOLDER_IMAGE.to_string(),
    }
}

/// Picks one embeddable video: a YouTube trailer, then a YouTube teaser, then
/// anything hosted on YouTube.
pub fn trailer_url(videos: &[Video]) -> Option<String> {
    let on_site = |v: &&Video| v.site.eq_ignore_ascii_case(TRAILER_SITE);

    videos
        .iter()
        .filter(on_site)
        .find(|v| v.kind == "Trailer")
        .or_else(|| videos.iter().filter(on_site).find(|v| v.kind == "Teaser"))
        .map(|v| format!("{YOUTUBE_EMBED}/{}?autoplay=1&mute=0", v.key))
        .or_else(|| {
            videos
                .iter()
                .find(on_site)
                .map(|v| format!("{YOUTUBE_EMBED}/{}", v.key))
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn video(key: &str, site: &str, kind: &str) -> Video {
        Video {
            key: key.to_string(),
            site: site.to_string(),
            kind: kind.to_string(),
            name: None,
        }
    }

    #[test]
    fn missing_path_uses_placeholder_for_every_size() {
        for size in [ImageSize::W92, ImageSize::W500, ImageSize::Original] {
            assert_eq!(image_url(None, size), PLACEHOLDER_IMAGE);
            assert_eq!(image_url(Some(""), size), PLACEHOLDER_IMAGE);
        }
    }

    #[test]
    fn image_url_is_deterministic() {
        let first = image_url(Some("/abc.jpg"), ImageSize::W500);
        assert_eq!(first, "https://image.tmdb.org/t/p/w500/abc.jpg");
        assert_eq!(image_url(Some("/abc.jpg"), ImageSize::W500), first);
        assert_eq!(
            image_url(Some("/b.jpg"), ImageSize::Original),
            "https://image.tmdb.org/t/p/original/b.jpg"
        );
    }

    #[test]
    fn no_videos_no_trailer() {
        assert_eq!(trailer_url(&[]), None);
        assert_eq!(trailer_url(&[video("v1", "Vimeo", "Trailer")]), None);
    }

    #[test]
    fn trailer_beats_teaser_regardless_of_order() {
        let videos = [
            video("teaser", "YouTube", "Teaser"),
            video("trailer", "YouTube", "Trailer"),
        ];
        assert_eq!(
            trailer_url(&videos).as_deref(),
            Some("https://www.youtube.com/embed/trailer?autoplay=1&mute=0")
        );
    }

    #[test]
    fn falls_back_to_teaser_then_any_youtube_clip() {
        let teaser = [
            video("clip", "YouTube", "Clip"),
            video("teaser", "youtube", "Teaser"),
        ];
        assert_eq!(
            trailer_url(&teaser).as_deref(),
            Some("https://www.youtube.com/embed/teaser?autoplay=1&mute=0")
        );

        let clips = [
            video("other", "Vimeo", "Trailer"),
            video("clip", "YouTube", "Featurette"),
        ];
        assert_eq!(
            trailer_url(&clips).as_deref(),
            Some("https://www.youtube.com/embed/clip")
        );
    }
}
