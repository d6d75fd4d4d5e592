//! URL to source-variant classification.
//!
//! Embed families are matched in a fixed order; anything else, malformed
//! URLs included, is treated as directly playable so a bad URL surfaces as a
//! media load error on the direct engine instead of disappearing.

use common::SourceVariant;
use once_cell::sync::Lazy;
use regex::Regex;

static EMBED_A: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(https?://)?(www\.)?(youtube\.com|youtu\.?be)/.+$")
        .expect("embed-a pattern is valid")
});

static EMBED_B: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(//)?(www\.)?(ok\.ru)/videoembed/.+$").expect("embed-b pattern is valid")
});

/// Classify a playlist URL. Pure and total.
pub fn classify(url: &str) -> SourceVariant {
    if EMBED_A.is_match(url) {
        SourceVariant::ExternalEmbedA
    } else if EMBED_B.is_match(url) {
        SourceVariant::ExternalEmbedB
    } else {
        SourceVariant::Direct
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_embed_a_urls() {
        for url in [
            "https://youtube.com/x",
            "https://www.youtube.com/embed/abc123",
            "http://youtu.be/abc",
            "youtube.com/watch?v=1",
        ] {
            assert_eq!(classify(url), SourceVariant::ExternalEmbedA, "{}", url);
        }
    }

    #[test]
    fn test_embed_b_urls() {
        for url in [
            "//ok.ru/videoembed/123",
            "ok.ru/videoembed/123",
            "www.ok.ru/videoembed/456",
        ] {
            assert_eq!(classify(url), SourceVariant::ExternalEmbedB, "{}", url);
        }
    }

    #[test]
    fn test_everything_else_is_direct() {
        for url in [
            "/video.mp4",
            "https://cdn.example.com/movie.webm",
            "",
            "not a url at all",
            "https://youtube.com/",
            // The second family is only recognised scheme-relative
            "https://ok.ru/videoembed/123",
            "ok.ru/video/123",
        ] {
            assert_eq!(classify(url), SourceVariant::Direct, "{:?}", url);
        }
    }

    #[test]
    fn test_classification_is_deterministic() {
        for url in ["https://youtube.com/x", "//ok.ru/videoembed/1", "/a.mp4", "::"] {
            assert_eq!(classify(url), classify(url));
        }
    }
}
