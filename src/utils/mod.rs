use std::sync::LazyLock;

use regex::Regex;
use url::Url;

/// Marker that distinguishes the audio side-car from the primary file.
pub const AUDIO_MARKER: &str = "_audio";

/// Marker for encoder output that has not been committed yet.
pub const TEMP_MARKER: &str = "_out";

static QUALITY_PREFIX_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*(\d+)").expect("static regex"));

/// Sanitize filename to remove invalid characters
pub fn sanitize_filename(filename: &str) -> String {
    filename
        .chars()
        .map(|c| match c {
            '<' | '>' | ':' | '"' | '/' | '\\' | '|' | '?' | '*' => '_',
            c if c.is_control() => '_',
            _ => c,
        })
        .collect::<String>()
        .trim()
        .trim_matches(|c| c == '.' || c == ' ')
        .to_string()
}

/// Numeric prefix of a provider quality label ("720p" -> 720, "128kbps" -> 128).
pub fn parse_quality_label(label: &str) -> Option<u32> {
    QUALITY_PREFIX_RE
        .captures(label)
        .and_then(|caps| caps[1].parse().ok())
}

/// Splits "name.ext" into ("name", Some("ext")). Dotfiles and names without a
/// dot have no extension.
pub fn split_extension(filename: &str) -> (&str, Option<&str>) {
    match filename.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() && !ext.is_empty() => (stem, Some(ext)),
        _ => (filename, None),
    }
}

fn join_extension(stem: &str, ext: Option<&str>) -> String {
    match ext {
        Some(ext) => format!("{}.{}", stem, ext),
        None => stem.to_string(),
    }
}

/// "Song.mp4" -> "Song_audio.mp4"
pub fn audio_sidecar_name(default_filename: &str) -> String {
    let (stem, ext) = split_extension(default_filename);
    join_extension(&format!("{}{}", stem, AUDIO_MARKER), ext)
}

/// Inverse of [`audio_sidecar_name`]: "Song_audio.mp4" -> "Song.mp4".
pub fn strip_audio_marker(sidecar: &str) -> Option<String> {
    let (stem, ext) = split_extension(sidecar);
    stem.strip_suffix(AUDIO_MARKER)
        .map(|original| join_extension(original, ext))
}

/// Name the encoder writes to before the result is committed.
pub fn temp_output_name(filename: &str, extension: Option<&str>) -> String {
    let (stem, _) = split_extension(filename);
    join_extension(&format!("{}{}", stem, TEMP_MARKER), extension)
}

/// Final name of a converted side-car: marker and old extension replaced.
pub fn converted_audio_name(sidecar: &str, target_extension: &str) -> String {
    let original = strip_audio_marker(sidecar).unwrap_or_else(|| sidecar.to_string());
    let (stem, _) = split_extension(&original);
    join_extension(stem, Some(target_extension))
}

/// Accepts absolute http(s) links only.
pub fn parse_link(input: &str) -> Option<Url> {
    let url = Url::parse(input.trim()).ok()?;
    match url.scheme() {
        "http" | "https" if url.host_str().is_some() => Some(url),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_filename() {
        assert_eq!(sanitize_filename("test/file.mp3"), "test_file.mp3");
        assert_eq!(sanitize_filename("normal-name.mp3"), "normal-name.mp3");
        assert_eq!(sanitize_filename("  Title: Part 2. "), "Title_ Part 2");
    }

    #[test]
    fn test_parse_quality_label() {
        assert_eq!(parse_quality_label("720p"), Some(720));
        assert_eq!(parse_quality_label("1080p60"), Some(1080));
        assert_eq!(parse_quality_label("128kbps"), Some(128));
        assert_eq!(parse_quality_label("48k"), Some(48));
        assert_eq!(parse_quality_label("audio only"), None);
        assert_eq!(parse_quality_label(""), None);
    }

    #[test]
    fn test_split_extension() {
        assert_eq!(split_extension("a.mp4"), ("a", Some("mp4")));
        assert_eq!(split_extension("a.b.webm"), ("a.b", Some("webm")));
        assert_eq!(split_extension("plain"), ("plain", None));
        assert_eq!(split_extension(".hidden"), (".hidden", None));
    }

    #[test]
    fn test_sidecar_name() {
        assert_eq!(audio_sidecar_name("Song.mp4"), "Song_audio.mp4");
        assert_eq!(audio_sidecar_name("Live v1.2.m4a"), "Live v1.2_audio.m4a");
        assert_eq!(audio_sidecar_name("noext"), "noext_audio");
    }

    #[test]
    fn test_sidecar_marker_is_invertible() {
        for name in ["Song.mp4", "Live v1.2.m4a", "noext", "x_audio.webm"] {
            let sidecar = audio_sidecar_name(name);
            assert_eq!(strip_audio_marker(&sidecar).as_deref(), Some(name));
        }
        assert_eq!(strip_audio_marker("Song.mp4"), None);
    }

    #[test]
    fn test_temp_output_name() {
        assert_eq!(temp_output_name("Clip.mp4", Some("mp4")), "Clip_out.mp4");
        assert_eq!(
            temp_output_name("Clip_audio.m4a", Some("mp3")),
            "Clip_audio_out.mp3"
        );
    }

    #[test]
    fn test_converted_audio_name() {
        assert_eq!(converted_audio_name("Clip_audio.m4a", "mp3"), "Clip.mp3");
        assert_eq!(converted_audio_name("Clip.m4a", "mp3"), "Clip.mp3");
        assert_eq!(converted_audio_name("Clip_audio", "mp3"), "Clip.mp3");
    }

    #[test]
    fn test_parse_link() {
        assert!(parse_link("https://www.youtube.com/watch?v=abc").is_some());
        assert!(parse_link("  https://youtu.be/abc  ").is_some());
        assert!(parse_link("ftp://example.com/a").is_none());
        assert!(parse_link("not a link").is_none());
    }
}
