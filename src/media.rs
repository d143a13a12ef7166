use url::Url;

use crate::db::models::MediaType;

/// Classify an uploaded file. The browser-supplied content type wins;
/// the file name is the fallback.
pub fn from_upload(content_type: Option<&str>, file_name: &str) -> MediaType {
    let mime = match content_type {
        Some(ct) => ct.to_string(),
        None => mime_guess::from_path(file_name)
            .first_or_octet_stream()
            .to_string(),
    };
    if mime.starts_with("video/") {
        MediaType::Video
    } else {
        MediaType::Image
    }
}

/// Classify an external media URL: youtube hosts, then video file
/// extensions, then image.
pub fn from_url(media_url: &str) -> MediaType {
    if is_youtube(media_url) {
        return MediaType::Youtube;
    }
    let lower = media_url.to_ascii_lowercase();
    if [".mp4", ".webm", ".ogg"]
        .iter()
        .any(|ext| lower.ends_with(ext))
    {
        MediaType::Video
    } else {
        MediaType::Image
    }
}

fn is_youtube(media_url: &str) -> bool {
    let Ok(url) = Url::parse(media_url) else {
        return false;
    };
    let Some(host) = url.host_str() else {
        return false;
    };
    let host = host.strip_prefix("www.").unwrap_or(host);
    if host == "youtu.be" {
        return url.path().len() > 1;
    }
    if host == "youtube.com" || host.ends_with(".youtube.com") {
        return url.path() == "/watch" && url.query_pairs().any(|(k, _)| k == "v");
    }
    false
}

/// Strip anything that is not safe in a stored file name.
pub fn sanitize_file_name(name: &str) -> String {
    name.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '.' || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect()
}
