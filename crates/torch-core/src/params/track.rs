//! Track URL normalisation.

const DROPBOX_HOST: &str = "dropbox.com/s/";
const DROPBOX_SHARE_SUFFIX: &str = "?dl=0";

/// Rewrite Dropbox share links (`dropbox.com/s/<path>?dl=0`, optionally
/// prefixed by `https`, `://` and `www.`) to their direct-download form.
/// Anything else is returned unchanged. Matching is case-insensitive.
pub fn track_source(track: &str) -> String {
    let lower = track.to_ascii_lowercase();
    let mut rest = lower.as_str();
    for prefix in ["https", "://", "www."] {
        rest = rest.strip_prefix(prefix).unwrap_or(rest);
    }
    let Some(after_host) = rest.strip_prefix(DROPBOX_HOST) else {
        return track.to_string();
    };
    if !after_host.ends_with(DROPBOX_SHARE_SUFFIX) {
        return track.to_string();
    }
    // Slice the original (case-preserved) path out by length.
    let path_start = track.len() - after_host.len();
    let path_end = track.len() - DROPBOX_SHARE_SUFFIX.len();
    format!(
        "https://dl.dropboxusercontent.com/s/{}?dl=1&raw=1",
        &track[path_start..path_end]
    )
}
