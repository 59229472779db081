//! Joining base directories and filenames into resolvable locations.

/// Appends `filename` to `dir`, inserting a `/` unless `dir` already ends
/// with one. An empty `dir` yields the bare filename.
///
/// Works the same for URLs and filesystem paths; nothing is normalized.
///
/// ```
/// use sheaf_storage::join_location;
///
/// assert_eq!(join_location("https://example.org/data", "a.tif"), "https://example.org/data/a.tif");
/// assert_eq!(join_location("https://example.org/data/", "a.tif"), "https://example.org/data/a.tif");
/// assert_eq!(join_location("", "a.tif"), "a.tif");
/// ```
pub fn join(dir: &str, filename: &str) -> String {
    if dir.is_empty() {
        return filename.to_string();
    }
    let mut location = String::with_capacity(dir.len() + filename.len() + 1);
    location.push_str(dir);
    if !dir.ends_with('/') {
        location.push('/');
    }
    location.push_str(filename);
    location
}

/// `true` for locations with an `http` or `https` scheme.
pub fn is_remote(location: &str) -> bool {
    let lower = location.get(..8).unwrap_or(location).to_ascii_lowercase();
    lower.starts_with("http://") || lower.starts_with("https://")
}
