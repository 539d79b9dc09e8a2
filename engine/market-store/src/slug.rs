//! URL-safe player names

/// Lowercase, spaces become `-`, anything outside `[a-z0-9-]` is dropped
pub fn slugify(name: &str) -> String {
    name.to_lowercase()
        .replace(' ', "-")
        .chars()
        .filter(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || *c == '-')
        .collect()
}
