//! Joining a configured backend base URL with endpoint paths.

/// Strip trailing slashes from a base URL.
///
/// # Examples
///
/// ```
/// use palaver::utils::url::normalize_base_url;
///
/// assert_eq!(normalize_base_url("http://localhost:8000/"), "http://localhost:8000");
/// assert_eq!(normalize_base_url("http://localhost:8000///"), "http://localhost:8000");
/// ```
pub fn normalize_base_url(base_url: &str) -> String {
    base_url.trim().trim_end_matches('/').to_string()
}

/// Append an endpoint path to a base URL with exactly one slash between them.
///
/// # Examples
///
/// ```
/// use palaver::utils::url::construct_api_url;
///
/// assert_eq!(
///     construct_api_url("http://localhost:8000/", "/api/chat"),
///     "http://localhost:8000/api/chat"
/// );
/// ```
pub fn construct_api_url(base_url: &str, endpoint: &str) -> String {
    let normalized_base = normalize_base_url(base_url);
    let endpoint = endpoint.trim().trim_start_matches('/');
    format!("{normalized_base}/{endpoint}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_base_url() {
        assert_eq!(
            normalize_base_url("https://chat.example.com"),
            "https://chat.example.com"
        );
        assert_eq!(
            normalize_base_url(" https://chat.example.com/backend/ "),
            "https://chat.example.com/backend"
        );
        assert_eq!(normalize_base_url(""), "");
        assert_eq!(normalize_base_url("///"), "");
    }

    #[test]
    fn test_construct_api_url() {
        assert_eq!(
            construct_api_url("http://localhost:8000", "api/chat"),
            "http://localhost:8000/api/chat"
        );
        assert_eq!(
            construct_api_url("http://localhost:8000//", "///api/health"),
            "http://localhost:8000/api/health"
        );
        assert_eq!(
            construct_api_url("https://chat.example.com/backend/", "/api/chat"),
            "https://chat.example.com/backend/api/chat"
        );
    }
}
