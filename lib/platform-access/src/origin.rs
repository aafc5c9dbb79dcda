//! Front-end origin allow-list and post-login redirect targets.
//!
//! After the provider callback the browser is sent back to the front end
//! that started the login. That origin arrives through the untrusted OAuth
//! state, so it is only honoured when it is on the allow-list; otherwise the
//! default callback URL is used.

use url::Url;
use url::form_urlencoded;

/// Path on every front-end origin that receives the login result.
pub const CALLBACK_PATH: &str = "/auth/callback";

/// Default front-end callback when none is configured.
pub const DEFAULT_CALLBACK_URL: &str = "http://localhost:5173/auth/callback";

/// Reduces a URL to `scheme://host[:port]`.
///
/// Returns an empty string for anything that does not parse or has an
/// opaque origin (`mailto:`, `data:` and the like).
#[must_use]
pub fn normalize_origin(value: &str) -> String {
    let value = value.trim();
    if value.is_empty() {
        return String::new();
    }

    match Url::parse(value) {
        Ok(url) => {
            let origin = url.origin();
            if origin.is_tuple() {
                origin.ascii_serialization()
            } else {
                String::new()
            }
        }
        Err(_) => String::new(),
    }
}

/// Set of front-end origins allowed to receive login redirects.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OriginAllowList {
    origins: Vec<String>,
    default_callback_url: String,
}

impl OriginAllowList {
    /// Builds the allow-list from configured origins and the default callback.
    ///
    /// The default callback's origin is always allowed. Invalid entries are
    /// dropped and duplicates collapse, keeping first-seen order.
    #[must_use]
    pub fn new<I, S>(configured: I, default_callback_url: &str) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let default_callback_url = if default_callback_url.trim().is_empty() {
            DEFAULT_CALLBACK_URL.to_string()
        } else {
            default_callback_url.trim().to_string()
        };

        let mut origins: Vec<String> = Vec::new();
        let candidates = configured
            .into_iter()
            .map(|item| normalize_origin(item.as_ref()))
            .chain(std::iter::once(normalize_origin(&default_callback_url)));

        for origin in candidates {
            if !origin.is_empty() && !origins.contains(&origin) {
                origins.push(origin);
            }
        }

        Self {
            origins,
            default_callback_url,
        }
    }

    /// Builds the allow-list from a comma-separated configuration value.
    #[must_use]
    pub fn from_csv(configured: &str, default_callback_url: &str) -> Self {
        Self::new(configured.split(','), default_callback_url)
    }

    /// Returns the normalized allowed origins.
    #[must_use]
    pub fn origins(&self) -> &[String] {
        &self.origins
    }

    /// Returns true if the origin normalizes to an allowed entry.
    #[must_use]
    pub fn is_allowed(&self, origin: &str) -> bool {
        let normalized = normalize_origin(origin);
        !normalized.is_empty() && self.origins.contains(&normalized)
    }

    /// Resolves the front-end callback URL for a login started from `frontend_origin`.
    #[must_use]
    pub fn resolve_callback_url(&self, frontend_origin: Option<&str>) -> String {
        let normalized = frontend_origin.map(normalize_origin).unwrap_or_default();
        if !normalized.is_empty() && self.origins.contains(&normalized) {
            format!("{normalized}{CALLBACK_PATH}")
        } else {
            self.default_callback_url.clone()
        }
    }

    /// Builds the success redirect; the token travels in the fragment so
    /// proxies never log it.
    #[must_use]
    pub fn success_redirect(&self, token: &str, frontend_origin: Option<&str>) -> String {
        let fragment = form_urlencoded::Serializer::new(String::new())
            .append_pair("token", token)
            .finish();
        self.with_callback(frontend_origin, |url| url.set_fragment(Some(&fragment)))
    }

    /// Builds the failure redirect carrying a short message in `?error=`.
    #[must_use]
    pub fn error_redirect(&self, message: &str, frontend_origin: Option<&str>) -> String {
        self.with_callback(frontend_origin, |url| {
            url.set_fragment(None);
            url.query_pairs_mut().append_pair("error", message);
        })
    }

    fn with_callback(&self, frontend_origin: Option<&str>, edit: impl FnOnce(&mut Url)) -> String {
        let callback = self.resolve_callback_url(frontend_origin);
        match Url::parse(&callback) {
            Ok(mut url) => {
                edit(&mut url);
                url.to_string()
            }
            Err(error) => {
                tracing::warn!(%callback, %error, "front-end callback URL is not a valid URL");
                callback
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_strips_path_query_and_fragment() {
        assert_eq!(
            normalize_origin("https://kateglo.org/some/path?x=1#frag"),
            "https://kateglo.org"
        );
        assert_eq!(
            normalize_origin("http://localhost:5173/auth/callback"),
            "http://localhost:5173"
        );
    }

    #[test]
    fn normalize_drops_default_port() {
        assert_eq!(normalize_origin("https://kateglo.org:443/"), "https://kateglo.org");
        assert_eq!(normalize_origin("http://kateglo.org:8080/"), "http://kateglo.org:8080");
    }

    #[test]
    fn normalize_fails_soft() {
        assert_eq!(normalize_origin(""), "");
        assert_eq!(normalize_origin("not a url"), "");
        assert_eq!(normalize_origin("kateglo.org"), "");
        assert_eq!(normalize_origin("mailto:someone@kateglo.org"), "");
    }

    #[test]
    fn allow_list_dedups_and_includes_default() {
        let list = OriginAllowList::from_csv(
            "https://kateglo.org, https://kateglo.org/, bogus, https://admin.kateglo.org",
            "http://localhost:5173/auth/callback",
        );
        assert_eq!(
            list.origins(),
            &[
                "https://kateglo.org".to_string(),
                "https://admin.kateglo.org".to_string(),
                "http://localhost:5173".to_string(),
            ]
        );
    }

    #[test]
    fn empty_default_falls_back_to_localhost() {
        let list = OriginAllowList::from_csv("", "");
        assert_eq!(list.resolve_callback_url(None), DEFAULT_CALLBACK_URL);
        assert!(list.is_allowed("http://localhost:5173"));
    }

    #[test]
    fn resolve_callback_honours_only_allowed_origins() {
        let list = OriginAllowList::from_csv("https://kateglo.org", DEFAULT_CALLBACK_URL);
        assert_eq!(
            list.resolve_callback_url(Some("https://kateglo.org/kamus")),
            "https://kateglo.org/auth/callback"
        );
        assert_eq!(
            list.resolve_callback_url(Some("https://evil.example")),
            DEFAULT_CALLBACK_URL
        );
        assert_eq!(list.resolve_callback_url(Some("")), DEFAULT_CALLBACK_URL);
        assert_eq!(list.resolve_callback_url(None), DEFAULT_CALLBACK_URL);
    }

    #[test]
    fn success_redirect_puts_token_in_fragment() {
        let list = OriginAllowList::from_csv("https://kateglo.org", DEFAULT_CALLBACK_URL);
        let redirect = list.success_redirect("abc.def.ghi", Some("https://kateglo.org"));
        assert_eq!(redirect, "https://kateglo.org/auth/callback#token=abc.def.ghi");
        assert!(!redirect.contains('?'));
    }

    #[test]
    fn error_redirect_puts_message_in_query() {
        let list = OriginAllowList::from_csv("", DEFAULT_CALLBACK_URL);
        let redirect = list.error_redirect("Login Google dibatalkan", None);
        let url = Url::parse(&redirect).expect("valid url");
        assert_eq!(url.path(), CALLBACK_PATH);
        assert!(url.fragment().is_none());
        let error = url
            .query_pairs()
            .find(|(key, _)| key == "error")
            .map(|(_, value)| value.into_owned());
        assert_eq!(error.as_deref(), Some("Login Google dibatalkan"));
    }
}
