//! Site keys

use crate::config::BoosterConfig;
use std::fmt;
use url::Url;

/// Origin (scheme, host, port) that scopes the stored gain.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SiteKey(String);

impl SiteKey {
    /// Origin of `url`; a string that does not parse as a URL is used as-is
    pub fn from_url(url: &str) -> Self {
        match Url::parse(url) {
            Ok(parsed) => Self(parsed.origin().ascii_serialization()),
            Err(e) => {
                log::debug!("[Settings] Not a URL ({}): {:?}", e, url);
                Self(url.to_string())
            }
        }
    }

    /// Key for the active tab; tabs without a URL share the global key
    pub fn for_tab(url: Option<&str>, config: &BoosterConfig) -> Self {
        match url.filter(|u| !u.is_empty()) {
            Some(url) => Self::from_url(url),
            None => Self::global(config),
        }
    }

    pub fn global(config: &BoosterConfig) -> Self {
        Self(config.global_site_key.clone())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SiteKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
