use url::Url;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DomainFilterPolicy {
    whitelist: Option<Vec<String>>,
    blacklist: Option<Vec<String>>,
}

impl DomainFilterPolicy {
    pub fn new(whitelist: Option<Vec<String>>, blacklist: Option<Vec<String>>) -> Self {
        Self {
            whitelist: normalize_list(whitelist),
            blacklist: normalize_list(blacklist),
        }
    }

    pub fn allow_all() -> Self {
        Self::default()
    }

    pub fn whitelist(&self) -> Option<&[String]> {
        self.whitelist.as_deref()
    }

    pub fn blacklist(&self) -> Option<&[String]> {
        self.blacklist.as_deref()
    }

    pub fn is_active(&self) -> bool {
        self.whitelist.is_some() || self.blacklist.is_some()
    }

    pub fn is_allowed(&self, url: &str) -> bool {
        is_allowed(url, self.whitelist(), self.blacklist())
    }
}

// Social and marketplace hosts whose images rarely show the product itself.
pub const RECOMMENDED_BLACKLIST: [&str; 6] = [
    "pinterest.com",
    "facebook.com",
    "instagram.com",
    "aliexpress.com",
    "temu.com",
    "wish.com",
];

fn normalize_list(list: Option<Vec<String>>) -> Option<Vec<String>> {
    let entries: Vec<String> = list?
        .into_iter()
        .map(|entry| entry.trim().to_lowercase())
        .filter(|entry| !entry.is_empty())
        .collect();

    if entries.is_empty() {
        None
    } else {
        Some(entries)
    }
}

pub fn host_of(url: &str) -> Option<String> {
    let parsed = Url::parse(url.trim()).ok()?;
    parsed
        .host_str()
        .filter(|host| !host.is_empty())
        .map(|host| host.to_lowercase())
}

/// Decides whether `url` passes the domain policy.
///
/// Blacklist wins over whitelist. Never panics: an empty or malformed URL is
/// rejected.
pub fn is_allowed(url: &str, whitelist: Option<&[String]>, blacklist: Option<&[String]>) -> bool {
    if url.trim().is_empty() {
        return false;
    }

    let host = match host_of(url) {
        Some(h) => h,
        None => return false,
    };

    if let Some(blocked) = blacklist.filter(|list| !list.is_empty()) {
        if blocked
            .iter()
            .any(|entry| host.contains(&entry.to_lowercase()))
        {
            return false;
        }
    }

    if let Some(allowed) = whitelist.filter(|list| !list.is_empty()) {
        return allowed
            .iter()
            .any(|entry| host.contains(&entry.to_lowercase()));
    }

    true
}
