/// Resolves a hyperlink relative to the base URL
///
/// Returns `None` when the hyperlink carries no new information: empty or
/// whitespace-only, a same-page fragment, a non-HTTP scheme, or a link that
/// resolves back to `base` itself.
///
/// # Resolution Rules
///
/// | Hyperlink | Result |
/// |-----------|--------|
/// | `http(s)://...` | unchanged |
/// | `//host/path` | base scheme + hyperlink |
/// | `/path` | base origin + hyperlink |
/// | `?query` | base without query/fragment + hyperlink |
/// | `page` on `scheme://host` | base + `/` + hyperlink |
/// | `page` otherwise | base up to its last `/` + hyperlink |
///
/// # Examples
///
/// ```
/// use knot_crawler::url::resolve;
///
/// assert_eq!(resolve("/page", "http://test.com").as_deref(), Some("http://test.com/page"));
/// assert_eq!(
///     resolve("page", "http://test.com/subdir/test").as_deref(),
///     Some("http://test.com/subdir/page")
/// );
/// assert_eq!(resolve("#top", "http://test.com/test"), None);
/// ```
pub fn resolve(hyperlink: &str, base: &str) -> Option<String> {
    let hl = hyperlink.trim();

    if hl.is_empty() || hl.starts_with('#') || hl == base {
        return None;
    }

    let resolved = if super::has_http_scheme(hl) {
        hl.to_string()
    } else if has_other_scheme(hl) {
        return None;
    } else if let Some(rest) = hl.strip_prefix("//") {
        format!("{}//{}", scheme_prefix(base), rest)
    } else if hl.starts_with('/') {
        format!("{}{}", origin(base), hl)
    } else if hl.starts_with('?') {
        let stripped = strip_query(base);
        if stripped.len() == origin(base).len() {
            format!("{}/{}", stripped, hl)
        } else {
            format!("{}{}", stripped, hl)
        }
    } else {
        let stripped = strip_query(base);
        let path_start = origin(base).len();
        match stripped.get(path_start..).and_then(|path| path.rfind('/')) {
            Some(slash) => format!("{}{}", &stripped[..path_start + slash + 1], hl),
            None => format!("{}/{}", stripped, hl),
        }
    };

    if resolved == base {
        None
    } else {
        Some(resolved)
    }
}

/// Index right after `scheme://`, or 0 for bare hosts
fn authority_start(base: &str) -> usize {
    base.find("://").map(|i| i + 3).unwrap_or(0)
}

/// `scheme://host[:port]` part of the base
fn origin(base: &str) -> &str {
    let start = authority_start(base);
    let end = base[start..]
        .find(['/', '?', '#'])
        .map(|i| start + i)
        .unwrap_or(base.len());
    &base[..end]
}

/// `scheme:` part of the base, defaulting to `http:`
fn scheme_prefix(base: &str) -> &str {
    match base.find("://") {
        Some(i) => &base[..=i],
        None => "http:",
    }
}

/// Base without its query string and fragment
fn strip_query(base: &str) -> &str {
    let end = base.find(['?', '#']).unwrap_or(base.len());
    &base[..end]
}

/// Detects `mailto:`, `javascript:`, `tel:` and other non-HTTP schemes
fn has_other_scheme(hl: &str) -> bool {
    let Some(colon) = hl.find(':') else {
        return false;
    };
    let scheme = &hl[..colon];
    let mut chars = scheme.chars();
    match chars.next() {
        Some(first) if first.is_ascii_alphabetic() => chars
            .all(|c| c.is_ascii_alphanumeric() || c == '+' || c == '-' || c == '.'),
        _ => false,
    }
}
