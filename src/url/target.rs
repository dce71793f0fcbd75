use rand::Rng;

/// Returns true if the string starts with `http://` or `https://`
pub fn has_http_scheme(s: &str) -> bool {
    let lower = s.get(..8).unwrap_or(s).to_ascii_lowercase();
    lower.starts_with("http://") || lower.starts_with("https://")
}

/// Gives a target an explicit scheme
///
/// Bare hosts and dotted quads are prefixed with `http://`; targets that
/// already carry an HTTP scheme are returned trimmed but otherwise unchanged.
///
/// # Examples
///
/// ```
/// use knot_crawler::url::normalize_target;
///
/// assert_eq!(normalize_target("10.0.0.1"), "http://10.0.0.1");
/// assert_eq!(normalize_target("https://example.com/"), "https://example.com/");
/// ```
pub fn normalize_target(target: &str) -> String {
    let target = target.trim();
    if has_http_scheme(target) {
        target.to_string()
    } else {
        format!("http://{}", target)
    }
}

/// Generates `count` random IPv4 addresses without any validity checks
pub fn generate_ips(count: usize) -> Vec<String> {
    let mut rng = rand::thread_rng();
    (0..count)
        .map(|_| {
            let octets: [u8; 4] = std::array::from_fn(|_| rng.gen_range(0..255));
            format!("{}.{}.{}.{}", octets[0], octets[1], octets[2], octets[3])
        })
        .collect()
}
