use url::Url;

/// Resolve `href` against `base` and drop the query string and fragment.
///
/// Returns `None` for empty hrefs and for hrefs that cannot be joined.
/// Scheme, host and path are kept exactly as resolution leaves them.
pub fn normalize_url(base: &Url, href: &str) -> Option<String> {
    let href = href.trim();
    if href.is_empty() {
        return None;
    }

    let mut resolved = base.join(href).ok()?;
    resolved.set_query(None);
    resolved.set_fragment(None);

    Some(resolved.to_string())
}

/// Read a single query parameter.
pub fn query_param(url: &Url, key: &str) -> Option<String> {
    url.query_pairs()
        .find(|(k, _)| k == key)
        .map(|(_, v)| v.into_owned())
}

/// Set `key` to `value`, keeping every other parameter and its position.
/// The parameter is appended if the URL does not carry it yet.
pub fn with_query_param(url: &Url, key: &str, value: &str) -> Url {
    let mut pairs: Vec<(String, String)> = url
        .query_pairs()
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();

    match pairs.iter_mut().find(|(k, _)| k == key) {
        Some(pair) => pair.1 = value.to_string(),
        None => pairs.push((key.to_string(), value.to_string())),
    }

    let mut updated = url.clone();
    updated.query_pairs_mut().clear().extend_pairs(pairs);
    updated
}
