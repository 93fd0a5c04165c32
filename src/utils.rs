use http::{HeaderMap, HeaderName, Uri, header};

/// Headers that only make sense for a single transport connection.
pub static HOP_BY_HOP_HEADERS: [HeaderName; 9] = [
    header::CONNECTION,
    HeaderName::from_static("keep-alive"),
    HeaderName::from_static("proxy-connection"),
    header::PROXY_AUTHENTICATE,
    header::PROXY_AUTHORIZATION,
    header::TE,
    header::TRAILER,
    header::TRANSFER_ENCODING,
    header::UPGRADE,
];

/// Combines a base URI with the path and query of another URI.
///
/// Exactly one `/` ends up at the seam between the two paths. Scheme and
/// authority always come from `base`; whatever `append` carries is dropped.
///
/// # Examples
///
/// ```
/// use http::Uri;
/// use devproxy::utils::combine_uris;
///
/// let base = "http://example.com/api".parse::<Uri>().unwrap();
/// let append = "/users?page=1".parse::<Uri>().unwrap();
/// let combined = combine_uris(&base, &append).unwrap();
/// assert_eq!(combined.to_string(), "http://example.com/api/users?page=1");
/// ```
pub fn combine_uris(base: &Uri, append: &Uri) -> Result<Uri, http::Error> {
    let base_path = base.path();
    let append_path = append.path();

    let mut full_path = match (base_path.ends_with('/'), append_path.starts_with('/')) {
        (true, true) => format!("{}{}", base_path, &append_path[1..]),
        (false, false) => format!("{}/{}", base_path, append_path),
        _ => format!("{}{}", base_path, append_path),
    };

    if let Some(query) = append.query() {
        full_path.push('?');
        full_path.push_str(query);
    }

    if let Some(scheme) = base.scheme_str() {
        let authority = base.authority().map(|a| a.as_str()).unwrap_or("");

        full_path = format!("{}://{}{}", scheme, authority, full_path);
    }
    Ok(full_path.parse::<Uri>()?)
}

/// Removes hop-by-hop headers, including every header the `Connection`
/// header lists as connection-specific.
pub fn strip_hop_by_hop(headers: &mut HeaderMap) {
    let listed: Vec<HeaderName> = headers
        .get_all(header::CONNECTION)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(','))
        .filter_map(|token| HeaderName::from_bytes(token.trim().as_bytes()).ok())
        .collect();

    for name in listed {
        headers.remove(name);
    }
    for name in HOP_BY_HOP_HEADERS.iter() {
        headers.remove(name);
    }
}
