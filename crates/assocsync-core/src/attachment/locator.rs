use url::Url;

/// Object path for an upload: `{owner}/{unix_millis}_{sanitized_filename}`.
#[must_use]
pub fn object_path(owner: &str, unix_millis: i64, filename: &str) -> String {
    format!("{owner}/{unix_millis}_{}", sanitize_filename(filename))
}

/// Keep ASCII alphanumerics, `.`, `-` and `_`; replace everything else.
#[must_use]
pub fn sanitize_filename(filename: &str) -> String {
    let base = filename.rsplit(['/', '\\']).next().unwrap_or(filename);
    let cleaned: String = base
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '_'
            }
        })
        .collect();

    if cleaned.trim_matches(['.', '_']).is_empty() {
        "file".to_string()
    } else {
        cleaned
    }
}

/// Recover the object path from a public locator of `bucket`.
///
/// Returns `None` when the locator does not parse or does not point into
/// the bucket.
#[must_use]
pub fn locator_to_path(locator: &str, bucket: &str) -> Option<String> {
    let url = Url::parse(locator).ok()?;
    let marker = format!("/{bucket}/");
    let path = url.path();

    let start = path.find(&marker)? + marker.len();
    let encoded = &path[start..];
    if encoded.is_empty() {
        return None;
    }

    let segments = encoded
        .split('/')
        .map(|segment| urlencoding::decode(segment).map(std::borrow::Cow::into_owned))
        .collect::<Result<Vec<_>, _>>()
        .ok()?;

    Some(segments.join("/"))
}

///
/// TESTS
///
