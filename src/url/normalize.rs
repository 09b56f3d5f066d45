use crate::{UrlError, UrlResult};
use url::{Position, Url};

/// Resolves a possibly-relative discovered link against the page it was found
/// on, producing a canonical absolute URL.
///
/// # Resolution Rules
///
/// 1. A link that already carries an `http`-family scheme token is returned
///    as-is.
/// 2. A link starting with `/` is rooted at the base URL's scheme and host
///    (and explicit port, when present).
/// 3. Anything else is relative: it is resolved against the directory portion
///    of the base URL's path (the substring up to and including the last `/`;
///    an empty base path counts as `/`).
/// 4. Every `/<segment>/../` occurrence in the resulting path is collapsed.
///    This is a single left-to-right pass over path segments with an explicit
///    stack, so cost is linear in the path length even for adversarial runs
///    of `/../` tokens.
///
/// A base URL without a host (e.g. `data:` URLs) fails with
/// [`UrlError::MissingHost`] rather than producing a malformed output.
///
/// # Examples
///
/// ```
/// use rulespider::url::normalize;
/// use url::Url;
///
/// let base = Url::parse("http://example.com/a/b/c").unwrap();
/// assert_eq!(normalize("../x", &base).unwrap(), "http://example.com/a/x");
/// assert_eq!(normalize("/x/../y", &base).unwrap(), "http://example.com/y");
/// ```
pub fn normalize(candidate: &str, base: &Url) -> UrlResult<String> {
    // Already absolute: pass through untouched.
    if candidate.starts_with("http") {
        return Ok(candidate.to_string());
    }

    if base.host_str().is_none() {
        return Err(UrlError::MissingHost(base.to_string()));
    }

    // scheme://host[:port], without path/query/fragment
    let origin = &base[..Position::BeforePath];

    let path = if candidate.starts_with('/') {
        candidate.to_string()
    } else {
        let base_path = if base.path().is_empty() {
            "/"
        } else {
            base.path()
        };
        // Directory portion: up to and including the last slash.
        let dir_end = base_path.rfind('/').map(|i| i + 1).unwrap_or(0);
        format!("{}{}", &base_path[..dir_end], candidate)
    };

    Ok(format!("{}{}", origin, collapse_parent_segments(&path)))
}

/// Collapses `/<segment>/../` occurrences with a segment stack.
///
/// Only a plain segment directly followed by `../` is collapsed; a `..` with
/// nothing to consume (at the path root, or after another surviving `..`) and
/// a bare trailing `..` with no slash after it are kept verbatim. Query
/// strings and fragments are left untouched.
fn collapse_parent_segments(path: &str) -> String {
    if !path.contains("/../") {
        return path.to_string();
    }

    let split_at = path.find(['?', '#']).unwrap_or(path.len());
    let (path_part, suffix) = path.split_at(split_at);

    let segments: Vec<&str> = path_part.split('/').collect();
    let mut stack: Vec<&str> = Vec::new();
    for (i, &segment) in segments.iter().enumerate() {
        // A final ".." has no trailing slash, so it is not a "/../" token.
        let followed = i + 1 < segments.len();
        if segment == ".."
            && followed
            && matches!(stack.last(), Some(&top) if !top.is_empty() && top != "..")
        {
            stack.pop();
        } else {
            stack.push(segment);
        }
    }

    format!("{}{}", stack.join("/"), suffix)
}
