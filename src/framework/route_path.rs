//! File-tree route path decoding.
//!
//! | Segment | Route path |
//! |---|---|
//! | `users` | `users` |
//! | `[id]` | `:id` |
//! | `[...slug]`, `[[...slug]]` | `*slug` |
//! | `(group)` | omitted |
//! | `@slot` | omitted |
//! | `index` | omitted |

/// Decode one directory or file-stem segment.
///
/// Returns `None` when the segment contributes nothing to the path.
pub fn decode_segment(segment: &str) -> Option<String> {
    if segment.is_empty() || segment == "." || segment == "index" {
        return None;
    }
    if segment.starts_with('(') && segment.ends_with(')') {
        return None;
    }
    if segment.starts_with('@') {
        return None;
    }
    if let Some(inner) = segment
        .strip_prefix("[[...")
        .and_then(|s| s.strip_suffix("]]"))
    {
        return Some(format!("*{inner}"));
    }
    if let Some(inner) = segment.strip_prefix('[').and_then(|s| s.strip_suffix(']')) {
        return Some(match inner.strip_prefix("...") {
            Some(catch_all) => format!("*{catch_all}"),
            None => format!(":{inner}"),
        });
    }
    Some(segment.to_string())
}

/// Join decoded segments into a route path (`/` when nothing remains).
pub fn to_route_path<'a>(segments: impl IntoIterator<Item = &'a str>) -> String {
    let parts: Vec<String> = segments.into_iter().filter_map(decode_segment).collect();
    if parts.is_empty() {
        "/".to_string()
    } else {
        format!("/{}", parts.join("/"))
    }
}

/// Join a prefix and decoded segments (`/api` + `users/[id]` → `/api/users/:id`).
pub fn to_prefixed_route_path<'a>(prefix: &str, segments: impl IntoIterator<Item = &'a str>) -> String {
    let rest = to_route_path(segments);
    let prefix = prefix.trim_end_matches('/');
    if rest == "/" {
        if prefix.is_empty() {
            "/".to_string()
        } else {
            prefix.to_string()
        }
    } else {
        format!("{prefix}{rest}")
    }
}

/// Normalize a decorator-declared path: `/<base>/<sub>`, no duplicate or
/// trailing slashes, `/` when empty.
pub fn join_annotated(base: &str, sub: &str) -> String {
    let parts: Vec<&str> = base
        .split('/')
        .chain(sub.split('/'))
        .filter(|p| !p.is_empty())
        .collect();
    if parts.is_empty() {
        "/".to_string()
    } else {
        format!("/{}", parts.join("/"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_segment_rules() {
        assert_eq!(decode_segment("[id]").as_deref(), Some(":id"));
        assert_eq!(decode_segment("[...slug]").as_deref(), Some("*slug"));
        assert_eq!(decode_segment("[[...slug]]").as_deref(), Some("*slug"));
        assert_eq!(decode_segment("(marketing)"), None);
        assert_eq!(decode_segment("index"), None);
        assert_eq!(decode_segment("@modal"), None);
        assert_eq!(decode_segment("users").as_deref(), Some("users"));
    }

    #[test]
    fn test_route_paths() {
        assert_eq!(to_route_path(["(shop)", "products", "[id]"]), "/products/:id");
        assert_eq!(to_route_path(["docs", "[...slug]"]), "/docs/*slug");
        assert_eq!(to_route_path(["blog", "index"]), "/blog");
        assert_eq!(to_route_path(Vec::<&str>::new()), "/");
        assert_eq!(to_route_path(["(group)"]), "/");
    }

    #[test]
    fn test_prefixed_paths() {
        assert_eq!(to_prefixed_route_path("/api", ["users", "[id]"]), "/api/users/:id");
        assert_eq!(to_prefixed_route_path("/api", ["index"]), "/api");
    }

    #[test]
    fn test_join_annotated() {
        assert_eq!(join_annotated("users", ":id"), "/users/:id");
        assert_eq!(join_annotated("/users/", ""), "/users");
        assert_eq!(join_annotated("", ""), "/");
        assert_eq!(join_annotated("api//v1", "/items/"), "/api/v1/items");
    }
}
