//! Helpers for queries that still carry `{wildcard}` placeholders.

/// Longest placeholder-free prefix of `path`, cut back to a whole path
/// segment.
///
/// A segment containing the first `{` is incomplete and is stripped along
/// with the wildcard, so `/data/run-{n}/out` yields `/data`, not
/// `/data/run-`. A path without placeholders is returned unchanged. An
/// empty result means no usable prefix exists (the path starts with a
/// wildcard segment).
pub fn constant_prefix(path: &str) -> &str {
    let Some(idx) = path.find('{') else {
        return path;
    };
    let head = &path[..idx];
    match head.rfind('/') {
        Some(0) => "/",
        Some(slash) => &head[..slash],
        None => "",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_wildcard_returns_path() {
        assert_eq!(constant_prefix("/data/samples/a.txt"), "/data/samples/a.txt");
    }

    #[test]
    fn test_wildcard_segment_is_stripped() {
        assert_eq!(constant_prefix("/data/{sample}.txt"), "/data");
        assert_eq!(constant_prefix("/data/samples/{s}/out.txt"), "/data/samples");
    }

    #[test]
    fn test_incomplete_segment_is_stripped() {
        assert_eq!(constant_prefix("/data/run-{n}/out.txt"), "/data");
    }

    #[test]
    fn test_wildcard_in_first_segment() {
        assert_eq!(constant_prefix("/{s}/out.txt"), "/");
        assert_eq!(constant_prefix("{s}/out.txt"), "");
    }
}
