//! Ant-style request path patterns.
//!
//! `?` matches one character inside a segment, `*` matches any run of
//! characters inside a segment and `**` matches zero or more whole segments.
//! Matching is case sensitive and distinguishes a trailing slash, except that
//! a trailing `/**` also matches the bare prefix (`/manage/**` matches `/manage`).

use std::fmt;

/// A compiled path pattern
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathPattern {
    raw: String,
    segments: Vec<String>,
}

impl PathPattern {
    pub fn new(pattern: impl Into<String>) -> Self {
        let raw = pattern.into();
        let segments = split_segments(&raw);
        Self { raw, segments }
    }

    /// The pattern that matches every path
    pub fn any() -> Self {
        Self::new("/**")
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    pub fn matches(&self, path: &str) -> bool {
        let path_segments = split_segments(path);
        let path_segments: Vec<&str> = path_segments.iter().map(String::as_str).collect();
        let pattern_segments: Vec<&str> = self.segments.iter().map(String::as_str).collect();
        match_segments(&pattern_segments, &path_segments)
    }
}

impl fmt::Display for PathPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

fn split_segments(value: &str) -> Vec<String> {
    let trimmed = value.strip_prefix('/').unwrap_or(value);
    trimmed.split('/').map(str::to_string).collect()
}

fn match_segments(pattern: &[&str], path: &[&str]) -> bool {
    match pattern.split_first() {
        None => path.is_empty(),
        Some((&"**", rest)) => {
            // `**` swallows zero or more segments
            (0..=path.len()).any(|skip| match_segments(rest, &path[skip..]))
        }
        Some((head, rest)) => match path.split_first() {
            Some((segment, path_rest)) => {
                match_segment(head, segment) && match_segments(rest, path_rest)
            }
            None => false,
        },
    }
}

fn match_segment(pattern: &str, segment: &str) -> bool {
    let pattern: Vec<char> = pattern.chars().collect();
    let segment: Vec<char> = segment.chars().collect();

    let (mut p, mut s) = (0usize, 0usize);
    let mut star: Option<usize> = None;
    let mut backtrack = 0usize;

    while s < segment.len() {
        if p < pattern.len() && (pattern[p] == '?' || pattern[p] == segment[s]) {
            p += 1;
            s += 1;
        } else if p < pattern.len() && pattern[p] == '*' {
            star = Some(p);
            backtrack = s;
            p += 1;
        } else if let Some(star_at) = star {
            p = star_at + 1;
            backtrack += 1;
            s = backtrack;
        } else {
            return false;
        }
    }

    pattern[p..].iter().all(|c| *c == '*')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_literal_patterns() {
        let login = PathPattern::new("/login");
        assert!(login.matches("/login"));
        assert!(!login.matches("/login/"));
        assert!(!login.matches("/login/extra"));
        assert!(!login.matches("/Login"));
        assert!(!login.matches("/logins"));
    }

    #[test]
    fn test_root_pattern() {
        let root = PathPattern::new("/");
        assert!(root.matches("/"));
        assert!(!root.matches("/index"));
    }

    #[test]
    fn test_recursive_wildcard() {
        let manage = PathPattern::new("/manage/**");
        assert!(manage.matches("/manage"));
        assert!(manage.matches("/manage/"));
        assert!(manage.matches("/manage/health"));
        assert!(manage.matches("/manage/metrics/jvm.memory"));
        assert!(!manage.matches("/management"));
        assert!(!manage.matches("/api/manage/health"));

        let any = PathPattern::any();
        assert!(any.matches("/"));
        assert!(any.matches("/api/users/bob"));
    }

    #[test]
    fn test_segment_wildcards() {
        let pattern = PathPattern::new("/api/*/profile-picture");
        assert!(pattern.matches("/api/bob/profile-picture"));
        assert!(!pattern.matches("/api/profile-picture"));
        assert!(!pattern.matches("/api/a/b/profile-picture"));

        let pattern = PathPattern::new("/file?.txt");
        assert!(pattern.matches("/file1.txt"));
        assert!(!pattern.matches("/file12.txt"));

        let pattern = PathPattern::new("/assets/*.css");
        assert!(pattern.matches("/assets/main.css"));
        assert!(pattern.matches("/assets/.css"));
        assert!(!pattern.matches("/assets/main.js"));
    }

    #[test]
    fn test_encoded_slash_stays_in_segment() {
        // paths are matched raw, `%2F` is not a separator
        let pattern = PathPattern::new("/api/*/profile-picture");
        assert!(pattern.matches("/api/a%2Fb/profile-picture"));
        assert!(!pattern.matches("/api/a/b/profile-picture"));

        let login = PathPattern::new("/login");
        assert!(!login.matches("/%2Flogin"));
        assert!(!login.matches("%2Flogin"));

        let encoded = PathPattern::new("/files/a%2Fb");
        assert!(encoded.matches("/files/a%2Fb"));
        assert!(!encoded.matches("/files/a%2fb"));
        assert!(!encoded.matches("/files/a/b"));

        assert!(PathPattern::new("/manage/**").matches("/manage/x%2F..%2Fy"));
    }

    #[test]
    fn test_inner_recursive_wildcard() {
        let pattern = PathPattern::new("/api/**/picture");
        assert!(pattern.matches("/api/picture"));
        assert!(pattern.matches("/api/users/bob/picture"));
        assert!(!pattern.matches("/api/users/bob/avatar"));
    }
}
