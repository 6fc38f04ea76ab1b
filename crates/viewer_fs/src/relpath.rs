//! Relative directory path utilities
//!
//! All engine paths are `.`-rooted, `/`-separated relative strings. The
//! root directory itself is spelled `"."`.

/// Normalize a relative directory string to `"a/b"` form, or `"."` for root.
///
/// Strips leading/trailing slashes; empty and `"."` both map to `"."`.
pub fn normalize_dir(dir: &str) -> String {
    let norm = dir.trim_matches('/');
    if norm.is_empty() || norm == "." {
        ".".to_string()
    } else {
        norm.to_string()
    }
}

/// Parent directory of a normalized path. The root stays at `"."`.
pub fn parent_dir(dir: &str) -> String {
    let norm = normalize_dir(dir);
    if norm == "." {
        return ".".to_string();
    }
    let mut parts: Vec<&str> = norm.split('/').filter(|s| !s.is_empty()).collect();
    parts.pop();
    if parts.is_empty() {
        ".".to_string()
    } else {
        parts.join("/")
    }
}

/// Map a normalized directory to its URL path (`"."` -> `"/"`).
pub fn dir_to_url(dir: &str) -> String {
    let norm = normalize_dir(dir);
    if norm == "." {
        "/".to_string()
    } else {
        format!("/{}", norm)
    }
}

/// Join a child name onto a normalized directory.
pub fn join_rel(dir: &str, name: &str) -> String {
    let norm = normalize_dir(dir);
    if norm == "." {
        name.to_string()
    } else {
        format!("{}/{}", norm, name)
    }
}

/// Every ancestor of `dir` from the top down, excluding the root.
///
/// `"a/b/c"` -> `["a", "a/b", "a/b/c"]`; the root yields an empty list.
pub fn ancestor_paths_of(dir: &str) -> Vec<String> {
    let norm = normalize_dir(dir);
    if norm == "." {
        return Vec::new();
    }
    let parts: Vec<&str> = norm.split('/').filter(|s| !s.is_empty()).collect();
    (1..=parts.len()).map(|i| parts[..i].join("/")).collect()
}

/// Generate a natural sort key (handles numbers correctly)
/// "image2.jpg" < "image10.jpg"
pub fn natural_sort_key(s: &str) -> Vec<NaturalSortPart> {
    let mut parts = Vec::new();
    let mut current_num = String::new();
    let mut current_str = String::new();

    for c in s.chars() {
        if c.is_ascii_digit() {
            if !current_str.is_empty() {
                parts.push(NaturalSortPart::Str(current_str.to_lowercase()));
                current_str.clear();
            }
            current_num.push(c);
        } else {
            if !current_num.is_empty() {
                if let Ok(n) = current_num.parse::<u64>() {
                    parts.push(NaturalSortPart::Num(n));
                }
                current_num.clear();
            }
            current_str.push(c);
        }
    }

    if !current_num.is_empty() {
        if let Ok(n) = current_num.parse::<u64>() {
            parts.push(NaturalSortPart::Num(n));
        }
    }
    if !current_str.is_empty() {
        parts.push(NaturalSortPart::Str(current_str.to_lowercase()));
    }

    parts
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub enum NaturalSortPart {
    Num(u64),
    Str(String),
}
