//! Store path helpers.
//!
//! Vault paths are forward-slash separated and relative to the vault root.
//! No `.`/`..` handling: the vault is a flat addressable namespace.

/// Extension of the files a scan picks up.
pub const MARKDOWN_EXTENSION: &str = ".md";

/// Whether a path value names a file or a folder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathKind {
    File,
    Folder,
}

/// Join two store paths with a single `/`.
///
/// Trailing slashes are stripped from `a`, leading and trailing slashes from `b`.
/// When one side ends up empty the other side is returned as-is.
pub fn join_paths(a: &str, b: &str) -> String {
    let a = a.trim_end_matches('/');
    let b = b.trim_matches('/');
    match (a.is_empty(), b.is_empty()) {
        (true, true) => String::new(),
        (true, false) => b.to_string(),
        (false, true) => a.to_string(),
        (false, false) => format!("{}/{}", a, b),
    }
}

/// Split a path into its non-empty segments, outermost first.
pub fn split_path_string(path: &str) -> Vec<&str> {
    path.split('/').filter(|s| !s.is_empty()).collect()
}

/// Collapse duplicate, leading and trailing slashes.
pub fn normalize(path: &str) -> String {
    split_path_string(path).join("/")
}

/// Folder portion of a path.
///
/// Folder paths come back unchanged. For file paths this is everything before
/// the last `/`, or `""` for a bare file name.
pub fn folder_from_path(path: &str, kind: PathKind) -> &str {
    match kind {
        PathKind::Folder => path,
        PathKind::File => match path.rfind('/') {
            Some(idx) => &path[..idx],
            None => "",
        },
    }
}

/// Last segment of a path.
pub fn file_name(path: &str) -> &str {
    split_path_string(path).last().copied().unwrap_or("")
}

/// Path of `file_path` relative to `source_folder`.
///
/// The source folder must be a whole-segment prefix of the file path;
/// `None` otherwise. A source folder of `""` or `/` is the vault root.
pub fn path_in_source_folder(file_path: &str, source_folder: &str) -> Option<String> {
    let file_segments = split_path_string(file_path);
    let source_segments = split_path_string(source_folder);

    if source_segments.len() >= file_segments.len()
        || !file_segments.starts_with(&source_segments)
    {
        return None;
    }

    Some(file_segments[source_segments.len()..].join("/"))
}

pub fn is_markdown(name: &str) -> bool {
    name.ends_with(MARKDOWN_EXTENSION)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_join_paths() {
        assert_eq!(join_paths("Archive", "2023/December"), "Archive/2023/December");
        assert_eq!(join_paths("Archive/", "/31.md"), "Archive/31.md");
        assert_eq!(join_paths("Archive///", "2023/"), "Archive/2023");
        assert_eq!(join_paths("", "31.md"), "31.md");
        assert_eq!(join_paths("Archive/", ""), "Archive");
        assert_eq!(join_paths("", ""), "");
        assert_eq!(join_paths("/", "/"), "");
    }

    #[test]
    fn test_join_paths_idempotent_with_empty() {
        let cases = [("a", "b"), ("a/", "/b/"), ("", "b"), ("a", ""), ("a/b", "c/d")];
        for (a, b) in cases {
            let joined = join_paths(a, b);
            assert_eq!(join_paths(&joined, ""), joined, "a={:?} b={:?}", a, b);
        }
    }

    #[test]
    fn test_join_paths_keeps_dot_segments() {
        assert_eq!(join_paths("a/..", "./b"), "a/.././b");
    }

    #[test]
    fn test_split_path_string() {
        assert_eq!(split_path_string("Notes/2023/December"), vec!["Notes", "2023", "December"]);
        assert_eq!(split_path_string("/Notes//2023/"), vec!["Notes", "2023"]);
        assert!(split_path_string("").is_empty());
        assert!(split_path_string("///").is_empty());
    }

    #[test]
    fn test_folder_from_path() {
        assert_eq!(folder_from_path("Notes/2023/31.md", PathKind::File), "Notes/2023");
        assert_eq!(folder_from_path("31.md", PathKind::File), "");
        assert_eq!(folder_from_path("Notes/2023", PathKind::Folder), "Notes/2023");
        // Folder names that look like files are still folders.
        assert_eq!(folder_from_path("Notes/ideas.md", PathKind::Folder), "Notes/ideas.md");
        // And files without the markdown extension are still files.
        assert_eq!(folder_from_path("Notes/photo.png", PathKind::File), "Notes");
    }

    #[test]
    fn test_path_in_source_folder() {
        assert_eq!(
            path_in_source_folder("Notes/2023/December/31.md", "Notes").as_deref(),
            Some("2023/December/31.md")
        );
        assert_eq!(
            path_in_source_folder("Notes/31.md", "Notes/").as_deref(),
            Some("31.md")
        );
        assert_eq!(
            path_in_source_folder("Notes/31.md", "/").as_deref(),
            Some("Notes/31.md")
        );
    }

    #[test]
    fn test_path_in_source_folder_is_prefix_anchored() {
        // The source name recurring deeper in the path must not be stripped.
        assert_eq!(
            path_in_source_folder("Notes/Work/Notes/a.md", "Notes").as_deref(),
            Some("Work/Notes/a.md")
        );
        assert_eq!(path_in_source_folder("Work/Notes/a.md", "Notes"), None);
        // Partial segment matches are not prefixes.
        assert_eq!(path_in_source_folder("Notebook/a.md", "Note"), None);
        assert_eq!(path_in_source_folder("Notes", "Notes"), None);
    }

    #[test]
    fn test_file_name_and_markdown() {
        assert_eq!(file_name("Notes/2023/31.md"), "31.md");
        assert_eq!(file_name("31.md"), "31.md");
        assert_eq!(file_name(""), "");
        assert!(is_markdown("31.md"));
        assert!(!is_markdown("31.md.png"));
        assert!(!is_markdown("README"));
    }
}
