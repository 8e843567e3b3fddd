// SPDX-License-Identifier: AGPL-3.0-or-later
//! Provider path syntax
//!
//! A [`PathResolver`] knows one provider's separator, case rules and the
//! handful of well-known storage roots. Everything here is pure string work;
//! nothing touches storage.

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use crate::platform::Platform;

/// Path syntax rules for one storage provider
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathResolver {
    separator: char,
    alt_separators: Vec<char>,
    case_insensitive: bool,
    known_roots: Vec<String>,
}

impl PathResolver {
    pub fn new(separator: char) -> Self {
        Self {
            separator,
            alt_separators: Vec::new(),
            case_insensitive: false,
            known_roots: Vec::new(),
        }
    }

    /// POSIX-style syntax: `/`, case-sensitive
    pub fn posix() -> Self {
        Self::new('/')
    }

    /// Windows-style syntax: `\` with `/` accepted, case-insensitive
    pub fn windows() -> Self {
        Self::new('\\').with_alt_separator('/').case_insensitive(true)
    }

    /// Syntax of the native filesystem on `platform`
    pub fn for_platform(platform: Platform) -> Self {
        match platform {
            Platform::Windows => Self::windows(),
            Platform::MacOs | Platform::Ios => Self::posix().case_insensitive(true),
            _ => Self::posix(),
        }
    }

    pub fn with_alt_separator(mut self, separator: char) -> Self {
        if separator != self.separator && !self.alt_separators.contains(&separator) {
            self.alt_separators.push(separator);
        }
        self
    }

    pub fn case_insensitive(mut self, yes: bool) -> Self {
        self.case_insensitive = yes;
        self
    }

    /// Register a storage root that must be reported as a root without I/O
    pub fn with_known_root(mut self, root: impl AsRef<str>) -> Self {
        let root = self.normalize(root.as_ref());
        if !root.is_empty() && !self.known_roots.iter().any(|r| self.eq_paths(r, &root)) {
            self.known_roots.push(root);
        }
        self
    }

    pub fn separator(&self) -> char {
        self.separator
    }

    pub fn is_case_insensitive(&self) -> bool {
        self.case_insensitive
    }

    pub fn is_separator(&self, c: char) -> bool {
        c == self.separator || self.alt_separators.contains(&c)
    }

    /// True if `name` contains this provider's separator, or either of `/` and `\`
    pub fn contains_separator(&self, name: &str) -> bool {
        name.chars()
            .any(|c| self.is_separator(c) || c == '/' || c == '\\')
    }

    /// Canonical spelling: native separators, no trailing separator except on a bare root
    pub fn normalize(&self, raw: &str) -> String {
        let mut path: String = raw
            .chars()
            .map(|c| if self.is_separator(c) { self.separator } else { c })
            .collect();

        let keep = self.root_prefix_len(&path);
        while path.len() > keep && path.ends_with(self.separator) {
            path.pop();
        }
        path
    }

    /// Left-fold `fragments` onto `base` with the native separator
    pub fn combine<S: AsRef<str>>(&self, base: &str, fragments: &[S]) -> String {
        fragments.iter().fold(self.normalize(base), |acc, fragment| {
            let fragment = self.normalize(fragment.as_ref());
            let fragment = fragment.trim_start_matches(self.separator);
            if fragment.is_empty() {
                return acc;
            }
            if acc.is_empty() {
                return fragment.to_string();
            }
            let mut joined = acc;
            if !joined.ends_with(self.separator) {
                joined.push(self.separator);
            }
            joined.push_str(fragment);
            joined
        })
    }

    /// True for filesystem roots and for the registered storage roots
    pub fn is_root(&self, path: &str) -> bool {
        let path = self.normalize(path);
        if self.known_roots.iter().any(|root| self.eq_paths(root, &path)) {
            return true;
        }
        !path.is_empty() && path.len() == self.root_prefix_len(&path)
    }

    /// Last component; empty for a bare root
    pub fn leaf_name<'a>(&self, path: &'a str) -> &'a str {
        let path = self.trim_trailing(path);
        let prefix = self.root_prefix_len(path);
        match path.char_indices().rev().find(|(_, c)| self.is_separator(*c)) {
            Some((i, c)) => &path[i + c.len_utf8()..],
            None if prefix == path.len() => "",
            None => path,
        }
    }

    /// Extension of the leaf name including the dot, or empty.
    ///
    /// A leaf made only of a dot and a suffix (`.gitignore`) is all extension.
    pub fn extension<'a>(&self, path: &'a str) -> &'a str {
        let leaf = self.leaf_name(path);
        match leaf.rfind('.') {
            Some(i) if i + 1 < leaf.len() => &leaf[i..],
            _ => "",
        }
    }

    /// Leaf name with the extension removed
    pub fn file_stem<'a>(&self, path: &'a str) -> &'a str {
        let leaf = self.leaf_name(path);
        let ext = self.extension(path);
        &leaf[..leaf.len() - ext.len()]
    }

    /// Everything before the last separator; `None` for roots and bare names
    pub fn parent<'a>(&self, path: &'a str) -> Option<&'a str> {
        let path = self.trim_trailing(path);
        let prefix = self.root_prefix_len(path);
        if !path.is_empty() && path.len() == prefix {
            return None;
        }
        let (i, _) = path.char_indices().rev().find(|(_, c)| self.is_separator(*c))?;
        if i < prefix {
            Some(&path[..prefix])
        } else {
            Some(&path[..i])
        }
    }

    /// True if `path` is `ancestor` itself or lies somewhere beneath it
    pub fn is_within(&self, path: &str, ancestor: &str) -> bool {
        let ancestor = self.trim_trailing(ancestor);
        let mut current = self.trim_trailing(path);
        loop {
            if self.eq_paths(current, ancestor) {
                return true;
            }
            match self.parent(current) {
                Some(parent) if parent.len() < current.len() => current = parent,
                _ => return false,
            }
        }
    }

    /// Compare two paths under this provider's case rules
    pub fn eq_paths(&self, a: &str, b: &str) -> bool {
        if self.case_insensitive {
            a.chars()
                .flat_map(char::to_lowercase)
                .eq(b.chars().flat_map(char::to_lowercase))
        } else {
            a == b
        }
    }

    fn trim_trailing<'a>(&self, path: &'a str) -> &'a str {
        let keep = self.root_prefix_len(path);
        let mut end = path.len();
        while end > keep {
            match path[..end].chars().next_back() {
                Some(c) if self.is_separator(c) => end -= c.len_utf8(),
                _ => break,
            }
        }
        &path[..end]
    }

    /// Length of the root prefix: `/`, `C:`, `C:\`, or nothing for relative paths
    fn root_prefix_len(&self, path: &str) -> usize {
        let mut chars = path.chars();
        match (chars.next(), chars.next(), chars.next()) {
            (Some(c), _, _) if self.is_separator(c) => c.len_utf8(),
            (Some(d), Some(':'), rest) if d.is_ascii_alphabetic() && self.separator == '\\' => {
                match rest {
                    Some(s) if self.is_separator(s) => 3,
                    _ => 2,
                }
            }
            _ => 0,
        }
    }
}

impl Default for PathResolver {
    fn default() -> Self {
        Self::for_platform(Platform::detect())
    }
}

/// A provider-specific location. Immutable; combining never checks existence.
#[derive(Clone)]
pub struct StoragePath {
    raw: String,
    resolver: Arc<PathResolver>,
}

impl StoragePath {
    pub fn new(resolver: Arc<PathResolver>, raw: impl AsRef<str>) -> Self {
        let raw = resolver.normalize(raw.as_ref());
        Self { raw, resolver }
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    pub fn resolver(&self) -> &Arc<PathResolver> {
        &self.resolver
    }

    pub fn is_empty(&self) -> bool {
        self.raw.is_empty()
    }

    pub fn is_root(&self) -> bool {
        self.resolver.is_root(&self.raw)
    }

    pub fn combine<S: AsRef<str>>(&self, fragments: &[S]) -> Self {
        Self {
            raw: self.resolver.combine(&self.raw, fragments),
            resolver: Arc::clone(&self.resolver),
        }
    }

    pub fn join(&self, name: impl AsRef<str>) -> Self {
        self.combine(&[name])
    }

    pub fn leaf_name(&self) -> &str {
        self.resolver.leaf_name(&self.raw)
    }

    pub fn extension(&self) -> &str {
        self.resolver.extension(&self.raw)
    }

    pub fn file_stem(&self) -> &str {
        self.resolver.file_stem(&self.raw)
    }

    pub fn parent(&self) -> Option<Self> {
        self.resolver.parent(&self.raw).map(|parent| Self {
            raw: parent.to_string(),
            resolver: Arc::clone(&self.resolver),
        })
    }

    /// True if this is `ancestor` or lies beneath it
    pub fn is_within(&self, ancestor: &StoragePath) -> bool {
        self.resolver.is_within(&self.raw, &ancestor.raw)
    }

    pub fn to_path_buf(&self) -> PathBuf {
        PathBuf::from(&self.raw)
    }
}

impl PartialEq for StoragePath {
    fn eq(&self, other: &Self) -> bool {
        self.resolver.eq_paths(&self.raw, &other.raw)
    }
}

impl Eq for StoragePath {}

impl AsRef<str> for StoragePath {
    fn as_ref(&self) -> &str {
        &self.raw
    }
}

impl fmt::Display for StoragePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

impl fmt::Debug for StoragePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "StoragePath({:?})", self.raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn posix() -> Arc<PathResolver> {
        Arc::new(PathResolver::posix())
    }

    fn windows() -> Arc<PathResolver> {
        Arc::new(PathResolver::windows())
    }

    #[test]
    fn test_combine() {
        let r = PathResolver::posix();
        assert_eq!(r.combine("/home/user", &["docs", "a.txt"]), "/home/user/docs/a.txt");
        assert_eq!(r.combine("/", &["etc"]), "/etc");
        assert_eq!(r.combine("", &["a", "b"]), "a/b");
    }

    #[test]
    fn test_combine_is_associative() {
        let r = PathResolver::posix();
        for base in ["/", "/home", "/home/user/", "relative"] {
            let once = r.combine(base, &["a", "b"]);
            let twice = r.combine(&r.combine(base, &["a"]), &["b"]);
            assert_eq!(once, twice, "base {base:?}");
        }

        let w = PathResolver::windows();
        for base in ["C:\\", "C:\\Users", "C:/Users/me/"] {
            let once = w.combine(base, &["a", "b"]);
            let twice = w.combine(&w.combine(base, &["a"]), &["b"]);
            assert_eq!(once, twice, "base {base:?}");
        }
    }

    #[test]
    fn test_combine_skips_empty_and_strips_leading_separators() {
        let r = PathResolver::posix();
        assert_eq!(r.combine("/home", &["", "/user/", "//docs"]), "/home/user/docs");
    }

    #[test]
    fn test_normalize_windows() {
        let w = PathResolver::windows();
        assert_eq!(w.normalize("C:/Users/me/"), "C:\\Users\\me");
        assert_eq!(w.normalize("C:\\"), "C:\\");
        assert_eq!(w.normalize("C:/"), "C:\\");
    }

    #[test]
    fn test_is_root() {
        let r = PathResolver::posix();
        assert!(r.is_root("/"));
        assert!(r.is_root("//"));
        assert!(!r.is_root("/home"));
        assert!(!r.is_root(""));

        let w = PathResolver::windows();
        assert!(w.is_root("C:\\"));
        assert!(w.is_root("d:"));
        assert!(!w.is_root("C:\\Windows"));
    }

    #[test]
    fn test_known_roots_are_roots() {
        let w = PathResolver::windows().with_known_root("C:\\Data\\LocalState\\");
        assert!(w.is_root("C:\\Data\\LocalState"));
        assert!(w.is_root("c:/data/localstate"));
        assert!(!w.is_root("C:\\Data"));

        let r = PathResolver::posix().with_known_root("/var/app/local");
        assert!(r.is_root("/var/app/local/"));
        assert!(!r.is_root("/VAR/app/local"));
    }

    #[test]
    fn test_leaf_name() {
        let r = PathResolver::posix();
        assert_eq!(r.leaf_name("/home/user/file.txt"), "file.txt");
        assert_eq!(r.leaf_name("/home/user/"), "user");
        assert_eq!(r.leaf_name("file.txt"), "file.txt");
        assert_eq!(r.leaf_name("/"), "");

        let w = PathResolver::windows();
        assert_eq!(w.leaf_name("C:\\"), "");
        assert_eq!(w.leaf_name("C:\\a"), "a");
        assert_eq!(w.leaf_name("C:/a/b.txt"), "b.txt");
    }

    #[test]
    fn test_extension() {
        let r = PathResolver::posix();
        assert_eq!(r.extension("report.txt"), ".txt");
        assert_eq!(r.extension(".gitignore"), ".gitignore");
        assert_eq!(r.extension("README"), "");
        assert_eq!(r.extension("/archive.tar.gz"), ".gz");
        assert_eq!(r.extension("/dir.d/file"), "");
        assert_eq!(r.extension("trailing."), "");
    }

    #[test]
    fn test_file_stem() {
        let r = PathResolver::posix();
        assert_eq!(r.file_stem("/a/report.txt"), "report");
        assert_eq!(r.file_stem(".gitignore"), "");
        assert_eq!(r.file_stem("README"), "README");
    }

    #[test]
    fn test_parent() {
        let r = PathResolver::posix();
        assert_eq!(r.parent("/home/user/docs"), Some("/home/user"));
        assert_eq!(r.parent("/home"), Some("/"));
        assert_eq!(r.parent("/"), None);
        assert_eq!(r.parent("file.txt"), None);

        let w = PathResolver::windows();
        assert_eq!(w.parent("C:\\Users"), Some("C:\\"));
        assert_eq!(w.parent("C:\\"), None);
    }

    #[test]
    fn test_contains_separator() {
        let r = PathResolver::posix();
        assert!(r.contains_separator("a/b"));
        assert!(r.contains_separator("a\\b"));
        assert!(!r.contains_separator("a.b"));
    }

    #[test]
    fn test_storage_path_equality_follows_case_rules() {
        let a = StoragePath::new(windows(), "C:\\Data\\File.TXT");
        let b = StoragePath::new(windows(), "c:/data/file.txt");
        assert_eq!(a, b);

        let c = StoragePath::new(posix(), "/data/File.txt");
        let d = StoragePath::new(posix(), "/data/file.txt");
        assert_ne!(c, d);
    }

    #[test]
    fn test_storage_path_accessors() {
        let path = StoragePath::new(posix(), "/home/user/report.txt");
        assert_eq!(path.leaf_name(), "report.txt");
        assert_eq!(path.extension(), ".txt");
        assert_eq!(path.file_stem(), "report");
        assert_eq!(path.parent().unwrap().as_str(), "/home/user");
        assert_eq!(path.to_string(), "/home/user/report.txt");
        assert_eq!(path.to_path_buf(), PathBuf::from("/home/user/report.txt"));
    }

    #[test]
    fn test_is_within() {
        let r = PathResolver::posix();
        assert!(r.is_within("/data/d/a.txt", "/data/d"));
        assert!(r.is_within("/data/d", "/data/d/"));
        assert!(r.is_within("/data/d/a.txt", "/"));
        assert!(!r.is_within("/data/dd/a.txt", "/data/d"));
        assert!(!r.is_within("/data", "/data/d"));
        assert!(!r.is_within("/DATA/d/a.txt", "/data/d"));

        let w = PathResolver::windows();
        assert!(w.is_within(r"C:\Data\D\a.txt", "c:/data/d"));
        assert!(!w.is_within(r"D:\Data", r"C:\"));

        let file = StoragePath::new(posix(), "/data/d/a.txt");
        assert!(file.is_within(&StoragePath::new(posix(), "/data/d")));
        assert!(!file.is_within(&StoragePath::new(posix(), "/data/e")));
    }

    #[test]
    fn test_storage_path_join() {
        let root = StoragePath::new(posix(), "/");
        let path = root.join("home").join("user");
        assert_eq!(path.as_str(), "/home/user");
        assert_eq!(path.combine(&["a", "b"]), path.join("a").join("b"));
    }
}
