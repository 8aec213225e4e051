// Filename sanitizing and the input -> output naming contract shared with the tool

use lazy_static::lazy_static;
use regex::Regex;
use unicode_normalization::UnicodeNormalization;

lazy_static! {
    static ref UNSAFE_CHARS: Regex =
        Regex::new(r"[^A-Za-z0-9_.-]").expect("filename character class is a valid regex");
}

/// Reduce a client-supplied filename to a single safe path component.
///
/// Accented letters are folded to ASCII (NFKD, combining marks dropped), path
/// separators become word breaks, whitespace runs collapse to `_`, anything
/// outside `[A-Za-z0-9_.-]` is dropped and leading/trailing `.`/`_` are
/// stripped. Returns `None` when nothing usable is left.
pub fn sanitize_filename(raw: &str) -> Option<String> {
    let ascii: String = raw.nfkd().filter(char::is_ascii).collect();
    let normalized = ascii.replace(['/', '\\'], " ");
    let joined = normalized.split_whitespace().collect::<Vec<_>>().join("_");
    let cleaned = UNSAFE_CHARS.replace_all(&joined, "");
    let trimmed = cleaned.trim_matches(|c| c == '.' || c == '_');
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

/// True when `name` is already in sanitized form, i.e. safe to join onto a storage directory.
pub fn is_safe_name(name: &str) -> bool {
    sanitize_filename(name).as_deref() == Some(name)
}

/// Split `photo.large.jpg` into (`photo.large`, `.jpg`); names without a dot have no extension.
pub fn split_name(name: &str) -> (&str, &str) {
    match name.rfind('.') {
        Some(idx) if !name[..idx].trim_start_matches('.').is_empty() => name.split_at(idx),
        _ => (name, ""),
    }
}

/// The file name the tool is expected to write for a given input: `{base}_{suffix}{ext}`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NamingContract {
    suffix: String,
}

impl NamingContract {
    pub fn new(suffix: impl Into<String>) -> Self {
        Self {
            suffix: suffix.into(),
        }
    }

    /// Value handed to the tool's `--suffix` flag.
    pub fn suffix(&self) -> &str {
        &self.suffix
    }

    pub fn output_name(&self, input_name: &str) -> String {
        let (base, ext) = split_name(input_name);
        format!("{base}_{}{ext}", self.suffix)
    }
}

impl Default for NamingContract {
    fn default() -> Self {
        Self::new("out")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_plain_names() {
        assert_eq!(sanitize_filename("photo.jpg").as_deref(), Some("photo.jpg"));
        assert_eq!(
            sanitize_filename("my holiday photo (1).png").as_deref(),
            Some("my_holiday_photo_1.png")
        );
    }

    #[test]
    fn test_sanitize_folds_accents() {
        assert_eq!(sanitize_filename("ünïcode.jpg").as_deref(), Some("unicode.jpg"));
        assert_eq!(sanitize_filename("Café crème.png").as_deref(), Some("Cafe_creme.png"));
        assert_eq!(sanitize_filename("ﬁle.png").as_deref(), Some("file.png"));
        assert_eq!(sanitize_filename("写真.jpg").as_deref(), Some("jpg"));
    }

    #[test]
    fn test_sanitize_confines_traversal() {
        assert_eq!(sanitize_filename("../../etc/passwd").as_deref(), Some("etc_passwd"));
        assert_eq!(
            sanitize_filename("..\\..\\windows\\system.ini").as_deref(),
            Some("windows_system.ini")
        );
        assert_eq!(sanitize_filename("/abs/path.png").as_deref(), Some("abs_path.png"));
        for raw in ["../../etc/passwd", "/etc/shadow", "a/../../b.jpg", ".hidden"] {
            let name = sanitize_filename(raw).unwrap();
            assert!(!name.contains('/') && !name.contains('\\'), "{raw} -> {name}");
            assert!(!name.starts_with('.'), "{raw} -> {name}");
        }
    }

    #[test]
    fn test_sanitize_rejects_empty() {
        assert_eq!(sanitize_filename(""), None);
        assert_eq!(sanitize_filename("   "), None);
        assert_eq!(sanitize_filename("../.."), None);
        assert_eq!(sanitize_filename("???"), None);
    }

    #[test]
    fn test_is_safe_name() {
        assert!(is_safe_name("photo_out.jpg"));
        assert!(!is_safe_name("../photo.jpg"));
        assert!(!is_safe_name("a/b.jpg"));
        assert!(!is_safe_name(".."));
        assert!(!is_safe_name(""));
    }

    #[test]
    fn test_split_name() {
        assert_eq!(split_name("photo.jpg"), ("photo", ".jpg"));
        assert_eq!(split_name("archive.tar.gz"), ("archive.tar", ".gz"));
        assert_eq!(split_name("README"), ("README", ""));
        assert_eq!(split_name(".bashrc"), (".bashrc", ""));
    }

    #[test]
    fn test_output_name() {
        let contract = NamingContract::default();
        assert_eq!(contract.output_name("photo.jpg"), "photo_out.jpg");
        assert_eq!(contract.output_name("scan"), "scan_out");
        assert_eq!(NamingContract::new("x4").output_name("a.b.png"), "a.b_x4.png");
    }
}
