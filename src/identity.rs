//! Project path identity resolution.
//!
//! A project can be named in four path dialects: native Windows
//! (`C:\Users\me\proj`), native Unix (`/home/me/proj`), a WSL UNC view of a
//! Linux tree from Windows (`\\wsl$\Ubuntu\home\me\proj`), and a WSL mount
//! view of a Windows tree from Linux (`/mnt/c/Users/me/proj`). All spellings
//! of the same tree must collapse to one canonical identity so that index
//! state written under one dialect is found under any other.
//!
//! Resolution is purely lexical. Nothing here touches the filesystem, so the
//! same input maps to the same identity on every host.

use std::path::PathBuf;

use crate::error::UplinkError;

/// A resolved project location.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectPath {
    /// Canonical identity: forward slashes, uppercase drive letter, no
    /// redundant segments. Keys the state store and the remote index.
    pub identity: String,
    /// Local path the scanner walks. Differs from `identity` only for the
    /// mount dialect, where the walkable form stays under `/mnt`.
    pub root: PathBuf,
}

/// Resolve any supported path dialect to its canonical identity.
///
/// Fails with [`UplinkError::InvalidPath`] for relative paths, drive-relative
/// Windows paths (`C:foo`), UNC hosts other than `wsl$`/`wsl.localhost`, and
/// paths whose `..` segments climb past the root.
pub fn resolve(input: &str) -> Result<ProjectPath, UplinkError> {
    let path = input.trim();
    if path.is_empty() {
        return Err(UplinkError::invalid_path(input, "empty path"));
    }

    let mut chars = path.chars();
    let first = chars.next().unwrap_or_default();
    let second = chars.next();

    if is_sep(first) && second.is_some_and(is_sep) {
        return resolve_unc(input, &path[2..]);
    }
    if first.is_ascii_alphabetic() && second == Some(':') {
        return resolve_windows(input, first, &path[2..]);
    }
    if first == '/' {
        return resolve_unix(input, path);
    }

    Err(UplinkError::invalid_path(
        input,
        "expected an absolute Windows, Unix, WSL UNC, or /mnt path",
    ))
}

fn is_sep(c: char) -> bool {
    c == '/' || c == '\\'
}

/// Collapse a raw segment stream: drop empties and `.`, pop on `..`.
fn normalize_segments<'a>(
    raw: impl Iterator<Item = &'a str>,
    input: &str,
) -> Result<Vec<&'a str>, UplinkError> {
    let mut segments = Vec::new();
    for segment in raw {
        match segment {
            "" | "." => {}
            ".." => {
                if segments.pop().is_none() {
                    return Err(UplinkError::invalid_path(input, "path escapes its root"));
                }
            }
            s => segments.push(s),
        }
    }
    Ok(segments)
}

fn windows_identity(drive: char, segments: &[&str]) -> String {
    let drive = drive.to_ascii_uppercase();
    if segments.is_empty() {
        format!("{}:/", drive)
    } else {
        format!("{}:/{}", drive, segments.join("/"))
    }
}

fn unix_identity(segments: &[&str]) -> String {
    if segments.is_empty() {
        "/".to_string()
    } else {
        format!("/{}", segments.join("/"))
    }
}

fn mount_root(drive: char, segments: &[&str]) -> PathBuf {
    let drive = drive.to_ascii_lowercase();
    if segments.is_empty() {
        PathBuf::from(format!("/mnt/{}", drive))
    } else {
        PathBuf::from(format!("/mnt/{}/{}", drive, segments.join("/")))
    }
}

/// `C:\...` or `C:/...`, rest starting right after the colon.
fn resolve_windows(input: &str, drive: char, rest: &str) -> Result<ProjectPath, UplinkError> {
    if !rest.chars().next().is_some_and(is_sep) {
        return Err(UplinkError::invalid_path(
            input,
            "drive-relative paths are not absolute",
        ));
    }
    let segments = normalize_segments(rest.split(is_sep), input)?;
    let identity = windows_identity(drive, &segments);
    Ok(ProjectPath {
        root: PathBuf::from(&identity),
        identity,
    })
}

/// Unix-rooted input. A normalized `/mnt/<drive>/...` prefix is the mount
/// dialect and canonicalizes to the Windows drive form while the walkable
/// root stays under `/mnt`.
fn resolve_unix(input: &str, path: &str) -> Result<ProjectPath, UplinkError> {
    let segments = normalize_segments(path.split(is_sep), input)?;

    if segments.len() >= 2 && segments[0] == "mnt" {
        if let Some(drive) = drive_letter(segments[1]) {
            return Ok(ProjectPath {
                identity: windows_identity(drive, &segments[2..]),
                root: mount_root(drive, &segments[2..]),
            });
        }
    }

    let identity = unix_identity(&segments);
    Ok(ProjectPath {
        root: PathBuf::from(&identity),
        identity,
    })
}

/// `\\wsl$\{distro}\...` or `\\wsl.localhost\{distro}\...`, body starting
/// after the two leading separators. The distro segment names which VM holds
/// the tree, not a directory in it, so it is stripped before normalization.
fn resolve_unc(input: &str, body: &str) -> Result<ProjectPath, UplinkError> {
    let mut parts = body.splitn(2, is_sep);
    let host = parts.next().unwrap_or("");
    if !host.eq_ignore_ascii_case("wsl$") && !host.eq_ignore_ascii_case("wsl.localhost") {
        return Err(UplinkError::invalid_path(
            input,
            "only \\\\wsl$ and \\\\wsl.localhost UNC hosts are recognized",
        ));
    }

    let after_host = parts.next().unwrap_or("");
    let mut rest = after_host.splitn(2, is_sep);
    let distro = rest.next().unwrap_or("");
    if distro.is_empty() || distro == "." || distro == ".." {
        return Err(UplinkError::invalid_path(input, "missing distribution name"));
    }

    let tail = rest.next().unwrap_or("");
    let segments = normalize_segments(tail.split(is_sep), input)?;
    let identity = unix_identity(&segments);
    Ok(ProjectPath {
        root: PathBuf::from(&identity),
        identity,
    })
}

fn drive_letter(segment: &str) -> Option<char> {
    let mut chars = segment.chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) if c.is_ascii_alphabetic() => Some(c),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn identity(input: &str) -> String {
        resolve(input).unwrap().identity
    }

    fn root(input: &str) -> PathBuf {
        resolve(input).unwrap().root
    }

    #[test]
    fn test_native_windows_backslashes() {
        assert_eq!(identity(r"C:\Users\foo"), "C:/Users/foo");
    }

    #[test]
    fn test_native_windows_forward_slashes() {
        assert_eq!(identity("C:/Users/foo"), "C:/Users/foo");
    }

    #[test]
    fn test_windows_mixed_separators() {
        assert_eq!(identity(r"C:/Users\foo/src"), "C:/Users/foo/src");
    }

    #[test]
    fn test_drive_letter_uppercased() {
        assert_eq!(identity(r"c:\proj"), "C:/proj");
        assert_eq!(identity("d:/proj"), "D:/proj");
    }

    #[test]
    fn test_mount_dialect_maps_to_drive() {
        assert_eq!(identity("/mnt/c/Users/foo"), "C:/Users/foo");
    }

    #[test]
    fn test_three_spellings_one_identity() {
        let canonical = identity(r"C:\Users\foo");
        assert_eq!(identity("C:/Users/foo"), canonical);
        assert_eq!(identity("/mnt/c/Users/foo"), canonical);
    }

    #[test]
    fn test_mount_root_stays_under_mnt() {
        assert_eq!(root("/mnt/c/Users/foo"), PathBuf::from("/mnt/c/Users/foo"));
        assert_eq!(root("/mnt/C/Users/foo"), PathBuf::from("/mnt/c/Users/foo"));
    }

    #[test]
    fn test_windows_root_uses_identity_form() {
        assert_eq!(root(r"C:\Users\foo"), PathBuf::from("C:/Users/foo"));
    }

    #[test]
    fn test_mount_drive_only() {
        assert_eq!(identity("/mnt/c"), "C:/");
        assert_eq!(root("/mnt/c"), PathBuf::from("/mnt/c"));
    }

    #[test]
    fn test_mnt_without_drive_is_plain_unix() {
        assert_eq!(identity("/mnt"), "/mnt");
        assert_eq!(identity("/mnt/data/proj"), "/mnt/data/proj");
    }

    #[test]
    fn test_native_unix() {
        assert_eq!(identity("/home/foo/proj"), "/home/foo/proj");
        assert_eq!(root("/home/foo/proj"), PathBuf::from("/home/foo/proj"));
    }

    #[test]
    fn test_unix_root() {
        assert_eq!(identity("/"), "/");
    }

    #[test]
    fn test_unc_wsl_dollar() {
        assert_eq!(identity(r"\\wsl$\Ubuntu\home\foo"), "/home/foo");
    }

    #[test]
    fn test_unc_wsl_localhost() {
        assert_eq!(identity(r"\\wsl.localhost\Debian\home\foo"), "/home/foo");
    }

    #[test]
    fn test_unc_host_case_insensitive() {
        assert_eq!(identity(r"\\WSL$\Ubuntu\home\foo"), "/home/foo");
    }

    #[test]
    fn test_unc_forward_slash_spelling() {
        assert_eq!(identity("//wsl$/Ubuntu/home/foo"), "/home/foo");
    }

    #[test]
    fn test_unc_matches_native_unix_identity() {
        assert_eq!(identity(r"\\wsl$\Ubuntu\home\foo"), identity("/home/foo"));
    }

    #[test]
    fn test_unc_distro_only_is_distro_root() {
        assert_eq!(identity(r"\\wsl$\Ubuntu"), "/");
    }

    #[test]
    fn test_redundant_separators_collapse() {
        assert_eq!(identity("C://Users///foo"), "C:/Users/foo");
        assert_eq!(identity("/home//foo/"), "/home/foo");
    }

    #[test]
    fn test_dot_segments_dropped() {
        assert_eq!(identity("/home/./foo/."), "/home/foo");
        assert_eq!(identity(r"C:\Users\.\foo"), "C:/Users/foo");
    }

    #[test]
    fn test_dotdot_resolved_lexically() {
        assert_eq!(identity("/home/bar/../foo"), "/home/foo");
        assert_eq!(identity(r"C:\Users\tmp\..\foo"), "C:/Users/foo");
    }

    #[test]
    fn test_dotdot_through_mount_prefix() {
        // Lexical resolution happens before dialect refinement.
        assert_eq!(identity("/mnt/../mnt/c/Users"), "C:/Users");
    }

    #[test]
    fn test_trailing_separator_ignored() {
        assert_eq!(identity(r"C:\Users\foo\"), "C:/Users/foo");
    }

    #[test]
    fn test_surrounding_whitespace_trimmed() {
        assert_eq!(identity("  /home/foo  "), "/home/foo");
    }

    #[test]
    fn test_interior_spaces_preserved() {
        assert_eq!(identity(r"C:\Program Files\proj"), "C:/Program Files/proj");
    }

    #[test]
    fn test_empty_input_rejected() {
        assert!(matches!(
            resolve(""),
            Err(UplinkError::InvalidPath { .. })
        ));
        assert!(matches!(
            resolve("   "),
            Err(UplinkError::InvalidPath { .. })
        ));
    }

    #[test]
    fn test_relative_input_rejected() {
        assert!(matches!(
            resolve("foo/bar"),
            Err(UplinkError::InvalidPath { .. })
        ));
        assert!(matches!(
            resolve("./foo"),
            Err(UplinkError::InvalidPath { .. })
        ));
    }

    #[test]
    fn test_drive_relative_rejected() {
        assert!(matches!(
            resolve("C:"),
            Err(UplinkError::InvalidPath { .. })
        ));
        assert!(matches!(
            resolve("C:foo"),
            Err(UplinkError::InvalidPath { .. })
        ));
    }

    #[test]
    fn test_unknown_unc_host_rejected() {
        assert!(matches!(
            resolve(r"\\server\share\docs"),
            Err(UplinkError::InvalidPath { .. })
        ));
    }

    #[test]
    fn test_unc_without_distro_rejected() {
        assert!(matches!(
            resolve(r"\\wsl$"),
            Err(UplinkError::InvalidPath { .. })
        ));
        assert!(matches!(
            resolve(r"\\wsl$\"),
            Err(UplinkError::InvalidPath { .. })
        ));
    }

    #[test]
    fn test_dotdot_escaping_root_rejected() {
        assert!(matches!(
            resolve("/.."),
            Err(UplinkError::InvalidPath { .. })
        ));
        assert!(matches!(
            resolve(r"C:\.."),
            Err(UplinkError::InvalidPath { .. })
        ));
        assert!(matches!(
            resolve("/home/../.."),
            Err(UplinkError::InvalidPath { .. })
        ));
    }

    #[test]
    fn test_resolution_is_deterministic() {
        let a = resolve(r"\\wsl$\Ubuntu\home\foo\proj").unwrap();
        let b = resolve(r"\\wsl$\Ubuntu\home\foo\proj").unwrap();
        assert_eq!(a, b);
    }
}
