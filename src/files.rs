use std::io::{self, Write};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

const INDENT: &str = "    ";
const HIGHLIGHT: &str = " <---------------------";

/// Lowercase each extension and make sure it starts with a dot.
pub fn normalize_extensions<S: AsRef<str>>(extensions: &[S]) -> Vec<String> {
    extensions
        .iter()
        .map(|e| e.as_ref().trim().to_lowercase())
        .filter(|e| !e.is_empty() && e != ".")
        .map(|e| if e.starts_with('.') { e } else { format!(".{}", e) })
        .collect()
}

/// Case-insensitive suffix match against already-normalized extensions.
pub fn matches_extension(file_name: &str, extensions: &[String]) -> bool {
    let lower = file_name.to_lowercase();
    extensions.iter().any(|ext| lower.ends_with(ext.as_str()))
}

/// Every regular file under `root` whose name matches one of `extensions`,
/// in a stable (name-sorted, depth-first) order.
pub fn discover_files<S: AsRef<str>>(root: &Path, extensions: &[S]) -> io::Result<Vec<PathBuf>> {
    if !root.is_dir() {
        return Err(io::Error::new(
            io::ErrorKind::NotFound,
            format!("'{}' is not a directory", root.display()),
        ));
    }
    let extensions = normalize_extensions(extensions);

    let mut files = Vec::new();
    for entry in WalkDir::new(root).sort_by_file_name() {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                log::warn!("Skipping unreadable entry: {}", e);
                continue;
            }
        };
        if !entry.file_type().is_file() {
            continue;
        }
        if matches_extension(&entry.file_name().to_string_lossy(), &extensions) {
            files.push(entry.into_path());
        }
    }
    Ok(files)
}

/// Print the tree below `root`, four spaces per level, marking files whose
/// extension matches.
pub fn list_tree<S: AsRef<str>, W: Write>(root: &Path, extensions: &[S], out: &mut W) -> io::Result<()> {
    let extensions = normalize_extensions(extensions);

    for entry in WalkDir::new(root).min_depth(1).sort_by_file_name() {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                log::warn!("Skipping unreadable entry: {}", e);
                continue;
            }
        };
        let name = entry.file_name().to_string_lossy();
        let highlight = entry.file_type().is_file() && matches_extension(&name, &extensions);
        writeln!(
            out,
            "{}{}{}",
            INDENT.repeat(entry.depth() - 1),
            name,
            if highlight { HIGHLIGHT } else { "" }
        )?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn fixture() -> TempDir {
        let dir = TempDir::new().unwrap();
        fs::create_dir_all(dir.path().join("docs/nested")).unwrap();
        fs::write(dir.path().join("a.txt"), "a").unwrap();
        fs::write(dir.path().join("b.rs"), "b").unwrap();
        fs::write(dir.path().join("docs/C.TXT"), "c").unwrap();
        fs::write(dir.path().join("docs/nested/d.pdf"), "d").unwrap();
        dir
    }

    #[test]
    fn test_normalize_extensions() {
        assert_eq!(normalize_extensions(&["TXT", ".pdf", " md ", ""]), vec![".txt", ".pdf", ".md"]);
    }

    #[test]
    fn test_discover_files_filters_case_insensitively() {
        let dir = fixture();
        let files = discover_files(dir.path(), &["txt", "pdf"]).unwrap();
        let names: Vec<String> = files
            .iter()
            .map(|p| p.strip_prefix(dir.path()).unwrap().to_string_lossy().replace('\\', "/"))
            .collect();
        assert_eq!(names, vec!["a.txt", "docs/C.TXT", "docs/nested/d.pdf"]);
    }

    #[test]
    fn test_discover_files_requires_directory() {
        let dir = fixture();
        assert!(discover_files(&dir.path().join("a.txt"), &["txt"]).is_err());
    }

    #[test]
    fn test_list_tree_marks_matches() {
        let dir = fixture();
        let mut out = Vec::new();
        list_tree(dir.path(), &["rs"], &mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(
            lines,
            vec![
                "a.txt",
                "b.rs <---------------------",
                "docs",
                "    C.TXT",
                "    nested",
                "        d.pdf",
            ]
        );
    }
}
