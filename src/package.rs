// Packaging of local projects into the zip archives the upload route expects.

use anyhow::{Context, Result};
use log::{debug, trace};
use std::fs::File;
use std::io::{self, Read, Seek, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use walkdir::{DirEntry, WalkDir};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

/// File names never shipped, wherever they appear.
pub const SKIPPED_FILES: &[&str] = &["deploy.zip", ".DS_Store", ".gitignore"];

/// Directories pruned together with everything below them.
pub const SKIPPED_DIRS: &[&str] = &["__pycache__", ".git", ".ebextensions"];

const ZIP_MAGICS: [[u8; 4]; 3] = [
    *b"PK\x03\x04", // local file header
    *b"PK\x05\x06", // end of central directory, empty archive
    *b"PK\x07\x08", // spanned archive
];

/// Whether a header starts with one of the zip signatures.
pub fn is_zip_magic(header: &[u8]) -> bool {
    header.len() >= 4 && ZIP_MAGICS.iter().any(|magic| header[..4] == magic[..])
}

/// Sniffs the first four bytes of `path`.
pub fn is_zip(path: &Path) -> Result<bool> {
    let file = File::open(path).with_context(|| format!("Failed to open {}", path.display()))?;
    let mut header = Vec::with_capacity(4);
    file.take(4)
        .read_to_end(&mut header)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    Ok(is_zip_magic(&header))
}

fn is_skipped_dir(entry: &DirEntry) -> bool {
    entry.depth() > 0
        && entry.file_type().is_dir()
        && entry
            .file_name()
            .to_str()
            .is_some_and(|name| SKIPPED_DIRS.contains(&name))
}

fn is_skipped_file(name: &str) -> bool {
    SKIPPED_FILES.contains(&name) || name.ends_with(".pyc")
}

fn options() -> SimpleFileOptions {
    SimpleFileOptions::default().compression_method(CompressionMethod::Deflated)
}

/// Archive name of `path` relative to `root`, always `/`-separated.
fn archive_name(root: &Path, path: &Path) -> Result<String> {
    let rel = path
        .strip_prefix(root)
        .with_context(|| format!("{} is outside {}", path.display(), root.display()))?;
    let parts: Vec<_> = rel
        .components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect();
    Ok(parts.join("/"))
}

/// Writes every shippable file under `root` into `writer` and returns the
/// archive names in the order they were added. Symlinks are stored as the
/// files they point to, under the link's own name.
pub fn zip_folder<W: Write + Seek>(root: &Path, writer: &mut ZipWriter<W>) -> Result<Vec<String>> {
    let mut added = Vec::new();
    let walker = WalkDir::new(root)
        .follow_links(true)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| !is_skipped_dir(e));

    for entry in walker {
        let entry = entry.with_context(|| format!("Failed to walk {}", root.display()))?;
        if !entry.file_type().is_file() {
            continue;
        }
        let file_name = entry.file_name().to_string_lossy();
        if is_skipped_file(&file_name) {
            trace!("skipping {}", entry.path().display());
            continue;
        }

        let name = archive_name(root, entry.path())?;
        debug!("adding {name}");
        writer
            .start_file(name.as_str(), options())
            .with_context(|| format!("Failed to add {name} to archive"))?;
        let mut file = File::open(entry.path())
            .with_context(|| format!("Failed to open {}", entry.path().display()))?;
        io::copy(&mut file, writer).with_context(|| format!("Failed to compress {name}"))?;
        added.push(name);
    }
    Ok(added)
}

/// Writes a single script and its requirements into `writer`.
pub fn zip_script<W: Write + Seek>(
    script: &Path,
    requirements: &Path,
    writer: &mut ZipWriter<W>,
) -> Result<()> {
    let script_name = script
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .with_context(|| format!("{} has no file name", script.display()))?;
    for (name, path) in [(script_name.as_str(), script), ("requirements.txt", requirements)] {
        writer
            .start_file(name, options())
            .with_context(|| format!("Failed to add {name} to archive"))?;
        let mut file =
            File::open(path).with_context(|| format!("Failed to open {}", path.display()))?;
        io::copy(&mut file, writer).with_context(|| format!("Failed to compress {name}"))?;
    }
    Ok(())
}

/// A finished archive in a temporary file. The file is deleted on drop.
pub struct Archive {
    file: NamedTempFile,
    pub entries: Vec<String>,
}

impl Archive {
    pub fn path(&self) -> &Path {
        self.file.path()
    }

    fn build<F>(fill: F) -> Result<Self>
    where
        F: FnOnce(&mut ZipWriter<File>) -> Result<Vec<String>>,
    {
        let tmp = tempfile::Builder::new()
            .prefix("funix-cloud-")
            .suffix(".zip")
            .tempfile()
            .context("Failed to create temporary archive")?;
        let handle = tmp.reopen().context("Failed to open temporary archive")?;
        let mut writer = ZipWriter::new(handle);
        let entries = fill(&mut writer)?;
        writer.finish().context("Failed to finish archive")?;
        Ok(Archive { file: tmp, entries })
    }

    /// Packs a project folder.
    pub fn from_folder(root: &Path) -> Result<Self> {
        Archive::build(|w| zip_folder(root, w))
    }

    /// Packs a single script together with the `requirements.txt` next to it.
    pub fn from_script(script: &Path) -> Result<Self> {
        let requirements = requirements_for(script);
        Archive::build(|w| {
            zip_script(script, &requirements, w)?;
            let name = script
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();
            Ok(vec![name, "requirements.txt".to_string()])
        })
    }
}

/// `requirements.txt` expected beside a script.
pub fn requirements_for(script: &Path) -> PathBuf {
    script
        .parent()
        .unwrap_or_else(|| Path::new("."))
        .join("requirements.txt")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use zip::ZipArchive;

    fn touch(root: &Path, rel: &str) {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, rel.as_bytes()).unwrap();
    }

    fn names_of(path: &Path) -> Vec<String> {
        let mut archive = ZipArchive::new(File::open(path).unwrap()).unwrap();
        let mut names: Vec<String> = (0..archive.len())
            .map(|i| archive.by_index(i).unwrap().name().to_string())
            .collect();
        names.sort();
        names
    }

    #[test]
    fn folder_excludes_denylist() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        for rel in [
            "main.py",
            "requirements.txt",
            "pkg/util.py",
            "pkg/util.pyc",
            "pkg/__pycache__/util.cpython-312.pyc",
            "pkg/__pycache__/notes.txt",
            ".git/HEAD",
            ".git/objects/ab/cdef",
            ".ebextensions/options.config",
            "deploy.zip",
            ".DS_Store",
            "static/.gitignore",
            "static/app.js",
        ] {
            touch(root, rel);
        }

        let archive = Archive::from_folder(root).unwrap();
        let expected = vec![
            "main.py".to_string(),
            "pkg/util.py".to_string(),
            "requirements.txt".to_string(),
            "static/app.js".to_string(),
        ];
        assert_eq!(names_of(archive.path()), expected);

        let mut entries = archive.entries.clone();
        entries.sort();
        assert_eq!(entries, expected);
    }

    #[test]
    fn folder_keeps_contents() {
        let dir = tempfile::tempdir().unwrap();
        touch(dir.path(), "app/main.py");
        let archive = Archive::from_folder(dir.path()).unwrap();
        let mut zip = ZipArchive::new(File::open(archive.path()).unwrap()).unwrap();
        let mut content = String::new();
        zip.by_name("app/main.py")
            .unwrap()
            .read_to_string(&mut content)
            .unwrap();
        assert_eq!(content, "app/main.py");
    }

    #[test]
    fn script_is_paired_with_requirements() {
        let dir = tempfile::tempdir().unwrap();
        touch(dir.path(), "hello.py");
        touch(dir.path(), "requirements.txt");
        let archive = Archive::from_script(&dir.path().join("hello.py")).unwrap();
        assert_eq!(
            names_of(archive.path()),
            vec!["hello.py".to_string(), "requirements.txt".to_string()]
        );
        assert!(is_zip(archive.path()).unwrap());
    }

    #[cfg(unix)]
    #[test]
    fn symlinked_files_are_packed_as_targets() {
        let dir = tempfile::tempdir().unwrap();
        let shared = tempfile::tempdir().unwrap();
        touch(dir.path(), "main.py");
        touch(shared.path(), "lib/shared.py");
        std::os::unix::fs::symlink(
            shared.path().join("lib/shared.py"),
            dir.path().join("shared.py"),
        )
        .unwrap();
        std::os::unix::fs::symlink(shared.path().join("lib"), dir.path().join("vendor")).unwrap();

        let archive = Archive::from_folder(dir.path()).unwrap();
        assert_eq!(
            names_of(archive.path()),
            vec![
                "main.py".to_string(),
                "shared.py".to_string(),
                "vendor/shared.py".to_string()
            ]
        );

        let mut zip = ZipArchive::new(File::open(archive.path()).unwrap()).unwrap();
        let mut content = String::new();
        zip.by_name("shared.py")
            .unwrap()
            .read_to_string(&mut content)
            .unwrap();
        assert_eq!(content, "lib/shared.py");
    }

    #[test]
    fn magic_sniffing() {
        assert!(is_zip_magic(b"PK\x03\x04rest"));
        assert!(is_zip_magic(b"PK\x05\x06"));
        assert!(is_zip_magic(b"PK\x07\x08"));
        assert!(!is_zip_magic(b"PK\x01\x02"));
        assert!(!is_zip_magic(b"\x7fELF"));
        assert!(!is_zip_magic(b"PK"));
        assert!(!is_zip_magic(b""));
    }

    #[test]
    fn sniff_reads_files() {
        let dir = tempfile::tempdir().unwrap();
        let text = dir.path().join("main.py");
        fs::write(&text, "print('hi')").unwrap();
        let short = dir.path().join("short");
        fs::write(&short, "PK").unwrap();
        assert!(!is_zip(&text).unwrap());
        assert!(!is_zip(&short).unwrap());
    }
}
