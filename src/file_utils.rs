use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use uuid::Uuid;
use walkdir::WalkDir;

// @module: File and directory utilities

// @struct: File operations utility
pub struct FileManager;

impl FileManager {
    // @checks: File existence
    pub fn file_exists<P: AsRef<Path>>(path: P) -> bool {
        path.as_ref().is_file()
    }

    // @creates: Directory and parents if needed
    pub fn ensure_dir<P: AsRef<Path>>(path: P) -> io::Result<()> {
        let path = path.as_ref();
        if !path.exists() {
            fs::create_dir_all(path)?;
        }
        Ok(())
    }

    // @returns: Fresh unique token for artifact names
    pub fn unique_token() -> String {
        Uuid::new_v4().to_string()
    }

    // @generates: `<dir>/<uuid>[.<tag>].<extension>`
    pub fn unique_path<P: AsRef<Path>>(dir: P, tag: Option<&str>, extension: &str) -> PathBuf {
        let file_name = match tag {
            Some(tag) => format!("{}.{}.{}", Self::unique_token(), tag, extension),
            None => format!("{}.{}", Self::unique_token(), extension),
        };
        dir.as_ref().join(file_name)
    }

    // @generates: `<dir>/<stem>_<uuid>.<ext>` next to the source file
    pub fn translated_sibling_path<P: AsRef<Path>>(source: P) -> PathBuf {
        let source = source.as_ref();
        let stem = source
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_else(|| "subtitles".to_string());
        let extension = source
            .extension()
            .map(|e| e.to_string_lossy().to_string())
            .unwrap_or_else(|| "srt".to_string());

        source.with_file_name(format!("{}_{}.{}", stem, Self::unique_token(), extension))
    }

    /// Find files in `dir` (non-recursive) whose name starts with `stem`
    pub fn find_by_stem<P: AsRef<Path>>(dir: P, stem: &str) -> io::Result<Vec<PathBuf>> {
        let mut result = Vec::new();
        for entry in WalkDir::new(dir.as_ref()).max_depth(1) {
            let entry = entry.map_err(io::Error::other)?;
            let path = entry.path();
            let matches = path
                .file_name()
                .map(|n| n.to_string_lossy().starts_with(stem))
                .unwrap_or(false);
            if path.is_file() && matches {
                result.push(path.to_path_buf());
            }
        }
        result.sort();
        Ok(result)
    }

    /// Read a file to a string
    pub fn read_to_string<P: AsRef<Path>>(path: P) -> io::Result<String> {
        fs::read_to_string(path)
    }

    /// Write a string to a file, creating the parent directory
    pub fn write_to_file<P: AsRef<Path>>(path: P, content: &str) -> io::Result<()> {
        if let Some(parent) = path.as_ref().parent() {
            Self::ensure_dir(parent)?;
        }
        fs::write(path, content)
    }

    /// Write a string so that `path` either holds all of it or does not exist
    ///
    /// Content goes to a temporary file in the destination directory first,
    /// which is renamed into place once fully written.
    pub fn write_atomically<P: AsRef<Path>>(path: P, content: &str) -> io::Result<()> {
        let path = path.as_ref();
        let dir = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        Self::ensure_dir(&dir)?;

        let mut file = NamedTempFile::new_in(&dir)?;
        file.write_all(content.as_bytes())?;
        file.flush()?;
        file.persist(path).map_err(|e| e.error)?;
        Ok(())
    }
}
