use crate::errors::LocsmithError;
use std::path::{Path, PathBuf};
use tracing::warn;
use walkdir::{DirEntry, WalkDir};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileType {
    StringCatalog,
    Manifest,
}

impl FileType {
    pub fn extension(self) -> &'static str {
        match self {
            FileType::StringCatalog => "xcstrings",
            FileType::Manifest => "json",
        }
    }

    /// Infers the type from a path's extension. Extension-less paths
    /// (directories, usually) default to string catalogs.
    pub fn infer(path: &Path) -> Result<Self, LocsmithError> {
        match path.extension().and_then(|ext| ext.to_str()) {
            None => Ok(FileType::StringCatalog),
            Some("xcstrings") => Ok(FileType::StringCatalog),
            Some("json") => Ok(FileType::Manifest),
            Some(other) => Err(LocsmithError::UnhandledFileType(other.to_string())),
        }
    }
}

/// Enumerates translatable files at a path for one file type.
pub struct FileFinder {
    path: PathBuf,
    file_type: FileType,
}

impl FileFinder {
    pub fn new(path: impl Into<PathBuf>, file_type: Option<FileType>) -> Result<Self, LocsmithError> {
        let path = path.into();
        let file_type = match file_type {
            Some(explicit) => explicit,
            None => FileType::infer(&path)?,
        };
        Ok(Self { path, file_type })
    }

    pub fn file_type(&self) -> FileType {
        self.file_type
    }

    /// A missing path or an empty result is a warning, not an error.
    pub fn find(&self) -> Result<Vec<PathBuf>, LocsmithError> {
        if !self.path.exists() {
            warn!(path = ?self.path, "Path does not exist; nothing to translate");
            return Ok(Vec::new());
        }
        if self.path.is_file() {
            if self.matches(&self.path) {
                return Ok(vec![self.path.clone()]);
            }
            warn!(
                path = ?self.path,
                expected = self.file_type.extension(),
                "File does not match the expected extension"
            );
            return Ok(Vec::new());
        }

        let mut found = Vec::new();
        let walker = WalkDir::new(&self.path)
            .into_iter()
            .filter_entry(|entry| entry.depth() == 0 || !is_hidden(entry));
        for entry in walker {
            let entry = entry.map_err(|source| LocsmithError::CouldNotSearchDirectory {
                path: self.path.clone(),
                source,
            })?;
            if entry.file_type().is_file() && self.matches(entry.path()) {
                found.push(entry.into_path());
            }
        }
        found.sort();
        if found.is_empty() {
            warn!(
                path = ?self.path,
                extension = self.file_type.extension(),
                "No translatable files found"
            );
        }
        Ok(found)
    }

    fn matches(&self, path: &Path) -> bool {
        path.extension().and_then(|ext| ext.to_str()) == Some(self.file_type.extension())
    }
}

fn is_hidden(entry: &DirEntry) -> bool {
    entry
        .file_name()
        .to_str()
        .map(|name| name.starts_with('.'))
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn infers_type_from_extension() {
        assert_eq!(
            FileType::infer(Path::new("App.xcstrings")).unwrap(),
            FileType::StringCatalog
        );
        assert_eq!(
            FileType::infer(Path::new("plan.json")).unwrap(),
            FileType::Manifest
        );
        assert_eq!(
            FileType::infer(Path::new("some/dir")).unwrap(),
            FileType::StringCatalog
        );
        assert!(matches!(
            FileType::infer(Path::new("notes.txt")),
            Err(LocsmithError::UnhandledFileType(ext)) if ext == "txt"
        ));
    }

    #[test]
    fn finds_single_matching_file() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("App.xcstrings");
        fs::write(&file, "{}").unwrap();
        let finder = FileFinder::new(&file, None).unwrap();
        assert_eq!(finder.find().unwrap(), vec![file]);
    }

    #[test]
    fn walks_directories_and_skips_hidden_entries() {
        let dir = TempDir::new().unwrap();
        fs::create_dir_all(dir.path().join("a/b")).unwrap();
        fs::create_dir_all(dir.path().join(".git")).unwrap();
        fs::write(dir.path().join("a/App.xcstrings"), "{}").unwrap();
        fs::write(dir.path().join("a/b/Other.xcstrings"), "{}").unwrap();
        fs::write(dir.path().join(".git/Sneaky.xcstrings"), "{}").unwrap();
        fs::write(dir.path().join("a/readme.md"), "").unwrap();

        let finder = FileFinder::new(dir.path(), None).unwrap();
        let found = finder.find().unwrap();
        assert_eq!(
            found,
            vec![
                dir.path().join("a/App.xcstrings"),
                dir.path().join("a/b/Other.xcstrings"),
            ]
        );
    }

    #[test]
    fn missing_path_yields_empty() {
        let finder = FileFinder::new("does/not/exist", None).unwrap();
        assert!(finder.find().unwrap().is_empty());
    }

    #[test]
    fn forced_type_overrides_inference() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("plan.json");
        fs::write(&file, "{}").unwrap();
        let finder = FileFinder::new(&file, Some(FileType::StringCatalog)).unwrap();
        // a manifest path searched as a catalog matches nothing
        assert!(finder.find().unwrap().is_empty());
    }
}
