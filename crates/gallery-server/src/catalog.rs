//! Filesystem catalog scanning.
//!
//! The media root is treated as a live, unindexed database: every scan
//! re-reads the root and its direct subdirectories. Subdirectories are
//! "collections"; anything deeper is ignored.

use std::ffi::OsStr;
use std::fs;
use std::hash::{Hash, Hasher};
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use crate::errors::CatalogError;
use crate::naming::format_name;

/// Video extensions recognized when no override is configured.
pub const DEFAULT_VIDEO_EXTENSIONS: [&str; 6] = ["mp4", "avi", "mov", "mkv", "webm", "m4v"];
const IMAGE_EXTENSIONS: [&str; 4] = ["jpg", "jpeg", "png", "webp"];

/// One playable file found by a scan.
///
/// Identity is the relative path; two entries with the same relative path
/// refer to the same logical video.
#[derive(Clone, Debug)]
pub struct CatalogEntry {
    /// Path under the media root, `/`-separated.
    pub relative_path: String,
    pub file_name: String,
    /// Parent directory name for collection entries.
    pub collection: Option<String>,
    pub is_root: bool,
    /// Last modification time, when the stat succeeded.
    pub modified: Option<SystemTime>,
}

impl PartialEq for CatalogEntry {
    fn eq(&self, other: &Self) -> bool {
        self.relative_path == other.relative_path
    }
}

impl Eq for CatalogEntry {}

impl Hash for CatalogEntry {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.relative_path.hash(state);
    }
}

impl CatalogEntry {
    fn root(file_name: String, modified: Option<SystemTime>) -> Self {
        Self {
            relative_path: file_name.clone(),
            file_name,
            collection: None,
            is_root: true,
            modified,
        }
    }

    fn in_collection(collection: String, file_name: String, modified: Option<SystemTime>) -> Self {
        Self {
            relative_path: format!("{collection}/{file_name}"),
            file_name,
            collection: Some(collection),
            is_root: false,
            modified,
        }
    }

    /// Title-cased collection name, if this entry belongs to a collection.
    pub fn collection_display_name(&self) -> Option<String> {
        self.collection.as_deref().map(format_name)
    }

    /// Absolute path of the video file under `root`.
    pub fn absolute_path(&self, root: &Path) -> PathBuf {
        match self.collection.as_deref() {
            Some(collection) => root.join(collection).join(&self.file_name),
            None => root.join(&self.file_name),
        }
    }
}

/// Summary of one collection directory.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CollectionSummary {
    pub name: String,
    pub display_name: String,
    pub video_count: usize,
    /// First image file found in the directory (cover art).
    pub image_file: Option<String>,
}

/// Scans a media root for recognized video files.
#[derive(Clone, Debug)]
pub struct Scanner {
    root: PathBuf,
    extensions: Vec<String>,
    excluded: Option<PathBuf>,
}

impl Scanner {
    /// Create a scanner using the default video extension set.
    pub fn new(root: PathBuf) -> Self {
        Self::with_extensions(
            root,
            DEFAULT_VIDEO_EXTENSIONS.iter().map(|s| s.to_string()).collect(),
        )
    }

    /// Create a scanner with a custom (case-insensitive) extension set.
    pub fn with_extensions(root: PathBuf, extensions: Vec<String>) -> Self {
        let extensions = extensions
            .into_iter()
            .map(|ext| ext.trim().trim_start_matches('.').to_ascii_lowercase())
            .filter(|ext| !ext.is_empty())
            .collect();
        Self {
            root,
            extensions,
            excluded: None,
        }
    }

    /// Skip `dir` when it is a direct child of the root, so an artifact
    /// directory placed there is never listed as a collection.
    pub fn excluding(mut self, dir: PathBuf) -> Self {
        self.excluded = Some(dir);
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// True when `name` ends in a recognized video extension.
    pub fn is_video_name(&self, name: &OsStr) -> bool {
        has_extension(Path::new(name), &self.extensions)
    }

    /// Read the whole tree and return every recognized video: root files by
    /// name, then each collection by directory name and its files by name.
    pub fn scan(&self) -> Result<Vec<CatalogEntry>, CatalogError> {
        let mut entries = Vec::new();
        let mut dirs = Vec::new();
        for child in self.read_root()? {
            match child {
                RootChild::File { name, modified } => {
                    if self.is_video_name(OsStr::new(&name)) {
                        entries.push(CatalogEntry::root(name, modified));
                    }
                }
                RootChild::Dir { name, path } => dirs.push((name, path)),
            }
        }
        for (name, path) in dirs {
            match self.videos_in(&path) {
                Ok(files) => entries.extend(files.into_iter().map(|(file, modified)| {
                    CatalogEntry::in_collection(name.clone(), file, modified)
                })),
                Err(err) => tracing::debug!(error = %err, "skipping collection"),
            }
        }
        Ok(entries)
    }

    /// Number of recognized videos in the tree.
    pub fn count(&self) -> Result<usize, CatalogError> {
        Ok(self.scan()?.len())
    }

    /// Names of the (non-hidden) collection directories currently present.
    pub fn collection_dirs(&self) -> Result<Vec<String>, CatalogError> {
        Ok(self
            .read_root()?
            .into_iter()
            .filter_map(|child| match child {
                RootChild::Dir { name, .. } => Some(name),
                RootChild::File { .. } => None,
            })
            .collect())
    }

    /// Collections with at least one video, with counts and cover images.
    pub fn collections(&self) -> Result<Vec<CollectionSummary>, CatalogError> {
        let mut out = Vec::new();
        for child in self.read_root()? {
            let RootChild::Dir { name, path } = child else {
                continue;
            };
            let video_count = match self.videos_in(&path) {
                Ok(files) => files.len(),
                Err(err) => {
                    tracing::debug!(error = %err, "skipping collection");
                    continue;
                }
            };
            if video_count == 0 {
                continue;
            }
            out.push(CollectionSummary {
                display_name: format_name(&name),
                image_file: find_image(&path),
                name,
                video_count,
            });
        }
        out.sort_by(|a, b| {
            a.display_name
                .to_lowercase()
                .cmp(&b.display_name.to_lowercase())
        });
        Ok(out)
    }

    /// Non-hidden children of the root, sorted by name. Symlinks are followed
    /// only when they resolve inside the root.
    fn read_root(&self) -> Result<Vec<RootChild>, CatalogError> {
        let unavailable = |source| CatalogError::CatalogUnavailable {
            root: self.root.clone(),
            source,
        };
        let canonical_root = self.root.canonicalize().map_err(unavailable)?;
        let mut children = Vec::new();
        for entry in fs::read_dir(&self.root).map_err(unavailable)? {
            let Ok(entry) = entry else {
                continue;
            };
            let name = entry.file_name().to_string_lossy().to_string();
            if name.starts_with('.') {
                continue;
            }
            let Ok(file_type) = entry.file_type() else {
                continue;
            };
            let path = entry.path();
            if self.excluded.as_deref() == Some(path.as_path()) {
                continue;
            }
            if file_type.is_symlink() && !resolves_under(&path, &canonical_root) {
                tracing::debug!(path = %path.display(), "skipping symlink leaving the media root");
                continue;
            }
            if path.is_dir() {
                children.push(RootChild::Dir { name, path });
            } else if path.is_file() {
                let modified = entry.metadata().ok().and_then(|m| m.modified().ok());
                children.push(RootChild::File { name, modified });
            }
        }
        children.sort_by(|a, b| a.name().cmp(b.name()));
        Ok(children)
    }

    fn videos_in(&self, dir: &Path) -> Result<Vec<(String, Option<SystemTime>)>, CatalogError> {
        let unreadable = |source| CatalogError::CollectionUnreadable {
            dir: dir.to_path_buf(),
            source,
        };
        let canonical_root = self.root.canonicalize().map_err(unreadable)?;
        let mut files = Vec::new();
        for entry in fs::read_dir(dir).map_err(unreadable)? {
            let Ok(entry) = entry else {
                continue;
            };
            let name = entry.file_name().to_string_lossy().to_string();
            if name.starts_with('.') {
                continue;
            }
            let path = entry.path();
            if !has_extension(&path, &self.extensions) || !path.is_file() {
                continue;
            }
            // Linked files must resolve under the root.
            if !resolves_under(&path, &canonical_root) {
                continue;
            }
            let modified = entry.metadata().ok().and_then(|m| m.modified().ok());
            files.push((name, modified));
        }
        files.sort_by(|a, b| a.0.cmp(&b.0));
        Ok(files)
    }
}

enum RootChild {
    File {
        name: String,
        modified: Option<SystemTime>,
    },
    Dir {
        name: String,
        path: PathBuf,
    },
}

impl RootChild {
    fn name(&self) -> &str {
        match self {
            RootChild::File { name, .. } | RootChild::Dir { name, .. } => name,
        }
    }
}

fn resolves_under(path: &Path, canonical_root: &Path) -> bool {
    path.canonicalize()
        .is_ok_and(|resolved| resolved.starts_with(canonical_root))
}

fn has_extension<S: AsRef<str>>(path: &Path, extensions: &[S]) -> bool {
    let Some(ext) = path.extension().and_then(OsStr::to_str) else {
        return false;
    };
    let ext = ext.to_ascii_lowercase();
    extensions.iter().any(|known| known.as_ref() == ext)
}

fn find_image(dir: &Path) -> Option<String> {
    let mut images = fs::read_dir(dir)
        .ok()?
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.path().is_file() && has_extension(&entry.path(), &IMAGE_EXTENSIONS))
        .map(|entry| entry.file_name().to_string_lossy().to_string())
        .collect::<Vec<_>>();
    images.sort();
    images.into_iter().next()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::touch;

    #[test]
    fn scan_finds_root_and_collection_videos() {
        let dir = tempfile::tempdir().unwrap();
        touch(&dir.path().join("a.mp4"));
        touch(&dir.path().join("B.MKV"));
        touch(&dir.path().join("notes.txt"));
        touch(&dir.path().join("Foo").join("c.mp4"));
        touch(&dir.path().join("Foo").join("cover.jpg"));
        touch(&dir.path().join("Foo").join("nested").join("deep.mp4"));

        let scanner = Scanner::new(dir.path().to_path_buf());
        let mut paths = scanner
            .scan()
            .unwrap()
            .into_iter()
            .map(|e| e.relative_path)
            .collect::<Vec<_>>();
        paths.sort();
        assert_eq!(paths, vec!["B.MKV", "Foo/c.mp4", "a.mp4"]);
    }

    #[test]
    fn root_flag_matches_missing_collection() {
        let dir = tempfile::tempdir().unwrap();
        touch(&dir.path().join("a.mp4"));
        touch(&dir.path().join("Foo").join("c.mp4"));

        let entries = Scanner::new(dir.path().to_path_buf()).scan().unwrap();
        for entry in entries {
            assert_eq!(entry.is_root, entry.collection.is_none());
        }
    }

    #[test]
    fn hidden_directories_are_ignored() {
        let dir = tempfile::tempdir().unwrap();
        touch(&dir.path().join(".gallery").join("a_preview.mp4"));
        touch(&dir.path().join("a.mp4"));

        let entries = Scanner::new(dir.path().to_path_buf()).scan().unwrap();
        assert_eq!(entries.len(), 1);
    }

    #[test]
    fn missing_root_is_catalog_unavailable() {
        let dir = tempfile::tempdir().unwrap();
        let scanner = Scanner::new(dir.path().join("does-not-exist"));
        assert!(matches!(
            scanner.scan(),
            Err(CatalogError::CatalogUnavailable { .. })
        ));
    }

    #[cfg(unix)]
    #[test]
    fn unreadable_collection_is_skipped() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        touch(&dir.path().join("a.mp4"));
        let locked = dir.path().join("Locked");
        touch(&locked.join("x.mp4"));
        std::fs::set_permissions(&locked, std::fs::Permissions::from_mode(0o000)).unwrap();

        let result = Scanner::new(dir.path().to_path_buf()).scan();
        std::fs::set_permissions(&locked, std::fs::Permissions::from_mode(0o755)).unwrap();

        let entries = result.unwrap();
        // Running as root bypasses permission bits; either way the scan succeeds.
        assert!(entries.iter().any(|e| e.relative_path == "a.mp4"));
    }

    #[test]
    fn custom_extensions_are_normalized() {
        let dir = tempfile::tempdir().unwrap();
        touch(&dir.path().join("clip.TS"));
        touch(&dir.path().join("clip.mp4"));

        let scanner = Scanner::with_extensions(dir.path().to_path_buf(), vec![".ts".to_string()]);
        let entries = scanner.scan().unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].file_name, "clip.TS");
    }

    #[test]
    fn collections_skip_empty_dirs_and_find_images() {
        let dir = tempfile::tempdir().unwrap();
        touch(&dir.path().join("jane_doe").join("one.mp4"));
        touch(&dir.path().join("jane_doe").join("two.webm"));
        touch(&dir.path().join("jane_doe").join("portrait.png"));
        std::fs::create_dir_all(dir.path().join("empty")).unwrap();
        touch(&dir.path().join("alpha").join("x.mov"));

        let collections = Scanner::new(dir.path().to_path_buf()).collections().unwrap();
        assert_eq!(collections.len(), 2);
        assert_eq!(collections[0].name, "alpha");
        assert_eq!(collections[1].display_name, "Jane Doe");
        assert_eq!(collections[1].video_count, 2);
        assert_eq!(collections[1].image_file.as_deref(), Some("portrait.png"));
    }

    #[test]
    fn scan_lists_root_files_then_collections_by_name() {
        let dir = tempfile::tempdir().unwrap();
        touch(&dir.path().join("zeta.mp4"));
        touch(&dir.path().join("Bravo").join("b2.mp4"));
        touch(&dir.path().join("Bravo").join("b1.mp4"));
        touch(&dir.path().join("Alpha").join("a.mp4"));
        touch(&dir.path().join("alpha.mp4"));

        let paths = Scanner::new(dir.path().to_path_buf())
            .scan()
            .unwrap()
            .into_iter()
            .map(|e| e.relative_path)
            .collect::<Vec<_>>();
        assert_eq!(
            paths,
            vec!["alpha.mp4", "zeta.mp4", "Alpha/a.mp4", "Bravo/b1.mp4", "Bravo/b2.mp4"]
        );
    }

    #[cfg(unix)]
    #[test]
    fn symlinks_leaving_the_root_are_not_listed() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("media");
        touch(&root.join("a.mp4"));
        touch(&dir.path().join("elsewhere").join("x.mp4"));
        touch(&dir.path().join("outside.mp4"));
        std::os::unix::fs::symlink(dir.path().join("elsewhere"), root.join("Linked")).unwrap();
        std::os::unix::fs::symlink(dir.path().join("outside.mp4"), root.join("link.mp4")).unwrap();
        touch(&root.join("Foo").join("c.mp4"));
        std::os::unix::fs::symlink(dir.path().join("outside.mp4"), root.join("Foo").join("l.mp4"))
            .unwrap();

        let scanner = Scanner::new(root.clone());
        let mut paths = scanner
            .scan()
            .unwrap()
            .into_iter()
            .map(|e| e.relative_path)
            .collect::<Vec<_>>();
        paths.sort();
        assert_eq!(paths, vec!["Foo/c.mp4", "a.mp4"]);
        assert_eq!(scanner.collection_dirs().unwrap(), vec!["Foo"]);
    }

    #[cfg(unix)]
    #[test]
    fn symlinks_inside_the_root_are_followed() {
        let dir = tempfile::tempdir().unwrap();
        touch(&dir.path().join("Real").join("x.mp4"));
        std::os::unix::fs::symlink(dir.path().join("Real"), dir.path().join("Alias")).unwrap();

        let mut paths = Scanner::new(dir.path().to_path_buf())
            .scan()
            .unwrap()
            .into_iter()
            .map(|e| e.relative_path)
            .collect::<Vec<_>>();
        paths.sort();
        assert_eq!(paths, vec!["Alias/x.mp4", "Real/x.mp4"]);
    }

    #[cfg(unix)]
    #[test]
    fn broken_entry_keeps_rest_of_collection() {
        let dir = tempfile::tempdir().unwrap();
        touch(&dir.path().join("Foo").join("a.mp4"));
        touch(&dir.path().join("Foo").join("b.mp4"));
        std::os::unix::fs::symlink(
            dir.path().join("nowhere.mp4"),
            dir.path().join("Foo").join("dangling.mp4"),
        )
        .unwrap();

        let paths = Scanner::new(dir.path().to_path_buf())
            .scan()
            .unwrap()
            .into_iter()
            .map(|e| e.relative_path)
            .collect::<Vec<_>>();
        assert_eq!(paths, vec!["Foo/a.mp4", "Foo/b.mp4"]);
    }

    #[test]
    fn excluded_directory_is_not_a_collection() {
        let dir = tempfile::tempdir().unwrap();
        touch(&dir.path().join("a.mp4"));
        touch(&dir.path().join("previews").join("a_preview.mp4"));

        let scanner =
            Scanner::new(dir.path().to_path_buf()).excluding(dir.path().join("previews"));
        let entries = scanner.scan().unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].relative_path, "a.mp4");
        assert!(scanner.collection_dirs().unwrap().is_empty());
        assert!(scanner.collections().unwrap().is_empty());
    }
}
