//! services/api/src/adapters/source_files.rs
//!
//! Filesystem adapter for the `SourceFileService` port. Every path handed in
//! by a caller is relative to the source root and must live under `src/`.

use aravalli_core::ports::{PortError, PortResult, SourceFileService};
use async_trait::async_trait;
use ignore::WalkBuilder;
use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};
use tracing::{debug, warn};

const SOURCE_PREFIX: &str = "src/";
const ALLOWED_EXTENSIONS: &[&str] = &["tsx", "ts", "css", "rs"];
const EXCLUDED_DIR: &str = "node_modules";
const ENCODED_MARKERS: &[&str] = &["%2e", "%2f", "%5c", "%25"];

/// Serves the `src/` tree below a fixed root directory.
#[derive(Clone, Debug)]
pub struct LocalSourceFiles {
    root: PathBuf,
}

impl LocalSourceFiles {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn source_dir(&self) -> PathBuf {
        self.root.join("src")
    }

    /// Validates `path` and returns the absolute location it names, confirmed
    /// to stay inside the source directory even through symlinks.
    async fn resolve(&self, path: &str) -> PortResult<PathBuf> {
        let relative = validate_relative_path(path)?;
        let source_dir = self.source_dir();
        let canonical_base = tokio::fs::canonicalize(&source_dir)
            .await
            .map_err(|_| PortError::NotFound(format!("Source directory missing: {}", path)))?;

        let target = canonical_base.join(&relative);
        ensure_within(&canonical_base, &target).await?;
        Ok(target)
    }
}

/// Lexical checks on a caller-supplied path. Returns the portion after `src/`.
pub fn validate_relative_path(path: &str) -> PortResult<PathBuf> {
    let invalid = || PortError::InvalidPath(path.to_string());

    let Some(rest) = path.strip_prefix(SOURCE_PREFIX) else {
        return Err(invalid());
    };
    if rest.is_empty() || rest.ends_with('/') {
        return Err(invalid());
    }
    if path.contains("..") || path.contains('\\') || path.contains('\0') {
        return Err(invalid());
    }
    let lowered = path.to_ascii_lowercase();
    if ENCODED_MARKERS.iter().any(|marker| lowered.contains(marker)) {
        return Err(invalid());
    }

    let relative = PathBuf::from(rest);
    if !relative
        .components()
        .all(|component| matches!(component, Component::Normal(_)))
    {
        return Err(invalid());
    }
    Ok(relative)
}

/// Canonicalizes the deepest existing ancestor of `target` and checks it is
/// still below `base`.
async fn ensure_within(base: &Path, target: &Path) -> PortResult<()> {
    let mut probe = target.to_path_buf();
    loop {
        match tokio::fs::canonicalize(&probe).await {
            Ok(resolved) => {
                if resolved.starts_with(base) {
                    return Ok(());
                }
                warn!(path = %target.display(), "Path escapes the source directory");
                return Err(PortError::InvalidPath(target.display().to_string()));
            }
            Err(e) if e.kind() == ErrorKind::NotFound => {
                if !probe.pop() {
                    return Err(PortError::InvalidPath(target.display().to_string()));
                }
            }
            Err(e) => return Err(PortError::Unexpected(e.to_string())),
        }
    }
}

fn has_allowed_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ALLOWED_EXTENSIONS.contains(&ext))
        .unwrap_or(false)
}

/// Joins the components of `path` below `root` with forward slashes.
fn to_relative_string(root: &Path, path: &Path) -> Option<String> {
    let relative = path.strip_prefix(root).ok()?;
    let parts: Option<Vec<&str>> = relative.components().map(|c| c.as_os_str().to_str()).collect();
    Some(parts?.join("/"))
}

/// Walks `source_dir` without following links, skipping `node_modules`.
/// A missing directory is an empty listing.
fn scan_sources(root: &Path, source_dir: &Path) -> Vec<String> {
    if !source_dir.is_dir() {
        return Vec::new();
    }

    let mut builder = WalkBuilder::new(source_dir);
    builder.standard_filters(false).follow_links(false);
    builder.filter_entry(|entry| entry.file_name() != EXCLUDED_DIR);

    let mut files = Vec::new();
    for result in builder.build() {
        let entry = match result {
            Ok(entry) => entry,
            Err(e) => {
                warn!(error = %e, "Skipping unreadable entry while listing sources");
                continue;
            }
        };
        let is_file = entry.file_type().map(|t| t.is_file()).unwrap_or(false);
        if !is_file || !has_allowed_extension(entry.path()) {
            continue;
        }
        if let Some(relative) = to_relative_string(root, entry.path()) {
            files.push(relative);
        }
    }

    files.sort();
    files
}

fn io_error(path: &str, e: std::io::Error) -> PortError {
    match e.kind() {
        ErrorKind::NotFound => PortError::NotFound(format!("File not found: {}", path)),
        _ => PortError::Unexpected(format!("{}: {}", path, e)),
    }
}

#[async_trait]
impl SourceFileService for LocalSourceFiles {
    async fn list_files(&self) -> PortResult<Vec<String>> {
        let root = self.root.clone();
        let source_dir = self.source_dir();
        let files = tokio::task::spawn_blocking(move || scan_sources(&root, &source_dir))
            .await
            .map_err(|e| PortError::Unexpected(format!("File listing task failed: {}", e)))?;

        debug!(count = files.len(), "Listed source files");
        Ok(files)
    }

    async fn read_file(&self, path: &str) -> PortResult<String> {
        let target = self.resolve(path).await?;
        tokio::fs::read_to_string(&target)
            .await
            .map_err(|e| io_error(path, e))
    }

    async fn write_file(&self, path: &str, content: &str) -> PortResult<()> {
        let target = self.resolve(path).await?;
        let parent = target
            .parent()
            .ok_or_else(|| PortError::InvalidPath(path.to_string()))?;
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|e| io_error(path, e))?;

        let file_name = target
            .file_name()
            .and_then(|name| name.to_str())
            .ok_or_else(|| PortError::InvalidPath(path.to_string()))?;
        let temp = parent.join(format!(".{}.{}.tmp", file_name, uuid::Uuid::new_v4()));

        tokio::fs::write(&temp, content)
            .await
            .map_err(|e| io_error(path, e))?;
        if let Err(e) = tokio::fs::rename(&temp, &target).await {
            let _ = tokio::fs::remove_file(&temp).await;
            return Err(io_error(path, e));
        }

        debug!(path, bytes = content.len(), "Wrote source file");
        Ok(())
    }

    async fn remove_file(&self, path: &str) -> PortResult<()> {
        let target = self.resolve(path).await?;
        match tokio::fs::remove_file(&target).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(io_error(path, e)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn tree() -> (TempDir, LocalSourceFiles) {
        let dir = TempDir::new().unwrap();
        let src = dir.path().join("src");
        std::fs::create_dir_all(src.join("components")).unwrap();
        std::fs::create_dir_all(src.join("node_modules/pkg")).unwrap();
        std::fs::write(src.join("App.tsx"), "app").unwrap();
        std::fs::write(src.join("index.css"), "body {}").unwrap();
        std::fs::write(src.join("components/Sidebar.tsx"), "sidebar").unwrap();
        std::fs::write(src.join("components/logo.png"), "png").unwrap();
        std::fs::write(src.join("node_modules/pkg/index.ts"), "dep").unwrap();
        std::fs::write(dir.path().join("server.ts"), "outside").unwrap();
        let files = LocalSourceFiles::new(dir.path());
        (dir, files)
    }

    #[test]
    fn rejects_paths_outside_src() {
        for bad in [
            "App.tsx",
            "src/",
            "src/../server.ts",
            "src/components/",
            "src//etc/passwd",
            "src/a\\b.ts",
            "src/%2e%2e/server.ts",
            "src/%2E%2E%2Fserver.ts",
            "src/%252e/x.ts",
            "src/./App.tsx",
            "src/a\0.ts",
        ] {
            assert!(
                matches!(validate_relative_path(bad), Err(PortError::InvalidPath(_))),
                "accepted {:?}",
                bad
            );
        }
        assert!(validate_relative_path("src/components/Sidebar.tsx").is_ok());
    }

    #[tokio::test]
    async fn lists_allowed_files_sorted() {
        let (_dir, files) = tree();
        let listed = files.list_files().await.unwrap();
        assert_eq!(
            listed,
            vec!["src/App.tsx", "src/components/Sidebar.tsx", "src/index.css"]
        );
    }

    #[tokio::test]
    async fn ignore_files_do_not_hide_sources() {
        let (dir, files) = tree();
        std::fs::write(dir.path().join("src/.gitignore"), "*.css\n").unwrap();
        std::fs::create_dir_all(dir.path().join("src/.hidden")).unwrap();
        std::fs::write(dir.path().join("src/.hidden/theme.ts"), "theme").unwrap();

        let listed = files.list_files().await.unwrap();
        assert!(listed.contains(&"src/index.css".to_string()));
        assert!(listed.contains(&"src/.hidden/theme.ts".to_string()));
        assert!(!listed.iter().any(|p| p.contains("node_modules")));
    }

    #[tokio::test]
    async fn missing_source_dir_lists_nothing() {
        let dir = TempDir::new().unwrap();
        let files = LocalSourceFiles::new(dir.path());
        assert!(files.list_files().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn read_write_and_remove() {
        let (dir, files) = tree();
        assert_eq!(files.read_file("src/App.tsx").await.unwrap(), "app");
        assert!(matches!(
            files.read_file("src/Missing.tsx").await,
            Err(PortError::NotFound(_))
        ));

        files.write_file("src/App.tsx", "new app").await.unwrap();
        assert_eq!(
            std::fs::read_to_string(dir.path().join("src/App.tsx")).unwrap(),
            "new app"
        );

        files.write_file("src/pages/New.tsx", "page").await.unwrap();
        assert_eq!(files.read_file("src/pages/New.tsx").await.unwrap(), "page");

        files.remove_file("src/pages/New.tsx").await.unwrap();
        files.remove_file("src/pages/New.tsx").await.unwrap();
        assert!(!dir.path().join("src/pages/New.tsx").exists());

        let leftovers: Vec<_> = std::fs::read_dir(dir.path().join("src"))
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_name().to_string_lossy().ends_with(".tmp"))
            .collect();
        assert!(leftovers.is_empty());
    }

    #[tokio::test]
    async fn write_outside_root_is_rejected() {
        let (dir, files) = tree();
        assert!(matches!(
            files.write_file("src/../server.ts", "pwned").await,
            Err(PortError::InvalidPath(_))
        ));
        assert_eq!(
            std::fs::read_to_string(dir.path().join("server.ts")).unwrap(),
            "outside"
        );
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn symlinked_directories_cannot_escape() {
        let (dir, files) = tree();
        let outside = TempDir::new().unwrap();
        std::fs::write(outside.path().join("secret.ts"), "secret").unwrap();
        std::os::unix::fs::symlink(outside.path(), dir.path().join("src/link")).unwrap();

        assert!(matches!(
            files.read_file("src/link/secret.ts").await,
            Err(PortError::InvalidPath(_))
        ));
        assert!(!files
            .list_files()
            .await
            .unwrap()
            .iter()
            .any(|p| p.contains("secret")));
    }
}
