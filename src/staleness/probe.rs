use std::path::Path;

/// Answers whether a worktree directory is present on disk.
pub trait WorktreeProbe: Sync {
    fn exists(&self, path: &Path) -> bool;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct FilesystemProbe;

impl WorktreeProbe for FilesystemProbe {
    fn exists(&self, path: &Path) -> bool {
        path.exists()
    }
}
