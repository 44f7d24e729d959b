pub mod detector;
pub mod probe;
pub mod vcs;

pub use detector::{
    BranchAction, BranchOutcome, OwnerStatus, StaleWorktree, StalenessDetector, StalenessReport,
};
pub use probe::{FilesystemProbe, WorktreeProbe};
pub use vcs::{parse_worktree_porcelain, GitCli, VcsError, VersionControl};
