use std::path::Path;

/// Version control seam invoked before a project file is overwritten in
/// place. Implementations live with their callers; the library only needs
/// the checkout contract.
pub trait Vcs {
    /// Makes `path` writable in the underlying version control system.
    /// Returns `false` when the checkout failed and the file must not be
    /// written; the pending changes for that file are then discarded.
    fn open_for_edit(&self, path: &Path) -> bool;
}

/// No version control: every file is considered writable.
pub struct NullVcs;

impl Vcs for NullVcs {
    fn open_for_edit(&self, _: &Path) -> bool {
        true
    }
}
