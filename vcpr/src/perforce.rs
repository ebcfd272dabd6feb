use std::path::Path;
use std::process::Command;

use vcpp::vcs::Vcs;

const OPENED_MARKER: &str = "opened for edit";

/// Checks files out of Perforce with `p4 edit` before they are written.
/// The server address is an explicit parameter; when absent, `p4` falls back
/// to `P4PORT` from the environment.
pub struct Perforce {
    port: Option<String>,
}

impl Perforce {
    #[must_use]
    pub fn new(port: Option<String>) -> Self {
        Self { port }
    }
}

impl Vcs for Perforce {
    fn open_for_edit(&self, path: &Path) -> bool {
        let mut edit = Command::new("p4");
        if let Some(port) = &self.port {
            edit.arg("-p").arg(port);
        }
        edit.arg("edit").arg(path);
        match edit.output() {
            Ok(output) => String::from_utf8_lossy(&output.stdout)
                .to_lowercase()
                .contains(OPENED_MARKER),
            Err(e) => {
                tracing::error!("p4 edit {} failed: {e}", path.display());
                false
            }
        }
    }
}
