use std::path::Path;

use miette::{miette, Result};

const MARKER: &str = "sandbox.txt";

/// Relative, `/`-separated path from the project file's directory to
/// `<sandbox>/<subdir>`, where the sandbox root is the nearest ancestor
/// directory holding a `sandbox.txt` marker.
///
/// # Errors
///
/// Fails when no marker exists above the project or the sandbox does not
/// contain `subdir`. Both are per-file conditions: the caller skips the file
/// and carries on with the rest of the tree.
pub fn relative_subdir(project: &Path, subdir: &str) -> Result<String> {
    let dir = project
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    let mut ups = 0usize;
    for ancestor in dir.ancestors() {
        if ancestor.join(MARKER).is_file() {
            if !ancestor.join(subdir).is_dir() {
                return Err(miette!(
                    "{subdir} is not located in the sandbox {}",
                    ancestor.display()
                ));
            }
            let mut parts = vec![".."; ups];
            parts.push(subdir);
            return Ok(parts.join("/"));
        }
        ups += 1;
    }
    Err(miette!(
        "no {MARKER} marker found above {}",
        project.display()
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn sandbox() -> tempfile::TempDir {
        let root = tempfile::tempdir().unwrap();
        fs::write(root.path().join(MARKER), "sandbox").unwrap();
        fs::create_dir(root.path().join("Boost")).unwrap();
        fs::create_dir_all(root.path().join("src").join("engine")).unwrap();
        root
    }

    #[test]
    fn nested_project_gets_parent_hops() {
        // Arrange
        let root = sandbox();
        let project = root.path().join("src").join("engine").join("engine.vcproj");

        // Act
        let actual = relative_subdir(&project, "Boost").unwrap();

        // Assert
        assert_eq!(actual, "../../Boost");
    }

    #[test]
    fn project_at_sandbox_root() {
        // Arrange
        let root = sandbox();
        let project = root.path().join("all.vcproj");

        // Act
        let actual = relative_subdir(&project, "Boost").unwrap();

        // Assert
        assert_eq!(actual, "Boost");
    }

    #[test]
    fn missing_subdir_is_an_error() {
        // Arrange
        let root = sandbox();
        let project = root.path().join("all.vcproj");

        // Act
        let actual = relative_subdir(&project, "cache");

        // Assert
        assert!(actual.is_err());
    }

    #[test]
    fn missing_marker_is_an_error() {
        // Arrange
        let root = tempfile::tempdir().unwrap();
        let project = root.path().join("all.vcproj");

        // Act
        let actual = relative_subdir(&project, "Boost");

        // Assert
        assert!(actual.is_err());
    }
}
