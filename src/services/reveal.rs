use anyhow::{Context, Result};
use camino::Utf8Path;
use std::process::Command;

/// "Show this path in the OS file browser", one variant per platform.
///
/// Chosen once at startup with [`FileRevealer::detect`]; the log view calls
/// [`FileRevealer::reveal`] when the artifact link is clicked.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileRevealer {
    /// Windows Explorer: selects files, opens directories
    Explorer,
    /// macOS Finder: reveals files, opens directories
    Finder,
    /// freedesktop `xdg-open`: opens the containing directory of files
    XdgOpen,
}

impl FileRevealer {
    /// Revealer for the platform this binary was built for
    pub fn detect() -> Self {
        if cfg!(target_os = "windows") {
            FileRevealer::Explorer
        } else if cfg!(target_os = "macos") {
            FileRevealer::Finder
        } else {
            FileRevealer::XdgOpen
        }
    }

    /// Program and arguments that reveal `path`
    pub fn command_line(self, path: &Utf8Path, is_file: bool) -> (&'static str, Vec<String>) {
        match (self, is_file) {
            (FileRevealer::Explorer, true) => {
                ("explorer", vec!["/select,".to_string(), path.to_string()])
            }
            (FileRevealer::Explorer, false) => ("explorer", vec![path.to_string()]),
            (FileRevealer::Finder, true) => ("open", vec!["-R".to_string(), path.to_string()]),
            (FileRevealer::Finder, false) => ("open", vec![path.to_string()]),
            (FileRevealer::XdgOpen, true) => {
                let folder = path.parent().unwrap_or(path);
                ("xdg-open", vec![folder.to_string()])
            }
            (FileRevealer::XdgOpen, false) => ("xdg-open", vec![path.to_string()]),
        }
    }

    /// Spawn the file browser for `path`.
    ///
    /// Returns `Ok(false)` without spawning anything when the path does not exist.
    pub fn reveal(self, path: &Utf8Path) -> Result<bool> {
        if !path.exists() {
            tracing::debug!("Not revealing missing path: {}", path);
            return Ok(false);
        }

        let (program, args) = self.command_line(path, path.is_file());
        tracing::info!("Revealing {} with {}", path, program);

        Command::new(program)
            .args(&args)
            .spawn()
            .with_context(|| format!("Failed to launch {} for {}", program, path))?;
        Ok(true)
    }
}

impl Default for FileRevealer {
    fn default() -> Self {
        Self::detect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_explorer_selects_files() {
        let (program, args) =
            FileRevealer::Explorer.command_line(Utf8Path::new(r"C:\out\a.zip"), true);
        assert_eq!(program, "explorer");
        assert_eq!(args, vec!["/select,".to_string(), r"C:\out\a.zip".to_string()]);
    }

    #[test]
    fn test_finder_reveals_files() {
        let (program, args) = FileRevealer::Finder.command_line(Utf8Path::new("/out/a.zip"), true);
        assert_eq!(program, "open");
        assert_eq!(args, vec!["-R".to_string(), "/out/a.zip".to_string()]);
    }

    #[test]
    fn test_xdg_open_uses_parent_for_files() {
        let (program, args) = FileRevealer::XdgOpen.command_line(Utf8Path::new("/out/a.zip"), true);
        assert_eq!(program, "xdg-open");
        assert_eq!(args, vec!["/out".to_string()]);

        let (_, args) = FileRevealer::XdgOpen.command_line(Utf8Path::new("/out"), false);
        assert_eq!(args, vec!["/out".to_string()]);
    }

    #[test]
    fn test_missing_path_is_ignored() {
        let revealed = FileRevealer::detect()
            .reveal(Utf8Path::new("/definitely/not/here.zip"))
            .unwrap();
        assert!(!revealed);
    }
}
