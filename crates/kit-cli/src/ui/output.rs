//! Console output handle used by commands and the install flow.

use crossterm::style::Stylize;
use kit_core::Reporter;
use kit_schema::{PackageName, Version};

use super::theme::{Theme, format_size};

/// Writes styled status lines. Progress and info go to stdout and are
/// dropped in quiet mode; warnings and failures always go to stderr.
#[derive(Debug, Clone, Default)]
pub struct Output {
    theme: Theme,
    quiet: bool,
}

impl Output {
    /// Create an output handle; `quiet` drops progress and info lines.
    pub fn with_quiet(quiet: bool) -> Self {
        Self {
            theme: Theme::default(),
            quiet,
        }
    }

    fn label(&self, name: &PackageName, version: &Version) -> String {
        format!(
            "{} {}",
            name.as_str().with(self.theme.colors.package_name).bold(),
            version.as_str().with(self.theme.colors.version)
        )
    }

    fn progress(&self, icon: &str, msg: &str) {
        if !self.quiet {
            println!("  {} {msg}", icon.with(self.theme.colors.active));
        }
    }

    /// Prints a visual section header for an operation phase.
    pub fn section(&self, title: &str) {
        if !self.quiet {
            println!("{}", title.bold());
        }
    }

    /// Prints an informational message.
    pub fn info(&self, msg: &str) {
        if !self.quiet {
            println!("  {} {msg}", self.theme.icons.info.with(self.theme.colors.secondary));
        }
    }

    /// Prints a success message.
    pub fn success(&self, msg: &str) {
        println!("{} {msg}", self.theme.icons.success.with(self.theme.colors.success));
    }

    /// Prints a warning message.
    pub fn warning(&self, msg: &str) {
        eprintln!("{} {msg}", self.theme.icons.warning.with(self.theme.colors.warning));
    }

    /// Prints an error message.
    pub fn error(&self, msg: &str) {
        eprintln!("{} {msg}", self.theme.icons.error.with(self.theme.colors.error));
    }

    /// Prints an indented `key: value` detail line.
    pub fn detail(&self, key: &str, value: &str) {
        println!("  {} {value}", format!("{key}:").with(self.theme.colors.secondary));
    }
}

impl Reporter for Output {
    fn section(&self, title: &str) {
        self.section(title);
    }

    fn downloading(&self, name: &PackageName, version: &Version, current: u64, total: Option<u64>) {
        let label = self.label(name, version);
        match total {
            _ if current == 0 => {
                let size = total.map(|t| format!(" ({})", format_size(t))).unwrap_or_default();
                self.progress(self.theme.icons.active, &format!("Downloading {label}{size}"));
            }
            Some(total) if current == total => {
                self.progress(self.theme.icons.active, &format!("Downloaded {}", format_size(total)));
            }
            _ => {}
        }
    }

    fn extracting(&self, name: &PackageName, version: &Version) {
        let label = self.label(name, version);
        self.progress(self.theme.icons.active, &format!("Extracting {label}"));
    }

    fn installing(&self, name: &PackageName, version: &Version) {
        let label = self.label(name, version);
        self.progress(self.theme.icons.active, &format!("Installing {label}"));
    }

    fn done(&self, name: &PackageName, version: &Version, detail: &str) {
        let label = self.label(name, version);
        self.success(&format!("{label} {}", detail.with(self.theme.colors.secondary)));
    }

    fn failed(&self, name: &PackageName, version: &Version, reason: &str) {
        let label = self.label(name, version);
        self.error(&format!("{label} {reason}"));
    }

    fn info(&self, msg: &str) {
        self.info(msg);
    }

    fn warning(&self, msg: &str) {
        self.warning(msg);
    }
}
