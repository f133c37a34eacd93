//! Archive dependency generation for source trees.
//!
//! Runs inside mk: for each tool source tree, emits the dependency lines
//! tying the per-platform archive targets to the tree's git HEAD, plus a
//! `newbins` variable collecting every emitted target.

use anyhow::{anyhow, Result};
use std::path::{Path, PathBuf};

/// Language a source tree builds with, detected from its build manifest.
#[derive(Clone, Copy, Debug, PartialEq)]
enum TreeKind {
    Go,
    Swift,
    Rust,
}

fn classify(pkg_root: &Path) -> Option<TreeKind> {
    if pkg_root.join("Package.swift").exists() {
        return Some(TreeKind::Swift);
    }
    if pkg_root.join("go.mod").exists() {
        return Some(TreeKind::Go);
    }
    if pkg_root.join("Cargo.toml").exists() {
        return Some(TreeKind::Rust);
    }
    None
}

/// Platform matrix a tree of the given kind is archived for.
fn platform_matrix(kind: TreeKind) -> &'static [(&'static str, &'static str)] {
    match kind {
        // Swift builds are macOS-only
        TreeKind::Swift => &[("darwin", "x86_64"), ("darwin", "aarch64")],
        TreeKind::Go | TreeKind::Rust => &[
            ("linux", "x86_64"),
            ("linux", "aarch64"),
            ("darwin", "x86_64"),
            ("darwin", "aarch64"),
        ],
    }
}

/// Walk up from `path` to the enclosing git checkout root.
fn find_pkg_root(path: &Path) -> Result<PathBuf> {
    let mut current = path.to_path_buf();
    loop {
        if current.join(".git").exists() {
            return Ok(current);
        }
        if !current.pop() || current.as_os_str().is_empty() {
            return Err(anyhow!(
                "no .git in any parent of {}",
                path.display()
            ));
        }
    }
}

/// Generated dependency rules and the accumulated target list.
#[derive(Debug)]
pub struct BinDeps {
    /// One `archive/os/arch/bin: repo/.git/HEAD` line per platform target
    pub rules: Vec<String>,
    /// Every archive target, for the trailing `newbins` variable
    pub newbins: Vec<String>,
}

impl BinDeps {
    /// Render as the mk fragment the command prints.
    pub fn render(&self) -> String {
        let mut out = self.rules.join("\n");
        out.push_str("\n\nnewbins = \\\n\t");
        out.push_str(&self.newbins.join(" \\\n\t"));
        out.push('\n');
        out
    }
}

/// Generate archive dependencies for each source tree path.
pub fn bin_deps(archive: &str, paths: &[PathBuf]) -> Result<BinDeps> {
    let mut rules = Vec::new();
    let mut newbins = Vec::new();

    for path in paths {
        let pkg_root = find_pkg_root(path)
            .map_err(|e| anyhow!("binary {} is not a git-tracked tool: {}", path.display(), e))?;
        let kind = classify(&pkg_root).ok_or_else(|| {
            anyhow!(
                "binary {} does not use a supported language",
                path.display()
            )
        })?;

        let bin = path
            .file_name()
            .ok_or_else(|| anyhow!("can't take a binary name from {}", path.display()))?
            .to_string_lossy()
            .to_string();
        let dep_root = pkg_root.join(".git").join("HEAD");

        for (os, arch) in platform_matrix(kind) {
            let target = format!("{}/{}/{}/{}", archive, os, arch, bin);
            rules.push(format!("{}: {}", target, dep_root.display()));
            newbins.push(target);
        }
    }

    Ok(BinDeps { rules, newbins })
}
