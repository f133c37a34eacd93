//! mk variable generation.
//!
//! Prints the machine facts the personal mkfiles key their targets on:
//! platform, home directory, package system, and install path.

use std::path::Path;

/// Determine the packaging scheme by probing for its tooling.
///
/// Only meaningful on Linux; returns None when nothing recognizable is
/// present.
fn package_system() -> Option<&'static str> {
    if Path::new("/usr/bin/apt").exists() {
        return Some("debian");
    }
    if Path::new("/sbin/apk").exists() {
        return Some("alpine");
    }
    if Path::new("/home/chronos").exists() {
        // Container OS or ChromeOS
        return Some("cos");
    }
    None
}

/// Assemble the `name = value` pairs for the vars command.
pub fn mk_vars(target_path: &Path) -> Vec<(String, String)> {
    let os = std::env::consts::OS;
    let arch = std::env::consts::ARCH;

    let mut vars = vec![
        ("os".to_string(), os.to_string()),
        ("arch".to_string(), arch.to_string()),
        ("suffix".to_string(), os.to_string()),
    ];

    if let Some(home) = dirs::home_dir() {
        vars.push(("home".to_string(), home.display().to_string()));
    }

    let mut platformtargets = vec![os, arch];
    if os == "linux" {
        if let Some(flavour) = package_system() {
            vars.push(("packagesystem".to_string(), flavour.to_string()));
            platformtargets.push(flavour);
        }
    }
    vars.push((
        "platformtargets".to_string(),
        platformtargets.join("_"),
    ));

    vars.push((
        "targetpath".to_string(),
        target_path.display().to_string(),
    ));

    vars
}
