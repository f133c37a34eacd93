//! Authorized installation of prebuilt artifacts.
//!
//! Downloads binaries, fonts, and man pages from a private object store
//! through the token lifecycle's authorized transport. In essence, wget
//! with a bearer token and a naming convention.

use anyhow::{bail, Context, Result};
use std::path::Path;
use tracing::info;

use crate::oauth::TokenLifecycle;

/// Object-store base hosting the prebuilt artifacts.
pub const DEFAULT_BASE_URL: &str = "storage.googleapis.com/boot-tools-liqui-org";

/// Resolve an artifact name to its store URL and install mode.
///
/// Fonts and man pages live in flat shared directories; everything else is
/// a per-platform executable.
fn artifact_url(base_url: &str, name: &str) -> (String, u32) {
    match Path::new(name).extension().and_then(|e| e.to_str()) {
        Some("ttf") | Some("otf") => (format!("https://{}/fonts/{}", base_url, name), 0o644),
        Some("1") => (format!("https://{}/mans/{}", base_url, name), 0o644),
        _ => (
            format!(
                "https://{}/{}/{}/{}",
                base_url,
                std::env::consts::OS,
                std::env::consts::ARCH,
                name
            ),
            0o755,
        ),
    }
}

/// Download each target into `target_path` and persist any refreshed token.
///
/// The write-back happens once, after all downloads complete; a failed
/// download aborts the batch with the error surfaced as-is.
pub async fn install_targets(
    lifecycle: &TokenLifecycle,
    target_path: &Path,
    base_url: &str,
    targets: &[String],
) -> Result<()> {
    let mut client = lifecycle.authorized_client().await?;

    tokio::fs::create_dir_all(target_path)
        .await
        .with_context(|| format!("can't create target path {}", target_path.display()))?;

    for name in targets {
        let (url, mode) = artifact_url(base_url, name);
        let local = target_path.join(name);
        info!(%url, local = %local.display(), "installing");

        let response = client.get(&url).await?;
        if !response.status().is_success() {
            bail!("can't GET {}: {}", url, response.status());
        }
        let body = response
            .bytes()
            .await
            .with_context(|| format!("can't download {}", url))?;

        tokio::fs::write(&local, &body)
            .await
            .with_context(|| format!("can't write {}", local.display()))?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(&local, std::fs::Permissions::from_mode(mode))
                .with_context(|| format!("can't set {} perms", local.display()))?;
        }
        #[cfg(not(unix))]
        let _ = mode;
    }

    lifecycle.finish(client)?;
    Ok(())
}
