use std::collections::BTreeMap;
use std::process::Stdio;
use std::time::Duration;

use futures::future::join_all;
use tokio::process::Command;

use crate::constants::PROBE_TIMEOUT_MS;
use crate::core::language::LanguageRegistry;

/// Reports, per language, whether its toolchain answers `--version`.
///
/// Probes run concurrently and never fail: a missing or hanging tool is
/// simply unavailable.
pub async fn probe(registry: &LanguageRegistry) -> BTreeMap<String, bool> {
    let checks = registry.iter().map(|language| async move {
        let available = match language.toolchain() {
            Some(tool) => is_available(tool).await,
            None => false,
        };
        tracing::debug!("Toolchain for {}: available={}", language.id, available);
        (language.id.to_string(), available)
    });

    join_all(checks).await.into_iter().collect()
}

/// Some tools reject `--version` but still print usage, which is enough to
/// know they are installed.
async fn is_available(tool: &str) -> bool {
    let child = Command::new(tool)
        .arg("--version")
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn();

    let child = match child {
        Ok(child) => child,
        Err(e) => {
            tracing::debug!("`{}` cannot be started: {}", tool, e);
            return false;
        }
    };

    match tokio::time::timeout(
        Duration::from_millis(PROBE_TIMEOUT_MS),
        child.wait_with_output(),
    )
    .await
    {
        Ok(Ok(output)) => {
            output.status.success() || !output.stdout.is_empty() || !output.stderr.is_empty()
        }
        Ok(Err(e)) => {
            tracing::debug!("`{}` failed: {}", tool, e);
            false
        }
        Err(_) => false,
    }
}
