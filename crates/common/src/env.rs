//! Environment/runtime helpers
//!
//! Sanity checks to ensure expected directories exist at startup.

use tracing::{debug, warn};

/// Ensure the data directory exists and is writable enough to create.
pub async fn ensure_env(data_dir: &str) -> anyhow::Result<()> {
    match tokio::fs::metadata(data_dir).await {
        Ok(meta) if !meta.is_dir() => {
            return Err(anyhow::anyhow!("{data_dir} exists but is not a directory"));
        }
        Ok(_) => debug!(%data_dir, "data directory present"),
        Err(_) => warn!(%data_dir, "data directory missing; creating it"),
    }
    tokio::fs::create_dir_all(data_dir)
        .await
        .map_err(|e| anyhow::anyhow!("cannot create {data_dir}: {e}"))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn ensure_env_creates_missing_dir() -> anyhow::Result<()> {
        let dir = std::env::temp_dir().join(format!("ensure_env_{}", std::process::id()));
        let dir_str = dir.to_string_lossy().to_string();
        let _ = tokio::fs::remove_dir_all(&dir).await;

        ensure_env(&dir_str).await?;
        assert!(tokio::fs::metadata(&dir).await?.is_dir());

        // second call is a no-op
        ensure_env(&dir_str).await?;
        let _ = tokio::fs::remove_dir_all(&dir).await;
        Ok(())
    }

    #[tokio::test]
    async fn ensure_env_rejects_plain_file() -> anyhow::Result<()> {
        let file = std::env::temp_dir().join(format!("ensure_env_file_{}", std::process::id()));
        tokio::fs::write(&file, b"x").await?;
        let res = ensure_env(&file.to_string_lossy()).await;
        assert!(res.is_err());
        let _ = tokio::fs::remove_file(&file).await;
        Ok(())
    }
}
