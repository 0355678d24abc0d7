//! Artifact-URL-backed watcher.
//!
//! The single target is a status document republished whenever something
//! changes: line 1 the artifact archive URL, line 2 the deploy-script URL.
//! Artifact and script are versioned independently; either changing
//! re-materializes the shared work dir.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use cdwatch_core::paths;
use cdwatch_core::{StatusDocument, WatchConfig, WatchError, Watcher};
use tracing::info;

use crate::archive;
use crate::fetch::Fetcher;

/// Watches one status-document URL and keeps the unpacked artifact and its
/// deploy script current under `<working-dir>/artifacts/<target>/work-dir`.
pub struct UrlWatcher {
    working_dir: PathBuf,
    fetcher: Box<dyn Fetcher>,
    artifact_url: Option<String>,
    deployer_url: Option<String>,
}

impl UrlWatcher {
    /// Create a watcher rooted at the configured working directory.
    pub fn new(config: &WatchConfig, fetcher: Box<dyn Fetcher>) -> Self {
        Self {
            working_dir: config.working_dir.clone(),
            fetcher,
            artifact_url: None,
            deployer_url: None,
        }
    }
}

#[async_trait]
impl Watcher for UrlWatcher {
    async fn watch(&mut self, targets: &[String]) -> Result<Vec<PathBuf>, WatchError> {
        let target = targets.first().ok_or(WatchError::NoTargets)?;

        let Some(body) = self.fetcher.fetch(target).await? else {
            return Ok(Vec::new());
        };
        let doc = StatusDocument::parse(&String::from_utf8_lossy(&body))?;

        let home = paths::artifact_home(&self.working_dir, target);
        let archive_file = home.join(paths::artifact_file_name(&doc.artifact_url)?);
        let script_file = home.join(paths::DEPLOY_SCRIPT);
        let work_dir = home.join(paths::WORK_DIR);

        let mut changed = false;

        if self.artifact_url.as_deref() != Some(doc.artifact_url.as_str()) {
            info!(old = ?self.artifact_url, new = %doc.artifact_url, "artifact URL changed");
            remove_stored_archives(&home)?;
            match fs::remove_dir_all(&work_dir) {
                Ok(()) => {}
                Err(e) if e.kind() == io::ErrorKind::NotFound => {}
                Err(e) => return Err(WatchError::io(&work_dir, e)),
            }
            fs::create_dir_all(&work_dir).map_err(|e| WatchError::io(&work_dir, e))?;

            info!(url = %doc.artifact_url, "downloading artifact");
            let Some(bytes) = self.fetcher.fetch(&doc.artifact_url).await? else {
                // Stored URLs untouched: the next pass retries the download
                return Ok(Vec::new());
            };
            fs::write(&archive_file, bytes).map_err(|e| WatchError::io(&archive_file, e))?;
            archive::extract_archive(&archive_file, &work_dir)?;

            changed = true;
            self.artifact_url = Some(doc.artifact_url.clone());
            // The stored script predates the new artifact; force a refresh
            self.deployer_url = None;
        }

        if self.deployer_url.as_deref() != Some(doc.deployer_url.as_str()) {
            info!(old = ?self.deployer_url, new = %doc.deployer_url, "deploy script URL changed");
            let Some(script) = self.fetcher.fetch(&doc.deployer_url).await? else {
                return Ok(Vec::new());
            };
            fs::create_dir_all(&home).map_err(|e| WatchError::io(&home, e))?;
            if !changed {
                // The shared work dir must reflect the stored artifact
                // before the new script runs against it
                archive::extract_archive(&archive_file, &work_dir)?;
            }
            write_executable(&script_file, &script)?;
            write_executable(&work_dir.join(paths::DEPLOY_SCRIPT), &script)?;

            changed = true;
            self.deployer_url = Some(doc.deployer_url.clone());
        }

        Ok(if changed { vec![work_dir] } else { Vec::new() })
    }
}

/// Delete previously downloaded archives from the artifact home.
fn remove_stored_archives(home: &Path) -> Result<(), WatchError> {
    let entries = match fs::read_dir(home) {
        Ok(entries) => entries,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(()),
        Err(e) => return Err(WatchError::io(home, e)),
    };
    for entry in entries {
        let entry = entry.map_err(|e| WatchError::io(home, e))?;
        let path = entry.path();
        if path.extension().is_some_and(|ext| ext == "zip") {
            fs::remove_file(&path).map_err(|e| WatchError::io(&path, e))?;
        }
    }
    Ok(())
}

fn write_executable(path: &Path, bytes: &[u8]) -> Result<(), WatchError> {
    fs::write(path, bytes).map_err(|e| WatchError::io(path, e))?;
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(path, fs::Permissions::from_mode(0o755))
            .map_err(|e| WatchError::io(path, e))?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;
    use std::sync::Mutex;
    use tempfile::TempDir;
    use zip::write::SimpleFileOptions;

    const STATUS_URL: &str = "http://ci.example.com/status";
    const ART1_URL: &str = "http://files.example.com/artifact1.zip";
    const ART2_URL: &str = "http://files.example.com/artifact2.zip";
    const SCRIPT1_URL: &str = "http://files.example.com/deploy/1";
    const SCRIPT2_URL: &str = "http://files.example.com/deploy/2";

    /// In-memory fetcher; URLs absent from the map answer "nothing fetched",
    /// like a non-success HTTP status.
    struct FakeFetcher {
        responses: Mutex<HashMap<String, Vec<u8>>>,
    }

    impl FakeFetcher {
        fn new() -> Self {
            Self {
                responses: Mutex::new(HashMap::new()),
            }
        }

        fn set(&self, url: &str, body: impl Into<Vec<u8>>) {
            self.responses
                .lock()
                .unwrap()
                .insert(url.to_string(), body.into());
        }

        fn unset(&self, url: &str) {
            self.responses.lock().unwrap().remove(url);
        }
    }

    #[async_trait]
    impl Fetcher for FakeFetcher {
        async fn fetch(&self, url: &str) -> Result<Option<Vec<u8>>, WatchError> {
            Ok(self.responses.lock().unwrap().get(url).cloned())
        }
    }

    fn zip_bytes(entries: &[(&str, &str)]) -> Vec<u8> {
        let mut writer = zip::ZipWriter::new(std::io::Cursor::new(Vec::new()));
        for (name, content) in entries {
            writer
                .start_file(name.to_string(), SimpleFileOptions::default())
                .unwrap();
            writer.write_all(content.as_bytes()).unwrap();
        }
        writer.finish().unwrap().into_inner()
    }

    fn status_doc(artifact_url: &str, deployer_url: &str) -> String {
        format!("{artifact_url}\n{deployer_url}\n")
    }

    struct Fixture {
        tmp: TempDir,
        fetcher: std::sync::Arc<FakeFetcher>,
        watcher: UrlWatcher,
    }

    impl Fixture {
        fn new() -> Self {
            let tmp = TempDir::new().unwrap();
            let config = WatchConfig::new(tmp.path());
            let fetcher = std::sync::Arc::new(FakeFetcher::new());
            let watcher = UrlWatcher::new(&config, Box::new(SharedFetcher(fetcher.clone())));
            Self {
                tmp,
                fetcher,
                watcher,
            }
        }

        fn work_dir(&self) -> PathBuf {
            paths::artifact_home(self.tmp.path(), STATUS_URL).join(paths::WORK_DIR)
        }

        async fn watch(&mut self) -> Vec<PathBuf> {
            self.watcher
                .watch(std::slice::from_ref(&STATUS_URL.to_string()))
                .await
                .unwrap()
        }
    }

    /// Box-able wrapper sharing the fake between test and watcher.
    struct SharedFetcher(std::sync::Arc<FakeFetcher>);

    #[async_trait]
    impl Fetcher for SharedFetcher {
        async fn fetch(&self, url: &str) -> Result<Option<Vec<u8>>, WatchError> {
            self.0.fetch(url).await
        }
    }

    #[tokio::test]
    async fn first_poll_materializes_artifact_and_script() {
        let mut fx = Fixture::new();
        fx.fetcher.set(STATUS_URL, status_doc(ART1_URL, SCRIPT1_URL));
        fx.fetcher.set(ART1_URL, zip_bytes(&[("test1.txt", "hello, world!")]));
        fx.fetcher.set(SCRIPT1_URL, "#!/bin/sh\necho v1\n");

        let changed = fx.watch().await;
        assert_eq!(changed, vec![fx.work_dir()]);
        assert_eq!(
            fs::read_to_string(fx.work_dir().join("test1.txt")).unwrap(),
            "hello, world!"
        );
        let script = fs::read_to_string(fx.work_dir().join("deploy.sh")).unwrap();
        assert!(script.contains("echo v1"));
    }

    #[tokio::test]
    async fn new_artifact_reuses_unchanged_script() {
        let mut fx = Fixture::new();
        fx.fetcher.set(STATUS_URL, status_doc(ART1_URL, SCRIPT1_URL));
        fx.fetcher.set(ART1_URL, zip_bytes(&[("test1.txt", "hello, world!")]));
        fx.fetcher.set(SCRIPT1_URL, "#!/bin/sh\necho v1\n");
        fx.watch().await;

        // Artifact advances to v2, deploy logic unchanged
        fx.fetcher.set(STATUS_URL, status_doc(ART2_URL, SCRIPT1_URL));
        fx.fetcher.set(ART2_URL, zip_bytes(&[("test2.txt", "hello, world! 2")]));

        let changed = fx.watch().await;
        assert_eq!(changed, vec![fx.work_dir()]);
        assert!(!fx.work_dir().join("test1.txt").exists());
        assert_eq!(
            fs::read_to_string(fx.work_dir().join("test2.txt")).unwrap(),
            "hello, world! 2"
        );
        // Same script logic runs against the new artifact contents
        let script = fs::read_to_string(fx.work_dir().join("deploy.sh")).unwrap();
        assert!(script.contains("echo v1"));
    }

    #[tokio::test]
    async fn new_script_sees_current_artifact_contents() {
        let mut fx = Fixture::new();
        fx.fetcher.set(STATUS_URL, status_doc(ART1_URL, SCRIPT1_URL));
        fx.fetcher.set(ART1_URL, zip_bytes(&[("test1.txt", "hello, world!")]));
        fx.fetcher.set(SCRIPT1_URL, "#!/bin/sh\necho v1\n");
        fx.watch().await;

        // Only the deploy logic changes; the work dir is re-extracted so the
        // new script runs against the stored artifact
        fs::write(fx.work_dir().join("leftover.txt"), "build output").unwrap();
        fx.fetcher.set(STATUS_URL, status_doc(ART1_URL, SCRIPT2_URL));
        fx.fetcher.set(SCRIPT2_URL, "#!/bin/sh\necho v2\n");

        let changed = fx.watch().await;
        assert_eq!(changed, vec![fx.work_dir()]);
        assert!(!fx.work_dir().join("leftover.txt").exists());
        assert!(fx.work_dir().join("test1.txt").exists());
        let script = fs::read_to_string(fx.work_dir().join("deploy.sh")).unwrap();
        assert!(script.contains("echo v2"));
    }

    #[tokio::test]
    async fn unchanged_status_yields_empty_result() {
        let mut fx = Fixture::new();
        fx.fetcher.set(STATUS_URL, status_doc(ART1_URL, SCRIPT1_URL));
        fx.fetcher.set(ART1_URL, zip_bytes(&[("test1.txt", "hello, world!")]));
        fx.fetcher.set(SCRIPT1_URL, "#!/bin/sh\necho v1\n");
        fx.watch().await;

        assert!(fx.watch().await.is_empty());
        assert!(fx.watch().await.is_empty());
    }

    #[tokio::test]
    async fn failed_artifact_download_leaves_state_retryable() {
        let mut fx = Fixture::new();
        fx.fetcher.set(STATUS_URL, status_doc(ART1_URL, SCRIPT1_URL));
        fx.fetcher.set(SCRIPT1_URL, "#!/bin/sh\necho v1\n");
        // Artifact endpoint answers non-success

        assert!(fx.watch().await.is_empty());

        // Endpoint recovers; the same version is picked up on the next pass
        fx.fetcher.set(ART1_URL, zip_bytes(&[("test1.txt", "hello, world!")]));
        let changed = fx.watch().await;
        assert_eq!(changed, vec![fx.work_dir()]);
    }

    #[tokio::test]
    async fn unreachable_status_endpoint_is_no_change() {
        let mut fx = Fixture::new();
        fx.fetcher.set(STATUS_URL, status_doc(ART1_URL, SCRIPT1_URL));
        fx.fetcher.set(ART1_URL, zip_bytes(&[("test1.txt", "hello, world!")]));
        fx.fetcher.set(SCRIPT1_URL, "#!/bin/sh\necho v1\n");
        fx.watch().await;

        fx.fetcher.unset(STATUS_URL);
        assert!(fx.watch().await.is_empty());
    }

    #[tokio::test]
    async fn malformed_status_document_is_an_error() {
        let mut fx = Fixture::new();
        fx.fetcher.set(STATUS_URL, "only-one-line");
        let result = fx
            .watcher
            .watch(std::slice::from_ref(&STATUS_URL.to_string()))
            .await;
        assert!(result.is_err());
    }
}
