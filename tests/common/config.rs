//! Configuration for tests against a local reader site

use segment_dl::Config;
use tempfile::TempDir;

/// Configuration rooted in `temp_dir` that reads segments from `site_uri`
///
/// Rate limiting and retries are off so each test controls every request.
pub fn test_config(temp_dir: &TempDir, site_uri: &str) -> Config {
    let mut config = Config::default();
    config.persistence.database_path = temp_dir.path().join("segments.db");
    config.storage.staging_dir = temp_dir.path().join("staging");
    config.storage.documents_dir = temp_dir.path().join("documents");
    config.extractor.page_url_template = format!("{}/read/{{work}}/{{segment}}", site_uri);
    config.extractor.image_class = "page-image".to_string();
    config.fetch.retry.max_attempts = 0;
    config.server.api.rate_limit.enabled = false;
    config
}
