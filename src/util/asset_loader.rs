use std::collections::HashMap;
use std::fs;
use std::path::{Component, Path, PathBuf};
use std::sync::{Arc, PoisonError, RwLock};

use minijinja::{Environment, Error, State};
use sha2::{Digest, Sha256};
use tracing::debug;

/// Resolves `asset("css/site.css")` in templates to a cache-busted URL under
/// `/static`, keyed by a digest of the file contents.
#[derive(Debug, Clone)]
pub struct AssetLoader {
    static_dir: PathBuf,
    cache: Arc<RwLock<HashMap<String, String>>>,
}

impl AssetLoader {
    pub fn new(static_dir: impl Into<PathBuf>) -> Self {
        Self {
            static_dir: static_dir.into(),
            cache: Arc::default(),
        }
    }

    pub fn asset_path(&self, path: &str) -> String {
        let path = path.trim_start_matches('/');
        if let Some(hit) = self
            .cache
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(path)
        {
            return hit.clone();
        }

        let plain = format!("/static/{path}");
        if !is_plain_relative(path) {
            return plain;
        }

        let contents = match fs::read(self.static_dir.join(path)) {
            Ok(contents) => contents,
            Err(e) => {
                debug!("Asset {} not fingerprinted: {}", path, e);
                return plain;
            }
        };

        let digest = Sha256::digest(&contents);
        let version: String = digest[..6].iter().map(|b| format!("{b:02x}")).collect();
        let versioned = format!("{plain}?v={version}");
        self.cache
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(path.to_string(), versioned.clone());
        versioned
    }

    pub fn register(&self, env: &mut Environment<'_>) {
        let loader = self.clone();
        env.add_function(
            "asset",
            move |_state: &State, path: String| -> Result<String, Error> {
                Ok(loader.asset_path(&path))
            },
        );
    }
}

fn is_plain_relative(path: &str) -> bool {
    Path::new(path)
        .components()
        .all(|c| matches!(c, Component::Normal(_)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::{SystemTime, UNIX_EPOCH};

    fn scratch_dir() -> PathBuf {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap()
            .as_nanos();
        let dir = std::env::temp_dir().join(format!("asset-loader-{}-{}", std::process::id(), nanos));
        fs::create_dir_all(dir.join("css")).unwrap();
        dir
    }

    #[test]
    fn fingerprints_existing_files_and_caches() {
        let dir = scratch_dir();
        fs::write(dir.join("css/site.css"), "body { color: black; }").unwrap();
        let loader = AssetLoader::new(&dir);

        let first = loader.asset_path("css/site.css");
        assert!(first.starts_with("/static/css/site.css?v="));
        assert_eq!(first.len(), "/static/css/site.css?v=".len() + 12);

        // Cached: a later edit is not picked up until restart.
        fs::write(dir.join("css/site.css"), "body { color: red; }").unwrap();
        assert_eq!(loader.clone().asset_path("/css/site.css"), first);

        fs::remove_dir_all(dir).unwrap();
    }

    #[test]
    fn missing_and_escaping_paths_are_served_plain() {
        let dir = scratch_dir();
        let loader = AssetLoader::new(&dir);
        assert_eq!(loader.asset_path("js/missing.js"), "/static/js/missing.js");
        assert_eq!(loader.asset_path("../secret.txt"), "/static/../secret.txt");
        fs::remove_dir_all(dir).unwrap();
    }

    #[test]
    fn registered_function_renders() {
        let dir = scratch_dir();
        let mut env = Environment::new();
        AssetLoader::new(&dir).register(&mut env);
        let out = env
            .render_str(r#"{{ asset("img/none.png") }}"#, minijinja::context! {})
            .unwrap();
        assert_eq!(out, "/static/img/none.png");
        fs::remove_dir_all(dir).unwrap();
    }
}
