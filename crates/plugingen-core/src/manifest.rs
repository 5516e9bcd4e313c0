use std::{
    collections::HashMap,
    fs,
    path::{Path, PathBuf},
};

use anyhow::{bail, Context, Result};
use serde::Serialize;
use tracing::debug;

use crate::config::GeneratorConfig;

/// Decides whether a plugin lives in the local plugin tree.
pub trait LocationProbe {
    /// `local_path` is `plugin_fs_prefix + repo`, relative to the generation root.
    fn exists(&self, local_path: &str) -> bool;
}

/// Probes the real filesystem below `root`.
#[derive(Debug, Clone)]
pub struct FsProbe {
    root: PathBuf,
}

impl FsProbe {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

impl LocationProbe for FsProbe {
    fn exists(&self, local_path: &str) -> bool {
        fs::metadata(self.root.join(local_path)).is_ok()
    }
}

impl<F> LocationProbe for F
where
    F: Fn(&str) -> bool,
{
    fn exists(&self, local_path: &str) -> bool {
        self(local_path)
    }
}

/// One enabled plugin.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PluginEntry {
    pub name: String,
    pub location: String,
    /// True when no local directory matched and `repo` was taken verbatim.
    pub external: bool,
    pub line: usize,
}

/// Plugins in manifest order. Names are unique.
#[derive(Debug, Clone, Default, Serialize)]
pub struct PluginManifest {
    entries: Vec<PluginEntry>,
}

impl PluginManifest {
    /// Opens and parses the manifest named by `config`, resolved against `root`.
    pub fn load(root: &Path, config: &GeneratorConfig) -> Result<Self> {
        let path = root.join(&config.manifest);
        let text = fs::read_to_string(&path)
            .with_context(|| format!("failed to open {}", path.display()))?;
        Self::parse(&text, config, &FsProbe::new(root))
            .with_context(|| format!("invalid manifest {}", path.display()))
    }

    pub fn parse(
        text: &str,
        config: &GeneratorConfig,
        probe: &impl LocationProbe,
    ) -> Result<Self> {
        let mut entries: Vec<PluginEntry> = Vec::new();
        let mut seen: HashMap<String, usize> = HashMap::new();

        for (idx, line) in text.lines().enumerate() {
            let lineno = idx + 1;
            if line.starts_with('#') {
                continue;
            }
            let Some((name, repo)) = split_entry(line) else {
                if !line.trim().is_empty() {
                    debug!(line = lineno, "skipping malformed manifest line");
                }
                continue;
            };

            if let Some(first) = seen.insert(name.to_string(), lineno) {
                bail!("duplicate entry `{name}` on line {lineno} (first defined on line {first})");
            }

            let local = format!("{}{}", config.plugin_fs_prefix, repo);
            let external = !probe.exists(&local);
            let location = if external {
                repo.to_string()
            } else {
                format!("{}{}", config.import_prefix, repo)
            };
            debug!(plugin = name, %location, external, "resolved plugin");

            entries.push(PluginEntry {
                name: name.to_string(),
                location,
                external,
                line: lineno,
            });
        }

        Ok(Self { entries })
    }

    pub fn entries(&self) -> &[PluginEntry] {
        &self.entries
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|e| e.name.as_str())
    }

    pub fn locations(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|e| e.location.as_str())
    }

    pub fn get(&self, name: &str) -> Option<&PluginEntry> {
        self.entries.iter().find(|e| e.name == name)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// `name:repo` with exactly one colon. Either side may be empty.
fn split_entry(line: &str) -> Option<(&str, &str)> {
    let (name, repo) = line.split_once(':')?;
    if repo.contains(':') {
        return None;
    }
    Some((name, repo))
}
