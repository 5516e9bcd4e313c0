use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::info;

use crate::{
    config::{GeneratorConfig, OutputTarget},
    format,
    manifest::PluginManifest,
    output, render,
};

/// A formatted file ready to be written.
#[derive(Debug, Clone)]
pub struct GeneratedFile {
    pub path: PathBuf,
    pub contents: String,
}

/// One generation run rooted at a source tree.
#[derive(Debug, Clone)]
pub struct Generator {
    root: PathBuf,
    config: GeneratorConfig,
}

impl Generator {
    pub fn new(root: impl Into<PathBuf>, config: GeneratorConfig) -> Self {
        Self {
            root: root.into(),
            config,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn config(&self) -> &GeneratorConfig {
        &self.config
    }

    pub fn load_manifest(&self) -> Result<PluginManifest> {
        PluginManifest::load(&self.root, &self.config)
    }

    /// Renders and formats both outputs without touching the filesystem.
    pub fn render(&self, manifest: &PluginManifest) -> Result<[GeneratedFile; 2]> {
        let cfg = &self.config;
        let imports = self.finish(
            &cfg.imports,
            render::imports(&cfg.header, &cfg.imports.package, manifest),
        )?;
        let directives = self.finish(
            &cfg.directives,
            render::directives(&cfg.header, &cfg.directives.package, manifest),
        )?;
        Ok([imports, directives])
    }

    /// Reads the manifest and rewrites both outputs. Nothing is written unless
    /// both files rendered and formatted cleanly.
    pub fn run(&self) -> Result<PluginManifest> {
        let manifest = self.load_manifest()?;
        for file in self.render(&manifest)? {
            output::write_file(&file.path, file.contents.as_bytes(), self.config.mode)?;
            info!(path = %file.path.display(), "wrote generated file");
        }
        info!(plugins = manifest.len(), "generation complete");
        Ok(manifest)
    }

    /// Returns the outputs whose on-disk contents differ from a fresh render.
    pub fn check(&self) -> Result<Vec<PathBuf>> {
        let manifest = self.load_manifest()?;
        let mut stale = Vec::new();
        for file in self.render(&manifest)? {
            if !output::is_current(&file.path, file.contents.as_bytes())? {
                stale.push(file.path);
            }
        }
        Ok(stale)
    }

    fn finish(&self, target: &OutputTarget, raw: String) -> Result<GeneratedFile> {
        let path = self.root.join(&target.path);
        let contents = format::source(&raw)
            .with_context(|| format!("failed to format {}", path.display()))?;
        Ok(GeneratedFile { path, contents })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn render_produces_formatted_pair() {
        let generator = Generator::new("/src", GeneratorConfig::default());
        let manifest =
            PluginManifest::parse("log:log\n", generator.config(), &|_: &str| true).unwrap();
        let [imports, directives] = generator.render(&manifest).unwrap();
        assert_eq!(imports.path, PathBuf::from("/src/core/zplugin.go"));
        assert!(imports
            .contents
            .contains("\t_ \"github.com/inverse-inc/packetfence/go/coredns/plugin/log\"\n"));
        assert_eq!(
            directives.path,
            PathBuf::from("/src/core/dnsserver/zdirectives.go")
        );
        assert!(directives.contents.ends_with("var directives = []string{\n\t\"log\",\n}\n"));
    }

    #[test]
    fn bad_header_surfaces_as_format_error() {
        let mut cfg = GeneratorConfig::default();
        cfg.header = "// (\nfunc (\n".into();
        let generator = Generator::new(".", cfg);
        let err = generator.render(&PluginManifest::default()).unwrap_err();
        assert!(format!("{err:#}").contains("failed to format"));
    }
}
