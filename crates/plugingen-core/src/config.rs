use std::{
    fs,
    path::{Path, PathBuf},
    sync::OnceLock,
};

use anyhow::{bail, Context, Result};
use regex::Regex;
use serde::Deserialize;

pub const DEFAULT_MANIFEST: &str = "plugin.cfg";
pub const DEFAULT_IMPORT_PREFIX: &str = "github.com/inverse-inc/packetfence/go/coredns/plugin/";
pub const DEFAULT_PLUGIN_FS_PREFIX: &str = "plugin/";
pub const DEFAULT_HEADER: &str = "// generated by directives_generate.go; DO NOT EDIT\n\n";

/// Build-time settings for a generation run, deserialized from TOML.
///
/// Every field has a default, so an empty file (or no file at all) yields the
/// stock layout: `plugin.cfg` in, `core/zplugin.go` and
/// `core/dnsserver/zdirectives.go` out.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct GeneratorConfig {
    pub manifest: PathBuf,
    pub import_prefix: String,
    pub plugin_fs_prefix: String,
    pub header: String,
    pub imports: OutputTarget,
    pub directives: OutputTarget,
    pub mode: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OutputTarget {
    pub path: PathBuf,
    pub package: String,
}

impl OutputTarget {
    pub fn new(path: impl Into<PathBuf>, package: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            package: package.into(),
        }
    }

    pub fn validate(&self, label: &str) -> Result<()> {
        if self.path.as_os_str().is_empty() {
            bail!("{label}.path must not be empty");
        }
        if !is_go_identifier(&self.package) {
            bail!(
                "{label}.package `{}` is not a valid Go package name",
                self.package
            );
        }
        Ok(())
    }
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            manifest: PathBuf::from(DEFAULT_MANIFEST),
            import_prefix: DEFAULT_IMPORT_PREFIX.into(),
            plugin_fs_prefix: DEFAULT_PLUGIN_FS_PREFIX.into(),
            header: DEFAULT_HEADER.into(),
            imports: OutputTarget::new("core/zplugin.go", "core"),
            directives: OutputTarget::new("core/dnsserver/zdirectives.go", "dnsserver"),
            mode: 0o644,
        }
    }
}

impl GeneratorConfig {
    /// Reads a TOML config file, expanding `${VAR}` / `${VAR:default}` first.
    pub fn load(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {}", path.display()))?;
        Self::from_toml(&raw).with_context(|| format!("failed to parse {}", path.display()))
    }

    pub fn from_toml(raw: &str) -> Result<Self> {
        let expanded = interpolate_env(raw);
        let cfg = toml::from_str::<GeneratorConfig>(&expanded)?;
        Ok(cfg)
    }

    /// Validates structural invariants and provides actionable error messages.
    pub fn validate(&self) -> Result<()> {
        if self.manifest.as_os_str().is_empty() {
            bail!("manifest path must not be empty");
        }
        if self.header.trim().is_empty() {
            bail!("header must not be empty; generated files need a DO NOT EDIT marker");
        }
        if self.header.lines().any(|line| !line.is_empty() && !line.starts_with("//")) {
            bail!("every non-blank header line must be a `//` comment");
        }
        if !self.header.ends_with('\n') {
            bail!("header must end with a newline");
        }
        self.imports.validate("imports")?;
        self.directives.validate("directives")?;
        if self.imports.path == self.directives.path {
            bail!(
                "imports and directives must be written to different files (both are `{}`)",
                self.imports.path.display()
            );
        }
        if self.mode > 0o777 {
            bail!("mode {:#o} has bits outside 0o777", self.mode);
        }
        Ok(())
    }
}

/// Replaces `${NAME}` and `${NAME:default}` with environment values.
pub fn interpolate_env(input: &str) -> String {
    static RE: OnceLock<Regex> = OnceLock::new();
    let regex = RE.get_or_init(|| {
        Regex::new(r"\$\{([A-Z0-9_]+)(?::([^}]+))?\}").expect("static pattern compiles")
    });
    let result = regex.replace_all(input, |caps: &regex::Captures| {
        let key = &caps[1];
        let default = caps.get(2).map(|m| m.as_str()).unwrap_or("");
        std::env::var(key).unwrap_or_else(|_| default.to_string())
    });
    result.into_owned()
}

fn is_go_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c == '_' || c.is_alphabetic() => {}
        _ => return false,
    }
    chars.all(|c| c == '_' || c.is_alphanumeric())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_toml_yields_stock_layout() {
        let cfg = GeneratorConfig::from_toml("").unwrap();
        assert_eq!(cfg.manifest, PathBuf::from("plugin.cfg"));
        assert_eq!(cfg.import_prefix, DEFAULT_IMPORT_PREFIX);
        assert_eq!(cfg.imports.package, "core");
        assert_eq!(cfg.directives.path, PathBuf::from("core/dnsserver/zdirectives.go"));
        assert_eq!(cfg.mode, 0o644);
        cfg.validate().unwrap();
    }

    #[test]
    fn partial_toml_overrides_only_named_fields() {
        let cfg = GeneratorConfig::from_toml(
            r#"
            import_prefix = "example.org/dns/plugin/"

            [directives]
            path = "gen/directives.go"
            package = "gen"
            "#,
        )
        .unwrap();
        assert_eq!(cfg.import_prefix, "example.org/dns/plugin/");
        assert_eq!(cfg.directives.package, "gen");
        assert_eq!(cfg.imports.path, PathBuf::from("core/zplugin.go"));
    }

    #[test]
    fn env_placeholders_fall_back_to_default() {
        let out = interpolate_env("prefix = \"${PLUGINGEN_TEST_UNSET_VAR:fallback/}\"");
        assert_eq!(out, "prefix = \"fallback/\"");
    }

    #[test]
    fn validate_rejects_bad_package_and_shared_output() {
        let mut cfg = GeneratorConfig::default();
        cfg.imports.package = "9lives".into();
        assert!(cfg.validate().is_err());

        let mut cfg = GeneratorConfig::default();
        cfg.directives.path = cfg.imports.path.clone();
        let err = cfg.validate().unwrap_err().to_string();
        assert!(err.contains("different files"), "{err}");
    }

    #[test]
    fn bundled_example_matches_defaults() {
        let example = GeneratorConfig::from_toml(include_str!("../../../config/plugingen.toml"))
            .unwrap();
        let defaults = GeneratorConfig::default();
        assert_eq!(example.manifest, defaults.manifest);
        assert_eq!(example.import_prefix, defaults.import_prefix);
        assert_eq!(example.plugin_fs_prefix, defaults.plugin_fs_prefix);
        assert_eq!(example.header, defaults.header);
        assert_eq!(example.imports.path, defaults.imports.path);
        assert_eq!(example.directives.package, defaults.directives.package);
        assert_eq!(example.mode, defaults.mode);
    }

    #[test]
    fn validate_rejects_non_comment_header() {
        let mut cfg = GeneratorConfig::default();
        cfg.header = "package oops\n".into();
        assert!(cfg.validate().is_err());

        cfg.header = "// DO NOT EDIT".into();
        assert!(cfg.validate().is_err());
    }
}
