//! Raw Go source for the two generated files. Output is unformatted; pass it
//! through [`crate::format::source`] before writing.

use std::collections::HashSet;

use tracing::warn;

use crate::manifest::PluginManifest;

pub const DIRECTIVES_DOC: &str = "\
// Directives are registered in the order they should be
// executed.
//
// Ordering is VERY important. Every plugin will
// feel the effects of all other plugin below
// (after) them during a request, but they must not
// care what plugin above them are doing.
";

/// `package <pkg>` followed by one blank import per plugin, in manifest order.
pub fn imports(header: &str, package: &str, manifest: &PluginManifest) -> String {
    let mut seen = HashSet::new();
    let mut out = preamble(header, package);
    out.push_str("import (\n// Include all plugins.\n");
    for entry in manifest.entries() {
        if !seen.insert(entry.location.as_str()) {
            warn!(plugin = %entry.name, location = %entry.location, "location already imported");
            continue;
        }
        out.push_str("_ ");
        out.push_str(&quote(&entry.location));
        out.push('\n');
    }
    out.push_str(")\n");
    out
}

/// `package <pkg>` followed by the ordered `directives` slice.
pub fn directives(header: &str, package: &str, manifest: &PluginManifest) -> String {
    let mut out = preamble(header, package);
    out.push('\n');
    out.push_str(DIRECTIVES_DOC);
    out.push_str("\nvar directives = []string{\n");
    for name in manifest.names() {
        out.push_str(&quote(name));
        out.push_str(",\n");
    }
    out.push_str("}\n");
    out
}

fn preamble(header: &str, package: &str) -> String {
    format!("{header}package {package}\n\n")
}

/// Interpreted Go string literal.
pub fn quote(value: &str) -> String {
    let mut out = String::with_capacity(value.len() + 2);
    out.push('"');
    for c in value.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\t' => out.push_str("\\t"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            c if c.is_control() => out.push_str(&format!("\\u{:04x}", c as u32)),
            c => out.push(c),
        }
    }
    out.push('"');
    out
}
