//! Canonical layout for generated Go source.
//!
//! This is not gofmt. It covers what the generators emit: comments, a package
//! clause, bracketed blocks and string literals. Blocks are indented with one
//! tab per open bracket, trailing whitespace is dropped, blank runs collapse to
//! a single line and never sit directly inside a bracket. Anything that would
//! not survive the Go parser at the bracket/literal level is rejected.
//!
//! Unlike gofmt, import specs are left in the order given rather than sorted,
//! so an import block that is not alphabetical will still be flagged by
//! `gofmt -l`.

use anyhow::{bail, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Carry {
    Code,
    RawString,
    BlockComment,
}

#[derive(Debug)]
struct Scanner {
    stack: Vec<(char, usize, usize)>,
    carry: Carry,
}

impl Scanner {
    fn new() -> Self {
        Self {
            stack: Vec::new(),
            carry: Carry::Code,
        }
    }

    /// Advances over one line and returns its last code character, if any.
    fn scan_line(&mut self, line: &str, lineno: usize) -> Result<Option<char>> {
        let mut chars = line.char_indices().peekable();
        let mut last = None;
        while let Some((i, c)) = chars.next() {
            let col = i + 1;
            match self.carry {
                Carry::RawString => {
                    if c == '`' {
                        self.carry = Carry::Code;
                        last = Some(c);
                    }
                    continue;
                }
                Carry::BlockComment => {
                    if c == '*' && matches!(chars.peek(), Some((_, '/'))) {
                        chars.next();
                        self.carry = Carry::Code;
                    }
                    continue;
                }
                Carry::Code => {}
            }
            match c {
                '/' if matches!(chars.peek(), Some((_, '/'))) => break,
                '/' if matches!(chars.peek(), Some((_, '*'))) => {
                    chars.next();
                    self.carry = Carry::BlockComment;
                }
                '"' | '\'' => {
                    let mut closed = false;
                    while let Some((_, d)) = chars.next() {
                        if d == '\\' {
                            chars.next();
                        } else if d == c {
                            closed = true;
                            break;
                        }
                    }
                    if !closed {
                        let kind = if c == '"' { "string" } else { "rune" };
                        bail!("{lineno}:{col}: unterminated {kind} literal");
                    }
                    last = Some(c);
                }
                '`' => self.carry = Carry::RawString,
                '(' | '[' | '{' => {
                    self.stack.push((c, lineno, col));
                    last = Some(c);
                }
                ')' | ']' | '}' => {
                    match self.stack.pop() {
                        Some((open, _, _)) if closer(open) == c => {}
                        Some((open, at_line, at_col)) => bail!(
                            "{lineno}:{col}: `{c}` does not close `{open}` opened at {at_line}:{at_col}"
                        ),
                        None => bail!("{lineno}:{col}: unexpected `{c}`"),
                    }
                    last = Some(c);
                }
                c if c.is_whitespace() => {}
                c => last = Some(c),
            }
        }
        Ok(last)
    }

    fn finish(&self) -> Result<()> {
        if let Some((open, line, col)) = self.stack.last() {
            bail!("{line}:{col}: `{open}` is never closed");
        }
        match self.carry {
            Carry::Code => Ok(()),
            Carry::RawString => bail!("unterminated raw string literal"),
            Carry::BlockComment => bail!("unterminated block comment"),
        }
    }
}

fn closer(open: char) -> char {
    match open {
        '(' => ')',
        '[' => ']',
        _ => '}',
    }
}

fn is_closer(c: char) -> bool {
    matches!(c, ')' | ']' | '}')
}

/// Formats `text`, failing with a `line:col` message on malformed input.
pub fn source(text: &str) -> Result<String> {
    let mut scanner = Scanner::new();
    let mut out = String::with_capacity(text.len() + 16);
    let mut seen_package = false;
    let mut pending_blank = false;
    let mut after_opener = false;

    for (idx, raw) in text.lines().enumerate() {
        let lineno = idx + 1;
        let carried = scanner.carry != Carry::Code;
        let depth = scanner.stack.len();
        let line = raw.trim_end();
        let last = scanner.scan_line(line, lineno)?;

        if carried {
            out.push_str(raw);
            out.push('\n');
            pending_blank = false;
            after_opener = false;
            continue;
        }

        let body = line.trim_start();
        if body.is_empty() {
            pending_blank = !out.is_empty();
            continue;
        }

        if !seen_package && !body.starts_with("//") && !body.starts_with("/*") {
            if !body.starts_with("package ") {
                bail!("{lineno}:1: expected `package` clause, found `{body}`");
            }
            seen_package = true;
        }

        let leading_closers = body.chars().take_while(|c| is_closer(*c)).count();
        if pending_blank && !after_opener && leading_closers == 0 {
            out.push('\n');
        }
        pending_blank = false;

        for _ in 0..depth.saturating_sub(leading_closers) {
            out.push('\t');
        }
        out.push_str(body);
        out.push('\n');
        after_opener = matches!(last, Some('(' | '[' | '{'));
    }

    scanner.finish()?;
    if !seen_package {
        bail!("missing `package` clause");
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn indents_blocks_with_tabs() {
        let raw = "package core\n\nimport (\n// Include all plugins.\n_ \"a/b\"\n   _ \"c/d\"   \n)\n";
        let out = source(raw).unwrap();
        assert_eq!(
            out,
            "package core\n\nimport (\n\t// Include all plugins.\n\t_ \"a/b\"\n\t_ \"c/d\"\n)\n"
        );
    }

    #[test]
    fn collapses_blank_runs_and_trims_block_edges() {
        let raw = "\n\n// header\n\n\n\npackage x\n\nvar v = []string{\n\n\"a\",\n\n}\n\n\n";
        let out = source(raw).unwrap();
        assert_eq!(out, "// header\n\npackage x\n\nvar v = []string{\n\t\"a\",\n}\n");
    }

    #[test]
    fn import_specs_keep_their_order() {
        let raw = "package core\n\nimport (\n_ \"z/trace\"\n_ \"a/log\"\n)\n";
        let out = source(raw).unwrap();
        assert!(out.contains("\t_ \"z/trace\"\n\t_ \"a/log\"\n"), "{out}");
    }

    #[test]
    fn formatting_is_idempotent() {
        let raw = "// h\n\npackage p\n\nvar d = []string{\n\"x\",\n\"y\",\n}\n";
        let once = source(raw).unwrap();
        assert_eq!(source(&once).unwrap(), once);
    }

    #[test]
    fn brackets_inside_literals_and_comments_are_ignored() {
        let raw = "package p\n\n// (not a block\nvar s = []string{\n\"}{)(\",\n`[`,\n}\n";
        let out = source(raw).unwrap();
        assert!(out.contains("\t\"}{)(\",\n\t`[`,\n}"));
    }

    #[test]
    fn rejects_unbalanced_brackets() {
        let err = source("package p\n\nimport (\n_ \"a\"\n").unwrap_err().to_string();
        assert!(err.contains("3:8"), "{err}");
        assert!(err.contains("never closed"), "{err}");

        let err = source("package p\nvar x = []int{1)\n").unwrap_err().to_string();
        assert!(err.contains("does not close"), "{err}");

        assert!(source("package p\n}\n").is_err());
    }

    #[test]
    fn rejects_unterminated_string() {
        let err = source("package p\nvar s = \"open\n").unwrap_err().to_string();
        assert!(err.contains("2:9: unterminated string"), "{err}");
    }

    #[test]
    fn requires_package_clause_first() {
        assert!(source("// only a comment\n").is_err());
        let err = source("import (\n)\n").unwrap_err().to_string();
        assert!(err.contains("expected `package`"), "{err}");
    }
}
