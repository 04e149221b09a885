//! Harness synthesis: wrapping a statement snippet in a runnable program.

use crucible_compiler::EntryPoint;

use crate::mapper::LineOffset;

/// Lines preceding the snippet inside the harness.
const PROLOGUE: &str = concat!(
    "using Core;\n",
    "using Core.Collections;\n",
    "using Core.Sequences;\n",
    "namespace Sandbox;\n",
    "public class Runner\n",
    "{\n",
    "    public static void Run(string[] args)\n",
    "    {\n",
);

const EPILOGUE: &str = "\n    }\n}\n";

/// A synthesized program around a caller's snippet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Harness {
    /// Full program source.
    pub source: String,
    /// Number of lines preceding the snippet.
    pub body_offset: u32,
    /// Number of lines the snippet spans.
    pub body_lines: u32,
}

impl Harness {
    /// Where the snippet sits in [`Self::source`].
    #[must_use]
    pub fn line_offset(&self) -> LineOffset {
        LineOffset::around(self.body_offset, self.body_lines)
    }
}

/// Wraps statement snippets in the fixed `Sandbox.Runner.Run` shell.
#[derive(Debug, Clone, Copy, Default)]
pub struct HarnessSynthesizer;

impl HarnessSynthesizer {
    /// Wrap `body` verbatim.
    #[must_use]
    pub fn wrap(&self, body: &str) -> Harness {
        let mut source = String::with_capacity(
            PROLOGUE
                .len()
                .saturating_add(body.len())
                .saturating_add(EPILOGUE.len()),
        );
        source.push_str(PROLOGUE);
        source.push_str(body);
        source.push_str(EPILOGUE);
        Harness {
            source,
            body_offset: Self::body_offset(),
            body_lines: u32::try_from(body.matches('\n').count())
                .unwrap_or(u32::MAX)
                .saturating_add(1),
        }
    }

    /// The entry point every harness exposes.
    #[must_use]
    pub fn entry_point(&self) -> EntryPoint {
        EntryPoint::new("Sandbox", "Runner", "Run")
    }

    fn body_offset() -> u32 {
        u32::try_from(PROLOGUE.matches('\n').count()).unwrap_or(u32::MAX)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snippet_starts_after_prologue() {
        let harness = HarnessSynthesizer.wrap("Console.WriteLine(1+1);");
        assert_eq!(harness.body_offset, 8);
        let lines: Vec<&str> = harness.source.lines().collect();
        assert_eq!(lines[8], "Console.WriteLine(1+1);");
        assert_eq!(lines[3], "namespace Sandbox;");
        assert_eq!(lines[6], "    public static void Run(string[] args)");
        assert_eq!(harness.body_lines, 1);
    }

    #[test]
    fn test_line_offset_covers_every_snippet_line() {
        let harness = HarnessSynthesizer.wrap("int a = 1;\nint b = 2;\n");
        assert_eq!(harness.line_offset(), LineOffset::around(8, 3));
        assert_eq!(harness.source.lines().nth(11), Some("    }"));
    }

    #[test]
    fn test_empty_body() {
        let harness = HarnessSynthesizer.wrap("");
        assert!(harness.source.ends_with("    {\n\n    }\n}\n"));
    }

    #[test]
    fn test_entry_point() {
        assert_eq!(
            HarnessSynthesizer.entry_point().export_name(),
            "Sandbox.Runner.Run"
        );
    }
}
