//! Line-oriented text builder for targets without a pretty-printer.

use super::Indent;

/// Accumulates lines at a tracked indentation level.
#[derive(Debug, Clone)]
pub struct CodeWriter {
    unit: String,
    level: usize,
    buf: String,
}

impl CodeWriter {
    pub fn new(indent: Indent) -> Self {
        Self::at_level(indent, 0)
    }

    /// A writer whose first line starts `level` units deep.
    pub fn at_level(indent: Indent, level: usize) -> Self {
        Self {
            unit: indent.unit(),
            level,
            buf: String::new(),
        }
    }

    /// Write one line at the current level. Empty lines carry no indentation.
    pub fn line(&mut self, text: impl AsRef<str>) -> &mut Self {
        let text = text.as_ref();
        if !text.is_empty() {
            for _ in 0..self.level {
                self.buf.push_str(&self.unit);
            }
            self.buf.push_str(text);
        }
        self.buf.push('\n');
        self
    }

    pub fn blank(&mut self) -> &mut Self {
        self.line("")
    }

    /// Write `text` and indent subsequent lines.
    pub fn open(&mut self, text: impl AsRef<str>) -> &mut Self {
        self.line(text);
        self.level += 1;
        self
    }

    /// Dedent, then write `text`.
    pub fn close(&mut self, text: impl AsRef<str>) -> &mut Self {
        self.level = self.level.saturating_sub(1);
        self.line(text)
    }

    /// Dedent, write `text`, indent again: `} else {`.
    pub fn reopen(&mut self, text: impl AsRef<str>) -> &mut Self {
        self.close(text);
        self.level += 1;
        self
    }

    pub fn level(&self) -> usize {
        self.level
    }

    pub fn finish(self) -> String {
        self.buf
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nested_blocks_with_tabs() {
        let mut w = CodeWriter::new(Indent::Tabs);
        w.open("struct A {").line("int x;").blank().close("};");
        assert_eq!(w.finish(), "struct A {\n\tint x;\n\n};\n");
    }

    #[test]
    fn starting_level_and_spaces() {
        let mut w = CodeWriter::at_level(Indent::Spaces(2), 1);
        w.open("f() {").line("g();").close("}");
        assert_eq!(w.level(), 1);
        assert_eq!(w.finish(), "  f() {\n    g();\n  }\n");
    }

    #[test]
    fn reopen_keeps_depth() {
        let mut w = CodeWriter::new(Indent::Spaces(1));
        w.open("if (a) {").line("x();").reopen("} else {").line("y();").close("}");
        assert_eq!(w.finish(), "if (a) {\n x();\n} else {\n y();\n}\n");
    }

    #[test]
    fn close_never_underflows() {
        let mut w = CodeWriter::new(Indent::Tabs);
        w.close("}");
        assert_eq!(w.finish(), "}\n");
    }
}
