use crate::error::Result;

const INDENT: &str = "  ";

/// An in-memory output stream with indentation tracking.
///
/// Indentation only changes inside [`CodeWriter::indented`] and
/// [`CodeWriter::block`], which restore the previous depth when the body
/// returns, including when it returns an error.
#[derive(Debug, Default)]
pub struct CodeWriter {
    buffer: String,
    depth:  usize,
    temps:  usize,
}

impl CodeWriter {
    pub fn new() -> CodeWriter {
        CodeWriter::default()
    }

    /// Writes one line at the current indentation. An empty line carries no
    /// trailing whitespace.
    pub fn line<S: AsRef<str>>(&mut self, text: S) {
        let text = text.as_ref();
        if !text.is_empty() {
            for _ in 0..self.depth {
                self.buffer.push_str(INDENT);
            }
            self.buffer.push_str(text);
        }
        self.buffer.push('\n');
    }

    pub fn blank(&mut self) {
        self.buffer.push('\n');
    }

    /// `# `-prefixed comment lines for a doc string.
    pub fn doc(&mut self, doc: Option<&str>) {
        let Some(doc) = doc else { return };
        for line in doc.trim_end().lines() {
            let line = line.trim_end();
            if line.is_empty() {
                self.line("#");
            } else {
                self.line(format!("# {}", line));
            }
        }
    }

    pub fn indented<F>(&mut self, body: F) -> Result<()>
    where
        F: FnOnce(&mut CodeWriter) -> Result<()>,
    {
        self.depth += 1;
        let result = body(self);
        self.depth -= 1;
        result
    }

    /// `header`, the indented body, then `end`.
    pub fn block<S, F>(&mut self, header: S, body: F) -> Result<()>
    where
        S: AsRef<str>,
        F: FnOnce(&mut CodeWriter) -> Result<()>,
    {
        self.line(header);
        self.indented(body)?;
        self.line("end");
        Ok(())
    }

    /// Wraps `body` in one `module` block per entry of `modules`.
    pub fn in_modules<F>(&mut self, modules: &[String], body: F) -> Result<()>
    where
        F: FnOnce(&mut CodeWriter) -> Result<()>,
    {
        match modules.split_first() {
            None => body(self),
            Some((first, rest)) => {
                self.block(format!("module {}", first), |w| w.in_modules(rest, body))
            }
        }
    }

    /// A fresh local variable name, unique within this writer.
    pub fn temp(&mut self, prefix: &str) -> String {
        self.temps += 1;
        format!("{}_{}", prefix, self.temps)
    }

    pub fn depth(&self) -> usize {
        self.depth
    }

    pub fn as_str(&self) -> &str {
        &self.buffer
    }

    pub fn finish(self) -> String {
        self.buffer
    }
}
