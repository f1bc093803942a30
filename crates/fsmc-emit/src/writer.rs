//! Indented source writer.

/// Indentation unit of the emitted code.
pub const INDENT: &str = "  ";

/// Line-oriented output buffer with a current indentation depth.
#[derive(Debug, Default)]
pub struct CodeWriter {
    out: String,
    depth: usize,
}

impl CodeWriter {
    #[must_use]
    pub fn new() -> Self {
        Self {
            out: String::with_capacity(4096),
            depth: 0,
        }
    }

    /// Write one line at the current depth.
    pub fn line(&mut self, s: &str) {
        for _ in 0..self.depth {
            self.out.push_str(INDENT);
        }
        self.out.push_str(s);
        self.out.push('\n');
    }

    /// Write a line and indent what follows.
    pub fn open(&mut self, s: &str) {
        self.line(s);
        self.depth += 1;
    }

    /// Dedent and write `end`.
    pub fn close(&mut self) {
        self.close_with("end");
    }

    /// Dedent and write `s`.
    pub fn close_with(&mut self, s: &str) {
        self.depth = self.depth.saturating_sub(1);
        self.line(s);
    }

    /// Dedent, write `s`, and indent again (`else`, `when`).
    pub fn middle(&mut self, s: &str) {
        self.depth = self.depth.saturating_sub(1);
        self.open(s);
    }

    pub const fn dedent(&mut self) {
        self.depth = self.depth.saturating_sub(1);
    }

    pub fn blank(&mut self) {
        self.out.push('\n');
    }

    /// Write multi-line text at the current depth, keeping its own relative
    /// indentation and dropping blank lines.
    pub fn block(&mut self, text: &str) {
        for line in text.lines() {
            let line = line.trim_end();
            if !line.is_empty() {
                self.line(line);
            }
        }
    }

    #[must_use]
    pub const fn depth(&self) -> usize {
        self.depth
    }

    #[must_use]
    pub fn output(&self) -> &str {
        &self.out
    }

    #[must_use]
    pub fn take_output(self) -> String {
        self.out
    }
}
