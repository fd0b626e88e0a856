// printer.rs — Line-oriented text sink shared by every emitter
//
// Accumulates generated source into a single buffer. Callers bracket each
// output line with `start_line()` / `end_line()`; the sink owns indentation
// so individual printers never have to know how deeply they are nested.
//
// Preconditions: none.
// Postconditions: `finish()` returns the accumulated text; every line ends
//   with '\n' and carries no trailing whitespace.
// Failure modes: none (in-memory buffer).
// Side effects: none.

#[derive(Debug)]
pub struct Printer {
    out: String,
    level: usize,
    width: usize,
}

impl Printer {
    /// Create a sink that indents by `width` spaces per level.
    pub fn new(width: usize) -> Self {
        Printer {
            out: String::with_capacity(4096),
            level: 0,
            width,
        }
    }

    /// Begin a new output line at the current indentation.
    pub fn start_line(&mut self) {
        for _ in 0..self.level * self.width {
            self.out.push(' ');
        }
    }

    pub fn print_str(&mut self, s: &str) {
        self.out.push_str(s);
    }

    /// Terminate the current line, dropping any trailing blanks.
    pub fn end_line(&mut self) {
        let trimmed = self.out.trim_end_matches(' ').len();
        self.out.truncate(trimmed);
        self.out.push('\n');
    }

    /// Print `s` as one complete line.
    pub fn line(&mut self, s: &str) {
        self.start_line();
        self.print_str(s);
        self.end_line();
    }

    pub fn blank_line(&mut self) {
        self.out.push('\n');
    }

    pub fn indent(&mut self) {
        self.level += 1;
    }

    pub fn dedent(&mut self) {
        self.level = self.level.saturating_sub(1);
    }

    pub fn is_empty(&self) -> bool {
        self.out.is_empty()
    }

    pub fn finish(self) -> String {
        self.out
    }
}

impl Default for Printer {
    fn default() -> Self {
        Printer::new(2)
    }
}
