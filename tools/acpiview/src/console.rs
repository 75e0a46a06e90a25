//! Report sink over stdout.

use acpi_view::{Highlight, ReportSink};
use colored::{ColoredString, Colorize};
use std::fmt;
use std::io::{self, StdoutLock, Write};

/// Writes the trace to stdout, colouring highlighted spans.
pub struct Console<W: Write = StdoutLock<'static>> {
    out: W,
    highlight: Option<Highlight>,
}

impl Console {
    pub fn stdout() -> Self {
        Self::new(io::stdout().lock())
    }
}

impl<W: Write> Console<W> {
    pub const fn new(out: W) -> Self {
        Self {
            out,
            highlight: None,
        }
    }

    pub fn flush(&mut self) -> io::Result<()> {
        self.out.flush()
    }

    #[cfg(test)]
    fn into_inner(self) -> W {
        self.out
    }
}

fn paint(text: &str, highlight: Highlight) -> ColoredString {
    match highlight {
        Highlight::Info => text.cyan(),
        Highlight::Good => text.green(),
        Highlight::Warn => text.yellow(),
        Highlight::Error => text.red().bold(),
        Highlight::Section => text.magenta().bold(),
    }
}

impl<W: Write> fmt::Write for Console<W> {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        let result = match self.highlight {
            Some(highlight) => write!(self.out, "{}", paint(s, highlight)),
            None => self.out.write_all(s.as_bytes()),
        };
        result.map_err(|_| fmt::Error)
    }
}

impl<W: Write> ReportSink for Console<W> {
    fn set_highlight(&mut self, highlight: Option<Highlight>) {
        self.highlight = highlight;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fmt::Write as _;

    #[test]
    fn plain_text_passes_through() {
        let mut console = Console::new(Vec::new());
        writeln!(console, "Signature : APIC").unwrap();
        assert_eq!(console.into_inner(), b"Signature : APIC\n");
    }

    #[test]
    fn highlight_is_cleared_by_none() {
        colored::control::set_override(false);
        let mut console = Console::new(Vec::new());
        console.set_highlight(Some(Highlight::Error));
        console.write_str("ERROR").unwrap();
        console.set_highlight(None);
        console.write_str(": bad\n").unwrap();
        assert_eq!(console.into_inner(), b"ERROR: bad\n");
    }
}
