use std::io::{self, Write};

use super::render::TerminalCommand;

const RULE: &str = "----------------------------------------";

/// Writes render commands as plain lines. Any `Write` works, so tests can
/// capture the page in a buffer.
pub struct Terminal<W: Write> {
    out: W,
    show_preview: bool,
}

impl<W: Write> Terminal<W> {
    pub fn new(out: W, show_preview: bool) -> Self {
        Self { out, show_preview }
    }

    pub fn execute(&mut self, cmds: Vec<TerminalCommand>) -> io::Result<()> {
        for cmd in cmds {
            match cmd {
                TerminalCommand::Clear => writeln!(self.out, "{RULE}")?,
                TerminalCommand::Line(text) => writeln!(self.out, "{text}")?,
                TerminalCommand::Status(text) => writeln!(self.out, "[{text}]")?,
                TerminalCommand::Preview(json) if self.show_preview => {
                    writeln!(self.out, "{json}")?
                }
                TerminalCommand::Preview(_) => {}
                TerminalCommand::Download(location) => {
                    writeln!(self.out, "Results saved to {location}")?
                }
            }
        }
        self.out.flush()
    }

    #[cfg(test)]
    fn into_inner(self) -> W {
        self.out
    }
}
