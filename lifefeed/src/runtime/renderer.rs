use std::io::{self, Write};

use log::warn;
use termcolor::{Color, ColorChoice, ColorSpec, StandardStream, WriteColor};

use crate::feed::frame::{Frame, FrameStatus};

const CLEAR_SCREEN: &str = "\x1b[2J\x1b[H";
const UNKNOWN_COUNTER: &str = "??";

/// Replaces whatever is currently displayed with `frame`.
pub trait Renderer: Send {
    fn render(&mut self, frame: &Frame);
}

impl<F> Renderer for F
where
    F: FnMut(&Frame) + Send,
{
    fn render(&mut self, frame: &Frame) {
        self(frame)
    }
}

/// Draws frames on a terminal: a counter line, then the world.
pub struct TerminalRenderer<W: WriteColor + Send = StandardStream> {
    out: W,
    clear: bool,
}

impl TerminalRenderer {
    pub fn stdout() -> Self {
        Self::new(StandardStream::stdout(ColorChoice::Auto))
    }
}

impl<W: WriteColor + Send> TerminalRenderer<W> {
    pub fn new(out: W) -> Self {
        Self { out, clear: true }
    }

    /// Append frames instead of redrawing in place.
    pub fn without_clearing(mut self) -> Self {
        self.clear = false;
        self
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn draw(&mut self, frame: &Frame) -> io::Result<()> {
        if self.clear {
            write!(self.out, "{}", CLEAR_SCREEN)?;
        }

        let counter = frame
            .sequence()
            .map(|s| s.to_string())
            .unwrap_or_else(|| UNKNOWN_COUNTER.to_string());

        self.out.set_color(ColorSpec::new().set_bold(true))?;
        writeln!(self.out, "Generation {}", counter)?;
        self.out.reset()?;

        match frame.status() {
            FrameStatus::Live => {
                writeln!(self.out, "{}", frame.payload())?;
            }
            FrameStatus::Finished => {
                writeln!(self.out, "{}", frame.payload())?;
                self.out
                    .set_color(ColorSpec::new().set_fg(Some(Color::Yellow)))?;
                writeln!(self.out, "Game over")?;
                self.out.reset()?;
            }
            FrameStatus::Failed => {
                self.out
                    .set_color(ColorSpec::new().set_fg(Some(Color::Red)))?;
                writeln!(self.out, "Error")?;
                self.out.reset()?;
                writeln!(self.out, "{}", frame.payload())?;
            }
        }

        self.out.flush()
    }
}

impl<W: WriteColor + Send> Renderer for TerminalRenderer<W> {
    fn render(&mut self, frame: &Frame) {
        if let Err(err) = self.draw(frame) {
            warn!("failed to draw frame {:?}: {}", frame.sequence(), err);
        }
    }
}
