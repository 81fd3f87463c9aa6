//! Pretty report rendering.
//!
//! Status lines carry an `INFO`, `PASS` or `FAIL` badge. Failed snippets are
//! echoed with numbered lines, faulty ones in red. `NO_COLOR` turns all
//! styling off.

use std::io::Write;
use termcolor::{Color, ColorChoice, ColorSpec, StandardStream, WriteColor};

/// Resolve `ColorChoice` from the `--color` flag and `NO_COLOR`.
pub fn resolve_color_choice(flag: Option<&str>) -> ColorChoice {
    if std::env::var_os("NO_COLOR").is_some() {
        return ColorChoice::Never;
    }
    match flag {
        Some("always") => ColorChoice::Always,
        Some("never") => ColorChoice::Never,
        _ => ColorChoice::Auto,
    }
}

/// Outcome marker printed in front of a status line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Badge {
    Info,
    Pass,
    Fail,
}

impl Badge {
    fn label(self) -> &'static str {
        match self {
            Badge::Info => "INFO",
            Badge::Pass => "PASS",
            Badge::Fail => "FAIL",
        }
    }

    fn color(self) -> Color {
        match self {
            Badge::Info => Color::Blue,
            Badge::Pass => Color::Green,
            Badge::Fail => Color::Red,
        }
    }

    /// Style of the message following the badge.
    fn message_spec(self) -> ColorSpec {
        let mut spec = ColorSpec::new();
        if self != Badge::Info {
            spec.set_fg(Some(self.color())).set_bold(true);
        }
        spec
    }
}

/// Report writer over any color-capable sink. Write errors are ignored.
pub struct StyledOutput<W: WriteColor = StandardStream> {
    out: W,
}

impl StyledOutput<StandardStream> {
    /// Writer on stdout.
    pub fn stdout(choice: ColorChoice) -> Self {
        Self::new(StandardStream::stdout(choice))
    }
}

impl<W: WriteColor> StyledOutput<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    /// Badge followed by a message on its own line.
    pub fn status(&mut self, badge: Badge, message: &str) {
        let mut spec = ColorSpec::new();
        spec.set_bg(Some(badge.color()))
            .set_fg(Some(Color::White))
            .set_bold(true);
        self.styled(&format!(" {} ", badge.label()), &spec);
        let _ = write!(self.out, " ");
        self.styled(message, &badge.message_spec());
        let _ = writeln!(self.out);
    }

    /// Blue bold line.
    pub fn heading(&mut self, text: &str) {
        let mut spec = ColorSpec::new();
        spec.set_fg(Some(Color::Blue)).set_bold(true);
        self.styled(text, &spec);
        let _ = writeln!(self.out);
    }

    /// Unstyled text followed by a newline.
    pub fn line(&mut self, text: &str) {
        let _ = writeln!(self.out, "{}", text);
    }

    /// One numbered snippet line, indented under its heading.
    pub fn code_line(&mut self, text: &str, faulty: bool) {
        let _ = write!(self.out, "    ");
        let mut spec = ColorSpec::new();
        if faulty {
            spec.set_fg(Some(Color::Red)).set_bold(true);
        }
        self.styled(text, &spec);
        let _ = writeln!(self.out);
    }

    pub fn blank(&mut self) {
        let _ = writeln!(self.out);
    }

    pub fn flush(&mut self) {
        let _ = self.out.flush();
    }

    #[cfg(test)]
    pub fn into_inner(self) -> W {
        self.out
    }

    fn styled(&mut self, text: &str, spec: &ColorSpec) {
        let _ = self.out.set_color(spec);
        let _ = write!(self.out, "{}", text);
        let _ = self.out.reset();
    }
}
