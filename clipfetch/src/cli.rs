use std::io::Write;

use crate::selector::{MenuItem, SelectionMenu};
use crate::workers::download::Update;

pub const USAGE: &str = "usage: clipfetch <url>\n       clipfetch convert <url> [format] [quality]";

const DEFAULT_FORMAT: &str = "mp4";
const DEFAULT_QUALITY: &str = "720p";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Pick a rendition from the menu and download it as-is.
    Interactive { url: String },
    /// Download and transcode to `format` at `quality`.
    Convert {
        url: String,
        format: String,
        quality: String
    }
}

impl Command {
    /// `None` when the URL is missing.
    pub fn from_args(args: &[String]) -> Option<Self> {
        match args {
            [sub, rest @ ..] if sub == "convert" => {
                let url = rest.first()?.clone();
                Some(Command::Convert {
                    url,
                    format: rest.get(1).cloned().unwrap_or_else(|| DEFAULT_FORMAT.to_string()),
                    quality: rest.get(2).cloned().unwrap_or_else(|| DEFAULT_QUALITY.to_string())
                })
            }
            [url, ..] => Some(Command::Interactive { url: url.clone() }),
            [] => None
        }
    }
}

pub fn render_menu(title: &str, menu: &SelectionMenu) -> String {
    let mut out = format!("{title}\n");
    for item in menu.items() {
        match item {
            MenuItem::Divider(label) => out.push_str(&format!("{label}\n")),
            MenuItem::Choice { label, id } => out.push_str(&format!("{id:>8}  {label}\n"))
        }
    }
    out
}

/// Single-line progress display on stdout. Other output first ends the
/// progress line so it is not overwritten.
#[derive(Debug, Default)]
pub struct ProgressDisplay {
    line_open: bool
}

impl ProgressDisplay {
    pub fn handle(&mut self, update: Update) {
        let mut stdout = std::io::stdout().lock();
        match update {
            Update::Progress(p) => {
                let _ = write!(
                    stdout,
                    "\r[download] {:>5.1}% of {} at {} ETA {}\x1b[K",
                    p.percent, p.total, p.rate, p.eta
                );
                self.line_open = !p.is_complete();
                if p.is_complete() {
                    let _ = writeln!(stdout);
                }
            }
            Update::Info(line) => {
                self.close_line(&mut stdout);
                let _ = writeln!(stdout, "{line}");
            }
            Update::Diagnostic(message) => {
                self.close_line(&mut stdout);
                let _ = stdout.flush();
                eprintln!("{message}");
            }
        }
        let _ = stdout.flush();
    }

    pub fn finish(&mut self) {
        let mut stdout = std::io::stdout().lock();
        self.close_line(&mut stdout);
        let _ = stdout.flush();
    }

    fn close_line(&mut self, out: &mut impl Write) {
        if self.line_open {
            let _ = writeln!(out);
            self.line_open = false;
        }
    }
}
