use std::io::{self, Write};

use crossterm::style::{Attribute, Color, Print, ResetColor, SetAttribute, SetForegroundColor};
use crossterm::queue;

use crate::job_stream::{LineStyle, LogEntry};

fn style_color(style: LineStyle) -> Option<Color> {
    match style {
        LineStyle::Plain => None,
        LineStyle::Header => Some(Color::Cyan),
        LineStyle::Error | LineStyle::ErrorBold => Some(Color::Red),
        LineStyle::Warning | LineStyle::WarningBold => Some(Color::Yellow),
        LineStyle::Info => Some(Color::Blue),
        LineStyle::Success | LineStyle::SuccessBold => Some(Color::Green),
    }
}

/// Writes one entry followed by a newline. Colors are only emitted when
/// `color` is set.
pub fn write_entry<W: Write>(out: &mut W, entry: &LogEntry, color: bool) -> io::Result<()> {
    let text = entry.render();
    if !color {
        return writeln!(out, "{text}");
    }
    match entry {
        LogEntry::Line { style, .. } => {
            if style.is_bold() {
                queue!(out, SetAttribute(Attribute::Bold))?;
            }
            if let Some(color) = style_color(*style) {
                queue!(out, SetForegroundColor(color))?;
            }
            queue!(out, Print(text), ResetColor, SetAttribute(Attribute::Reset))?;
        }
        LogEntry::Step { .. } => {
            queue!(out, SetAttribute(Attribute::Bold), Print("» "), SetAttribute(Attribute::Reset), Print(text))?;
        }
        LogEntry::Status { .. } => {
            queue!(out, SetAttribute(Attribute::Dim), Print(text), SetAttribute(Attribute::Reset))?;
        }
        LogEntry::Raw { stderr: true, .. } => {
            queue!(out, SetForegroundColor(Color::Red), Print(text), ResetColor)?;
        }
        LogEntry::Raw { .. } => queue!(out, Print(text))?,
    }
    writeln!(out)
}
