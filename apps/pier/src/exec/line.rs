/// Visually removes one character: back, blank, back.
pub const ERASE: &str = "\u{8} \u{8}";
/// Appended to the buffered command when Enter is pressed.
pub const NEWLINE: &str = "\n";

/// Ctrl-] leaves the session, as in telnet and ssh.
pub const DETACH: char = '\u{1d}';

const CTRL_U: &str = "\u{15}";
const DELETE: &str = "\u{7f}";
const BACKSPACE: &str = "\u{8}";

/// Classification of one raw terminal input chunk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Keystroke {
    Arrow,
    ClearLine,
    Enter,
    Backspace,
    Detach,
    /// Printable text with control characters already stripped.
    Text(String),
}

impl Keystroke {
    /// Returns `None` when nothing printable is left after stripping.
    pub fn classify(input: &str) -> Option<Keystroke> {
        match input {
            "\u{1b}[A" | "\u{1b}[B" | "\u{1b}[C" | "\u{1b}[D" => Some(Keystroke::Arrow),
            CTRL_U => Some(Keystroke::ClearLine),
            "\r" | "\n" | "\r\n" => Some(Keystroke::Enter),
            DELETE | BACKSPACE => Some(Keystroke::Backspace),
            other if other.contains(DETACH) => Some(Keystroke::Detach),
            other => {
                let text = strip_controls(other);
                (!text.is_empty()).then_some(Keystroke::Text(text))
            }
        }
    }
}

/// What the caller has to do after feeding a keystroke.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct LineOutput {
    /// Text to write to the local terminal.
    pub echo: String,
    /// A completed command to send as one input frame.
    pub submit: Option<String>,
    /// The user asked to leave the session.
    pub detach: bool,
}

/// Local line editing for the exec terminal. Typed text is echoed and
/// buffered; only Enter flushes it to the remote side.
#[derive(Debug, Default)]
pub struct LineDiscipline {
    buffer: String,
}

impl LineDiscipline {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn buffer(&self) -> &str {
        &self.buffer
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    pub fn feed(&mut self, input: &str) -> LineOutput {
        let Some(keystroke) = Keystroke::classify(input) else {
            return LineOutput::default();
        };
        match keystroke {
            Keystroke::Arrow => LineOutput::default(),
            Keystroke::Detach => LineOutput {
                echo: self.take_erased(),
                detach: true,
                ..LineOutput::default()
            },
            Keystroke::ClearLine => LineOutput {
                echo: self.take_erased(),
                ..LineOutput::default()
            },
            Keystroke::Enter => {
                let echo = ERASE.repeat(self.buffer.chars().count());
                self.buffer.push_str(NEWLINE);
                LineOutput {
                    echo,
                    submit: Some(std::mem::take(&mut self.buffer)),
                    detach: false,
                }
            }
            Keystroke::Backspace => {
                if self.buffer.pop().is_some() {
                    LineOutput {
                        echo: ERASE.to_string(),
                        ..LineOutput::default()
                    }
                } else {
                    LineOutput::default()
                }
            }
            Keystroke::Text(text) => {
                self.buffer.push_str(&text);
                LineOutput {
                    echo: text,
                    ..LineOutput::default()
                }
            }
        }
    }

    fn take_erased(&mut self) -> String {
        let erase = ERASE.repeat(self.buffer.chars().count());
        self.buffer.clear();
        erase
    }
}

fn strip_controls(input: &str) -> String {
    input.chars().filter(|ch| !matches!(ch, '\u{0}'..='\u{1f}')).collect()
}
