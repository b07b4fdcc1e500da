/// Presentation hint the server attaches to a terminal line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum LineStyle {
    #[default]
    Plain,
    Header,
    Error,
    ErrorBold,
    Warning,
    WarningBold,
    Info,
    Success,
    SuccessBold,
}

impl LineStyle {
    pub fn parse(style: &str) -> Self {
        match style.trim() {
            "header" => LineStyle::Header,
            "error" => LineStyle::Error,
            "error-bold" => LineStyle::ErrorBold,
            "warning" => LineStyle::Warning,
            "warning-bold" => LineStyle::WarningBold,
            "info" => LineStyle::Info,
            "success" => LineStyle::Success,
            "success-bold" => LineStyle::SuccessBold,
            _ => LineStyle::Plain,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            LineStyle::Plain => "",
            LineStyle::Header => "header",
            LineStyle::Error => "error",
            LineStyle::ErrorBold => "error-bold",
            LineStyle::Warning => "warning",
            LineStyle::WarningBold => "warning-bold",
            LineStyle::Info => "info",
            LineStyle::Success => "success",
            LineStyle::SuccessBold => "success-bold",
        }
    }

    pub fn is_bold(self) -> bool {
        matches!(
            self,
            LineStyle::Header | LineStyle::ErrorBold | LineStyle::WarningBold | LineStyle::SuccessBold
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntryKind {
    Line,
    Step,
    Status,
    Raw,
}

/// One rendered row of the job log. Entries are immutable once appended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogEntry {
    Line {
        msg: String,
        style: LineStyle,
    },
    Step {
        id: i32,
        msg: String,
        status: String,
        /// Step output decoded as UTF-8, lossy.
        output: String,
    },
    Status {
        details: String,
    },
    Raw {
        text: String,
        stderr: bool,
    },
}

impl LogEntry {
    pub fn line(msg: impl Into<String>, style: LineStyle) -> Self {
        LogEntry::Line {
            msg: msg.into(),
            style,
        }
    }

    pub fn status(details: impl Into<String>) -> Self {
        LogEntry::Status {
            details: details.into(),
        }
    }

    pub fn kind(&self) -> EntryKind {
        match self {
            LogEntry::Line { .. } => EntryKind::Line,
            LogEntry::Step { .. } => EntryKind::Step,
            LogEntry::Status { .. } => EntryKind::Status,
            LogEntry::Raw { .. } => EntryKind::Raw,
        }
    }

    /// Plain-text form, without styling.
    pub fn render(&self) -> String {
        match self {
            LogEntry::Line { msg, .. } => msg.clone(),
            LogEntry::Step { msg, output, .. } => {
                let output = output.trim_end_matches('\n');
                match (msg.is_empty(), output.is_empty()) {
                    (_, true) => msg.clone(),
                    (true, false) => output.to_string(),
                    (false, false) => format!("{msg}\n{output}"),
                }
            }
            LogEntry::Status { details } => details.clone(),
            LogEntry::Raw { text, .. } => text.trim_end_matches('\n').to_string(),
        }
    }
}
