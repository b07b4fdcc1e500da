use pier_proto::GetJobStreamResponse;
use pier_proto::job::get_job_stream_response::Event as ResponseEvent;
use pier_proto::job::terminal_event::Event as TermEvent;
use pier_proto::job::RpcStatus;

use super::entry::LineStyle;

/// Decoded job stream message; one variant per case of the response oneof.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobEvent {
    /// The oneof was unset.
    Empty,
    Open,
    State {
        previous: String,
        current: String,
    },
    Terminal {
        events: Vec<TerminalEvent>,
        buffered: bool,
    },
    Error {
        message: String,
    },
    Complete {
        error: Option<String>,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TerminalEvent {
    Line {
        msg: String,
        style: LineStyle,
    },
    Step {
        id: i32,
        close: bool,
        msg: String,
        status: String,
        output: Vec<u8>,
    },
    Raw {
        data: Vec<u8>,
        stderr: bool,
    },
    NamedValues(Vec<(String, String)>),
    Status {
        status: String,
        msg: String,
    },
    StepGroup {
        close: bool,
    },
    Empty,
}

impl From<GetJobStreamResponse> for JobEvent {
    fn from(response: GetJobStreamResponse) -> Self {
        match response.event {
            None => JobEvent::Empty,
            Some(ResponseEvent::Open(_)) => JobEvent::Open,
            Some(ResponseEvent::State(state)) => JobEvent::State {
                previous: state.previous,
                current: state.current,
            },
            Some(ResponseEvent::Terminal(terminal)) => JobEvent::Terminal {
                events: terminal.events.into_iter().map(TerminalEvent::from).collect(),
                buffered: terminal.buffered,
            },
            Some(ResponseEvent::Error(error)) => JobEvent::Error {
                message: error
                    .error
                    .and_then(error_message)
                    .unwrap_or_else(|| "job stream reported an error".to_string()),
            },
            Some(ResponseEvent::Complete(complete)) => JobEvent::Complete {
                error: complete.error.and_then(error_message),
            },
        }
    }
}

impl From<pier_proto::TerminalEvent> for TerminalEvent {
    fn from(event: pier_proto::TerminalEvent) -> Self {
        match event.event {
            None => TerminalEvent::Empty,
            Some(TermEvent::Line(line)) => TerminalEvent::Line {
                style: LineStyle::parse(&line.style),
                msg: line.msg,
            },
            Some(TermEvent::Step(step)) => TerminalEvent::Step {
                id: step.id,
                close: step.close,
                msg: step.msg,
                status: step.status,
                output: step.output,
            },
            Some(TermEvent::Raw(raw)) => TerminalEvent::Raw {
                data: raw.data,
                stderr: raw.stderr,
            },
            Some(TermEvent::NamedValues(values)) => TerminalEvent::NamedValues(
                values
                    .values
                    .into_iter()
                    .map(|value| (value.name, value.value))
                    .collect(),
            ),
            Some(TermEvent::Status(status)) => TerminalEvent::Status {
                status: status.status,
                msg: status.msg,
            },
            Some(TermEvent::StepGroup(group)) => TerminalEvent::StepGroup { close: group.close },
        }
    }
}

/// A zero status with no message is how some servers spell "no error".
fn error_message(status: RpcStatus) -> Option<String> {
    match (status.code, status.message.is_empty()) {
        (0, true) => None,
        (code, true) => Some(format!("job failed with code {code}")),
        (_, false) => Some(status.message),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pier_proto::job::get_job_stream_response::{Complete, Error, Terminal};
    use pier_proto::job::terminal_event::{Line, NamedValue, NamedValues, Step};

    fn response(event: ResponseEvent) -> GetJobStreamResponse {
        GetJobStreamResponse { event: Some(event) }
    }

    #[test]
    fn terminal_events_convert_in_order() {
        let event = JobEvent::from(response(ResponseEvent::Terminal(Terminal {
            events: vec![
                pier_proto::TerminalEvent {
                    event: Some(TermEvent::Line(Line {
                        msg: "Deploying".into(),
                        style: "header".into(),
                    })),
                },
                pier_proto::TerminalEvent {
                    event: Some(TermEvent::Step(Step {
                        id: 1,
                        close: false,
                        msg: "pull".into(),
                        status: "running".into(),
                        output: b"ok".to_vec(),
                    })),
                },
                pier_proto::TerminalEvent {
                    event: Some(TermEvent::NamedValues(NamedValues {
                        values: vec![NamedValue {
                            name: "url".into(),
                            value: "https://app".into(),
                        }],
                    })),
                },
                pier_proto::TerminalEvent { event: None },
            ],
            buffered: true,
        })));

        let JobEvent::Terminal { events, buffered } = event else {
            panic!("expected terminal event");
        };
        assert!(buffered);
        assert_eq!(
            events,
            vec![
                TerminalEvent::Line {
                    msg: "Deploying".into(),
                    style: LineStyle::Header,
                },
                TerminalEvent::Step {
                    id: 1,
                    close: false,
                    msg: "pull".into(),
                    status: "running".into(),
                    output: b"ok".to_vec(),
                },
                TerminalEvent::NamedValues(vec![("url".into(), "https://app".into())]),
                TerminalEvent::Empty,
            ]
        );
    }

    #[test]
    fn complete_error_message_is_extracted() {
        let failed = JobEvent::from(response(ResponseEvent::Complete(Complete {
            error: Some(RpcStatus {
                code: 13,
                message: "build failed".into(),
            }),
        })));
        assert_eq!(
            failed,
            JobEvent::Complete {
                error: Some("build failed".into())
            }
        );

        let coded = JobEvent::from(response(ResponseEvent::Complete(Complete {
            error: Some(RpcStatus {
                code: 9,
                message: String::new(),
            }),
        })));
        assert_eq!(
            coded,
            JobEvent::Complete {
                error: Some("job failed with code 9".into())
            }
        );

        let ok = JobEvent::from(response(ResponseEvent::Complete(Complete {
            error: Some(RpcStatus::default()),
        })));
        assert_eq!(ok, JobEvent::Complete { error: None });
    }

    #[test]
    fn error_event_without_status_gets_fallback_text() {
        let event = JobEvent::from(response(ResponseEvent::Error(Error { error: None })));
        assert_eq!(
            event,
            JobEvent::Error {
                message: "job stream reported an error".into()
            }
        );
        assert_eq!(
            JobEvent::from(GetJobStreamResponse::default()),
            JobEvent::Empty
        );
    }
}
