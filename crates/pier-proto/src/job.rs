#[derive(Clone, PartialEq, ::prost::Message)]
pub struct GetJobStreamRequest {
    #[prost(string, tag = "1")]
    pub job_id: String,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct GetJobStreamResponse {
    #[prost(oneof = "get_job_stream_response::Event", tags = "1, 2, 3, 4, 5")]
    pub event: Option<get_job_stream_response::Event>,
}

pub mod get_job_stream_response {
    #[derive(Clone, PartialEq, ::prost::Oneof)]
    pub enum Event {
        #[prost(message, tag = "1")]
        Open(Open),
        #[prost(message, tag = "2")]
        State(State),
        #[prost(message, tag = "3")]
        Terminal(Terminal),
        #[prost(message, tag = "4")]
        Error(Error),
        #[prost(message, tag = "5")]
        Complete(Complete),
    }

    #[derive(Clone, PartialEq, ::prost::Message)]
    pub struct Open {}

    #[derive(Clone, PartialEq, ::prost::Message)]
    pub struct State {
        #[prost(string, tag = "1")]
        pub previous: String,
        #[prost(string, tag = "2")]
        pub current: String,
    }

    #[derive(Clone, PartialEq, ::prost::Message)]
    pub struct Terminal {
        #[prost(message, repeated, tag = "1")]
        pub events: Vec<super::TerminalEvent>,
        /// Set when the events were replayed from the server-side buffer.
        #[prost(bool, tag = "2")]
        pub buffered: bool,
    }

    #[derive(Clone, PartialEq, ::prost::Message)]
    pub struct Error {
        #[prost(message, optional, tag = "1")]
        pub error: Option<super::RpcStatus>,
    }

    #[derive(Clone, PartialEq, ::prost::Message)]
    pub struct Complete {
        #[prost(message, optional, tag = "1")]
        pub error: Option<super::RpcStatus>,
    }
}

/// Subset of `google.rpc.Status`.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct RpcStatus {
    #[prost(int32, tag = "1")]
    pub code: i32,
    #[prost(string, tag = "2")]
    pub message: String,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct TerminalEvent {
    #[prost(oneof = "terminal_event::Event", tags = "1, 2, 3, 4, 5, 6")]
    pub event: Option<terminal_event::Event>,
}

pub mod terminal_event {
    #[derive(Clone, PartialEq, ::prost::Oneof)]
    pub enum Event {
        #[prost(message, tag = "1")]
        Line(Line),
        #[prost(message, tag = "2")]
        Status(Status),
        #[prost(message, tag = "3")]
        NamedValues(NamedValues),
        #[prost(message, tag = "4")]
        Raw(Raw),
        #[prost(message, tag = "5")]
        StepGroup(StepGroup),
        #[prost(message, tag = "6")]
        Step(Step),
    }

    #[derive(Clone, PartialEq, ::prost::Message)]
    pub struct Line {
        #[prost(string, tag = "1")]
        pub msg: String,
        #[prost(string, tag = "2")]
        pub style: String,
    }

    #[derive(Clone, PartialEq, ::prost::Message)]
    pub struct Status {
        #[prost(string, tag = "1")]
        pub status: String,
        #[prost(string, tag = "2")]
        pub msg: String,
        #[prost(bool, tag = "3")]
        pub step: bool,
    }

    #[derive(Clone, PartialEq, ::prost::Message)]
    pub struct NamedValues {
        #[prost(message, repeated, tag = "1")]
        pub values: Vec<NamedValue>,
    }

    #[derive(Clone, PartialEq, ::prost::Message)]
    pub struct NamedValue {
        #[prost(string, tag = "1")]
        pub name: String,
        #[prost(string, tag = "2")]
        pub value: String,
    }

    #[derive(Clone, PartialEq, ::prost::Message)]
    pub struct Raw {
        #[prost(bytes = "vec", tag = "1")]
        pub data: Vec<u8>,
        #[prost(bool, tag = "2")]
        pub stderr: bool,
    }

    #[derive(Clone, PartialEq, ::prost::Message)]
    pub struct StepGroup {
        #[prost(bool, tag = "1")]
        pub close: bool,
    }

    #[derive(Clone, PartialEq, ::prost::Message)]
    pub struct Step {
        #[prost(int32, tag = "1")]
        pub id: i32,
        #[prost(bool, tag = "2")]
        pub close: bool,
        #[prost(string, tag = "3")]
        pub msg: String,
        #[prost(string, tag = "4")]
        pub status: String,
        #[prost(bytes = "vec", tag = "5")]
        pub output: Vec<u8>,
    }
}
