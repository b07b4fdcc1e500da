#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ExecStreamRequest {
    #[prost(oneof = "exec_stream_request::Event", tags = "1, 2, 3, 4")]
    pub event: Option<exec_stream_request::Event>,
}

pub mod exec_stream_request {
    #[derive(Clone, PartialEq, ::prost::Oneof)]
    pub enum Event {
        #[prost(message, tag = "1")]
        Start(Start),
        #[prost(message, tag = "2")]
        Input(Input),
        #[prost(message, tag = "3")]
        Winch(super::WindowSize),
        #[prost(message, tag = "4")]
        InputEof(InputEof),
    }

    #[derive(Clone, PartialEq, ::prost::Message)]
    pub struct Start {
        #[prost(string, tag = "1")]
        pub deployment_id: String,
        #[prost(string, repeated, tag = "2")]
        pub args: Vec<String>,
        #[prost(message, optional, tag = "3")]
        pub pty: Option<super::Pty>,
    }

    #[derive(Clone, PartialEq, ::prost::Message)]
    pub struct Input {
        #[prost(bytes = "vec", tag = "1")]
        pub data: Vec<u8>,
    }

    #[derive(Clone, PartialEq, ::prost::Message)]
    pub struct InputEof {}
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Pty {
    #[prost(bool, tag = "1")]
    pub enable: bool,
    #[prost(string, tag = "2")]
    pub term: String,
    #[prost(message, optional, tag = "3")]
    pub window_size: Option<WindowSize>,
}

/// Terminal geometry in character cells and pixels.
#[derive(Clone, Copy, Eq, Hash, PartialEq, ::prost::Message)]
pub struct WindowSize {
    #[prost(int32, tag = "1")]
    pub rows: i32,
    #[prost(int32, tag = "2")]
    pub cols: i32,
    #[prost(int32, tag = "3")]
    pub width: i32,
    #[prost(int32, tag = "4")]
    pub height: i32,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ExecStreamResponse {
    #[prost(oneof = "exec_stream_response::Event", tags = "1, 2, 3")]
    pub event: Option<exec_stream_response::Event>,
}

pub mod exec_stream_response {
    #[derive(Clone, PartialEq, ::prost::Oneof)]
    pub enum Event {
        #[prost(message, tag = "1")]
        Output(Output),
        #[prost(message, tag = "2")]
        Exit(Exit),
        #[prost(message, tag = "3")]
        Open(Open),
    }

    #[derive(Clone, PartialEq, ::prost::Message)]
    pub struct Open {}

    #[derive(Clone, PartialEq, ::prost::Message)]
    pub struct Output {
        #[prost(enumeration = "output::Channel", tag = "1")]
        pub channel: i32,
        #[prost(bytes = "vec", tag = "2")]
        pub data: Vec<u8>,
    }

    pub mod output {
        #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration)]
        #[repr(i32)]
        pub enum Channel {
            Unknown = 0,
            Stdout = 1,
            Stderr = 2,
        }
    }

    #[derive(Clone, PartialEq, ::prost::Message)]
    pub struct Exit {
        #[prost(int32, tag = "1")]
        pub code: i32,
    }
}
