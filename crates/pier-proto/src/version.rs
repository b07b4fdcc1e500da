#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Empty {}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct GetVersionInfoResponse {
    #[prost(message, optional, tag = "1")]
    pub info: Option<VersionInfo>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct VersionInfo {
    #[prost(message, optional, tag = "1")]
    pub api: Option<ProtocolVersion>,
    #[prost(message, optional, tag = "2")]
    pub entrypoint: Option<ProtocolVersion>,
    #[prost(string, tag = "3")]
    pub version: String,
}

#[derive(Clone, Copy, Eq, PartialEq, ::prost::Message)]
pub struct ProtocolVersion {
    #[prost(uint32, tag = "1")]
    pub current: u32,
    #[prost(uint32, tag = "2")]
    pub minimum: u32,
}
