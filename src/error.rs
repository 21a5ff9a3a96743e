use thiserror::Error;

/// Everything that can go wrong while talking to a game server or the master server.
#[derive(Error, Debug)]
pub enum SourceQueryError {
    #[error("failed to bind a local UDP port: {0}")]
    FailedPortBind(#[source] std::io::Error),

    #[error("host is unreachable: {0}")]
    UnreachableHost(#[source] std::io::Error),

    #[error("could not resolve `{0}` to any address")]
    Resolve(String),

    #[error("failed to send packet: {0}")]
    SendError(#[source] std::io::Error),

    #[error("failed to receive packet: {0}")]
    ReceiveError(#[source] std::io::Error),

    #[error("only {sent} of {len} bytes were sent")]
    PartialSend { sent: usize, len: usize },

    #[error("timed out")]
    Timeout(#[from] tokio::time::error::Elapsed),

    #[error("unknown packet header: {0}")]
    UnknownPacketHeader(i32),

    #[error("unknown packet type: 0x{0:02X}")]
    UnknownPacketType(u8),

    #[error("expected packet type 0x{expected:02X}, got 0x{got:02X}")]
    UnexpectedPacketType { expected: u8, got: u8 },

    #[error("packet ended early: needed {needed} bytes at offset {offset}, {len} available")]
    UnexpectedEnd {
        offset: usize,
        needed: usize,
        len: usize,
    },

    #[error("fragment declares {got} total fragments, first fragment declared {expected}")]
    FragmentCountMismatch { expected: u8, got: u8 },

    #[error("fragment index {index} is out of range for {total} fragments")]
    FragmentOutOfRange { index: u8, total: u8 },

    #[error("fragment belongs to request {got:#010X}, expected {expected:#010X}")]
    RequestIdMismatch { expected: u32, got: u32 },

    #[error("failed to decompress payload: {0}")]
    Decompress(#[source] std::io::Error),

    #[error("checksum mismatch: declared {declared:#010X}, computed {computed:#010X}")]
    ChecksumMismatch { declared: u32, computed: u32 },

    #[error("decompressed {got} bytes, expected {expected}")]
    DecompressedSizeMismatch { expected: u32, got: usize },

    #[error("malformed master server response: {0}")]
    MalformedDirectoryResponse(&'static str),
}

/// Reasons a textual or numeric Steam ID was rejected.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SteamIdError {
    #[error("default universe must be a real universe")]
    InvalidDefaultUniverse,

    #[error("`{0}` is not a recognised Steam ID format")]
    Malformed(String),

    #[error("account id {0} does not fit in 32 bits")]
    AccountOutOfRange(u64),

    #[error("instance {0} does not fit in 20 bits")]
    InstanceOutOfRange(u64),

    #[error("unknown account type character `{0}`")]
    UnknownAccountType(char),

    #[error("{0} is not a 64-bit Steam ID")]
    NotSteam64(u64),
}
