//! Pure Rust async clients for the [Source server query protocol][a2s]
//! and the [Steam master server query protocol][master],
//! plus parsing and rendering of Steam IDs.
//!
//! [a2s]: https://developer.valvesoftware.com/wiki/Server_queries
//! [master]: https://developer.valvesoftware.com/wiki/Master_Server_Query_Protocol
pub mod bits;
pub mod error;
pub mod filter;
mod grammar;
pub mod info;
pub mod master;
pub mod packet;
mod parse;
pub mod players;
pub mod rules;
pub mod server;
pub mod split;
pub mod steamid;

pub use error::{SourceQueryError, SteamIdError};
pub use filter::{Filter, Region};
pub use info::ServerInfo;
pub use master::MasterServer;
pub use players::Player;
pub use rules::Rule;
pub use server::{query, SourceServer};
pub use steamid::{AccountType, SteamID, Universe};
