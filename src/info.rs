use serde::Serialize;

use crate::error::SourceQueryError;
use crate::packet::{PacketType, ResponsePacket};
use crate::parse::{get_string, get_u16, get_u64, get_u8};

/// SourceTV relay advertised in the extra data of an info response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SourceTv {
    /// Spectator port
    pub port: u16,
    /// Spectator server name
    pub name: String,
}

/// Server information as obtained by [crate::server::SourceServer::info].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ServerInfo {
    /// A2S_INFO protocol version
    pub protocol: u8,
    /// Server hostname
    pub hostname: String,
    /// Current map
    pub map: String,
    /// Location of server files
    pub folder: String,
    /// Name of game
    pub game: String,
    /// Steam application ID of game
    pub app_id: u16,
    /// Current players
    pub players: u8,
    /// Max players
    pub maxplayers: u8,
    /// Current bots
    pub bots: u8,
    /// Server type:
    /// - `d`: Dedicated
    /// - `l`: Listen (non-dedicated)
    /// - `p`: SourceTV relay (proxy)
    pub server_type: char,
    /// Server environment:
    /// - `l`: Linux
    /// - `w`: Windows
    /// - `m` or `o`: Mac
    pub server_env: char,
    /// Is the server password protected?
    pub password_protected: bool,
    /// Is the server VAC enabled?
    pub vac_enabled: bool,
    /// Version of the game installed on the server
    pub version: String,
    /// Game port, if the server reported it
    pub port: Option<u16>,
    /// Server's 64-bit Steam ID
    pub steam_id: Option<u64>,
    /// SourceTV relay
    pub source_tv: Option<SourceTv>,
    /// Free-form tags
    pub keywords: Option<String>,
    /// 64-bit game ID; the low 24 bits are the app id
    pub game_id: Option<u64>,
}

impl ServerInfo {
    const EDF_PORT: u8 = 0x80;
    const EDF_STEAM_ID: u8 = 0x10;
    const EDF_SOURCE_TV: u8 = 0x40;
    const EDF_KEYWORDS: u8 = 0x20;
    const EDF_GAME_ID: u8 = 0x01;

    /// Parse a [ResponsePacket] into its corresponding [ServerInfo].
    /// Fails with [SourceQueryError::UnexpectedPacketType] unless it is a [PacketType::Info].
    pub fn parse(packet: &ResponsePacket) -> Result<ServerInfo, SourceQueryError> {
        let data: &[u8] = packet.expect(PacketType::Info)?;
        let mut offset: usize = 0;

        let protocol = get_u8(data, &mut offset)?;
        let hostname = get_string(data, &mut offset)?;
        let map = get_string(data, &mut offset)?;
        let folder = get_string(data, &mut offset)?;
        let game = get_string(data, &mut offset)?;
        let app_id = get_u16(data, &mut offset)?;
        let players = get_u8(data, &mut offset)?;
        let maxplayers = get_u8(data, &mut offset)?;
        let bots = get_u8(data, &mut offset)?;
        let server_type = char::from(get_u8(data, &mut offset)?);
        let server_env = char::from(get_u8(data, &mut offset)?);
        let password_protected = get_u8(data, &mut offset)? != 0;
        let vac_enabled = get_u8(data, &mut offset)? != 0;
        let version = get_string(data, &mut offset)?;

        let mut info = ServerInfo {
            protocol,
            hostname,
            map,
            folder,
            game,
            app_id,
            players,
            maxplayers,
            bots,
            server_type,
            server_env,
            password_protected,
            vac_enabled,
            version,
            port: None,
            steam_id: None,
            source_tv: None,
            keywords: None,
            game_id: None,
        };

        // old servers stop after the version string
        let edf: u8 = match data.get(offset) {
            Some(_) => get_u8(data, &mut offset)?,
            None => return Ok(info),
        };

        // the order of these reads is fixed by the protocol, not by bit value
        if edf & Self::EDF_PORT != 0 {
            info.port = Some(get_u16(data, &mut offset)?);
        }
        if edf & Self::EDF_STEAM_ID != 0 {
            info.steam_id = Some(get_u64(data, &mut offset)?);
        }
        if edf & Self::EDF_SOURCE_TV != 0 {
            info.source_tv = Some(SourceTv {
                port: get_u16(data, &mut offset)?,
                name: get_string(data, &mut offset)?,
            });
        }
        if edf & Self::EDF_KEYWORDS != 0 {
            info.keywords = Some(get_string(data, &mut offset)?);
        }
        if edf & Self::EDF_GAME_ID != 0 {
            info.game_id = Some(get_u64(data, &mut offset)?);
        }

        Ok(info)
    }
}
