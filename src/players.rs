use serde::Serialize;

use crate::error::SourceQueryError;
use crate::packet::{PacketType, ResponsePacket};
use crate::parse::{get_f32, get_i32, get_string, get_u8};

/// A connected player as reported by A2S_PLAYER.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Player {
    /// Slot index, often 0 for every player
    pub index: u8,
    pub name: String,
    /// Kills or score, depending on the game
    pub score: i32,
    /// Seconds connected to the server
    pub duration: f32,
}

/// Parse an S2A_PLAYER [ResponsePacket] into players, in the order the server sent them.
pub fn parse_players(packet: &ResponsePacket) -> Result<Vec<Player>, SourceQueryError> {
    let data: &[u8] = packet.expect(PacketType::Players)?;
    let mut offset: usize = 0;

    let count: u8 = get_u8(data, &mut offset)?;
    let mut players: Vec<Player> = Vec::with_capacity(count as usize);
    for _ in 0..count {
        players.push(Player {
            index: get_u8(data, &mut offset)?,
            name: get_string(data, &mut offset)?,
            score: get_i32(data, &mut offset)?,
            duration: get_f32(data, &mut offset)?,
        });
    }

    Ok(players)
}
