use std::ops::Range;

use crate::error::SourceQueryError;
use crate::parse::{get_i32, get_u8, put_string, take};

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum PacketHeader {
    Single,
    Split,
}

impl PacketHeader {
    pub const SINGLE: i32 = -1;
    pub const SPLIT: i32 = -2;

    /// Read the 4-byte header at the start of a datagram.
    pub fn peek(datagram: &[u8]) -> Result<Self, SourceQueryError> {
        get_i32(datagram, &mut 0)?.try_into()
    }

    /// For packing a [PacketHeader] into a packet in [RequestPacket::pack].
    pub fn to_le_bytes(&self) -> [u8; 4] {
        let type_value: i32 = match self {
            PacketHeader::Single => Self::SINGLE,
            PacketHeader::Split => Self::SPLIT,
        };
        type_value.to_le_bytes()
    }
}

impl TryFrom<i32> for PacketHeader {
    type Error = SourceQueryError;

    fn try_from(value: i32) -> Result<Self, Self::Error> {
        match value {
            Self::SINGLE => Ok(PacketHeader::Single),
            Self::SPLIT => Ok(PacketHeader::Split),
            n => Err(SourceQueryError::UnknownPacketHeader(n)),
        }
    }
}

/// Type byte following the single-packet header.
/// See <https://developer.valvesoftware.com/wiki/Server_queries>.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum PacketType {
    /// A2S_INFO request ('T').
    InfoRequest,
    /// A2S_PLAYER request ('U').
    PlayerRequest,
    /// A2S_RULES request ('V').
    RulesRequest,
    /// S2C_CHALLENGE ('A')
    ///
    /// The server may reply with a challenge instead of data. In that case the
    /// client repeats the request with the challenge number appended.
    Challenge,
    /// S2A_PLAYER response ('D'), parsed by [crate::players::parse_players].
    Players,
    /// S2A_RULES response ('E'), parsed by [crate::rules::parse_rules].
    Rules,
    /// S2A_INFO response ('I'), parsed by [crate::info::ServerInfo::parse].
    Info,
}

impl TryFrom<u8> for PacketType {
    type Error = SourceQueryError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0x54 => Ok(PacketType::InfoRequest),
            0x55 => Ok(PacketType::PlayerRequest),
            0x56 => Ok(PacketType::RulesRequest),
            0x41 => Ok(PacketType::Challenge),
            0x44 => Ok(PacketType::Players),
            0x45 => Ok(PacketType::Rules),
            0x49 => Ok(PacketType::Info),
            n => Err(SourceQueryError::UnknownPacketType(n)),
        }
    }
}

impl PacketType {
    pub fn to_byte(&self) -> u8 {
        match self {
            PacketType::InfoRequest => 0x54,   // 'T'
            PacketType::PlayerRequest => 0x55, // 'U'
            PacketType::RulesRequest => 0x56,  // 'V'
            PacketType::Challenge => 0x41,     // 'A'
            PacketType::Players => 0x44,       // 'D'
            PacketType::Rules => 0x45,         // 'E'
            PacketType::Info => 0x49,          // 'I'
        }
    }
}

/// Appended to A2S_PLAYER and A2S_RULES requests to ask the server for a challenge.
pub const CHALLENGE_MARKER: [u8; 4] = [0xFF; 4];

/// Largest UDP payload we are prepared to receive. Source servers stay under
/// 1400 bytes per datagram, but some games do not.
pub const MAX_PACKET_SIZE: usize = 65_507;

/// Body of every A2S_INFO request.
pub const INFO_PAYLOAD: &str = "Source Engine Query";

#[derive(Debug, PartialEq, Eq, Clone)]
pub struct RequestPacket {
    packet_header: PacketHeader,
    packet_type: PacketType,
    challenge: Option<[u8; 4]>,
}

impl RequestPacket {
    pub fn new(packet_type: PacketType, challenge: Option<[u8; 4]>) -> Self {
        RequestPacket {
            packet_header: PacketHeader::Single,
            packet_type,
            challenge,
        }
    }

    pub fn info(challenge: Option<[u8; 4]>) -> Self {
        Self::new(PacketType::InfoRequest, challenge)
    }

    pub fn players(challenge: Option<[u8; 4]>) -> Self {
        Self::new(PacketType::PlayerRequest, challenge)
    }

    pub fn rules(challenge: Option<[u8; 4]>) -> Self {
        Self::new(PacketType::RulesRequest, challenge)
    }

    /// The same request carrying a different challenge.
    pub fn with_challenge(&self, challenge: [u8; 4]) -> Self {
        Self::new(self.packet_type, Some(challenge))
    }

    /// Serializes a request packet into an array of bytes.
    pub fn pack(&self) -> Vec<u8> {
        // packet structure: header, type, body (info only), challenge
        let mut payload: Vec<u8> = Vec::with_capacity(29);
        payload.extend_from_slice(&self.packet_header.to_le_bytes());
        payload.push(self.packet_type.to_byte());
        if self.packet_type == PacketType::InfoRequest {
            put_string(&mut payload, INFO_PAYLOAD);
        }
        if let Some(c) = &self.challenge {
            payload.extend_from_slice(c);
        }

        payload
    }

    pub fn packet_type(&self) -> &PacketType {
        &self.packet_type
    }

    pub fn challenge(&self) -> Option<[u8; 4]> {
        self.challenge
    }
}

/// A complete (reassembled, decompressed) single-header response.
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct ResponsePacket {
    packet_type: PacketType,
    body: Vec<u8>,
}

impl ResponsePacket {
    const HEADER_RANGE: Range<usize> = 0..4;
    const TYPE_OFFSET: usize = 4;
    const BODY_OFFSET: usize = 5;

    /// Deserializes an incoming payload, splitting it up into type and body.
    pub fn unpack(incoming: &[u8]) -> Result<Self, SourceQueryError> {
        let mut offset: usize = Self::HEADER_RANGE.start;
        let raw_header: i32 = get_i32(incoming, &mut offset)?;
        match PacketHeader::try_from(raw_header)? {
            PacketHeader::Single => {}
            PacketHeader::Split => return Err(SourceQueryError::UnknownPacketHeader(raw_header)),
        }

        debug_assert_eq!(offset, Self::TYPE_OFFSET);
        let packet_type: PacketType = get_u8(incoming, &mut offset)?.try_into()?;

        Ok(ResponsePacket {
            packet_type,
            body: incoming[Self::BODY_OFFSET..].to_vec(),
        })
    }

    /// The 4-byte challenge token carried by an S2C_CHALLENGE response.
    pub fn challenge(&self) -> Result<[u8; 4], SourceQueryError> {
        let token: &[u8] = take(&self.body, &mut 0, 4)?;
        Ok([token[0], token[1], token[2], token[3]])
    }

    /// Fail unless this packet is of type `expected`.
    pub fn expect(&self, expected: PacketType) -> Result<&[u8], SourceQueryError> {
        if self.packet_type != expected {
            return Err(SourceQueryError::UnexpectedPacketType {
                expected: expected.to_byte(),
                got: self.packet_type.to_byte(),
            });
        }
        Ok(&self.body)
    }

    pub fn packet_type(&self) -> &PacketType {
        &self.packet_type
    }

    pub fn body(&self) -> &[u8] {
        &self.body
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_info_request_layout() {
        let packed = RequestPacket::info(None).pack();
        assert_eq!(packed, b"\xFF\xFF\xFF\xFFTSource Engine Query\0");
    }

    #[test]
    fn test_info_request_with_challenge() {
        let packed = RequestPacket::info(Some([1, 2, 3, 4])).pack();
        assert!(packed.ends_with(b"Query\0\x01\x02\x03\x04"));
    }

    #[test]
    fn test_player_and_rules_requests() {
        assert_eq!(
            RequestPacket::players(Some(CHALLENGE_MARKER)).pack(),
            b"\xFF\xFF\xFF\xFFU\xFF\xFF\xFF\xFF"
        );
        let challenged = RequestPacket::rules(Some(CHALLENGE_MARKER)).with_challenge([9, 8, 7, 6]);
        assert_eq!(challenged.pack(), b"\xFF\xFF\xFF\xFFV\x09\x08\x07\x06");
    }

    #[test]
    fn test_unpack_challenge() {
        let packet = ResponsePacket::unpack(b"\xFF\xFF\xFF\xFFA\x0A\x0B\x0C\x0D").unwrap();
        assert_eq!(packet.packet_type(), &PacketType::Challenge);
        assert_eq!(packet.challenge().unwrap(), [0x0A, 0x0B, 0x0C, 0x0D]);
    }

    #[test]
    fn test_unpack_short_challenge() {
        let packet = ResponsePacket::unpack(b"\xFF\xFF\xFF\xFFA\x0A\x0B").unwrap();
        assert!(packet.challenge().is_err());
    }

    #[test]
    fn test_unpack_rejects_bad_header() {
        let err = ResponsePacket::unpack(b"\xFE\xFF\xFF\xFFI").unwrap_err();
        assert!(matches!(err, SourceQueryError::UnknownPacketHeader(-2)));
        let err = ResponsePacket::unpack(b"\x00\x00\x00\x00I").unwrap_err();
        assert!(matches!(err, SourceQueryError::UnknownPacketHeader(0)));
        assert!(ResponsePacket::unpack(b"\xFF\xFF").is_err());
    }

    #[test]
    fn test_expect_type() {
        let packet = ResponsePacket::unpack(b"\xFF\xFF\xFF\xFFE\x00\x00").unwrap();
        assert_eq!(packet.expect(PacketType::Rules).unwrap(), &[0, 0]);
        assert!(matches!(
            packet.expect(PacketType::Players),
            Err(SourceQueryError::UnexpectedPacketType { expected: 0x44, got: 0x45 })
        ));
    }

    #[test]
    fn test_peek_header() {
        assert_eq!(PacketHeader::peek(&[0xFE, 0xFF, 0xFF, 0xFF]).unwrap(), PacketHeader::Split);
        assert_eq!(
            PacketHeader::peek(&[0xFF, 0xFF, 0xFF, 0xFF, 0x49]).unwrap(),
            PacketHeader::Single
        );
        assert!(PacketHeader::peek(&[0xFF]).is_err());
    }
}
