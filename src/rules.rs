use serde::Serialize;

use crate::error::SourceQueryError;
use crate::packet::{PacketType, ResponsePacket};
use crate::parse::{get_string, get_u16};

/// A server cvar as reported by A2S_RULES.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Rule {
    pub name: String,
    pub value: String,
}

/// Parse an S2A_RULES [ResponsePacket] into rules, in the order the server sent them.
pub fn parse_rules(packet: &ResponsePacket) -> Result<Vec<Rule>, SourceQueryError> {
    let data: &[u8] = packet.expect(PacketType::Rules)?;
    let mut offset: usize = 0;

    let count: u16 = get_u16(data, &mut offset)?;
    let mut rules: Vec<Rule> = Vec::with_capacity(count as usize);
    for _ in 0..count {
        rules.push(Rule {
            name: get_string(data, &mut offset)?,
            value: get_string(data, &mut offset)?,
        });
    }

    Ok(rules)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_rules_in_wire_order() {
        let mut data = b"\xFF\xFF\xFF\xFFE".to_vec();
        data.extend_from_slice(&2u16.to_le_bytes());
        data.extend_from_slice(b"mp_timelimit\030\0sv_gravity\0800\0");

        let rules = parse_rules(&ResponsePacket::unpack(&data).unwrap()).unwrap();
        assert_eq!(
            rules,
            vec![
                Rule { name: "mp_timelimit".into(), value: "30".into() },
                Rule { name: "sv_gravity".into(), value: "800".into() },
            ]
        );
    }

    #[test]
    fn test_parse_no_rules() {
        let packet = ResponsePacket::unpack(b"\xFF\xFF\xFF\xFFE\x00\x00").unwrap();
        let rules = parse_rules(&packet).unwrap();
        assert!(rules.is_empty());
    }

    #[test]
    fn test_count_larger_than_payload_fails() {
        let mut data = b"\xFF\xFF\xFF\xFFE".to_vec();
        data.extend_from_slice(&3u16.to_le_bytes());
        data.extend_from_slice(b"a\0b\0");
        assert!(parse_rules(&ResponsePacket::unpack(&data).unwrap()).is_err());
    }
}
