//! 64-bit Steam account identifiers and their text forms.
//!
//! Layout, from the low bit up: account id (32 bits), instance (20 bits),
//! account type (4 bits), universe (8 bits).
//!
//! Accepted text forms:
//! - Steam2: `STEAM_0:1:4491990` (the `STEAM_` prefix is optional)
//! - Steam3: `[U:1:8983981]`, `[A:1:0:0]`, `[g:1:4]`, with a loose and a strict grammar
//! - Steam64: `76561197969249709`, through the Steam3 entry points
use std::fmt;
use std::str::FromStr;

use serde::{de, Deserialize, Deserializer, Serialize, Serializer};

use crate::bits::BitVector64;
use crate::error::SteamIdError;
use crate::grammar::{full_match, Captures, Node, Slot};

/// Steam universes. Each universe is a self-contained Steam instance.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(u8)]
pub enum Universe {
    #[default]
    Invalid = 0,
    Public = 1,
    Beta = 2,
    Internal = 3,
    Dev = 4,
}

impl Universe {
    /// First value past the known universes.
    pub const MAX: u8 = 5;

    pub fn from_raw(value: u8) -> Option<Self> {
        match value {
            0 => Some(Universe::Invalid),
            1 => Some(Universe::Public),
            2 => Some(Universe::Beta),
            3 => Some(Universe::Internal),
            4 => Some(Universe::Dev),
            _ => None,
        }
    }
}

/// Steam account types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(u8)]
pub enum AccountType {
    Invalid = 0,
    /// single user account
    Individual = 1,
    /// multiseat (e.g. cybercafe) account
    Multiseat = 2,
    GameServer = 3,
    AnonGameServer = 4,
    Pending = 5,
    ContentServer = 6,
    Clan = 7,
    Chat = 8,
    /// local PSN or Live account
    ConsoleUser = 9,
    AnonUser = 10,
}

impl AccountType {
    /// First value past the known types. The field has room for 16.
    pub const MAX: u8 = 11;

    pub fn from_raw(value: u8) -> Option<Self> {
        use AccountType::*;
        const ALL: [AccountType; 11] = [
            Invalid,
            Individual,
            Multiseat,
            GameServer,
            AnonGameServer,
            Pending,
            ContentServer,
            Clan,
            Chat,
            ConsoleUser,
            AnonUser,
        ];
        ALL.get(value as usize).copied()
    }

    /// Type for a Steam3 letter. `L` and `c` are chat rooms with a flag set.
    pub fn from_char(c: char) -> Option<Self> {
        match c {
            'i' | 'I' => Some(AccountType::Invalid),
            'U' => Some(AccountType::Individual),
            'M' => Some(AccountType::Multiseat),
            'G' => Some(AccountType::GameServer),
            'A' => Some(AccountType::AnonGameServer),
            'P' => Some(AccountType::Pending),
            'C' => Some(AccountType::ContentServer),
            'g' => Some(AccountType::Clan),
            'T' | 'L' | 'c' => Some(AccountType::Chat),
            'a' => Some(AccountType::AnonUser),
            _ => None,
        }
    }

    pub fn to_char(self) -> Option<char> {
        match self {
            AccountType::AnonGameServer => Some('A'),
            AccountType::GameServer => Some('G'),
            AccountType::Multiseat => Some('M'),
            AccountType::Pending => Some('P'),
            AccountType::ContentServer => Some('C'),
            AccountType::Clan => Some('g'),
            AccountType::Chat => Some('T'),
            AccountType::Invalid => Some('I'),
            AccountType::Individual => Some('U'),
            AccountType::AnonUser => Some('a'),
            AccountType::ConsoleUser => None,
        }
    }
}

/// User account instances.
pub mod instance {
    pub const ALL: u32 = 0;
    pub const DESKTOP: u32 = 1;
    pub const CONSOLE: u32 = 2;
    pub const WEB: u32 = 4;
    /// Individual accounts must have an instance below this.
    pub const USER_LIMIT: u32 = 4;
}

/// Flags for chat accounts, kept in the top bits of the instance.
///
/// These follow the Steam SDK, which places the flags at the top of the full
/// 20-bit instance field (`0x80000`, `0x40000`, `0x20000`).
pub mod chat_flags {
    use super::SteamID;

    pub const CLAN: u32 = ((SteamID::INSTANCE_MASK + 1) >> 1) as u32;
    pub const LOBBY: u32 = ((SteamID::INSTANCE_MASK + 1) >> 2) as u32;
    pub const MMS_LOBBY: u32 = ((SteamID::INSTANCE_MASK + 1) >> 3) as u32;
}

const SEP: Node = Node::Class(b":-");
const UNIVERSE: Node = Node::Maybe(&[Node::Capture(Slot::Universe, b"01234"), SEP]);
const ACCOUNT: Node = Node::Digits(Slot::Account, usize::MAX);
const TYPE_CHARS: &[u8] = b"GMPCgcLTIUai";

static STEAM2: &[Node] = &[
    Node::Maybe(&[Node::Text("STEAM_")]),
    Node::Either(
        &[Node::Text("1")],
        &[Node::Class(b"01234"), Node::Text(":"), Node::Capture(Slot::AuthServer, b"01")],
    ),
    Node::Text(":"),
    Node::Digits(Slot::Account, 10),
];

/// Matched against the text with one pair of enclosing brackets removed.
static STEAM3_STRICT: &[Node] = &[Node::Either(
    &[
        Node::Capture(Slot::Type, b"A"),
        Node::Maybe(&[SEP]),
        UNIVERSE,
        ACCOUNT,
        Node::Maybe(&[Node::Either(
            &[SEP, Node::Digits(Slot::Instance, 10)],
            &[Node::Text("("), Node::Digits(Slot::Instance, 10), Node::Text(")")],
        )]),
    ],
    &[
        Node::Maybe(&[Node::Capture(Slot::Type, TYPE_CHARS), Node::Maybe(&[SEP])]),
        UNIVERSE,
        ACCOUNT,
    ],
)];

static STEAM3_LOOSE: &[Node] = &[
    Node::Maybe(&[Node::Text("[")]),
    Node::Either(
        &[
            Node::Capture(Slot::Type, b"A"),
            Node::Maybe(&[SEP]),
            UNIVERSE,
            ACCOUNT,
            Node::Maybe(&[
                Node::Class(b":("),
                Node::Digits(Slot::Instance, 10),
                Node::Maybe(&[Node::Text(")")]),
            ]),
        ],
        &[
            Node::Maybe(&[Node::Capture(Slot::Type, TYPE_CHARS), Node::Maybe(&[SEP])]),
            Node::Maybe(&[Node::Text("[")]),
            UNIVERSE,
            ACCOUNT,
            Node::Maybe(&[Node::Text("]")]),
        ],
    ),
    Node::Maybe(&[Node::Text("]")]),
];

/// A Steam ID. The default value is the all-zero "not set" ID.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SteamID(BitVector64);

impl SteamID {
    const ACCOUNT_ID_OFFSET: u32 = 0;
    pub const ACCOUNT_ID_MASK: u64 = 0xFFFF_FFFF;

    const INSTANCE_OFFSET: u32 = 32;
    pub const INSTANCE_MASK: u64 = 0xF_FFFF;

    const TYPE_OFFSET: u32 = 52;
    const TYPE_MASK: u64 = 0xF;

    const UNIVERSE_OFFSET: u32 = 56;
    const UNIVERSE_MASK: u64 = 0xFF;

    /// Pack the four fields into an ID. `instance` is truncated to 20 bits.
    pub fn new(
        universe: Universe,
        account_type: AccountType,
        instance: u32,
        account_id: u32,
    ) -> Self {
        let mut id = SteamID::default();
        id.set_universe(universe);
        id.set_account_type(account_type);
        id.set_instance(instance);
        id.set_account_id(account_id);
        id
    }

    /// Accept a raw 64-bit value. Values that fit in an account id alone are rejected.
    pub fn from_u64(steam64: u64) -> Result<Self, SteamIdError> {
        if steam64 <= Self::ACCOUNT_ID_MASK {
            return Err(SteamIdError::NotSteam64(steam64));
        }
        Ok(SteamID(BitVector64::new(steam64)))
    }

    /// Parse a Steam2 ID such as `STEAM_0:1:4491990`.
    ///
    /// The universe digit in the text is ignored; Steam2 IDs are always
    /// individual desktop accounts in `universe`.
    pub fn from_steam2(text: &str, universe: Universe) -> Result<Self, SteamIdError> {
        if universe == Universe::Invalid {
            return Err(SteamIdError::InvalidDefaultUniverse);
        }
        let caps: Captures<'_> =
            full_match(STEAM2, text).ok_or_else(|| SteamIdError::Malformed(text.to_owned()))?;

        let fragment: u64 = parse_number(text, caps.get(Slot::Account))?;
        let mut account: u64 = fragment;
        if let Some(auth) = caps.get(Slot::AuthServer) {
            account = (fragment << 1) | parse_number(text, Some(auth))?;
        }
        if account > Self::ACCOUNT_ID_MASK {
            return Err(SteamIdError::AccountOutOfRange(account));
        }

        Ok(SteamID::new(
            universe,
            AccountType::Individual,
            instance::DESKTOP,
            account as u32,
        ))
    }

    /// Parse a Steam3 ID with the loose grammar: brackets may be missing or
    /// unbalanced, `:` and `-` are interchangeable, and an anonymous game
    /// server instance may follow `:` or sit in parentheses.
    ///
    /// A bare number too large for an account id is taken as a Steam64 value.
    pub fn from_steam3(text: &str, default_universe: Universe) -> Result<Self, SteamIdError> {
        if default_universe == Universe::Invalid {
            return Err(SteamIdError::InvalidDefaultUniverse);
        }
        let caps: Captures<'_> =
            full_match(STEAM3_LOOSE, text).ok_or_else(|| SteamIdError::Malformed(text.to_owned()))?;
        Self::from_captures(text, &caps, default_universe)
    }

    /// Parse a Steam3 ID with the strict grammar: brackets must enclose the
    /// whole text or be absent, and only an anonymous game server may carry
    /// an instance.
    pub fn from_steam3_strict(
        text: &str,
        default_universe: Universe,
    ) -> Result<Self, SteamIdError> {
        if default_universe == Universe::Invalid {
            return Err(SteamIdError::InvalidDefaultUniverse);
        }

        let inner: &str = match (text.strip_prefix('['), text.ends_with(']')) {
            (Some(rest), true) => &rest[..rest.len() - 1],
            (None, false) => text,
            _ => return Err(SteamIdError::Malformed(text.to_owned())),
        };
        let caps: Captures<'_> =
            full_match(STEAM3_STRICT, inner)
                .ok_or_else(|| SteamIdError::Malformed(text.to_owned()))?;
        Self::from_captures(text, &caps, default_universe)
    }

    /// Parse Steam3 text with either grammar.
    pub fn parse_text(
        text: &str,
        default_universe: Universe,
        strict: bool,
    ) -> Result<Self, SteamIdError> {
        match strict {
            true => Self::from_steam3_strict(text, default_universe),
            false => Self::from_steam3(text, default_universe),
        }
    }

    fn from_captures(
        text: &str,
        caps: &Captures<'_>,
        default_universe: Universe,
    ) -> Result<Self, SteamIdError> {
        let account: u64 = parse_number(text, caps.get(Slot::Account))?;

        let mut universe: Universe = default_universe;
        if let Some(digit) = caps.get(Slot::Universe) {
            let raw = parse_number(text, Some(digit))?;
            universe = u8::try_from(raw)
                .ok()
                .and_then(Universe::from_raw)
                .ok_or_else(|| SteamIdError::Malformed(text.to_owned()))?;
            if universe == Universe::Invalid {
                universe = default_universe;
            }
        }

        let type_char: Option<char> = caps.get(Slot::Type).and_then(|t| t.chars().next());
        let account_type: AccountType = match type_char {
            Some(c) => AccountType::from_char(c).ok_or(SteamIdError::UnknownAccountType(c))?,
            None => AccountType::Individual,
        };

        let mut inst: u64 = instance::DESKTOP as u64;
        if let Some(digits) = caps.get(Slot::Instance) {
            inst = parse_number(text, Some(digits))?;
            if inst > Self::INSTANCE_MASK {
                return Err(SteamIdError::InstanceOutOfRange(inst));
            }
        }

        if account > Self::ACCOUNT_ID_MASK {
            let bare = !caps.has(Slot::Universe)
                && !caps.has(Slot::Type)
                && !caps.has(Slot::Instance);
            if bare {
                return Self::from_u64(account);
            }
            return Err(SteamIdError::AccountOutOfRange(account));
        }

        match account_type {
            AccountType::Clan => inst = 0,
            AccountType::Individual | AccountType::Invalid => inst = instance::DESKTOP as u64,
            AccountType::Chat => match type_char {
                Some('T') => inst = 0,
                Some('L') => inst = chat_flags::LOBBY as u64,
                Some('c') => inst = chat_flags::CLAN as u64,
                _ => {}
            },
            AccountType::AnonGameServer if account == 0 => inst = 0,
            _ => {}
        }

        Ok(SteamID::new(universe, account_type, inst as u32, account as u32))
    }

    pub fn as_u64(&self) -> u64 {
        self.0.data()
    }

    pub fn account_id(&self) -> u32 {
        self.0.get(Self::ACCOUNT_ID_OFFSET, Self::ACCOUNT_ID_MASK) as u32
    }

    pub fn set_account_id(&mut self, account_id: u32) {
        self.0.set(Self::ACCOUNT_ID_OFFSET, Self::ACCOUNT_ID_MASK, account_id as u64);
    }

    pub fn instance(&self) -> u32 {
        self.0.get(Self::INSTANCE_OFFSET, Self::INSTANCE_MASK) as u32
    }

    pub fn set_instance(&mut self, instance: u32) {
        self.0.set(Self::INSTANCE_OFFSET, Self::INSTANCE_MASK, instance as u64);
    }

    /// Raw 4-bit type field.
    pub fn account_type_raw(&self) -> u8 {
        self.0.get(Self::TYPE_OFFSET, Self::TYPE_MASK) as u8
    }

    /// `None` for type values Steam does not define.
    pub fn account_type(&self) -> Option<AccountType> {
        AccountType::from_raw(self.account_type_raw())
    }

    pub fn set_account_type(&mut self, account_type: AccountType) {
        self.0.set(Self::TYPE_OFFSET, Self::TYPE_MASK, account_type as u64);
    }

    /// Raw 8-bit universe field.
    pub fn universe_raw(&self) -> u8 {
        self.0.get(Self::UNIVERSE_OFFSET, Self::UNIVERSE_MASK) as u8
    }

    /// `None` for universe values Steam does not define.
    pub fn universe(&self) -> Option<Universe> {
        Universe::from_raw(self.universe_raw())
    }

    pub fn set_universe(&mut self, universe: Universe) {
        self.0.set(Self::UNIVERSE_OFFSET, Self::UNIVERSE_MASK, universe as u64);
    }

    pub fn is_valid(&self) -> bool {
        let universe: u8 = self.universe_raw();
        if universe < Universe::Public as u8 || universe >= Universe::MAX {
            return false;
        }

        match self.account_type() {
            None | Some(AccountType::Invalid) => false,
            Some(AccountType::Individual) => {
                self.account_id() != 0 && self.instance() < instance::USER_LIMIT
            }
            Some(AccountType::Clan) => self.account_id() != 0 && self.instance() == 0,
            Some(AccountType::GameServer) => self.account_id() != 0,
            Some(AccountType::AnonGameServer) => self.account_id() != 0 || self.instance() != 0,
            Some(_) => true,
        }
    }

    /// `STEAM_X:Y:Z`, only for individual (or invalid) accounts.
    pub fn render_steam2(&self) -> Option<String> {
        match self.account_type() {
            Some(AccountType::Invalid) | Some(AccountType::Individual) => {}
            _ => return None,
        }

        let universe: u8 = self.universe_raw();
        let universe_digit: u8 = if universe <= Universe::Public as u8 { 0 } else { universe };
        let account: u32 = self.account_id();
        Some(format!("STEAM_{}:{}:{}", universe_digit, account & 1, account >> 1))
    }

    /// `[T:U:A]` or `[T:U:A:I]`.
    pub fn render_steam3(&self) -> String {
        let account_type: Option<AccountType> = self.account_type();
        let mut type_char: char = account_type.and_then(AccountType::to_char).unwrap_or('i');
        let inst: u32 = self.instance();

        let render_instance: bool = match account_type {
            Some(AccountType::AnonGameServer) | Some(AccountType::Multiseat) => true,
            Some(AccountType::Individual) => inst != instance::DESKTOP,
            Some(AccountType::Chat) => {
                if inst & chat_flags::CLAN != 0 {
                    type_char = 'c';
                } else if inst & chat_flags::LOBBY != 0 {
                    type_char = 'L';
                }
                // the letter carries the flag
                false
            }
            _ => false,
        };

        if render_instance {
            format!("[{}:{}:{}:{}]", type_char, self.universe_raw(), self.account_id(), inst)
        } else {
            format!("[{}:{}:{}]", type_char, self.universe_raw(), self.account_id())
        }
    }

    /// Steam3 text, or Steam2 text when `steam3` is false and the account has one.
    pub fn render(&self, steam3: bool) -> Option<String> {
        if steam3 {
            Some(self.render_steam3())
        } else {
            self.render_steam2()
        }
    }
}

fn parse_number(text: &str, digits: Option<&str>) -> Result<u64, SteamIdError> {
    digits
        .and_then(|d| d.parse::<u64>().ok())
        .ok_or_else(|| SteamIdError::Malformed(text.to_owned()))
}

impl fmt::Display for SteamID {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render_steam3())
    }
}

impl FromStr for SteamID {
    type Err = SteamIdError;

    /// Loose Steam3 (or bare Steam64) text in the public universe.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        SteamID::from_steam3(s, Universe::Public)
    }
}

impl From<SteamID> for u64 {
    fn from(id: SteamID) -> u64 {
        id.as_u64()
    }
}

impl Serialize for SteamID {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for SteamID {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        text.parse().map_err(de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn loose(text: &str) -> Result<SteamID, SteamIdError> {
        SteamID::from_steam3(text, Universe::Public)
    }

    fn strict(text: &str) -> Result<SteamID, SteamIdError> {
        SteamID::from_steam3_strict(text, Universe::Public)
    }

    #[test]
    fn test_pack_layout() {
        let id = SteamID::new(Universe::Public, AccountType::Individual, 1, 8_983_981);
        assert_eq!(id.as_u64(), 76_561_197_969_249_709);
        assert_eq!(id.universe(), Some(Universe::Public));
        assert_eq!(id.account_type(), Some(AccountType::Individual));
        assert_eq!(id.instance(), 1);
        assert_eq!(id.account_id(), 8_983_981);
    }

    #[test]
    fn test_default_is_not_set() {
        let id = SteamID::default();
        assert_eq!(id.as_u64(), 0);
        assert!(!id.is_valid());
    }

    #[test]
    fn test_steam2_success() {
        for text in ["STEAM_0:0:66138017", "0:0:66138017"] {
            let id = SteamID::from_steam2(text, Universe::Public).unwrap();
            let render = id.render(false).unwrap();
            assert!(render.contains(text), "{render} doesn't contain {text}");
            assert_eq!(id.account_id(), 66_138_017 << 1);
            assert_eq!(id.instance(), instance::DESKTOP);
            assert!(id.is_valid());
        }
    }

    #[test]
    fn test_steam2_auth_bit() {
        let id = SteamID::from_steam2("STEAM_1:1:4491990", Universe::Public).unwrap();
        assert_eq!(id.account_id(), 8_983_981);
        assert_eq!(id.as_u64(), 76_561_197_969_249_709);
        assert_eq!(id.render_steam2().unwrap(), "STEAM_0:1:4491990");
    }

    #[test]
    fn test_steam2_short_form() {
        let id = SteamID::from_steam2("STEAM_1:12345", Universe::Beta).unwrap();
        assert_eq!(id.account_id(), 12345);
        assert_eq!(id.universe(), Some(Universe::Beta));
        assert_eq!(id.render_steam2().unwrap(), "STEAM_2:1:6172");
    }

    #[test]
    fn test_steam2_failures() {
        let inputs = [
            "STEAM_0:0",
            "STEAM_0:0:12345678901",
            "0:0",
            "0:0:12345678901",
            "",
            "STEAM_5:0:1",
            "STEAM_0:2:1",
        ];
        for text in inputs {
            assert!(SteamID::from_steam2(text, Universe::Public).is_err(), "{text} parsed");
        }
    }

    #[test]
    fn test_steam2_account_overflow() {
        assert!(matches!(
            SteamID::from_steam2("STEAM_0:1:2147483648", Universe::Public),
            Err(SteamIdError::AccountOutOfRange(_))
        ));
        assert!(SteamID::from_steam2("STEAM_1:9999999999", Universe::Public).is_err());
    }

    #[test]
    fn test_invalid_default_universe() {
        assert_eq!(
            SteamID::from_steam2("STEAM_0:0:1", Universe::Invalid),
            Err(SteamIdError::InvalidDefaultUniverse)
        );
        assert_eq!(
            SteamID::from_steam3("[U:1:1]", Universe::Invalid),
            Err(SteamIdError::InvalidDefaultUniverse)
        );
        assert_eq!(
            SteamID::from_steam3_strict("[U:1:1]", Universe::Invalid),
            Err(SteamIdError::InvalidDefaultUniverse)
        );
    }

    #[test]
    fn test_loose_success() {
        let inputs = [
            "[U-1-0]", "[U:1:0]", "U:1:0", "U-1-0", "[U:1:0", "U:1:0]", "[U-1-0", "U-1-0]",
            "[A:1:0:0]", "[A:1:0(0)]", "A:1:0:0", "A:1:0(0)", "[A-1-0:0]", "[A-1-0(0)]",
            "A-1-0:0", "A-1-0(0)", "A-1-0:0)", "A-1-0(0", "[1-0]", "[1:0]", "1-0", "1:0",
        ];
        for text in inputs {
            let id = loose(text).unwrap_or_else(|e| panic!("{text} failed to parse: {e}"));
            let render = id.render_steam3();
            let clean = text
                .replace('-', ":")
                .replace('(', ":")
                .trim_matches(|c: char| c == ')' || c == '[' || c == ']')
                .to_owned();
            assert!(render.contains(&clean), "{render} doesn't contain {text} ({clean})");
        }
    }

    #[test]
    fn test_loose_failures() {
        let inputs = [
            "[A-0-0-0]", "[A-0-0:(0)]", "[U-0-0-0]", "A-0-0-0", "A-0-0:(0)", "U-0-0-0", "", "[]",
            "X:1:0",
        ];
        for text in inputs {
            assert!(loose(text).is_err(), "{text} parsed");
        }
        assert!(SteamID::parse_text("[U:1:0", Universe::Public, false).is_ok());
        assert!(SteamID::parse_text("[U:1:0", Universe::Public, true).is_err());
    }

    #[test]
    fn test_strict_success() {
        let inputs = [
            "[U-0-0]", "[U:0:0]", "U:0:0", "U-0-0", "[A:0:0(0)]", "A:0:0(0)", "[A-0-0(0)]",
            "A-0-0(0)", "[0-0]", "[0:0]", "0-0", "0:0", "0", "[0]",
        ];
        for text in inputs {
            assert!(strict(text).is_ok(), "{text} failed to parse");
        }
    }

    #[test]
    fn test_strict_failures() {
        let inputs = [
            "[A-0-0:(0)]", "[U-0-0-0]", "[U:0:0:0]", "[U-0-0:0]", "[U:0:0", "U:0:0]", "[U-0-0",
            "U-0-0]", "A-0-0(0", "A-0-0:0)", "[", "]",
        ];
        for text in inputs {
            assert!(strict(text).is_err(), "{text} parsed");
        }
    }

    #[test]
    fn test_invalid_universe_falls_back_to_default() {
        let id = SteamID::from_steam3("[U:0:5]", Universe::Dev).unwrap();
        assert_eq!(id.universe(), Some(Universe::Dev));
        let id = SteamID::from_steam3("[U:3:5]", Universe::Dev).unwrap();
        assert_eq!(id.universe(), Some(Universe::Internal));
        let id = SteamID::from_steam3("5", Universe::Beta).unwrap();
        assert_eq!(id.universe(), Some(Universe::Beta));
    }

    #[test]
    fn test_chat_flags_sit_at_top_of_instance() {
        assert_eq!(chat_flags::CLAN, 0x80000);
        assert_eq!(chat_flags::LOBBY, 0x40000);
        assert_eq!(chat_flags::MMS_LOBBY, 0x20000);

        let lobby = loose("[L:1:4]").unwrap();
        assert_eq!(u64::from(lobby), 0x0184_0000_0000_0004);
    }

    #[test]
    fn test_type_instance_rules() {
        let clan = loose("[g:1:4]").unwrap();
        assert_eq!(clan.account_type(), Some(AccountType::Clan));
        assert_eq!(clan.instance(), 0);
        assert!(clan.is_valid());

        let user = loose("[U:1:4]").unwrap();
        assert_eq!(user.instance(), instance::DESKTOP);

        let chat = loose("[T:1:4]").unwrap();
        assert_eq!(chat.account_type(), Some(AccountType::Chat));
        assert_eq!(chat.instance(), 0);

        let lobby = loose("[L:1:4]").unwrap();
        assert_eq!(lobby.instance(), chat_flags::LOBBY);
        assert_eq!(lobby.render_steam3(), "[L:1:4]");

        let clan_chat = loose("[c:1:4]").unwrap();
        assert_eq!(clan_chat.instance(), chat_flags::CLAN);
        assert_eq!(clan_chat.render_steam3(), "[c:1:4]");

        let anon = loose("[A:1:0]").unwrap();
        assert_eq!(anon.instance(), 0);
        let anon = loose("[A:1:7]").unwrap();
        assert_eq!(anon.instance(), 1);
        assert_eq!(anon.render_steam3(), "[A:1:7:1]");
        let anon = loose("[A:1:7:1234]").unwrap();
        assert_eq!(anon.instance(), 1234);
    }

    #[test]
    fn test_instance_out_of_range() {
        assert_eq!(
            loose("[A:1:7:1048576]"),
            Err(SteamIdError::InstanceOutOfRange(1_048_576))
        );
        assert!(loose("[A:1:7:1048575]").is_ok());
    }

    #[test]
    fn test_bare_steam64() {
        let id: SteamID = "76561197969249709".parse().unwrap();
        assert_eq!(id.as_u64(), 76_561_197_969_249_709);
        assert_eq!(id.render_steam3(), "[U:1:8983981]");

        // markers present, so too large is an error rather than a Steam64
        assert_eq!(
            loose("[U:1:76561197969249709]"),
            Err(SteamIdError::AccountOutOfRange(76_561_197_969_249_709))
        );
        assert!(strict("76561197969249709").is_ok());
    }

    #[test]
    fn test_from_u64() {
        assert_eq!(SteamID::from_u64(5), Err(SteamIdError::NotSteam64(5)));
        assert_eq!(SteamID::from_u64(0x1_0000_0000).unwrap().as_u64(), 0x1_0000_0000);
    }

    #[test]
    fn test_validity() {
        assert!(SteamID::new(Universe::Public, AccountType::Individual, 1, 5).is_valid());
        assert!(!SteamID::new(Universe::Public, AccountType::Individual, 1, 0).is_valid());
        assert!(!SteamID::new(Universe::Public, AccountType::Individual, 4, 5).is_valid());
        assert!(!SteamID::new(Universe::Invalid, AccountType::Individual, 1, 5).is_valid());
        assert!(!SteamID::new(Universe::Public, AccountType::Invalid, 1, 5).is_valid());
        assert!(!SteamID::new(Universe::Public, AccountType::Clan, 1, 5).is_valid());
        assert!(SteamID::new(Universe::Public, AccountType::Clan, 0, 5).is_valid());
        assert!(!SteamID::new(Universe::Public, AccountType::GameServer, 1, 0).is_valid());
        assert!(SteamID::new(Universe::Public, AccountType::AnonGameServer, 1, 0).is_valid());
        assert!(!SteamID::new(Universe::Public, AccountType::AnonGameServer, 0, 0).is_valid());
        assert!(SteamID::new(Universe::Dev, AccountType::Pending, 0, 0).is_valid());

        let mut weird = SteamID::new(Universe::Public, AccountType::Individual, 1, 5);
        weird.0.set(SteamID::TYPE_OFFSET, SteamID::TYPE_MASK, 12);
        assert!(!weird.is_valid());
        assert_eq!(weird.render_steam3(), "[i:1:5]");
        assert_eq!(weird.render_steam2(), None);
    }

    #[test]
    fn test_render_forms() {
        let gs = SteamID::new(Universe::Public, AccountType::GameServer, 1, 77);
        assert_eq!(gs.render_steam3(), "[G:1:77]");
        assert_eq!(gs.render(false), None);

        let console = SteamID::new(Universe::Public, AccountType::Individual, instance::CONSOLE, 9);
        assert_eq!(console.render_steam3(), "[U:1:9:2]");

        let seat = SteamID::new(Universe::Beta, AccountType::Multiseat, 3, 9);
        assert_eq!(seat.render_steam3(), "[M:2:9:3]");

        let invalid = SteamID::new(Universe::Invalid, AccountType::Invalid, 0, 3);
        assert_eq!(invalid.render_steam2().unwrap(), "STEAM_0:1:1");
        assert_eq!(invalid.render_steam3(), "[I:0:3]");

        let internal = SteamID::new(Universe::Internal, AccountType::Individual, 1, 10);
        assert_eq!(internal.render_steam2().unwrap(), "STEAM_3:0:5");
    }

    #[test]
    fn test_round_trip_through_text() {
        let ids = [
            SteamID::new(Universe::Public, AccountType::Individual, 1, 8_983_981),
            SteamID::new(Universe::Beta, AccountType::Individual, 1, 1),
            SteamID::new(Universe::Public, AccountType::Clan, 0, 103_582_791),
            SteamID::new(Universe::Dev, AccountType::GameServer, 1, 42),
            SteamID::new(Universe::Public, AccountType::AnonGameServer, 4321, 42),
            SteamID::new(Universe::Public, AccountType::AnonGameServer, 0, 0),
            SteamID::new(Universe::Public, AccountType::Chat, 0, 7),
            SteamID::new(Universe::Public, AccountType::Chat, chat_flags::LOBBY, 7),
            SteamID::new(Universe::Public, AccountType::Chat, chat_flags::CLAN, 7),
            SteamID::new(Universe::Internal, AccountType::Pending, 1, 7),
            SteamID::new(Universe::Public, AccountType::ContentServer, 1, 7),
            SteamID::new(Universe::Public, AccountType::AnonUser, 1, 7),
        ];
        for id in ids {
            let text = id.render_steam3();
            assert_eq!(loose(&text).unwrap(), id, "{text}");
            assert_eq!(strict(&text).unwrap(), id, "{text}");
        }

        let individuals = [
            SteamID::new(Universe::Public, AccountType::Individual, 1, 8_983_981),
            SteamID::new(Universe::Public, AccountType::Individual, 1, 0),
        ];
        for id in individuals {
            let text = id.render_steam2().unwrap();
            assert_eq!(SteamID::from_steam2(&text, Universe::Public).unwrap(), id, "{text}");
        }
    }

    #[test]
    fn test_serde_as_text() {
        let id = SteamID::new(Universe::Public, AccountType::Individual, 1, 8_983_981);
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "\"[U:1:8983981]\"");
        let back: SteamID = serde_json::from_str(&json).unwrap();
        assert_eq!(back, id);
        let raw: SteamID = serde_json::from_str("\"76561197969249709\"").unwrap();
        assert_eq!(raw, id);
        assert!(serde_json::from_str::<SteamID>("\"nope\"").is_err());
    }
}
