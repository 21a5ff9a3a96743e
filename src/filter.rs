//! Master server filter strings.
//!
//! See <https://developer.valvesoftware.com/wiki/Master_Server_Query_Protocol#Filter>.
use std::fmt;
use std::net::SocketAddr;

/// Region byte of a master server request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Region {
    UsEast,
    UsWest,
    SouthAmerica,
    Europe,
    Asia,
    Australia,
    MiddleEast,
    Africa,
    #[default]
    World,
}

impl Region {
    pub fn to_byte(&self) -> u8 {
        match self {
            Region::UsEast => 0x00,
            Region::UsWest => 0x01,
            Region::SouthAmerica => 0x02,
            Region::Europe => 0x03,
            Region::Asia => 0x04,
            Region::Australia => 0x05,
            Region::MiddleEast => 0x06,
            Region::Africa => 0x07,
            Region::World => 0xFF,
        }
    }
}

/// Criteria sent along with each master server request.
///
/// Fields left at their default contribute nothing to the filter string.
/// Built with the chaining setters:
///
/// ```
/// use sourcequery::filter::Filter;
///
/// let filter = Filter::new().dedicated_only().app_id(10).game_dir("cstrike");
/// assert_eq!(filter.to_string(), r"\type\d\gamedir\cstrike\appid\10");
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Filter {
    pub dedicated_only: bool,
    pub secure_only: bool,
    pub game_dir: Option<String>,
    pub map: Option<String>,
    pub linux_only: bool,
    /// Only servers that are not empty.
    pub not_empty: bool,
    /// Only servers that are not full.
    pub not_full: bool,
    pub spectator_only: bool,
    pub app_id: Option<u32>,
    pub not_app_id: Option<u32>,
    /// Only servers with no players at all.
    pub empty_only: bool,
    pub whitelisted_only: bool,
    /// Servers whose public tags contain all of these (comma-delimited).
    pub tags: Option<String>,
    /// Servers whose hidden tags contain all of these (comma-delimited).
    pub hidden_tags_all: Option<String>,
    /// Servers whose hidden tags contain any of these (comma-delimited).
    pub hidden_tags_any: Option<String>,
    /// Hostname match, `*` is a wildcard.
    pub name_match: Option<String>,
    /// Version match, `*` is a wildcard.
    pub version_match: Option<String>,
    /// Return only one server per unique IP address.
    pub one_per_address: bool,
    /// Only servers on this address; a port of 0 matches any port.
    pub address: Option<SocketAddr>,
    /// A nested filter of which none may match.
    pub nor: Option<String>,
    /// A nested filter of which not all may match.
    pub nand: Option<String>,
}

impl Filter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn dedicated_only(mut self) -> Self {
        self.dedicated_only = true;
        self
    }

    pub fn secure_only(mut self) -> Self {
        self.secure_only = true;
        self
    }

    pub fn game_dir(mut self, game_dir: impl Into<String>) -> Self {
        self.game_dir = Some(game_dir.into());
        self
    }

    pub fn map(mut self, map: impl Into<String>) -> Self {
        self.map = Some(map.into());
        self
    }

    pub fn linux_only(mut self) -> Self {
        self.linux_only = true;
        self
    }

    pub fn not_empty(mut self) -> Self {
        self.not_empty = true;
        self
    }

    pub fn not_full(mut self) -> Self {
        self.not_full = true;
        self
    }

    pub fn spectator_only(mut self) -> Self {
        self.spectator_only = true;
        self
    }

    pub fn app_id(mut self, app_id: u32) -> Self {
        self.app_id = Some(app_id);
        self
    }

    pub fn not_app_id(mut self, app_id: u32) -> Self {
        self.not_app_id = Some(app_id);
        self
    }

    pub fn empty_only(mut self) -> Self {
        self.empty_only = true;
        self
    }

    pub fn whitelisted_only(mut self) -> Self {
        self.whitelisted_only = true;
        self
    }

    pub fn tags(mut self, tags: impl Into<String>) -> Self {
        self.tags = Some(tags.into());
        self
    }

    pub fn hidden_tags_all(mut self, tags: impl Into<String>) -> Self {
        self.hidden_tags_all = Some(tags.into());
        self
    }

    pub fn hidden_tags_any(mut self, tags: impl Into<String>) -> Self {
        self.hidden_tags_any = Some(tags.into());
        self
    }

    pub fn name_match(mut self, name: impl Into<String>) -> Self {
        self.name_match = Some(name.into());
        self
    }

    pub fn version_match(mut self, version: impl Into<String>) -> Self {
        self.version_match = Some(version.into());
        self
    }

    pub fn one_per_address(mut self) -> Self {
        self.one_per_address = true;
        self
    }

    pub fn address(mut self, address: SocketAddr) -> Self {
        self.address = Some(address);
        self
    }

    pub fn nor(mut self, filter: impl Into<String>) -> Self {
        self.nor = Some(filter.into());
        self
    }

    pub fn nand(mut self, filter: impl Into<String>) -> Self {
        self.nand = Some(filter.into());
        self
    }
}

fn write_flag(f: &mut fmt::Formatter<'_>, key: &str, value: &str, on: bool) -> fmt::Result {
    if on {
        write!(f, "\\{}\\{}", key, value)?;
    }
    Ok(())
}

fn write_opt<T: fmt::Display>(
    f: &mut fmt::Formatter<'_>,
    key: &str,
    value: &Option<T>,
) -> fmt::Result {
    match value {
        Some(v) => {
            let v = v.to_string();
            if v.is_empty() {
                return Ok(());
            }
            write!(f, "\\{}\\{}", key, v)
        }
        None => Ok(()),
    }
}

impl fmt::Display for Filter {
    /// The emission order below is what the master server expects.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_flag(f, "type", "d", self.dedicated_only)?;
        write_flag(f, "secure", "1", self.secure_only)?;
        write_opt(f, "gamedir", &self.game_dir)?;
        write_opt(f, "map", &self.map)?;
        write_flag(f, "linux", "1", self.linux_only)?;
        write_flag(f, "empty", "1", self.not_empty)?;
        write_flag(f, "full", "1", self.not_full)?;
        write_flag(f, "proxy", "1", self.spectator_only)?;
        write_opt(f, "appid", &self.app_id.filter(|id| *id != 0))?;
        write_opt(f, "napp", &self.not_app_id.filter(|id| *id != 0))?;
        write_flag(f, "noplayers", "1", self.empty_only)?;
        write_flag(f, "white", "1", self.whitelisted_only)?;
        write_opt(f, "gametype", &self.tags)?;
        write_opt(f, "gamedata", &self.hidden_tags_all)?;
        write_opt(f, "gamedataor", &self.hidden_tags_any)?;
        write_opt(f, "name_match", &self.name_match)?;
        write_opt(f, "version_match", &self.version_match)?;
        write_flag(f, "collapse_addr_hash", "1", self.one_per_address)?;
        match self.address {
            Some(addr) if addr.port() == 0 => write!(f, "\\gameaddr\\{}", addr.ip())?,
            Some(addr) => write!(f, "\\gameaddr\\{}", addr)?,
            None => {}
        }
        write_opt(f, "nor", &self.nor)?;
        write_opt(f, "nand", &self.nand)?;
        Ok(())
    }
}
