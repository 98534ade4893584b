//! Map cell types

use bitflags::bitflags;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter};

use crate::monster::MonsterId;

/// Trap kinds
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, Display, EnumIter,
)]
#[repr(u8)]
pub enum TrapKind {
    FalseFloor = 0,
    #[default]
    Pit = 1,
    SpikedPit = 2,
    Dart = 3,
    Flash = 4,
    GasConfusion = 5,
    GasMemory = 6,
    Acid = 7,
    Alarm = 8,
    Caltrops = 9,
    Roost = 10,
    Web = 11,
    Deadfall = 12,
}

impl TrapKind {
    /// Pits and webs hold the player until they climb out
    pub const fn holds_player(&self) -> bool {
        matches!(self, TrapKind::Pit | TrapKind::SpikedPit | TrapKind::Web)
    }

    pub const fn name(&self) -> &'static str {
        match self {
            TrapKind::FalseFloor => "false floor",
            TrapKind::Pit => "pit",
            TrapKind::SpikedPit => "spiked pit",
            TrapKind::Dart => "dart trap",
            TrapKind::Flash => "flash trap",
            TrapKind::GasConfusion => "gas trap",
            TrapKind::GasMemory => "gas trap",
            TrapKind::Acid => "acid trap",
            TrapKind::Alarm => "alarm",
            TrapKind::Caltrops => "caltrops",
            TrapKind::Roost => "roost",
            TrapKind::Web => "web",
            TrapKind::Deadfall => "deadfall",
        }
    }
}

/// Terrain feature
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, Display)]
pub enum Feature {
    #[default]
    Floor,
    Chasm,
    Glyph,
    OpenDoor,
    BrokenDoor,
    /// Closed door; `lock` 0 is unlocked, higher values are harder to open
    Door {
        lock: u8,
    },
    SecretDoor,
    Rubble,
    Quartz,
    Granite,
    Permanent,
    UpStair,
    DownStair,
    Forge,
    Trap(TrapKind),
}

impl Feature {
    /// Walls block movement and sight: rock, rubble, closed and secret doors
    pub const fn is_wall(&self) -> bool {
        matches!(
            self,
            Feature::Door { .. }
                | Feature::SecretDoor
                | Feature::Rubble
                | Feature::Quartz
                | Feature::Granite
                | Feature::Permanent
        )
    }

    /// Anything that is not a wall; chasms, stairs and traps count as floor
    pub const fn is_floor(&self) -> bool {
        !self.is_wall()
    }

    /// A closed door the player knows about
    pub const fn is_known_closed_door(&self) -> bool {
        matches!(self, Feature::Door { .. })
    }

    /// Any closed door, including secret ones
    pub const fn is_closed_door(&self) -> bool {
        matches!(self, Feature::Door { .. } | Feature::SecretDoor)
    }

    pub const fn is_locked_door(&self) -> bool {
        matches!(self, Feature::Door { lock } if *lock > 0)
    }

    pub const fn is_stair(&self) -> bool {
        matches!(self, Feature::UpStair | Feature::DownStair)
    }

    pub const fn is_trap(&self) -> bool {
        matches!(self, Feature::Trap(_))
    }

    pub const fn trap(&self) -> Option<TrapKind> {
        match self {
            Feature::Trap(kind) => Some(*kind),
            _ => None,
        }
    }

    /// Noteworthy features that stop a runner
    pub const fn is_interesting(&self) -> bool {
        matches!(
            self,
            Feature::UpStair
                | Feature::DownStair
                | Feature::Forge
                | Feature::Glyph
                | Feature::Chasm
                | Feature::Trap(_)
                | Feature::Door { .. }
                | Feature::Rubble
        )
    }

    /// Get the display character for this feature
    pub const fn symbol(&self) -> char {
        match self {
            Feature::Floor => '.',
            Feature::Chasm => 'v',
            Feature::Glyph => ';',
            Feature::OpenDoor => '\'',
            Feature::BrokenDoor => '/',
            Feature::Door { lock: 0 } => '+',
            Feature::Door { .. } => '*',
            Feature::SecretDoor => 'S',
            Feature::Rubble => ':',
            Feature::Quartz => '%',
            Feature::Granite => '#',
            Feature::Permanent => 'X',
            Feature::UpStair => '<',
            Feature::DownStair => '>',
            Feature::Forge => '0',
            Feature::Trap(_) => '^',
        }
    }

    /// Inverse of [`Feature::symbol`] for terrain characters
    pub const fn from_symbol(ch: char) -> Option<Feature> {
        Some(match ch {
            '.' => Feature::Floor,
            'v' => Feature::Chasm,
            ';' => Feature::Glyph,
            '\'' => Feature::OpenDoor,
            '/' => Feature::BrokenDoor,
            '+' => Feature::Door { lock: 0 },
            '*' => Feature::Door { lock: 3 },
            'S' => Feature::SecretDoor,
            ':' => Feature::Rubble,
            '%' => Feature::Quartz,
            '#' => Feature::Granite,
            'X' => Feature::Permanent,
            '<' => Feature::UpStair,
            '>' => Feature::DownStair,
            '0' => Feature::Forge,
            '^' => Feature::Trap(TrapKind::Pit),
            _ => return None,
        })
    }
}

bitflags! {
    /// Per-cell knowledge and visibility flags
    #[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
    pub struct CellFlags: u16 {
        /// Remembered by the player
        const MARK = 0x0001;
        /// Permanently lit
        const GLOW = 0x0002;
        /// Part of a vault or other special room
        const ICKY = 0x0004;
        /// Part of a room
        const ROOM = 0x0008;
        /// In view and lit, so the player can see it
        const SEEN = 0x0010;
        /// In the player's line of sight
        const VIEW = 0x0020;
        /// Holds a trap the player has not found
        const HIDDEN = 0x0040;
        /// The player has a line of fire to it
        const FIRE = 0x0080;
        /// Scratch mark used by searches
        const TEMP = 0x0100;
    }
}

// Manual serde impl for CellFlags
impl Serialize for CellFlags {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        self.bits().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for CellFlags {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let bits = u16::deserialize(deserializer)?;
        Ok(CellFlags::from_bits_truncate(bits))
    }
}

/// Who stands in a cell
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Occupant {
    #[default]
    Empty,
    Player,
    Monster(MonsterId),
}

impl Occupant {
    pub const fn is_empty(&self) -> bool {
        matches!(self, Occupant::Empty)
    }

    pub const fn monster(&self) -> Option<MonsterId> {
        match self {
            Occupant::Monster(id) => Some(*id),
            _ => None,
        }
    }
}

/// A single map cell
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct Cell {
    /// Terrain
    pub feat: Feature,

    /// Knowledge and visibility flags
    pub info: CellFlags,

    /// Creature standing here
    pub occupant: Occupant,

    /// Light level (positive is lit, negative is unnaturally dark)
    pub light: i32,

    /// Scent stamp laid by the player, if any
    pub scent: Option<i64>,
}

impl Cell {
    /// Create a cell of the given terrain
    pub const fn with_feat(feat: Feature) -> Self {
        Self {
            feat,
            info: CellFlags::empty(),
            occupant: Occupant::Empty,
            light: 0,
            scent: None,
        }
    }

    /// Create a floor cell
    pub const fn floor() -> Self {
        Self::with_feat(Feature::Floor)
    }

    /// Create a permanent rock cell
    pub const fn permanent() -> Self {
        Self::with_feat(Feature::Permanent)
    }

    pub const fn is_floor(&self) -> bool {
        self.feat.is_floor()
    }

    pub const fn is_wall(&self) -> bool {
        self.feat.is_wall()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use strum::IntoEnumIterator;

    #[test]
    fn test_wall_floor_partition() {
        let walls = [
            Feature::Door { lock: 0 },
            Feature::Door { lock: 4 },
            Feature::SecretDoor,
            Feature::Rubble,
            Feature::Quartz,
            Feature::Granite,
            Feature::Permanent,
        ];
        for f in walls {
            assert!(f.is_wall(), "{f} should be a wall");
            assert!(!f.is_floor());
        }
        let floors = [
            Feature::Floor,
            Feature::Chasm,
            Feature::Glyph,
            Feature::OpenDoor,
            Feature::BrokenDoor,
            Feature::UpStair,
            Feature::DownStair,
            Feature::Forge,
            Feature::Trap(TrapKind::Web),
        ];
        for f in floors {
            assert!(f.is_floor(), "{f} should be floor");
        }
    }

    #[test]
    fn test_symbols_roundtrip() {
        let feats = [
            Feature::Floor,
            Feature::Chasm,
            Feature::Glyph,
            Feature::OpenDoor,
            Feature::BrokenDoor,
            Feature::Door { lock: 0 },
            Feature::SecretDoor,
            Feature::Rubble,
            Feature::Quartz,
            Feature::Granite,
            Feature::Permanent,
            Feature::UpStair,
            Feature::DownStair,
            Feature::Forge,
        ];
        for f in feats {
            assert_eq!(Feature::from_symbol(f.symbol()), Some(f));
        }
        assert!(Feature::from_symbol('*').is_some_and(|f| f.is_locked_door()));
        assert_eq!(Feature::from_symbol('Q'), None);
    }

    #[test]
    fn test_trap_kinds() {
        for kind in TrapKind::iter() {
            assert!(Feature::Trap(kind).is_trap());
            assert!(!kind.name().is_empty());
        }
        assert!(TrapKind::Web.holds_player());
        assert!(!TrapKind::Dart.holds_player());
    }

    #[test]
    fn test_cell_flags_serde() {
        let flags = CellFlags::MARK | CellFlags::GLOW;
        let json = serde_json::to_string(&flags).unwrap_or_default();
        let back: CellFlags = serde_json::from_str(&json).unwrap_or_default();
        assert_eq!(back, flags);
    }
}
