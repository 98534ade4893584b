//! Core simulation constants
//!
//! Tuning values shared by the AI, combat and perception code.

/// Alertness scale: asleep below `ALERTNESS_UNWARY`, acting at `ALERTNESS_ALERT` and up
pub const ALERTNESS_MIN: i32 = -20;
pub const ALERTNESS_UNWARY: i32 = -10;
pub const ALERTNESS_ALERT: i32 = 0;
pub const ALERTNESS_QUITE_ALERT: i32 = 10;
pub const ALERTNESS_VERY_ALERT: i32 = 20;
pub const ALERTNESS_MAX: i32 = 20;

/// Monsters closer than this who are slower than the player turn and fight
pub const TURN_RANGE: i32 = 3;
/// Distance at which a fleeing monster stops worrying
pub const FLEE_RANGE: i32 = 25;
/// How far `find_safety` looks for a hiding place
pub const HIDE_RANGE: i32 = 15;

/// Maximum view distance
pub const MAX_SIGHT: i32 = 20;
/// Maximum projection range
pub const MAX_RANGE: i32 = 20;

/// Flow distance meaning "unreachable"
pub const FLOW_MAX_DIST: i32 = 100;
/// Maximum age, in turns, of a detectable scent
pub const SMELL_STRENGTH: i32 = 50;
/// Wanderers further than this from their destination pick a new one
pub const MON_WANDER_RANGE: i32 = 30;
/// Breeders stop multiplying this close to the monster limit
pub const MAX_MONSTERS: usize = 512;
pub const BREEDING_HEADROOM: usize = 50;
/// Number of shared wandering flows
pub const MAX_WANDER_FLOWS: usize = 16;

/// Mana per ranged attack, and the pool ceiling
pub const MON_MANA_COST: i32 = 1;
pub const MON_MANA_MAX: i32 = 10;

/// Length of a monster's action history
pub const ACTION_MAX: usize = 4;
/// Action history markers beyond the nine keypad directions
pub const ACTION_NOTHING: u8 = 10;
pub const ACTION_MISC: u8 = 11;

/// Energy needed before an entity can act
pub const ENERGY_TO_ACT: i32 = 100;

/// Speed of an ordinary creature
pub const NORMAL_SPEED: i32 = 2;

/// Dice used by skill checks and by attack-vs-evasion rolls
pub const SKILL_DIE: i32 = 10;
pub const HIT_DIE: i32 = 20;

/// Base morale before modifiers
pub const MORALE_BASE: i32 = 60;
/// Size of the rally/break swing on a stance change
pub const MORALE_SWING: i32 = 60;

/// Player turns to regenerate from nothing to full
pub const PY_REGEN_HP_PERIOD: i32 = 200;
pub const PY_REGEN_SP_PERIOD: i32 = 400;
/// Monster regeneration periods, counted in tens of game turns
pub const MON_REGEN_HP_PERIOD: i32 = 100;
pub const MON_REGEN_SP_PERIOD: i32 = 50;

/// Stun level that stops most actions
pub const HEAVY_STUN: i32 = 100;

/// Level of Morgoth's throne room
pub const MORGOTH_DEPTH: i32 = 20;

/// Energy gained per game tick for a given speed
pub const fn turn_energy(speed: i32) -> i32 {
    match speed {
        i32::MIN..=0 => 0,
        1 => 5,
        2 => 10,
        3 => 15,
        _ => 20,
    }
}

/// Health brackets, shared by the player and monsters
pub const HEALTH_DEAD: i32 = 0;
pub const HEALTH_ALMOST_DEAD: i32 = 1;
pub const HEALTH_BADLY_WOUNDED: i32 = 2;
pub const HEALTH_WOUNDED: i32 = 3;
pub const HEALTH_SOMEWHAT_WOUNDED: i32 = 4;
pub const HEALTH_UNHURT: i32 = 5;

/// Which health bracket `cur` out of `max` falls into
pub const fn health_level(cur: i32, max: i32) -> i32 {
    if cur >= max {
        return HEALTH_UNHURT;
    }
    if cur <= 0 || max <= 0 {
        return HEALTH_DEAD;
    }
    match (4 * cur + max - 1) / max {
        4 => HEALTH_SOMEWHAT_WOUNDED,
        3 => HEALTH_WOUNDED,
        2 => HEALTH_BADLY_WOUNDED,
        1 => HEALTH_ALMOST_DEAD,
        _ => HEALTH_DEAD,
    }
}

/// Stealth gained by moving carefully
pub const STEALTH_MODE_BONUS: i32 = 5;

/// Stats are kept within these bounds
pub const BASE_STAT_MIN: i32 = -9;
pub const BASE_STAT_MAX: i32 = 20;

/// Hit points below this many tenths of the maximum draw a warning
pub const HITPOINT_WARN: i32 = 3;
