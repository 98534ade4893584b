//! Combat system
//!
//! Opposed skill rolls, attack and evasion totals, critical hits, slays,
//! protection and the blow-by-blow resolution of melee on both sides.

mod damage;
mod melee;
mod modifiers;
mod monster_melee;
mod skill;
mod slay;

pub use damage::{
    add_wrath, break_truce, dec_stat, elem_bonus, element_damage, message_pain, mon_take_hit,
    monster_death, protection_roll, resist_cold, resist_dark, resist_fire, resist_pois,
    resistance, take_hit,
};
pub use melee::{
    AttackType, adj_mon_count, attack_punctuation, flanking_or_retreat, knock_back,
    possible_follow_through, py_attack, py_attack_aux, unasked, valid_charge, whirlwind_possible,
};
pub use modifiers::{
    CritTarget, concentration_bonus, crit_bonus, focused_attack_bonus, light_penalty,
    master_hunter_bonus, overwhelming_att_mod, player_is_held, stealth_melee_bonus,
    total_monster_attack, total_monster_evasion, total_player_attack, total_player_evasion,
};
pub use monster_melee::{make_attack_normal, monster_charge, monster_cut_or_stun};
pub use skill::{
    Actor, Affliction, allow_player, bane_bonus, bane_bonus_for_kills, bane_kills,
    elf_bane_bonus, hit_roll, saving_throw, skill_check, success_chance,
};
pub use slay::{SlayBonus, prt_after_sharpness, scare_onlooking_friends, slay_bonus};
