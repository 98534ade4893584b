//! sil-core: combat and monster AI simulation for a Sil-style roguelike
//!
//! This crate resolves melee and ranged attacks, runs each monster's turn
//! (perception, morale, movement, spellcasting) and propagates damage and
//! status effects through a shared grid. It has no I/O dependencies: the
//! dungeon generator, display and save files live elsewhere.
//!
//! Everything hangs off a [`world::World`], passed by reference into each
//! component. Supports `no_std` environments by disabling the default `std`
//! feature; only options file loading needs std.

#![cfg_attr(not(feature = "std"), no_std)]

extern crate alloc;

/// Re-exports of alloc types needed when building without std.
/// In std mode, these are provided by the std prelude.
#[cfg(not(feature = "std"))]
pub(crate) mod compat {
    pub use alloc::borrow::ToOwned;
    pub use alloc::boxed::Box;
    pub use alloc::format;
    pub use alloc::string::{String, ToString};
    pub use alloc::vec;
    pub use alloc::vec::Vec;
}

pub mod action;
pub mod combat;
pub mod consts;
pub mod dungeon;
pub mod magic;
pub mod monster;
pub mod object;
pub mod perception;
pub mod player;
pub mod rng;
pub mod world;

pub use rng::GameRng;
pub use world::{SimError, SimOptions, TurnOutcome, World};
