//! The level's monster list
//!
//! Slots are reused after a monster dies; each reuse bumps the slot's
//! generation so stale handles resolve to nothing.

#[cfg(not(feature = "std"))]
use crate::compat::*;

use serde::{Deserialize, Serialize};

use super::monst::{Monster, MonsterId};

#[derive(Debug, Clone, Serialize, Deserialize)]
struct Slot {
    generation: u32,
    monster: Option<Monster>,
}

/// Every living monster on the level
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MonsterList {
    slots: Vec<Slot>,
    free: Vec<usize>,
}

impl MonsterList {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a monster, reusing a dead slot if there is one
    pub fn insert(&mut self, monster: Monster) -> MonsterId {
        if let Some(index) = self.free.pop() {
            let slot = &mut self.slots[index];
            slot.generation += 1;
            slot.monster = Some(monster);
            return MonsterId::new(index as u32, slot.generation);
        }
        self.slots.push(Slot {
            generation: 0,
            monster: Some(monster),
        });
        MonsterId::new(self.slots.len() as u32 - 1, 0)
    }

    /// Remove a monster, returning it if the handle was live
    pub fn remove(&mut self, id: MonsterId) -> Option<Monster> {
        let slot = self.slots.get_mut(id.index())?;
        if slot.generation != id.generation() {
            return None;
        }
        let monster = slot.monster.take()?;
        self.free.push(id.index());
        Some(monster)
    }

    pub fn get(&self, id: MonsterId) -> Option<&Monster> {
        let slot = self.slots.get(id.index())?;
        if slot.generation != id.generation() {
            return None;
        }
        slot.monster.as_ref()
    }

    pub fn get_mut(&mut self, id: MonsterId) -> Option<&mut Monster> {
        let slot = self.slots.get_mut(id.index())?;
        if slot.generation != id.generation() {
            return None;
        }
        slot.monster.as_mut()
    }

    pub fn contains(&self, id: MonsterId) -> bool {
        self.get(id).is_some()
    }

    pub fn len(&self) -> usize {
        self.slots.iter().filter(|s| s.monster.is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Handles of all living monsters in slot order
    pub fn ids(&self) -> Vec<MonsterId> {
        self.slots
            .iter()
            .enumerate()
            .filter(|(_, s)| s.monster.is_some())
            .map(|(i, s)| MonsterId::new(i as u32, s.generation))
            .collect()
    }

    /// Handles in reverse slot order, the order monsters take their turns
    pub fn ids_rev(&self) -> Vec<MonsterId> {
        let mut ids = self.ids();
        ids.reverse();
        ids
    }

    pub fn iter(&self) -> impl Iterator<Item = (MonsterId, &Monster)> {
        self.slots.iter().enumerate().filter_map(|(i, s)| {
            s.monster
                .as_ref()
                .map(|m| (MonsterId::new(i as u32, s.generation), m))
        })
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = (MonsterId, &mut Monster)> {
        self.slots.iter_mut().enumerate().filter_map(|(i, s)| {
            let generation = s.generation;
            s.monster
                .as_mut()
                .map(|m| (MonsterId::new(i as u32, generation), m))
        })
    }

    /// Remove every monster, as on leaving the level
    pub fn clear(&mut self) {
        for (i, slot) in self.slots.iter_mut().enumerate() {
            if slot.monster.take().is_some() {
                self.free.push(i);
            }
        }
    }
}
