use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use anyhow::Result;

use crate::model::{Fight, FightId, FightRecord, FightStatus, Fighter, FighterId};
use crate::snapshot::FighterSnapshot;

/// Read access to fights, fighters and precomputed snapshots.
///
/// Lookups return `Ok(None)` for missing rows; `Err` is reserved for the store itself
/// failing (I/O, decode, a dead worker).
pub trait FightDataSource {
    fn fight(&self, id: FightId) -> Result<Option<Fight>>;

    fn fighter(&self, id: FighterId) -> Result<Option<Fighter>>;

    /// Every completed fight involving `id`, from that fighter's perspective, in no
    /// particular order. Callers apply their own date cutoff.
    fn fighter_history(&self, id: FighterId) -> Result<Vec<FightRecord>>;

    /// A stored pre-fight snapshot for `fighter` keyed by `fight`.
    fn snapshot(&self, fighter: FighterId, fight: FightId) -> Result<Option<FighterSnapshot>>;

    /// Scheduled fights ordered by date, at most `limit`.
    fn upcoming_fights(&self, limit: usize) -> Result<Vec<Fight>>;

    /// Completed fights ordered by (date, id).
    fn completed_fights(&self) -> Result<Vec<Fight>>;
}

impl<S: FightDataSource + ?Sized> FightDataSource for &S {
    fn fight(&self, id: FightId) -> Result<Option<Fight>> {
        (**self).fight(id)
    }

    fn fighter(&self, id: FighterId) -> Result<Option<Fighter>> {
        (**self).fighter(id)
    }

    fn fighter_history(&self, id: FighterId) -> Result<Vec<FightRecord>> {
        (**self).fighter_history(id)
    }

    fn snapshot(&self, fighter: FighterId, fight: FightId) -> Result<Option<FighterSnapshot>> {
        (**self).snapshot(fighter, fight)
    }

    fn upcoming_fights(&self, limit: usize) -> Result<Vec<Fight>> {
        (**self).upcoming_fights(limit)
    }

    fn completed_fights(&self) -> Result<Vec<Fight>> {
        (**self).completed_fights()
    }
}

impl<S: FightDataSource + ?Sized> FightDataSource for Arc<S> {
    fn fight(&self, id: FightId) -> Result<Option<Fight>> {
        (**self).fight(id)
    }

    fn fighter(&self, id: FighterId) -> Result<Option<Fighter>> {
        (**self).fighter(id)
    }

    fn fighter_history(&self, id: FighterId) -> Result<Vec<FightRecord>> {
        (**self).fighter_history(id)
    }

    fn snapshot(&self, fighter: FighterId, fight: FightId) -> Result<Option<FighterSnapshot>> {
        (**self).snapshot(fighter, fight)
    }

    fn upcoming_fights(&self, limit: usize) -> Result<Vec<Fight>> {
        (**self).upcoming_fights(limit)
    }

    fn completed_fights(&self) -> Result<Vec<Fight>> {
        (**self).completed_fights()
    }
}

/// Fully in-memory store. Used by tests, benches, the synthetic league and as the
/// loaded form of the SQLite store for parallel backtests.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    fighters: HashMap<FighterId, Fighter>,
    fights: BTreeMap<FightId, Fight>,
    by_fighter: HashMap<FighterId, Vec<FightId>>,
    snapshots: HashMap<(FighterId, FightId), FighterSnapshot>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_fighter(&mut self, fighter: Fighter) {
        self.fighters.insert(fighter.id, fighter);
    }

    /// Inserts or replaces a fight.
    pub fn insert_fight(&mut self, fight: Fight) {
        if let Some(old) = self.fights.get(&fight.id) {
            for id in [old.fighter_a, old.fighter_b] {
                if let Some(ids) = self.by_fighter.get_mut(&id) {
                    ids.retain(|f| *f != fight.id);
                }
            }
        }
        for id in [fight.fighter_a, fight.fighter_b] {
            let ids = self.by_fighter.entry(id).or_default();
            if !ids.contains(&fight.id) {
                ids.push(fight.id);
            }
        }
        self.fights.insert(fight.id, fight);
    }

    /// Stores a snapshot under (fighter, fight). Snapshots without a fight id are ignored.
    pub fn insert_snapshot(&mut self, snapshot: FighterSnapshot) {
        if let Some(fight_id) = snapshot.fight_id {
            self.snapshots
                .insert((snapshot.fighter_id, fight_id), snapshot);
        }
    }

    pub fn fighters(&self) -> &HashMap<FighterId, Fighter> {
        &self.fighters
    }

    pub fn fights(&self) -> impl Iterator<Item = &Fight> {
        self.fights.values()
    }

    pub fn fight_count(&self) -> usize {
        self.fights.len()
    }

    pub fn snapshot_count(&self) -> usize {
        self.snapshots.len()
    }
}

impl FightDataSource for MemoryStore {
    fn fight(&self, id: FightId) -> Result<Option<Fight>> {
        Ok(self.fights.get(&id).cloned())
    }

    fn fighter(&self, id: FighterId) -> Result<Option<Fighter>> {
        Ok(self.fighters.get(&id).cloned())
    }

    fn fighter_history(&self, id: FighterId) -> Result<Vec<FightRecord>> {
        let Some(ids) = self.by_fighter.get(&id) else {
            return Ok(Vec::new());
        };
        Ok(ids
            .iter()
            .filter_map(|fid| self.fights.get(fid))
            .filter_map(|f| f.record_for(id))
            .collect())
    }

    fn snapshot(&self, fighter: FighterId, fight: FightId) -> Result<Option<FighterSnapshot>> {
        Ok(self.snapshots.get(&(fighter, fight)).cloned())
    }

    fn upcoming_fights(&self, limit: usize) -> Result<Vec<Fight>> {
        let mut out: Vec<Fight> = self
            .fights
            .values()
            .filter(|f| f.status == FightStatus::Scheduled)
            .cloned()
            .collect();
        out.sort_by(|a, b| a.date.cmp(&b.date).then(a.id.cmp(&b.id)));
        out.truncate(limit);
        Ok(out)
    }

    fn completed_fights(&self) -> Result<Vec<Fight>> {
        let mut out: Vec<Fight> = self
            .fights
            .values()
            .filter(|f| f.status == FightStatus::Completed)
            .cloned()
            .collect();
        out.sort_by(|a, b| a.date.cmp(&b.date).then(a.id.cmp(&b.id)));
        Ok(out)
    }
}
