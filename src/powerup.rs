use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::agent::Agent;
use crate::event::Event;
use crate::grid::{Cell, Grid};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PowerUpKind {
    Speed,
    Freeze,
    WallBreaker,
}

impl PowerUpKind {
    pub const ALL: [PowerUpKind; 3] = [PowerUpKind::Speed, PowerUpKind::Freeze, PowerUpKind::WallBreaker];

    fn index(self) -> usize {
        match self {
            PowerUpKind::Speed => 0,
            PowerUpKind::Freeze => 1,
            PowerUpKind::WallBreaker => 2,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            PowerUpKind::Speed => "Speed Boost",
            PowerUpKind::Freeze => "Ghost Freeze",
            PowerUpKind::WallBreaker => "Wall Breaker",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct PowerUp {
    pub cell: Cell,
    pub kind: PowerUpKind,
    pub spawned_at: f64,
    pub lifetime: f64,
}

impl PowerUp {
    pub fn is_expired(&self, now: f64) -> bool {
        now - self.spawned_at > self.lifetime
    }
}

/// Expiry deadline per effect kind; at most one per kind.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize)]
pub struct ActiveEffects([Option<f64>; 3]);

impl ActiveEffects {
    /// Sets or refreshes the deadline for `kind`.
    pub fn activate(&mut self, kind: PowerUpKind, until: f64) {
        self.0[kind.index()] = Some(until);
    }

    pub fn until(&self, kind: PowerUpKind) -> Option<f64> {
        self.0[kind.index()]
    }

    pub fn is_active(&self, kind: PowerUpKind, now: f64) -> bool {
        self.until(kind).is_some_and(|until| now < until)
    }

    pub fn remaining(&self, kind: PowerUpKind, now: f64) -> f64 {
        self.until(kind).map_or(0.0, |until| (until - now).max(0.0))
    }

    pub fn is_empty(&self) -> bool {
        self.0.iter().all(Option::is_none)
    }

    pub fn iter(&self) -> impl Iterator<Item = (PowerUpKind, f64)> + '_ {
        PowerUpKind::ALL
            .into_iter()
            .filter_map(|kind| self.until(kind).map(|until| (kind, until)))
    }

    /// Drops deadlines at or before `now`, returning the kinds removed.
    pub fn expire(&mut self, now: f64) -> Vec<PowerUpKind> {
        let mut ended = Vec::new();
        for kind in PowerUpKind::ALL {
            if let Some(until) = self.0[kind.index()] {
                if now >= until {
                    self.0[kind.index()] = None;
                    ended.push(kind);
                }
            }
        }
        ended
    }
}

/// Per-kind frame counters for HUD display. They tick once per step and
/// have no effect on gameplay.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct EffectCountdowns([u32; 3]);

impl EffectCountdowns {
    pub fn set(&mut self, kind: PowerUpKind, frames: u32) {
        self.0[kind.index()] = frames;
    }

    pub fn get(&self, kind: PowerUpKind) -> u32 {
        self.0[kind.index()]
    }

    pub fn tick(&mut self) {
        for frames in &mut self.0 {
            *frames = frames.saturating_sub(1);
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PowerUpParams {
    pub lifetime: f64,
    pub effect_duration: f64,
    pub max_live: usize,
    pub display_fps: u32,
}

impl Default for PowerUpParams {
    fn default() -> Self {
        Self {
            lifetime: 15.0,
            effect_duration: 3.0,
            max_live: 3,
            display_fps: 60,
        }
    }
}

#[derive(Clone, Debug, Default)]
pub struct PowerUpRegistry {
    params: PowerUpParams,
    live: Vec<PowerUp>,
    effects: ActiveEffects,
    countdowns: EffectCountdowns,
}

impl PowerUpRegistry {
    pub fn new(params: PowerUpParams) -> Self {
        Self {
            params,
            live: Vec::new(),
            effects: ActiveEffects::default(),
            countdowns: EffectCountdowns::default(),
        }
    }

    pub fn live(&self) -> &[PowerUp] {
        &self.live
    }

    pub fn effects(&self) -> &ActiveEffects {
        &self.effects
    }

    pub fn countdowns(&self) -> &EffectCountdowns {
        &self.countdowns
    }

    pub fn is_full(&self) -> bool {
        self.live.len() >= self.params.max_live
    }

    /// Places a power-up of a random kind on a random open interior cell
    /// that is neither in `occupied` nor holding another power-up. Nothing
    /// spawns when the registry is full or no such cell exists.
    pub fn try_spawn(
        &mut self,
        rng: &mut impl Rng,
        grid: &Grid,
        occupied: &[Cell],
        now: f64,
        events: &mut Vec<Event>,
    ) -> Option<PowerUp> {
        if self.is_full() {
            return None;
        }
        let candidates: Vec<Cell> = grid
            .interior_cells()
            .filter(|cell| grid.is_open(*cell))
            .filter(|cell| !occupied.contains(cell))
            .filter(|cell| !self.live.iter().any(|p| p.cell == *cell))
            .collect();
        let cell = *candidates.choose(rng)?;
        let kind = *PowerUpKind::ALL.choose(rng)?;

        let power_up = PowerUp {
            cell,
            kind,
            spawned_at: now,
            lifetime: self.params.lifetime,
        };
        debug!(?kind, ?cell, "power-up spawned");
        self.live.push(power_up);
        events.push(Event::PowerUpSpawned { kind, cell });
        Some(power_up)
    }

    /// Puts a power-up of `kind` on `cell` directly, e.g. for scripted
    /// layouts. Refused when full.
    pub fn place(&mut self, kind: PowerUpKind, cell: Cell, now: f64) -> bool {
        if self.is_full() {
            return false;
        }
        self.live.push(PowerUp {
            cell,
            kind,
            spawned_at: now,
            lifetime: self.params.lifetime,
        });
        true
    }

    /// Collects every power-up on `cell` and applies its effect. Returns the
    /// kinds collected; the caller charges the score cost per entry.
    pub fn collect_at(
        &mut self,
        cell: Cell,
        now: f64,
        agents: &mut [Agent],
        events: &mut Vec<Event>,
    ) -> Vec<PowerUpKind> {
        let mut collected = Vec::new();
        let mut i = 0;
        while i < self.live.len() {
            if self.live[i].cell == cell {
                let power_up = self.live.swap_remove(i);
                self.apply(power_up, now, agents, events);
                collected.push(power_up.kind);
            } else {
                i += 1;
            }
        }
        collected
    }

    fn apply(&mut self, power_up: PowerUp, now: f64, agents: &mut [Agent], events: &mut Vec<Event>) {
        let duration = self.params.effect_duration;
        let until = now + duration;
        debug!(kind = ?power_up.kind, cell = ?power_up.cell, "power-up collected");
        events.push(Event::PowerUpCollected {
            kind: power_up.kind,
            cell: power_up.cell,
        });

        match power_up.kind {
            PowerUpKind::Freeze => {
                for agent in agents.iter_mut() {
                    agent.freeze(now, duration);
                }
                events.push(Event::AgentsFrozen { until });
            }
            kind @ (PowerUpKind::Speed | PowerUpKind::WallBreaker) => {
                self.effects.activate(kind, until);
                events.push(Event::EffectActivated { kind, until });
            }
        }
        let frames = (duration * f64::from(self.params.display_fps)).round() as u32;
        self.countdowns.set(power_up.kind, frames);
    }

    /// Removes power-ups past their lifetime and effects past their deadline.
    /// One `EffectEnded` is emitted per removed effect.
    pub fn expire(&mut self, now: f64, events: &mut Vec<Event>) {
        self.live.retain(|p| !p.is_expired(now));
        for kind in self.effects.expire(now) {
            debug!(?kind, "effect ended");
            events.push(Event::EffectEnded { kind });
        }
    }

    pub fn tick_countdowns(&mut self) {
        self.countdowns.tick();
    }

    /// Rewrites live power-up positions, dropping any mapped to `None`.
    pub fn remap(&mut self, mut f: impl FnMut(Cell) -> Option<Cell>) {
        self.live.retain_mut(|p| match f(p.cell) {
            Some(cell) => {
                p.cell = cell;
                true
            }
            None => false,
        });
    }
}
