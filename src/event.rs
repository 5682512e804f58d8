use serde::Serialize;

use crate::grid::Cell;
use crate::powerup::PowerUpKind;

/// Notifications emitted while the simulation runs. The simulation pushes
/// them into a caller-owned buffer; presentation decides what to show.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub enum Event {
    MazeRegenerated { fallback: bool },
    PowerUpSpawned { kind: PowerUpKind, cell: Cell },
    PowerUpCollected { kind: PowerUpKind, cell: Cell },
    EffectActivated { kind: PowerUpKind, until: f64 },
    EffectEnded { kind: PowerUpKind },
    AgentsFrozen { until: f64 },
    WallBroken { cell: Cell },
    PlayerHit { lives_left: u32 },
    Won { score: i64 },
    Lost { score: i64 },
}

impl Event {
    /// Short banner text for a HUD.
    pub fn message(&self) -> Option<String> {
        let text = match self {
            Event::PowerUpSpawned { kind, .. } => format!("{} spawned!", kind.label()),
            Event::EffectActivated { kind, .. } => format!("{} activated!", kind.label()),
            Event::AgentsFrozen { .. } => "Ghost Freeze activated!".to_string(),
            Event::EffectEnded { kind } => format!("{} ended", kind.label()),
            Event::WallBroken { .. } => "Wall broken!".to_string(),
            Event::PlayerHit { lives_left } => format!("Hit! Lives left: {lives_left}"),
            _ => return None,
        };
        Some(text)
    }
}
