use crate::scheduler::TimerId;
use rand::Rng;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HoleStatus {
    /// No mole; the spawner may pick this hole.
    Empty,
    /// Mole visible and whackable, with an outstanding retract timer.
    Active,
    /// Transient post-whack splat before reverting to Empty.
    Hit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, strum_macros::Display)]
pub enum MoleKind {
    Hamster,
    Bunny,
    Frog,
    Bear,
    Pig,
}

impl MoleKind {
    pub const ALL: [MoleKind; 5] = [
        MoleKind::Hamster,
        MoleKind::Bunny,
        MoleKind::Frog,
        MoleKind::Bear,
        MoleKind::Pig,
    ];

    pub fn glyph(&self) -> &'static str {
        match self {
            MoleKind::Hamster => "🐹",
            MoleKind::Bunny => "🐰",
            MoleKind::Frog => "🐸",
            MoleKind::Bear => "🐻",
            MoleKind::Pig => "🐷",
        }
    }
}

/// One grid slot. Identity and the cosmetic scatter are fixed at grid
/// initialization; spawn/retract/hit logic only ever touches `status`,
/// `mole_kind` and the two timer handles.
#[derive(Debug)]
pub struct Hole {
    pub id: usize,
    pub status: HoleStatus,
    pub mole_kind: MoleKind,
    /// Auto-retract timer; Some exactly while status is Active.
    pub pending_retract: Option<TimerId>,
    /// Hit-splat reset timer; Some exactly while status is Hit.
    pub pending_clear: Option<TimerId>,
    // Cosmetic scatter for a hand-placed look, immutable for the session.
    pub x_offset: f32,
    pub y_offset: f32,
    pub rotation: f32,
}

impl Hole {
    pub fn new(id: usize, rng: &mut impl Rng) -> Self {
        Self {
            id,
            status: HoleStatus::Empty,
            mole_kind: MoleKind::Hamster,
            pending_retract: None,
            pending_clear: None,
            x_offset: rng.gen_range(-10.0..10.0),
            y_offset: rng.gen_range(-10.0..10.0),
            rotation: rng.gen_range(-2.0..2.0),
        }
    }
}
