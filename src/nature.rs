use rand::seq::SliceRandom;

/// The fixed gallery behind /nature/:id and the members page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NatureImage {
    NatureWalk,
    WinterLandscape,
    AutumnWalk,
}

impl NatureImage {
    pub const ALL: [Self; 3] = [Self::NatureWalk, Self::WinterLandscape, Self::AutumnWalk];

    /// Ids are 1-based, matching the public URLs. Anything unmapped
    /// is None; callers render a defined fallback.
    pub fn from_id(id: u32) -> Option<Self> {
        match id {
            1 => Some(Self::NatureWalk),
            2 => Some(Self::WinterLandscape),
            3 => Some(Self::AutumnWalk),
            _ => None,
        }
    }

    pub fn file(self) -> &'static str {
        match self {
            Self::NatureWalk => "nature-walk.jpeg",
            Self::WinterLandscape => "winter-landscape.jpeg",
            Self::AutumnWalk => "autumn-walk.jpeg",
        }
    }

    pub fn random() -> Self {
        Self::ALL
            .choose(&mut rand::thread_rng())
            .copied()
            .unwrap_or(Self::NatureWalk)
    }
}
