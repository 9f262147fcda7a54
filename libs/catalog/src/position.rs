//! Canonical position keys and per-template slot tables.

use serde::{Deserialize, Serialize};

use crate::Template;

/// Every canonical position key across both templates.
///
/// Keys are shared vocabulary; whether a key is legal depends on the
/// template (see [`validate_position_for_template`]).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PositionKey {
    Kaleci,
    SagDef,
    SolDef,
    Stoper,
    SagStoper,
    SolStoper,
    OnLibero,
    OrtaSaha,
    MerkezOrtaSaha,
    SagKanat,
    SolKanat,
    Santrfor,
    OnNumara,
}

impl PositionKey {
    pub const ALL: [PositionKey; 13] = [
        PositionKey::Kaleci,
        PositionKey::SagDef,
        PositionKey::SolDef,
        PositionKey::Stoper,
        PositionKey::SagStoper,
        PositionKey::SolStoper,
        PositionKey::OnLibero,
        PositionKey::OrtaSaha,
        PositionKey::MerkezOrtaSaha,
        PositionKey::SagKanat,
        PositionKey::SolKanat,
        PositionKey::Santrfor,
        PositionKey::OnNumara,
    ];

    /// The canonical key string, as stored.
    pub fn as_str(&self) -> &'static str {
        match self {
            PositionKey::Kaleci => "KALECI",
            PositionKey::SagDef => "SAG_DEF",
            PositionKey::SolDef => "SOL_DEF",
            PositionKey::Stoper => "STOPER",
            PositionKey::SagStoper => "SAG_STOPER",
            PositionKey::SolStoper => "SOL_STOPER",
            PositionKey::OnLibero => "ON_LIBERO",
            PositionKey::OrtaSaha => "ORTA_SAHA",
            PositionKey::MerkezOrtaSaha => "MERKEZ_ORTA_SAHA",
            PositionKey::SagKanat => "SAG_KANAT",
            PositionKey::SolKanat => "SOL_KANAT",
            PositionKey::Santrfor => "SANTRFOR",
            PositionKey::OnNumara => "ON_NUMARA",
        }
    }

    /// Exact match against canonical key strings.
    pub fn from_canonical(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|key| key.as_str() == s)
    }
}

impl std::fmt::Display for PositionKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for PositionKey {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_canonical(s).ok_or_else(|| format!("unknown position key '{s}'"))
    }
}

/// One position slot of a template.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Slot {
    pub position: PositionKey,
    pub jersey_number: u8,
}

const fn slot(position: PositionKey, jersey_number: u8) -> Slot {
    Slot {
        position,
        jersey_number,
    }
}

static EIGHT_A_SIDE: [Slot; 8] = [
    slot(PositionKey::Kaleci, 1),
    slot(PositionKey::SagDef, 2),
    slot(PositionKey::SolDef, 3),
    slot(PositionKey::Stoper, 4),
    slot(PositionKey::SagKanat, 7),
    slot(PositionKey::OrtaSaha, 8),
    slot(PositionKey::Santrfor, 9),
    slot(PositionKey::SolKanat, 11),
];

static ELEVEN_A_SIDE: [Slot; 11] = [
    slot(PositionKey::Kaleci, 1),
    slot(PositionKey::SagDef, 2),
    slot(PositionKey::SolDef, 3),
    slot(PositionKey::SagStoper, 4),
    slot(PositionKey::SolStoper, 5),
    slot(PositionKey::OnLibero, 6),
    slot(PositionKey::SagKanat, 7),
    slot(PositionKey::MerkezOrtaSaha, 8),
    slot(PositionKey::Santrfor, 9),
    slot(PositionKey::OnNumara, 10),
    slot(PositionKey::SolKanat, 11),
];

/// Ordered slot list for a template.
pub fn positions_for_template(template: Template) -> &'static [Slot] {
    match template {
        Template::EightASide => &EIGHT_A_SIDE,
        Template::ElevenASide => &ELEVEN_A_SIDE,
    }
}

/// Jersey number of a key in a template, or `None` if the template has no
/// such slot.
pub fn jersey_number_for(template: Template, key: PositionKey) -> Option<u8> {
    positions_for_template(template)
        .iter()
        .find(|slot| slot.position == key)
        .map(|slot| slot.jersey_number)
}

/// Strict membership test of a key in a template.
pub fn validate_position_for_template(key: PositionKey, template: Template) -> bool {
    jersey_number_for(template, key).is_some()
}
