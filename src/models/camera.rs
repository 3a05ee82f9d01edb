use serde::{Deserialize, Serialize};
use std::fmt;

/// One of the six fixed camera positions on the vehicle.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "snake_case")]
pub enum CameraId {
    Front,
    Back,
    LeftPillar,
    RightPillar,
    LeftRepeater,
    RightRepeater,
}

impl CameraId {
    pub const ALL: [CameraId; 6] = [
        CameraId::Front,
        CameraId::Back,
        CameraId::LeftPillar,
        CameraId::RightPillar,
        CameraId::LeftRepeater,
        CameraId::RightRepeater,
    ];

    /// Display order of the 2x3 camera grid, top row first.
    pub const GRID_LAYOUT: [[CameraId; 3]; 2] = [
        [CameraId::LeftPillar, CameraId::Front, CameraId::RightPillar],
        [CameraId::RightRepeater, CameraId::Back, CameraId::LeftRepeater],
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            CameraId::Front => "front",
            CameraId::Back => "back",
            CameraId::LeftPillar => "left_pillar",
            CameraId::RightPillar => "right_pillar",
            CameraId::LeftRepeater => "left_repeater",
            CameraId::RightRepeater => "right_repeater",
        }
    }

    pub fn from_name(value: &str) -> Option<Self> {
        CameraId::ALL
            .into_iter()
            .find(|camera| camera.as_str() == value)
    }

    /// Cameras in grid reading order (left to right, top to bottom).
    pub fn grid_order() -> impl Iterator<Item = CameraId> {
        CameraId::GRID_LAYOUT.into_iter().flatten()
    }
}

impl fmt::Display for CameraId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
