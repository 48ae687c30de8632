//! Room categories and the furniture vocabulary that anchors each one

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::DesignError;

/// Room category the redesign must stay within
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoomType {
    Bedroom,
    LivingRoom,
    Kitchen,
    Office,
}

impl RoomType {
    /// Every room type, in display order
    pub const ALL: [RoomType; 4] = [
        RoomType::Bedroom,
        RoomType::LivingRoom,
        RoomType::Kitchen,
        RoomType::Office,
    ];

    /// Lowercase name used inside prompts and filenames
    pub fn name(&self) -> &'static str {
        match self {
            RoomType::Bedroom => "bedroom",
            RoomType::LivingRoom => "living room",
            RoomType::Kitchen => "kitchen",
            RoomType::Office => "office",
        }
    }

    /// Terms that identify this room. Other room types exclude them.
    pub fn anchor_terms(&self) -> &'static [&'static str] {
        match self {
            RoomType::Bedroom => &["bedroom", "bed"],
            RoomType::LivingRoom => &[
                "living room",
                "sofa",
                "dining table",
                "coffee table",
                "tv stand",
            ],
            RoomType::Kitchen => &["kitchen", "stove", "refrigerator"],
            RoomType::Office => &["office", "desk", "chair"],
        }
    }

    /// Instruction naming the furniture that must remain the focal point
    pub fn central_feature(&self) -> &'static str {
        match self {
            RoomType::Bedroom => "Keep bed as central feature",
            RoomType::LivingRoom => "Keep sofa/seating as central feature",
            RoomType::Kitchen => "Keep countertops and appliances as central features",
            RoomType::Office => "Keep desk and chair as central features",
        }
    }

    /// All room types except this one
    pub fn others(&self) -> impl Iterator<Item = RoomType> + '_ {
        RoomType::ALL.into_iter().filter(move |r| r != self)
    }

    /// Filename-safe slug ("living-room")
    pub fn slug(&self) -> String {
        self.name().replace(' ', "-")
    }
}

impl fmt::Display for RoomType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for RoomType {
    type Err = DesignError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "bedroom" => Ok(RoomType::Bedroom),
            "living room" | "living_room" | "livingroom" | "hall" | "hall (living room)" => {
                Ok(RoomType::LivingRoom)
            }
            "kitchen" => Ok(RoomType::Kitchen),
            "office" => Ok(RoomType::Office),
            _ => Err(DesignError::InvalidRoomType(s.to_string())),
        }
    }
}
