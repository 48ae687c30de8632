//! Prompt construction for room redesigns
//!
//! The positive prompt pins the room category and layout while asking for a
//! new style. The negative prompt rules out non-photographic output, common
//! defects, and every other room category's furniture.

use serde::Serialize;

use super::room::RoomType;

/// Renderings that are not photographs
const NON_PHOTOGRAPHIC: &[&str] = &[
    "cartoon",
    "3d render",
    "illustration",
    "drawing",
    "painting",
    "sketch",
    "anime",
    "unrealistic",
];

/// Quality defects
const DEFECTS: &[&str] = &[
    "distorted proportions",
    "blurry",
    "low quality",
    "text",
    "watermark",
    "signature",
    "deformed",
];

/// Positive and negative prompt for one generation
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PromptPair {
    pub positive: String,
    pub negative: String,
}

/// Build the prompt pair for a room type and style
pub fn build_prompt(room_type: RoomType, style_name: &str, style_description: &str) -> PromptPair {
    let room = room_type.name();

    let positive = format!(
        "a photorealistic {style} {room}, {desc}, interior design. Keep as {room}. \
         Maintain the same room layout, architecture and function. \
         Redesign with {style} {room} furniture and decor. {feature}. \
         Keep the same window and door positions. \
         8k ultra HD photography, interior design magazine quality",
        style = style_name,
        room = room,
        desc = style_description,
        feature = room_type.central_feature(),
    );

    let mut terms: Vec<String> = NON_PHOTOGRAPHIC
        .iter()
        .chain(DEFECTS)
        .map(|t| t.to_string())
        .collect();
    for other in room_type.others() {
        terms.extend(other.anchor_terms().iter().map(|t| t.to_string()));
    }
    for other in room_type.others() {
        terms.push(format!("converting to {}", other.name()));
    }

    PromptPair {
        positive,
        negative: terms.join(", "),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn exclusions(prompt: &PromptPair) -> Vec<&str> {
        prompt.negative.split(", ").collect()
    }

    #[test]
    fn test_kitchen_rustic() {
        let prompt = build_prompt(
            RoomType::Kitchen,
            "rustic",
            "natural wood, earthy tones, vintage accessories, cozy textures",
        );

        assert!(prompt.positive.matches("kitchen").count() >= 2);
        assert!(prompt.positive.contains("rustic"));
        assert!(prompt.positive.contains("countertops and appliances"));
        assert!(prompt.positive.contains("Keep as kitchen"));
        assert!(prompt
            .positive
            .contains("Maintain the same room layout, architecture and function"));
        assert!(prompt.positive.contains("window and door positions"));

        let excluded = exclusions(&prompt);
        for term in ["bedroom", "bed", "living room", "office"] {
            assert!(excluded.contains(&term), "missing exclusion {}", term);
        }
        assert!(!prompt.negative.contains("stove"));
        assert!(!prompt.negative.contains("refrigerator"));
        assert!(excluded.contains(&"converting to bedroom"));
        assert!(!prompt.negative.contains("converting to kitchen"));
    }

    #[test]
    fn test_negative_never_excludes_own_anchors() {
        for room in RoomType::ALL {
            let prompt = build_prompt(room, "modern", "clean lines");
            for term in room.anchor_terms() {
                assert!(
                    !prompt.negative.contains(term),
                    "{} negative prompt excludes its own term {}",
                    room,
                    term
                );
            }
            for other in room.others() {
                for term in other.anchor_terms() {
                    assert!(exclusions(&prompt).contains(term));
                }
                assert!(prompt
                    .negative
                    .contains(&format!("converting to {}", other.name())));
            }
        }
    }

    #[test]
    fn test_negative_always_has_defects() {
        for room in RoomType::ALL {
            let prompt = build_prompt(room, "bohemian", "eclectic patterns");
            for term in NON_PHOTOGRAPHIC.iter().chain(DEFECTS) {
                assert!(exclusions(&prompt).contains(term));
            }
        }
    }

    #[test]
    fn test_build_prompt_deterministic() {
        let a = build_prompt(RoomType::Office, "industrial", "exposed brick");
        let b = build_prompt(RoomType::Office, "industrial", "exposed brick");
        assert_eq!(a, b);
    }

    #[test]
    fn test_living_room_positive() {
        let prompt = build_prompt(RoomType::LivingRoom, "modern", "sleek furniture");
        assert!(prompt.positive.starts_with("a photorealistic modern living room"));
        assert!(prompt.positive.contains("Keep as living room"));
        assert!(prompt.positive.contains("sofa/seating"));
    }
}
