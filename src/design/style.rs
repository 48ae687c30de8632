//! Decorating style catalog and user style selections

use serde::Serialize;

use super::DesignError;

/// Most styles a single batch may request
pub const MAX_STYLES: usize = 3;

/// A named decorating style and its visual attributes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Style {
    pub name: &'static str,
    pub description: &'static str,
}

/// The supported styles
pub const CATALOG: [Style; 5] = [
    Style {
        name: "modern",
        description: "clean lines, minimalist, neutral colors, sleek furniture",
    },
    Style {
        name: "rustic",
        description: "natural wood, earthy tones, vintage accessories, cozy textures",
    },
    Style {
        name: "bohemian",
        description: "eclectic patterns, vibrant colors, indoor plants, layered textiles",
    },
    Style {
        name: "scandinavian",
        description: "light woods, white walls, functional furniture, minimal decor",
    },
    Style {
        name: "industrial",
        description: "exposed brick, metal accents, raw materials, leather furniture",
    },
];

/// Look up a style by name (case-insensitive)
pub fn lookup(name: &str) -> Option<Style> {
    let wanted = name.trim().to_lowercase();
    CATALOG.iter().copied().find(|s| s.name == wanted)
}

/// Styles the form preselects
pub fn default_selection() -> Vec<String> {
    vec!["modern".to_string(), "rustic".to_string()]
}

/// One to three distinct catalog styles, in the order requested
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StyleSelection(Vec<Style>);

impl StyleSelection {
    /// Validate a list of style names
    pub fn new<S: AsRef<str>>(names: &[S]) -> Result<Self, DesignError> {
        if names.is_empty() {
            return Err(DesignError::InvalidStyleSelection(
                "select at least one design style".to_string(),
            ));
        }
        if names.len() > MAX_STYLES {
            return Err(DesignError::InvalidStyleSelection(format!(
                "at most {} styles may be selected, got {}",
                MAX_STYLES,
                names.len()
            )));
        }

        let mut styles: Vec<Style> = Vec::with_capacity(names.len());
        for name in names {
            let name = name.as_ref();
            let style = lookup(name).ok_or_else(|| {
                DesignError::InvalidStyleSelection(format!("unknown style '{}'", name))
            })?;
            if styles.contains(&style) {
                return Err(DesignError::InvalidStyleSelection(format!(
                    "style '{}' selected more than once",
                    style.name
                )));
            }
            styles.push(style);
        }

        Ok(Self(styles))
    }

    pub fn styles(&self) -> &[Style] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}
