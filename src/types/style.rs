use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Teaching style presets that steer the tone and depth of the tutor.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TutorStyle {
    /// Short answers in plain language.
    Simple,

    /// Clear explanations with examples.
    #[default]
    Balanced,

    /// In-depth explanations with technical depth.
    Detailed,

    /// Guides the student with questions instead of answers.
    Socratic,
}

impl TutorStyle {
    /// Every style, in the order they are offered to the user.
    pub const ALL: [TutorStyle; 4] = [
        TutorStyle::Simple,
        TutorStyle::Balanced,
        TutorStyle::Detailed,
        TutorStyle::Socratic,
    ];

    /// The key used in settings and on the command line.
    pub fn key(&self) -> &'static str {
        match self {
            TutorStyle::Simple => "simple",
            TutorStyle::Balanced => "balanced",
            TutorStyle::Detailed => "detailed",
            TutorStyle::Socratic => "socratic",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            TutorStyle::Simple => "Simple",
            TutorStyle::Balanced => "Balanced",
            TutorStyle::Detailed => "Detailed",
            TutorStyle::Socratic => "Socratic",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            TutorStyle::Simple => "Easy explanations for beginners",
            TutorStyle::Balanced => "Clear explanations with examples",
            TutorStyle::Detailed => "In-depth explanations with technical depth",
            TutorStyle::Socratic => "Learn through guided questions",
        }
    }

    /// The instruction fragment sent to the remote model for this style.
    pub fn instruction(&self) -> &'static str {
        match self {
            TutorStyle::Simple => {
                "Explain concepts in very simple terms, as if to a beginner. Use everyday \
                 analogies, avoid jargon, and keep answers short."
            }
            TutorStyle::Balanced => {
                "Give clear, well-structured explanations with a concrete example for each \
                 key idea. Balance depth with readability."
            }
            TutorStyle::Detailed => {
                "Give thorough, in-depth explanations. Cover the underlying theory, edge \
                 cases, and technical terminology, and connect ideas to related concepts."
            }
            TutorStyle::Socratic => {
                "Use the Socratic method. Do not give the answer directly; guide the student \
                 with probing questions, one step at a time, and build on their replies."
            }
        }
    }
}

impl fmt::Display for TutorStyle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.key())
    }
}

/// Error returned when parsing an unknown style key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TutorStyleParseError {
    /// The key that did not name a style.
    pub invalid_value: String,
}

impl fmt::Display for TutorStyleParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Unknown tutor style: {} (expected simple, balanced, detailed, or socratic)",
            self.invalid_value
        )
    }
}

impl std::error::Error for TutorStyleParseError {}

impl FromStr for TutorStyle {
    type Err = TutorStyleParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "simple" => Ok(TutorStyle::Simple),
            "balanced" => Ok(TutorStyle::Balanced),
            "detailed" => Ok(TutorStyle::Detailed),
            "socratic" => Ok(TutorStyle::Socratic),
            _ => Err(TutorStyleParseError {
                invalid_value: s.to_string(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;

    #[test]
    fn default_is_balanced() {
        assert_eq!(TutorStyle::default(), TutorStyle::Balanced);
    }

    #[test]
    fn parse_known_keys() {
        for style in TutorStyle::ALL {
            assert_eq!(style.key().parse::<TutorStyle>().unwrap(), style);
        }
        assert_eq!(
            " Socratic ".parse::<TutorStyle>().unwrap(),
            TutorStyle::Socratic
        );
    }

    #[test]
    fn parse_unknown_key() {
        let err = "casual".parse::<TutorStyle>().unwrap_err();
        assert_eq!(err.invalid_value, "casual");
        assert!(err.to_string().contains("casual"));
    }

    #[test]
    fn serialization() {
        let json = serde_json::to_string(&TutorStyle::Detailed).unwrap();
        assert_eq!(json, r#""detailed""#);
        let style: TutorStyle = serde_json::from_str(r#""simple""#).unwrap();
        assert_eq!(style, TutorStyle::Simple);
    }

    #[test]
    fn metadata_is_distinct() {
        let names: HashSet<_> = TutorStyle::ALL.iter().map(|s| s.display_name()).collect();
        let keys: HashSet<_> = TutorStyle::ALL.iter().map(|s| s.key()).collect();
        assert_eq!(names.len(), 4);
        assert_eq!(keys.len(), 4);
        assert!(TutorStyle::ALL.iter().all(|s| !s.instruction().is_empty()));
    }
}
