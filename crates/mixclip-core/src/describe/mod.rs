//! Paired high-info / low-info descriptions written by a vision-language model.
//!
//! Each photo gets one request; the model answers with both descriptions on a
//! single line, which [`parse_descriptions`] splits apart.

mod describer;
pub mod tokens;

use std::sync::LazyLock;

use regex::Regex;

pub use describer::{DescribeOptions, DescribeReport, Describer};
pub use tokens::{token_report, TokenCount, TokenReport, CLIP_TOKEN_LIMIT};

/// Prompt sent with every photo.
pub const INSTRUCTIONS: &str = r#"You are to generate TWO descriptions of the animal in the image: one highly detailed (high_info) and one simplified (low_info).
Your responses MUST be provided exactly in this format:

high_info="your high-info description" low_info="your low-info description"

Do not include any text other than these two descriptions.

The high-info description should contain as much semantic detail as possible within 60 words, using concise, descriptive phrases. Sentence fragments are allowed but it must read as natural prose.

The low-info description should convey as much semantic detail as possible within 25 words. Sentence fragments are allowed but it must read as natural prose.

High-info description:
Describe the animal in continuous, natural prose. Include its approximate size relative to everyday references (knee-height, waist-height), its build (heavy-set, slender, medium, muscular), fur colour and texture (short, long, shaggy, smooth, fluffy), fur pattern (solid, spotted, striped, patchy), posture (standing, sitting, lying down, in motion), demeanor (calm, alert, playful, relaxed), distinctive features (ear shape and position, tail length and shape, snout length and shape), accessories (colour, type and any readable text), gaze and facial expression, and the environment (ground surface and background). DO NOT state the species (for example dog or cat).

Low-info description:
Describe the animal briefly in continuous, natural prose. State its size (small, medium, large), primary fur colour, main accessory if visible (harness, collar) and the general setting (indoors or outdoors). DO NOT state the species (for example dog or cat).
"#;

/// The two descriptions extracted from one model response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DescriptionPair {
    pub high_info: String,
    pub low_info: String,
}

const RESPONSE_PATTERN: &str = r#"(?s)^high_info="(.+?)"\s+low_info="(.+?)""#;

static RESPONSE_RE: LazyLock<Option<Regex>> = LazyLock::new(|| Regex::new(RESPONSE_PATTERN).ok());

/// Split a model response into its two descriptions.
///
/// The trimmed response must begin with `high_info="…"`, then whitespace,
/// then `low_info="…"`. Anything after the closing quote is ignored.
pub fn parse_descriptions(text: &str) -> Option<DescriptionPair> {
    let pattern = RESPONSE_RE.as_ref()?;
    let captures = pattern.captures(text.trim())?;
    Some(DescriptionPair {
        high_info: captures.get(1)?.as_str().trim().to_string(),
        low_info: captures.get(2)?.as_str().trim().to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_response_pattern_compiles_once() {
        let first = RESPONSE_RE.as_ref().unwrap() as *const Regex;
        assert!(parse_descriptions(r#"high_info="a" low_info="b""#).is_some());
        assert_eq!(RESPONSE_RE.as_ref().unwrap() as *const Regex, first);
    }

    #[test]
    fn test_parse_exact_format() {
        let pair = parse_descriptions(
            r#"high_info="A knee-height, slender animal with short grey fur." low_info="Small grey animal indoors.""#,
        )
        .unwrap();
        assert_eq!(
            pair.high_info,
            "A knee-height, slender animal with short grey fur."
        );
        assert_eq!(pair.low_info, "Small grey animal indoors.");
    }

    #[test]
    fn test_parse_trims_and_spans_newlines() {
        let pair = parse_descriptions(
            "  high_info=\" Fluffy,\nalert. \"\n\nlow_info=\" Medium, outdoors. \"  trailing",
        )
        .unwrap();
        assert_eq!(pair.high_info, "Fluffy,\nalert.");
        assert_eq!(pair.low_info, "Medium, outdoors.");
    }

    #[test]
    fn test_parse_rejects_other_shapes() {
        assert!(parse_descriptions("Here you go: high_info=\"a\" low_info=\"b\"").is_none());
        assert!(parse_descriptions("high_info=\"a\"").is_none());
        assert!(parse_descriptions("high_info=\"a\"low_info=\"b\"").is_none());
        assert!(parse_descriptions("low_info=\"b\" high_info=\"a\"").is_none());
        assert!(parse_descriptions("high_info=\"\" low_info=\"b\"").is_none());
    }

    #[test]
    fn test_instructions_ask_for_exact_format() {
        assert!(INSTRUCTIONS.contains(r#"high_info="your high-info description" low_info="#));
        assert!(INSTRUCTIONS.contains("60 words"));
        assert!(INSTRUCTIONS.contains("25 words"));
    }
}
