//! Instruction prompt sent with every turn.

use crate::types::TutorStyle;

const PREAMBLE: &str = "You are an AI tutor helping a student understand their study material.";

const GUIDELINES: &str = "Guidelines:
- Base your answers on the student's documents; say so plainly when they do not cover the question.
- Format answers in Markdown with short paragraphs, lists, and bold key terms.
- Check understanding with a brief follow-up question when it helps.
- Be encouraging and patient.";

/// Builds the instruction prompt for one turn.
///
/// Blank labels are treated as absent.
pub fn build_instructions(
    style: TutorStyle,
    topic: Option<&str>,
    document_name: Option<&str>,
) -> String {
    let mut prompt = String::new();
    prompt.push_str(PREAMBLE);
    prompt.push_str("\n\n");
    prompt.push_str(&format!(
        "Teaching style ({}): {}\n",
        style.display_name(),
        style.instruction()
    ));
    if let Some(topic) = non_blank(topic) {
        prompt.push_str(&format!("Current topic: {topic}\n"));
    }
    if let Some(document) = non_blank(document_name) {
        prompt.push_str(&format!("Document being studied: {document}\n"));
    }
    prompt.push('\n');
    prompt.push_str(GUIDELINES);
    prompt
}

fn non_blank(label: Option<&str>) -> Option<&str> {
    label.map(str::trim).filter(|label| !label.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn includes_style_fragment() {
        let prompt = build_instructions(TutorStyle::Socratic, None, None);
        assert!(prompt.contains(TutorStyle::Socratic.instruction()));
        assert!(prompt.contains("Teaching style (Socratic)"));
        assert!(prompt.ends_with(GUIDELINES));
        assert!(!prompt.contains("Current topic"));
        assert!(!prompt.contains("Document being studied"));
    }

    #[test]
    fn includes_labels() {
        let prompt = build_instructions(
            TutorStyle::Balanced,
            Some("Photosynthesis"),
            Some("biology-ch3.pdf"),
        );
        assert!(prompt.contains("Current topic: Photosynthesis\n"));
        assert!(prompt.contains("Document being studied: biology-ch3.pdf\n"));
    }

    #[test]
    fn blank_labels_are_skipped() {
        let prompt = build_instructions(TutorStyle::Simple, Some("  "), Some(""));
        assert!(!prompt.contains("Current topic"));
        assert!(!prompt.contains("Document being studied"));
    }
}
