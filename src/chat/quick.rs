//! Canned prompts offered before the user has engaged.

/// The quick prompts, in display order.
pub const QUICK_PROMPTS: [&str; 4] = [
    "Summarize the key concepts",
    "Explain this like I'm a beginner",
    "Quiz me on this topic",
    "What are the most important points to remember?",
];

/// Quick prompts are offered while the conversation has at most this many messages.
pub const QUICK_PROMPT_LIMIT: usize = 2;

/// Returns true if quick prompts should be offered.
pub fn quick_prompts_visible(message_count: usize) -> bool {
    message_count <= QUICK_PROMPT_LIMIT
}

/// Looks up a quick prompt by its 1-based position.
pub fn quick_prompt(position: usize) -> Option<&'static str> {
    position
        .checked_sub(1)
        .and_then(|idx| QUICK_PROMPTS.get(idx))
        .copied()
}
