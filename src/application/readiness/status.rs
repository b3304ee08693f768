//! Cosmetic status lines shown while an article body is still being generated.

const STATUS_MESSAGES: [&str; 8] = [
    "Researching the topic...",
    "Outlining the key concepts...",
    "Drafting explanations...",
    "Writing example code...",
    "Checking edge cases...",
    "Polishing the walkthrough...",
    "Adding complexity analysis...",
    "Almost there, formatting the article...",
];

/// Number of distinct status lines.
pub fn status_message_count() -> usize {
    STATUS_MESSAGES.len()
}

/// Pick a status line for an arbitrary index. Any `usize` is accepted.
pub fn status_message(index: usize) -> &'static str {
    STATUS_MESSAGES[index % STATUS_MESSAGES.len()]
}
