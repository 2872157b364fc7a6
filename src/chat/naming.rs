const NAME_WORD_LIMIT: usize = 4;
const NAME_CHAR_LIMIT: usize = 50;

/// Derive a conversation display name from its first user message: the
/// first few words, ellipsized, capped at a character boundary.
pub fn derive_conversation_name(content: &str) -> String {
    let words: Vec<&str> = content.split_whitespace().collect();
    let mut name = words
        .iter()
        .take(NAME_WORD_LIMIT)
        .copied()
        .collect::<Vec<_>>()
        .join(" ");
    if words.len() > NAME_WORD_LIMIT {
        name.push_str("...");
    }

    if name.len() > NAME_CHAR_LIMIT {
        let boundary = name
            .char_indices()
            .map(|(i, c)| i + c.len_utf8())
            .take_while(|end| *end <= NAME_CHAR_LIMIT - 3)
            .last()
            .unwrap_or(0);
        name = format!("{}...", &name[..boundary]);
    }

    name
}
