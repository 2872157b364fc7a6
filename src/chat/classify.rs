/// Rendering category for a message body. Detection is presence-based, not
/// a parse, and the first matching rule wins: code fences before math.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentKind {
    PlainText,
    CodeFenced,
    MathAnnotated,
}

pub fn classify(content: &str) -> ContentKind {
    if content.contains("```") {
        ContentKind::CodeFenced
    } else if content.contains('$') {
        ContentKind::MathAnnotated
    } else {
        ContentKind::PlainText
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_text() {
        assert_eq!(classify("just words"), ContentKind::PlainText);
    }

    #[test]
    fn test_code_fence() {
        assert_eq!(classify("```rust\nfn main() {}\n```"), ContentKind::CodeFenced);
    }

    #[test]
    fn test_math_marker() {
        assert_eq!(classify("inline $x^2$ math"), ContentKind::MathAnnotated);
    }

    #[test]
    fn test_code_fence_wins_over_math() {
        assert_eq!(
            classify("```py\nprint('$5')\n```"),
            ContentKind::CodeFenced
        );
    }
}
