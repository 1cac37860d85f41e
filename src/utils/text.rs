//! 文字處理輔助函式，所有長度都以字元（char）計算。

/// 取前 `max` 個字元，不會切斷 UTF-8 code point
pub fn truncate_chars(text: &str, max: usize) -> &str {
    match text.char_indices().nth(max) {
        Some((byte_idx, _)) => &text[..byte_idx],
        None => text,
    }
}

/// 超過 `max` 個字元時截斷為 `max - 3` 個字元並加上 `...`
pub fn ellipsize(text: &str, max: usize) -> String {
    if text.chars().count() > max {
        format!("{}...", truncate_chars(text, max.saturating_sub(3)))
    } else {
        text.to_string()
    }
}

/// 由夢境內容推導標題
pub fn extract_title(content: &str) -> String {
    let first_sentence = content
        .split(['.', '!', '?'])
        .next()
        .map(str::trim)
        .unwrap_or_default();

    if first_sentence.chars().count() > 10 {
        return ellipsize(first_sentence, 50);
    }

    if content.is_empty() {
        return "Untitled Dream".to_string();
    }

    ellipsize(content, 50)
}

/// 穩定的小型雜湊，用於從固定清單中挑選項目
pub fn stable_index(text: &str, len: usize) -> usize {
    if len == 0 {
        return 0;
    }
    let hash = text
        .bytes()
        .fold(0u64, |acc, b| acc.wrapping_mul(31).wrapping_add(u64::from(b)));
    (hash % len as u64) as usize
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_chars_respects_char_boundaries() {
        assert_eq!(truncate_chars("hello", 10), "hello");
        assert_eq!(truncate_chars("hello", 3), "hel");
        assert_eq!(truncate_chars("夢見飛翔", 2), "夢見");
        assert_eq!(truncate_chars("", 5), "");
    }

    #[test]
    fn test_ellipsize() {
        assert_eq!(ellipsize("short", 150), "short");
        let long = "a".repeat(200);
        let out = ellipsize(&long, 150);
        assert_eq!(out.chars().count(), 150);
        assert!(out.ends_with("..."));
    }

    #[test]
    fn test_extract_title_uses_first_sentence() {
        assert_eq!(
            extract_title("I was flying over the ocean. Then I fell."),
            "I was flying over the ocean"
        );
    }

    #[test]
    fn test_extract_title_truncates_long_sentence() {
        let sentence = "I walked through an endless corridor lined with doors that never opened";
        let title = extract_title(sentence);
        assert_eq!(title.chars().count(), 50);
        assert!(title.ends_with("..."));
        assert!(title.starts_with("I walked through an endless corridor"));
    }

    #[test]
    fn test_extract_title_short_first_sentence_falls_back_to_content() {
        assert_eq!(extract_title("Flying! Over water."), "Flying! Over water.");
        let content = format!("Cats. {}", "x".repeat(60));
        let title = extract_title(&content);
        assert!(title.starts_with("Cats. "));
        assert_eq!(title.chars().count(), 50);
    }

    #[test]
    fn test_extract_title_empty_content() {
        assert_eq!(extract_title(""), "Untitled Dream");
    }

    #[test]
    fn test_stable_index_is_deterministic_and_in_range() {
        let a = stable_index("a dream about teeth", 5);
        let b = stable_index("a dream about teeth", 5);
        assert_eq!(a, b);
        assert!(a < 5);
        assert_eq!(stable_index("anything", 0), 0);
    }
}
