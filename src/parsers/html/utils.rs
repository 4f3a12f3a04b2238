/// ASCII 空白字符
pub const WHITESPACES: &[char] = &[' ', '\t', '\n', '\x0c', '\r'];

/// 行内（短语级）元素：嵌在另一个可翻译元素中时不单独成为翻译单元
pub const INLINE_ELEMENTS: &[&str] = &[
    "a", "abbr", "b", "bdi", "bdo", "big", "cite", "code", "data", "dfn", "em", "font", "i",
    "kbd", "label", "mark", "q", "s", "samp", "small", "span", "strike", "strong", "sub", "sup",
    "time", "tt", "u", "var",
];

/// 不参与翻译的元素（整棵子树跳过）
pub const SKIP_ELEMENTS: &[&str] = &[
    "script", "style", "noscript", "template", "textarea", "svg", "math", "iframe", "object",
    "embed", "canvas", "head",
];

/// 标记不翻译的类名
pub const NO_TRANSLATE_CLASS: &str = "notranslate";

pub fn is_inline_element(name: &str) -> bool {
    INLINE_ELEMENTS.contains(&name)
}

pub fn is_skip_element(name: &str) -> bool {
    SKIP_ELEMENTS.contains(&name)
}

/// 判断字符串是否只包含 HTML 空白
pub fn is_whitespace_only(text: &str) -> bool {
    text.chars().all(|c| WHITESPACES.contains(&c))
}

/// 将连续的 HTML 空白折叠为单个空格（保留首尾的单个空格，不处理 `&nbsp;`）
pub fn collapse_whitespace(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut in_space = false;
    for c in text.chars() {
        if WHITESPACES.contains(&c) {
            if !in_space {
                out.push(' ');
                in_space = true;
            }
        } else {
            out.push(c);
            in_space = false;
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_collapse_whitespace() {
        assert_eq!(collapse_whitespace("  Hello \n\t world "), " Hello world ");
        assert_eq!(collapse_whitespace("a"), "a");
        assert_eq!(collapse_whitespace("a\u{a0}\u{a0}b"), "a\u{a0}\u{a0}b");
        assert!(is_whitespace_only(" \n\t"));
        assert!(!is_whitespace_only(" x "));
    }
}
