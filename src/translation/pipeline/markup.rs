//! 占位标记
//!
//! 发送给翻译后端的文本只包含两种标记：
//!
//! - `<b id=N>…</b>`：可翻译的行内元素，`N` 为文档内的条目编号
//! - `<br id=K>`：不透明节点（图片、嵌套的翻译单元、注释等），
//!   `K` 为它在所属条目中的序号
//!
//! 标记之外的文本经过转义，因此原文里出现的 `<b id=1>` 不会被误认。

use std::sync::OnceLock;

use regex::Regex;

use crate::translation::error::{TranslationError, TranslationResult};

/// 条目结束标记
pub const ITEM_CLOSE: &str = "</b>";

/// `<b id=N>` 的最大嵌套层数，更深的行内元素单独成为翻译单元
pub const MAX_MARKUP_DEPTH: usize = 32;

fn marker_regex() -> &'static Regex {
    static MARKER: OnceLock<Regex> = OnceLock::new();
    MARKER.get_or_init(|| {
        Regex::new(r#"<[bB]\s+[iI][dD]\s*=\s*"?(\d+)"?\s*>|</[bB]\s*>|<[bB][rR]\s+[iI][dD]\s*=\s*"?(\d+)"?\s*/?>"#)
            .expect("占位标记正则表达式无效")
    })
}

/// 条目开始标记
pub fn item_open(id: usize) -> String {
    format!("<b id={}>", id)
}

/// 不透明节点标记
pub fn opaque_marker(ordinal: usize) -> String {
    format!("<br id={}>", ordinal)
}

/// 转义普通文本
pub fn escape_text(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            _ => out.push(c),
        }
    }
    out
}

/// 反转义普通文本
pub fn unescape_text(text: &str) -> String {
    if !text.contains('&') {
        return text.to_string();
    }
    text.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&nbsp;", "\u{a0}")
        .replace("&amp;", "&")
}

/// 词法单元
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MarkupToken {
    Text(String),
    Open(usize),
    Close,
    Opaque(usize),
}

/// 将带标记的文本切分为词法单元
pub fn tokenize(markup: &str) -> Vec<MarkupToken> {
    let mut tokens = Vec::new();
    let mut last = 0;

    for captures in marker_regex().captures_iter(markup) {
        let Some(whole) = captures.get(0) else {
            continue;
        };
        if whole.start() > last {
            tokens.push(MarkupToken::Text(unescape_text(&markup[last..whole.start()])));
        }
        last = whole.end();

        if let Some(id) = captures.get(1) {
            match id.as_str().parse() {
                Ok(id) => tokens.push(MarkupToken::Open(id)),
                Err(_) => tokens.push(MarkupToken::Text(whole.as_str().to_string())),
            }
        } else if let Some(ordinal) = captures.get(2) {
            match ordinal.as_str().parse() {
                Ok(ordinal) => tokens.push(MarkupToken::Opaque(ordinal)),
                Err(_) => tokens.push(MarkupToken::Text(whole.as_str().to_string())),
            }
        } else {
            tokens.push(MarkupToken::Close);
        }
    }

    if last < markup.len() {
        tokens.push(MarkupToken::Text(unescape_text(&markup[last..])));
    }

    tokens
}

/// 去掉全部标记后的纯文本
pub fn strip_markers(markup: &str) -> String {
    tokenize(markup)
        .into_iter()
        .filter_map(|token| match token {
            MarkupToken::Text(text) => Some(text),
            _ => None,
        })
        .collect()
}

/// 标记树节点
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MarkupNode {
    Text(String),
    Item { id: usize, children: Vec<MarkupNode> },
    Opaque(usize),
}

/// 把带标记的文本解析为树；标记不配对时返回 `ReconstructionError`
pub fn parse_markup(markup: &str) -> TranslationResult<Vec<MarkupNode>> {
    let mut stack: Vec<(Option<usize>, Vec<MarkupNode>)> = vec![(None, Vec::new())];

    for token in tokenize(markup) {
        match token {
            MarkupToken::Text(text) => {
                if let Some((_, children)) = stack.last_mut() {
                    match children.last_mut() {
                        Some(MarkupNode::Text(previous)) => previous.push_str(&text),
                        _ => children.push(MarkupNode::Text(text)),
                    }
                }
            }
            MarkupToken::Open(id) => {
                if stack.len() > MAX_MARKUP_DEPTH {
                    return Err(TranslationError::ReconstructionError(format!(
                        "标记嵌套超过 {} 层",
                        MAX_MARKUP_DEPTH
                    )));
                }
                stack.push((Some(id), Vec::new()));
            }
            MarkupToken::Opaque(ordinal) => {
                if let Some((_, children)) = stack.last_mut() {
                    children.push(MarkupNode::Opaque(ordinal));
                }
            }
            MarkupToken::Close => {
                if stack.len() < 2 {
                    return Err(TranslationError::ReconstructionError(
                        "出现多余的结束标记".to_string(),
                    ));
                }
                if let Some((Some(id), children)) = stack.pop() {
                    if let Some((_, parent)) = stack.last_mut() {
                        parent.push(MarkupNode::Item { id, children });
                    }
                }
            }
        }
    }

    if stack.len() != 1 {
        return Err(TranslationError::ReconstructionError(format!(
            "{} 个开始标记未闭合",
            stack.len() - 1
        )));
    }

    Ok(stack.pop().map(|(_, children)| children).unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tokenize_accepts_backend_variants() {
        let tokens = tokenize(r#"a <B id="3">b</B > c<br id=0/>"#);
        assert_eq!(
            tokens,
            vec![
                MarkupToken::Text("a ".to_string()),
                MarkupToken::Open(3),
                MarkupToken::Text("b".to_string()),
                MarkupToken::Close,
                MarkupToken::Text(" c".to_string()),
                MarkupToken::Opaque(0),
            ]
        );
    }

    #[test]
    fn test_escaped_text_is_not_a_marker() {
        let markup = format!("x {} y", escape_text("<b id=1>"));
        assert_eq!(tokenize(&markup), vec![MarkupToken::Text("x <b id=1> y".to_string())]);
    }

    #[test]
    fn test_parse_nested_markup() {
        let tree = parse_markup("Hi <b id=1>big <b id=2>bold</b></b><br id=0>!").unwrap();
        assert_eq!(
            tree,
            vec![
                MarkupNode::Text("Hi ".to_string()),
                MarkupNode::Item {
                    id: 1,
                    children: vec![
                        MarkupNode::Text("big ".to_string()),
                        MarkupNode::Item {
                            id: 2,
                            children: vec![MarkupNode::Text("bold".to_string())],
                        },
                    ],
                },
                MarkupNode::Opaque(0),
                MarkupNode::Text("!".to_string()),
            ]
        );
    }

    #[test]
    fn test_parse_unbalanced_markup_fails() {
        assert!(parse_markup("<b id=1>open").is_err());
        assert!(parse_markup("close</b>").is_err());
    }

    #[test]
    fn test_parse_rejects_excessive_nesting() {
        let nested = |depth: usize| format!("{}x{}", "<b id=1>".repeat(depth), "</b>".repeat(depth));
        assert!(parse_markup(&nested(MAX_MARKUP_DEPTH)).is_ok());
        assert!(matches!(
            parse_markup(&nested(100_000)),
            Err(TranslationError::ReconstructionError(_))
        ));
    }

    #[test]
    fn test_strip_markers() {
        assert_eq!(strip_markers("Hello <b id=4>world</b><br id=0> &amp; more"), "Hello world & more");
    }
}
