//! 行内样式可见性判断
//!
//! 宿主环境之外无法得到计算样式，这里只读取元素自身的 `style` 属性，
//! 识别 `display: none` 与 `visibility: hidden|collapse` 两种隐藏方式。

use cssparser::{Parser, ParserInput, Token};

/// 行内样式是否把元素隐藏
pub fn inline_style_hides(style: &str) -> bool {
    let mut input = ParserInput::new(style);
    let mut parser = Parser::new(&mut input);

    let mut property: Option<String> = None;
    let mut after_colon = false;

    while let Ok(token) = parser.next() {
        match token {
            Token::Ident(ident) => {
                if !after_colon {
                    property = Some(ident.to_ascii_lowercase());
                    continue;
                }

                let value = ident.to_ascii_lowercase();
                match property.as_deref() {
                    Some("display") if value == "none" => return true,
                    Some("visibility") if value == "hidden" || value == "collapse" => {
                        return true
                    }
                    _ => {}
                }
            }
            Token::Colon => after_colon = true,
            Token::Semicolon => {
                property = None;
                after_colon = false;
            }
            _ => {}
        }
    }

    false
}
