//! # 解析器模块
//!
//! - `html` - HTML文档解析、DOM竞技场、序列化
//! - `css` - 行内样式可见性判断

pub mod css;
pub mod html;

pub use css::inline_style_hides;
pub use html::{html_to_dom, parse_html, serialize_document, Dom, NodeData, NodeId, Rect};
