//! HTML解析和处理模块
//!
//! - `node`: 以句柄寻址的 DOM 竞技场
//! - `dom`: 解析与基础DOM查询
//! - `serializer`: 序列化功能
//! - `utils`: 元素分类常量与文本工具

pub mod dom;
pub mod node;
pub mod serializer;
pub mod utils;

pub use dom::{find_nodes, get_child_node_by_name, get_document_lang, html_to_dom, parse_html};
pub use node::{Dom, NodeData, NodeId, Rect};
pub use serializer::{serialize_children, serialize_document, serialize_node};
pub use utils::{collapse_whitespace, is_inline_element, is_skip_element, WHITESPACES};
