//! Document model: pages, blocks, lines and spans with their geometry.
//!
//! The tree is built once from extraction output, rewritten in place by the
//! fusion stages and handed to rendering. Blocks, lines and spans carry
//! process-unique handles so stages can refer to them across edits.

mod bbox;
mod block;
mod document;
mod page;
mod resource;

pub use bbox::{rescale, union_bbox, BBox, HasBBox};
pub use block::{Block, BlockId, BlockType, Line, LineId, Span, SpanId};
pub use document::Document;
pub use page::{Layout, LayoutRegion, Order, OrderBox, Page, RegionLabel, TextLines};
pub use resource::Resource;
