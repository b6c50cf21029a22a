//! Layout fusion: heading splits and reading order driven by model regions,
//! plus the splicing primitives the equation and image stages share.

mod headings;
mod order;
pub mod splice;

pub use headings::split_heading_blocks;
pub use order::{sort_block_group, sort_blocks_in_reading_order};
pub use splice::{find_insert_block, insert_block, Anchor};
