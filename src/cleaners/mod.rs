//! Text-statistics cleaners: code detection, font styles and boilerplate removal.

mod code;
mod fontstyle;
mod headers;

pub use code::{identify_code_blocks, indent_blocks, reflow_code_text, FontStatistics};
pub use fontstyle::find_bold_italic;
pub use headers::{
    filter_common_titles, filter_header_footer, find_common_titles, normalize_title, remove_spans,
};
