//! HTML extraction modules
//!
//! Selector helpers plus the skill page extractor built on them.

mod css_extractor;
mod skill_page;

pub use css_extractor::*;
pub use skill_page::*;
