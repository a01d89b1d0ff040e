pub mod constants;
pub mod html_text;
pub mod url_utils;

pub use constants::*;
pub use html_text::{element_text, visible_text, visible_text_of};
pub use url_utils::{is_valid_url, normalize_url, origin_of, parse_target_url, same_origin};
