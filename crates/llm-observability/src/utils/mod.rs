//! Utilities module - text shaping shared by search, the HTML views and the API

pub mod text_utils;

pub use text_utils::{TextUtils, DEFAULT_SNIPPET_LENGTH};
