pub mod computed;
pub mod css_matcher;
pub mod owned_css;
pub mod stylesheet;
