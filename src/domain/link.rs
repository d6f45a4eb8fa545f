//! Bookmarkable links that encode the whole document in the URL path.
//!
//! The rendering service answers `GET /render/{source}` with the same image
//! a `POST /render` would produce, so a link carrying the source is enough to
//! share a preview. Browsers and gateways start rejecting URLs somewhere past
//! 2000 characters; past that bound no link is offered.

use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};
use url::Url;

/// Longest absolute URL, in characters, that is still offered as a link.
pub const MAX_LINK_LENGTH: usize = 2000;

const RENDER_PATH: &str = "/render/";

/// Characters left as-is by JavaScript's `encodeURIComponent`.
const URI_COMPONENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'~')
    .remove(b'*')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')');

#[derive(Debug, Clone)]
pub struct LinkBuilder {
    base: Url,
    max_length: usize,
}

impl LinkBuilder {
    pub fn new(base: Url, max_length: usize) -> Self {
        Self { base, max_length }
    }

    pub fn base(&self) -> &Url {
        &self.base
    }

    pub fn max_length(&self) -> usize {
        self.max_length
    }

    /// The link for `content`, regardless of its length.
    pub fn candidate(&self, content: &str) -> Result<Url, url::ParseError> {
        let encoded = utf8_percent_encode(content, URI_COMPONENT);
        self.base.join(&format!("{RENDER_PATH}{encoded}"))
    }

    /// The link for `content`, or `None` when it would exceed the length bound.
    pub fn build(&self, content: &str) -> Option<Url> {
        let url = self.candidate(content).ok()?;
        (url.as_str().len() <= self.max_length).then_some(url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn builder() -> LinkBuilder {
        let base = Url::parse("http://localhost:3000/").expect("valid base");
        LinkBuilder::new(base, MAX_LINK_LENGTH)
    }

    #[test]
    fn encodes_like_uri_component() {
        let link = builder().build("a b&c/é\\$").expect("short link");
        assert_eq!(
            link.as_str(),
            "http://localhost:3000/render/a%20b%26c%2F%C3%A9%5C%24"
        );

        let link = builder().build("(x)!*'~-_.").expect("short link");
        assert_eq!(link.as_str(), "http://localhost:3000/render/(x)!*'~-_.");
    }

    #[test]
    fn path_is_resolved_from_the_origin() {
        let base = Url::parse("https://tex.example/editor/index.html").expect("valid base");
        let link = LinkBuilder::new(base, MAX_LINK_LENGTH)
            .build("x")
            .expect("short link");
        assert_eq!(link.as_str(), "https://tex.example/render/x");
    }

    #[test]
    fn length_bound_is_inclusive() {
        // "http://localhost:3000/render/" is 29 characters long.
        let builder = builder();

        let link = builder.build(&"a".repeat(1970)).expect("1999 characters");
        assert_eq!(link.as_str().len(), 1999);

        let link = builder.build(&"a".repeat(1971)).expect("2000 characters");
        assert_eq!(link.as_str().len(), 2000);

        assert!(builder.build(&"a".repeat(1972)).is_none());
    }

    #[test]
    fn bound_applies_to_encoded_length() {
        // Each space expands to three characters once encoded.
        let builder = builder();
        assert!(builder.build(&" ".repeat(657)).is_some());
        assert!(builder.build(&" ".repeat(658)).is_none());
    }
}
