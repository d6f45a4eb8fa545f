//! Extraction of the first fatal-error block from a TeX engine log.
//!
//! The rendering service returns the raw engine output when compilation
//! fails. TeX marks fatal errors with a line starting with `!` (or `*!` when
//! the error is raised while reading terminal input) and the context block is
//! closed by the next line that starts with `!`. Everything between the two
//! markers is the part a user wants to see; the rest is log noise.

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::debug;

static DIAGNOSTIC_BLOCK: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?ms)^\*?!(.*?)^!").expect("diagnostic block pattern is valid")
});

/// Return the trimmed interior of the first diagnostic block in `raw`, or
/// `raw` unchanged when the payload carries no complete block.
pub fn extract_diagnostic(raw: &str) -> String {
    if let Some(interior) = DIAGNOSTIC_BLOCK
        .captures(raw)
        .and_then(|captures| captures.get(1))
    {
        return interior.as_str().trim().to_string();
    }

    if has_unterminated_block(raw) {
        debug!(
            bytes = raw.len(),
            "diagnostic payload opens an error block without closing it; showing it verbatim"
        );
    }

    raw.to_string()
}

fn has_unterminated_block(raw: &str) -> bool {
    raw.lines()
        .any(|line| line.starts_with('!') || line.starts_with("*!"))
}
