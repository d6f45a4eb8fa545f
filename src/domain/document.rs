//! The document a fresh session starts from.

/// Sample shown on first launch, before anything has been persisted.
pub const DEFAULT_DOCUMENT: &str = concat!(
    "texflag renders \\textbf{text}, \\( e^{i \\pi} + 1 = 0 \\), and even pictures:\n",
    "\\begin{center}\\begin{tikzpicture} \\draw (0,0) circle (0.5); \\end{tikzpicture}\\end{center}\n",
);

/// Pick the initial document: the persisted text when there is any, the
/// built-in sample otherwise.
pub fn seed_document(persisted: Option<String>) -> String {
    match persisted {
        Some(content) if !content.is_empty() => content,
        _ => DEFAULT_DOCUMENT.to_string(),
    }
}
