/// Marker appended to text that was cut at the character budget
pub const TRUNCATION_MARKER: &str = "...";

/// Tidy rendered page text.
///
/// Lines are trimmed and inner whitespace collapsed. Runs of blank lines
/// become a single paragraph break, so the text keeps its structure
/// without the layout noise `innerText` carries.
pub fn tidy(text: &str) -> String {
    split_into_paragraphs(text)
        .iter()
        .map(|paragraph| {
            paragraph
                .iter()
                .map(|line| normalize_whitespace_in_segment(line))
                .collect::<Vec<_>>()
                .join("\n")
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// Keep at most `limit` characters, appending [`TRUNCATION_MARKER`] when
/// anything was dropped
pub fn truncate(text: &str, limit: usize) -> String {
    match text.char_indices().nth(limit) {
        Some((cut, _)) => format!("{}{}", &text[..cut], TRUNCATION_MARKER),
        None => text.to_string(),
    }
}

/// Splits text into paragraphs based on empty lines
pub fn split_into_paragraphs(text: &str) -> Vec<Vec<&str>> {
    let mut paragraphs: Vec<Vec<&str>> = Vec::new();
    let mut current_paragraph: Vec<&str> = Vec::new();

    for line in text.lines() {
        let trimmed = line.trim();

        if trimmed.is_empty() {
            // Found an empty line, which marks a paragraph boundary
            if !current_paragraph.is_empty() {
                paragraphs.push(std::mem::take(&mut current_paragraph));
            }
        } else {
            current_paragraph.push(trimmed);
        }
    }

    if !current_paragraph.is_empty() {
        paragraphs.push(current_paragraph);
    }

    paragraphs
}

/// Collapse all whitespace runs in a segment to single spaces
pub fn normalize_whitespace_in_segment(segment: &str) -> String {
    segment.split_whitespace().collect::<Vec<_>>().join(" ")
}
