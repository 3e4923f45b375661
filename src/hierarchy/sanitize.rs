//! Normalization of imported topic names.

/// Line-break marker left behind by the spreadsheet export that feeds imports.
pub const EOL_MARKER: &str = "<EOL>";

/// Strip every [`EOL_MARKER`], trim, and collapse whitespace runs to one space.
pub fn sanitize(raw: &str) -> String {
    raw.replace(EOL_MARKER, "")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}
