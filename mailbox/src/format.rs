/// Renders `input` as an IMAP quoted string.
pub(crate) fn quote_astring(input: &str) -> String {
    let mut out = String::with_capacity(input.len() + 2);
    out.push('"');
    for ch in input.chars() {
        if matches!(ch, '"' | '\\') {
            out.push('\\');
        }
        out.push(ch);
    }
    out.push('"');
    out
}

/// Quoted strings cannot carry line breaks or NUL; such input would need a
/// literal, which this client never sends.
pub(crate) fn is_quotable(input: &str) -> bool {
    !input.contains(['\r', '\n', '\0'])
}
