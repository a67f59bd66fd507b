//! Markdown code-fence stripping for provider output.

const FENCE: &str = "```";

/// Strip a leading and/or trailing triple-backtick fence
///
/// A leading fence line is dropped together with its language tag
/// (```` ```python ````). Content without fences is returned unchanged.
pub fn strip_code_fences(content: &str) -> String {
    let trimmed = content.trim();
    let opens = trimmed.starts_with(FENCE);
    let closes = trimmed.len() > FENCE.len() && trimmed.ends_with(FENCE);

    if !opens && !closes {
        return content.to_string();
    }

    let mut body = trimmed;

    if opens {
        body = match body.find('\n') {
            Some(newline) => &body[newline + 1..],
            // Single line: "```code```" or a lone fence
            None => &body[FENCE.len()..],
        };
    }

    if body.trim_end().ends_with(FENCE) {
        let end = body.trim_end();
        body = &end[..end.len() - FENCE.len()];
    }

    body.trim().to_string()
}
