/// Trimmed body as a single value.
pub fn scalar(body: &str) -> String {
    body.trim().to_string()
}

/// Comma-separated items, each trimmed. Empty items are kept.
pub fn comma_list(body: &str) -> Vec<String> {
    body.split(',').map(|item| item.trim().to_string()).collect()
}

/// One item per line of the trimmed body. Lines keep their own spacing.
pub fn line_list(body: &str) -> Vec<String> {
    body.trim()
        .split('\n')
        .map(|line| line.strip_suffix('\r').unwrap_or(line).to_string())
        .collect()
}
