/// Mint `"{prefix}{n}"` for the next `n` after `counter` that `taken` rejects.
/// The counter only moves forward, so two calls never return the same id.
pub fn fresh_id(prefix: &str, counter: &mut u64, taken: impl Fn(&str) -> bool) -> String {
    loop {
        *counter += 1;
        let candidate = format!("{prefix}{counter}");
        if !taken(&candidate) {
            return candidate;
        }
    }
}

/// First name out of `"{base} (copy)"`, `"{base} (copy 2)"`, ... that is not taken.
pub fn copy_name(base: &str, taken: impl Fn(&str) -> bool) -> String {
    let first = format!("{base} (copy)");
    if !taken(&first) {
        return first;
    }
    (2..)
        .map(|n| format!("{base} (copy {n})"))
        .find(|candidate| !taken(candidate))
        .unwrap_or(first)
}
