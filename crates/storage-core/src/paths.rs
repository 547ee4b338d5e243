//! Logical-name hygiene applied before names reach a backend.

/// Normalizes a caller-supplied name into POSIX form.
///
/// Backslashes are unified to `/`, empty and `.` segments are dropped,
/// internal `..` segments collapse against their parent (leading `..` is
/// preserved on relative names), and a trailing separator survives
/// normalization. A name that reduces to nothing becomes the empty string.
pub fn clean_name(name: &str) -> String {
    let unified = name.replace('\\', "/");
    let absolute = unified.starts_with('/');
    let trailing = unified.ends_with('/') && !unified.is_empty();

    let mut stack: Vec<&str> = Vec::new();
    for segment in unified.split('/') {
        match segment {
            "" | "." => {}
            ".." => match stack.last() {
                Some(&top) if top != ".." => {
                    stack.pop();
                }
                // A rooted name cannot climb above the root.
                _ if absolute => {}
                _ => stack.push(".."),
            },
            other => stack.push(other),
        }
    }

    if stack.is_empty() {
        return if absolute { "/".to_string() } else { String::new() };
    }

    let mut cleaned = stack.join("/");
    if absolute {
        cleaned.insert(0, '/');
    }
    if trailing {
        cleaned.push('/');
    }
    cleaned
}

/// Final segment of a name, the part after the last `/`.
pub fn base_name(name: &str) -> &str {
    match name.rfind('/') {
        Some(idx) => &name[idx + 1..],
        None => name,
    }
}
