//! Path pattern checks.
//!
//! # Responsibilities
//! - Reject malformed patterns before they reach the matcher
//! - Reduce patterns to a shape key so collisions are detected up front
//! - Compute the trailing-slash twin used by strict-slash redirects
//!
//! # Design Decisions
//! - Capture names are irrelevant to matching: `/u/{id}` and `/u/{name}`
//!   have the same shape and therefore collide
//! - Only `{name}` and `{*name}` captures are accepted, each filling a
//!   whole segment

/// Why a pattern was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PatternIssue {
    MissingLeadingSlash,
    UnbalancedBraces,
    EmptyCapture,
    LegacyCaptureSyntax,
    CatchAllNotLast,
    CaptureNotWholeSegment,
}

impl PatternIssue {
    pub fn as_str(&self) -> &'static str {
        match self {
            PatternIssue::MissingLeadingSlash => "must start with '/'",
            PatternIssue::UnbalancedBraces => "unbalanced '{' '}'",
            PatternIssue::EmptyCapture => "capture segment has no name",
            PatternIssue::LegacyCaptureSyntax => "segments must not start with ':' or '*', use '{name}'",
            PatternIssue::CatchAllNotLast => "'{*name}' must be the last segment",
            PatternIssue::CaptureNotWholeSegment => "a capture must fill its whole segment",
        }
    }
}

impl std::fmt::Display for PatternIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Check that `pattern` is something the matcher accepts.
pub fn validate(pattern: &str) -> Result<(), PatternIssue> {
    if !pattern.starts_with('/') {
        return Err(PatternIssue::MissingLeadingSlash);
    }

    let segments: Vec<&str> = pattern[1..].split('/').collect();
    let last = segments.len() - 1;

    for (i, segment) in segments.iter().enumerate() {
        if segment.starts_with(':') || segment.starts_with('*') {
            return Err(PatternIssue::LegacyCaptureSyntax);
        }

        let opens = segment.matches('{').count();
        let closes = segment.matches('}').count();
        if opens != closes || opens > 1 {
            return Err(PatternIssue::UnbalancedBraces);
        }
        if opens == 0 {
            continue;
        }

        let (Some(start), Some(end)) = (segment.find('{'), segment.find('}')) else {
            return Err(PatternIssue::UnbalancedBraces);
        };
        if end < start {
            return Err(PatternIssue::UnbalancedBraces);
        }
        if start != 0 || end != segment.len() - 1 {
            return Err(PatternIssue::CaptureNotWholeSegment);
        }

        let capture = &segment[start + 1..end];
        let (catch_all, name) = match capture.strip_prefix('*') {
            Some(rest) => (true, rest),
            None => (false, capture),
        };
        if catch_all && i != last {
            return Err(PatternIssue::CatchAllNotLast);
        }
        if name.is_empty() {
            return Err(PatternIssue::EmptyCapture);
        }
    }

    Ok(())
}

/// Reduce a pattern to its matching shape.
///
/// `/users/{id}/posts` becomes `/users/{}/posts`.
pub fn shape(pattern: &str) -> String {
    let mut out = String::with_capacity(pattern.len());
    let mut in_capture = false;
    let mut catch_all = false;

    for c in pattern.chars() {
        match c {
            '{' => {
                in_capture = true;
                catch_all = false;
                out.push('{');
            }
            '}' if in_capture => {
                in_capture = false;
                if catch_all {
                    out.push('*');
                }
                out.push('}');
            }
            '*' if in_capture => catch_all = true,
            _ if in_capture => {}
            _ => out.push(c),
        }
    }

    out
}

/// Whether two patterns put different captures at the same position.
///
/// Captures differ when their names differ or when one is a catch-all and
/// the other is not. Only positions reachable by both patterns count: once
/// a static segment differs the patterns diverge and no longer interfere.
pub fn captures_disagree(a: &str, b: &str) -> bool {
    for (left, right) in a.split('/').zip(b.split('/')) {
        match (capture_name(left), capture_name(right)) {
            (Some(l), Some(r)) if l != r => return true,
            (Some(_), Some(_)) => {}
            _ if left != right => return false,
            _ => {}
        }
    }
    false
}

fn capture_name(segment: &str) -> Option<&str> {
    let start = segment.find('{')?;
    let end = segment.find('}')?;
    segment.get(start + 1..end)
}

/// The same pattern with its trailing slash toggled.
///
/// `None` for `/` and for catch-all patterns, which already match both forms.
pub fn slash_twin(pattern: &str) -> Option<String> {
    if pattern == "/" || pattern.contains("{*") {
        return None;
    }
    match pattern.strip_suffix('/') {
        Some(trimmed) => Some(trimmed.to_string()),
        None => Some(format!("{pattern}/")),
    }
}

/// Toggle the trailing slash of a concrete request path.
pub fn toggle_trailing_slash(path: &str) -> String {
    match path.strip_suffix('/') {
        Some("") => "/".to_string(),
        Some(trimmed) => trimmed.to_string(),
        None => format!("{path}/"),
    }
}
