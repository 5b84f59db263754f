//! Glob matching with captures
//!
//! `glob::Pattern` answers *whether* a path matches; flows also need to know
//! *what* each wildcard matched so the fragments can be spliced into the
//! target pattern. The capture matcher below handles the subset flows use
//! (`**` as a full segment, `*` and `?` within segments); anything fancier
//! still gets correct boolean behavior via `glob::Pattern` and simply
//! captures nothing.

/// Match a path against a pattern, returning what each wildcard consumed
///
/// Captures are ordered by wildcard position: a `**` contributes the joined
/// segments it swallowed (possibly empty), each `*` its substring.
pub fn match_with_captures(pattern: &str, path: &str) -> Option<Vec<String>> {
    let pattern_segments: Vec<&str> = pattern.split('/').collect();
    let path_segments: Vec<&str> = path.split('/').collect();
    let mut captures = Vec::new();
    if match_segments(&pattern_segments, &path_segments, &mut captures) {
        Some(captures)
    } else {
        // fall back to boolean glob matching for syntax the capture matcher
        // doesn't model (char classes etc.)
        let matched = glob::Pattern::new(pattern)
            .map(|p| p.matches(path))
            .unwrap_or(false);
        matched.then(Vec::new)
    }
}

fn match_segments(pattern: &[&str], path: &[&str], captures: &mut Vec<String>) -> bool {
    match pattern.split_first() {
        None => path.is_empty(),
        Some((&"**", rest)) => {
            // shortest match first keeps captures predictable
            for take in 0..=path.len() {
                let mark = captures.len();
                captures.push(path[..take].join("/"));
                if match_segments(rest, &path[take..], captures) {
                    return true;
                }
                captures.truncate(mark);
            }
            false
        }
        Some((segment, rest)) => {
            let Some((first, path_rest)) = path.split_first() else {
                return false;
            };
            let mark = captures.len();
            if match_one_segment(segment, first, captures)
                && match_segments(rest, path_rest, captures)
            {
                true
            } else {
                captures.truncate(mark);
                false
            }
        }
    }
}

/// Match a single path segment against a single pattern segment, capturing
/// each `*`
fn match_one_segment(pattern: &str, segment: &str, captures: &mut Vec<String>) -> bool {
    fn inner(
        pattern: &[char],
        segment: &[char],
        captures: &mut Vec<String>,
    ) -> bool {
        match pattern.split_first() {
            None => segment.is_empty(),
            Some(('*', rest)) => {
                // longest match first: `*` in `*.md` should swallow the stem
                for take in (0..=segment.len()).rev() {
                    let mark = captures.len();
                    captures.push(segment[..take].iter().collect());
                    if inner(rest, &segment[take..], captures) {
                        return true;
                    }
                    captures.truncate(mark);
                }
                false
            }
            Some(('?', rest)) => match segment.split_first() {
                Some((_, segment_rest)) => inner(rest, segment_rest, captures),
                None => false,
            },
            Some((ch, rest)) => match segment.split_first() {
                Some((first, segment_rest)) if first == ch => inner(rest, segment_rest, captures),
                _ => false,
            },
        }
    }
    let pattern: Vec<char> = pattern.chars().collect();
    let segment: Vec<char> = segment.chars().collect();
    inner(&pattern, &segment, captures)
}

/// Splice captures into a target pattern, wildcard by wildcard
///
/// The nth wildcard in the target consumes the nth capture; a `**` whose
/// capture is empty collapses (no empty path segment is emitted). Wildcards
/// past the available captures substitute as empty.
pub fn splice_captures(target_pattern: &str, captures: &[String]) -> String {
    let mut next = 0usize;
    let mut out_segments: Vec<String> = Vec::new();
    for segment in target_pattern.split('/') {
        if segment == "**" {
            let capture = captures.get(next).cloned().unwrap_or_default();
            next += 1;
            if !capture.is_empty() {
                out_segments.push(capture);
            }
            continue;
        }
        let mut rendered = String::new();
        for ch in segment.chars() {
            if ch == '*' {
                rendered.push_str(captures.get(next).map(String::as_str).unwrap_or(""));
                next += 1;
            } else {
                rendered.push(ch);
            }
        }
        out_segments.push(rendered);
    }
    out_segments.join("/")
}

/// Whether a pattern has any wildcards at all
pub fn has_wildcards(pattern: &str) -> bool {
    pattern.contains('*') || pattern.contains('?')
}
