/// Removes the leading whitespace shared by every non-blank line.
///
/// Lines holding only whitespace do not count towards the margin and come
/// out empty. Tabs and spaces are compared literally, so a tab never matches
/// a run of spaces.
#[must_use]
pub fn dedent(source: &str) -> String {
    let normalized = source.replace("\r\n", "\n");

    let mut margin: Option<&str> = None;
    for line in normalized.lines() {
        if is_blank(line) {
            continue;
        }
        let indent = leading_whitespace(line);
        margin = Some(match margin {
            None => indent,
            Some(current) => common_prefix(current, indent),
        });
    }
    let margin = margin.unwrap_or("");

    let mut out = String::with_capacity(normalized.len());
    for (idx, line) in normalized.split('\n').enumerate() {
        if idx > 0 {
            out.push('\n');
        }
        if is_blank(line) {
            continue;
        }
        out.push_str(line.strip_prefix(margin).unwrap_or(line));
    }
    out
}

fn is_blank(line: &str) -> bool {
    line.chars().all(|ch| matches!(ch, ' ' | '\t' | '\r'))
}

fn leading_whitespace(line: &str) -> &str {
    let rest = line.trim_start_matches([' ', '\t']);
    &line[..line.len() - rest.len()]
}

// Both inputs are ASCII whitespace, so byte offsets are char boundaries.
fn common_prefix<'a>(a: &'a str, b: &str) -> &'a str {
    let len = a
        .bytes()
        .zip(b.bytes())
        .take_while(|(x, y)| x == y)
        .count();
    &a[..len]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_uniform_indent() {
        assert_eq!(dedent("    a = 1\n    print(a)\n"), "a = 1\nprint(a)\n");
    }

    #[test]
    fn keeps_relative_indent() {
        assert_eq!(
            dedent("  for i in x:\n      print(i)"),
            "for i in x:\n    print(i)"
        );
    }

    #[test]
    fn blank_lines_do_not_limit_margin() {
        assert_eq!(dedent("    a\n\n  \n    b"), "a\n\n\nb");
    }

    #[test]
    fn mixed_tabs_and_spaces_share_no_margin() {
        assert_eq!(dedent("\ta\n    b"), "\ta\n    b");
    }

    #[test]
    fn unindented_source_is_unchanged() {
        let src = "print('hi')\nif x:\n    y()\n";
        assert_eq!(dedent(src), src);
    }

    #[test]
    fn crlf_is_normalized() {
        assert_eq!(dedent("  a\r\n  b\r\n"), "a\nb\n");
    }
}
