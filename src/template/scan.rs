//! Low-level text scanning over JSX-flavoured template source.
//!
//! All offsets are byte offsets. Only ASCII delimiters are inspected, so
//! offsets always land on UTF-8 character boundaries.

/// Byte offset just past the `>` closing the tag that opens at `start`.
///
/// Attribute values in quotes and `{...}` expressions are skipped, so arrow
/// functions such as `onClick={() => go()}` do not end the tag early.
pub fn tag_end(src: &str, start: usize) -> Option<usize> {
    let bytes = src.as_bytes();
    if bytes.get(start) != Some(&b'<') {
        return None;
    }
    let mut i = start + 1;
    while i < bytes.len() {
        match bytes[i] {
            b'"' | b'\'' => {
                let quote = bytes[i];
                i += 1;
                while i < bytes.len() && bytes[i] != quote {
                    i += 1;
                }
            }
            b'{' => {
                i = matching_brace(src, i)?;
            }
            b'>' => return Some(i + 1),
            _ => {}
        }
        i += 1;
    }
    None
}

/// Offset of the `}` matching the `{` at `open`, skipping string literals.
pub fn matching_brace(src: &str, open: usize) -> Option<usize> {
    let bytes = src.as_bytes();
    if bytes.get(open) != Some(&b'{') {
        return None;
    }
    let mut depth = 0usize;
    let mut i = open;
    while i < bytes.len() {
        match bytes[i] {
            b'"' | b'\'' | b'`' => {
                let quote = bytes[i];
                i += 1;
                while i < bytes.len() && bytes[i] != quote {
                    if bytes[i] == b'\\' {
                        i += 1;
                    }
                    i += 1;
                }
            }
            b'{' => depth += 1,
            b'}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(i);
                }
            }
            _ => {}
        }
        i += 1;
    }
    None
}

/// Range of the content between the opening tag ending at `content_start`
/// and the matching `</name>`, honouring nested elements of the same name.
pub fn element_content(src: &str, name: &str, content_start: usize) -> Option<(usize, usize)> {
    let open = format!("<{}", name);
    let close = format!("</{}>", name);
    let mut depth = 1usize;
    let mut i = content_start;
    loop {
        let next_close = src[i..].find(&close).map(|p| p + i)?;
        let next_open = src[i..]
            .match_indices(&open)
            .map(|(p, _)| p + i)
            .find(|&p| is_tag_boundary(src, p + open.len()));
        match next_open {
            Some(p) if p < next_close => {
                depth += 1;
                i = p + open.len();
            }
            _ => {
                depth -= 1;
                if depth == 0 {
                    return Some((content_start, next_close));
                }
                i = next_close + close.len();
            }
        }
    }
}

fn is_tag_boundary(src: &str, at: usize) -> bool {
    src[at..]
        .chars()
        .next()
        .map_or(true, |c| c.is_whitespace() || c == '>' || c == '/')
}

/// A visible text run located in a markup snippet
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextSpan {
    /// Byte range of the trimmed raw text, or of the whole `{...}`
    /// expression when the text comes from a string literal
    pub start: usize,
    pub end: usize,
    /// Text with whitespace collapsed
    pub text: String,
    pub literal: bool,
}

/// Visible text runs of a markup snippet, in document order.
///
/// Tags and `{...}` expressions act as separators and are dropped, except
/// that an expression holding only a string literal (`{'Total'}`) counts as
/// text.
pub fn text_spans(markup: &str) -> Vec<TextSpan> {
    let bytes = markup.as_bytes();
    let mut spans = Vec::new();
    let mut run_start = 0;
    let mut i = 0;

    while i < bytes.len() {
        match bytes[i] {
            b'<' => {
                push_run(markup, run_start, i, &mut spans);
                i = tag_end(markup, i).unwrap_or(bytes.len());
                run_start = i;
            }
            b'{' => {
                push_run(markup, run_start, i, &mut spans);
                let end = matching_brace(markup, i).unwrap_or(bytes.len());
                if let Some(literal) = string_literal(&markup[i + 1..end]) {
                    let text = collapse_whitespace(literal);
                    if !text.is_empty() {
                        spans.push(TextSpan {
                            start: i,
                            end: (end + 1).min(bytes.len()),
                            text,
                            literal: true,
                        });
                    }
                }
                i = (end + 1).min(bytes.len());
                run_start = i;
            }
            _ => i += 1,
        }
    }
    push_run(markup, run_start, bytes.len(), &mut spans);
    spans
}

/// Visible text fragments of a markup snippet, in document order
pub fn text_fragments(markup: &str) -> Vec<String> {
    text_spans(markup).into_iter().map(|span| span.text).collect()
}

fn push_run(markup: &str, start: usize, end: usize, spans: &mut Vec<TextSpan>) {
    if start >= end {
        return;
    }
    let raw = &markup[start..end];
    let text = collapse_whitespace(raw);
    if text.is_empty() {
        return;
    }
    let lead = raw.len() - raw.trim_start().len();
    spans.push(TextSpan {
        start: start + lead,
        end: start + raw.trim_end().len(),
        text,
        literal: false,
    });
}

fn string_literal(expr: &str) -> Option<&str> {
    let expr = expr.trim();
    let first = expr.chars().next()?;
    if !matches!(first, '\'' | '"' | '`') || expr.len() < 2 || !expr.ends_with(first) {
        return None;
    }
    let inner = &expr[1..expr.len() - 1];
    (!inner.contains(first)).then_some(inner)
}

pub fn collapse_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Remove backtick template literals so `${...}` interpolation is not
/// mistaken for currency.
pub fn strip_template_literals(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut in_literal = false;
    for c in s.chars() {
        if c == '`' {
            in_literal = !in_literal;
            continue;
        }
        if !in_literal {
            out.push(c);
        }
    }
    out
}

/// Offset of the start of the line containing `at`.
pub fn line_start(src: &str, at: usize) -> usize {
    src[..at].rfind('\n').map_or(0, |p| p + 1)
}

/// Leading whitespace of the line containing `at`.
pub fn indentation_at(src: &str, at: usize) -> &str {
    let start = line_start(src, at);
    let line = &src[start..];
    let width = line.len() - line.trim_start_matches([' ', '\t']).len();
    &line[..width]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tag_end_skips_arrow_functions() {
        let src = r#"<th onClick={() => sort('name')}>Nombre</th>"#;
        let end = tag_end(src, 0).unwrap();
        assert_eq!(&src[end..], "Nombre</th>");
    }

    #[test]
    fn test_tag_end_self_closing() {
        let src = r#"<input value={form.a} onChange={(e) => set(e.target.value)} />rest"#;
        let end = tag_end(src, 0).unwrap();
        assert_eq!(&src[end..], "rest");
    }

    #[test]
    fn test_matching_brace_ignores_braces_in_strings() {
        let src = "{ a: '}', b: { c: 1 } } tail";
        let close = matching_brace(src, 0).unwrap();
        assert_eq!(&src[close + 1..], " tail");
    }

    #[test]
    fn test_element_content_nested() {
        let src = "<div><div>inner</div>outer</div>after";
        let open_end = tag_end(src, 0).unwrap();
        let (start, end) = element_content(src, "div", open_end).unwrap();
        assert_eq!(&src[start..end], "<div>inner</div>outer");
    }

    #[test]
    fn test_text_fragments() {
        let markup = r#"<span onClick={() => toggle()}>⇅</span> Fecha de compra {sortIcon('date')}"#;
        assert_eq!(text_fragments(markup), vec!["⇅", "Fecha de compra"]);
        assert_eq!(text_fragments("{'Total'}"), vec!["Total"]);
    }

    #[test]
    fn test_text_spans_locate_visible_text() {
        let markup = "  Nombre {sortIcon('Nombre')} {'Total'}";
        let spans = text_spans(markup);
        assert_eq!(spans.len(), 2);
        assert_eq!(&markup[spans[0].start..spans[0].end], "Nombre");
        assert!(!spans[0].literal);
        assert_eq!(&markup[spans[1].start..spans[1].end], "{'Total'}");
        assert_eq!(spans[1].text, "Total");
        assert!(spans[1].literal);
    }

    #[test]
    fn test_strip_template_literals() {
        assert_eq!(strip_template_literals("a `x ${y}` b"), "a  b");
    }

    #[test]
    fn test_indentation_at() {
        let src = "line\n    <button type=\"submit\">";
        let at = src.find("<button").unwrap();
        assert_eq!(indentation_at(src, at), "    ");
        assert_eq!(line_start(src, at), 5);
    }
}
