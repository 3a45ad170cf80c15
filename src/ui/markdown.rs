//! Markdown subset for the preview pane: ATX headings, fenced code, bullet
//! lists, paragraphs, `code` and **bold** spans. All text is escaped.

pub(crate) fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            c => out.push(c),
        }
    }
    out
}

/// Wrap non-empty `delim`-enclosed spans of `text` in `tag`. Unmatched
/// delimiters stay literal.
fn wrap_spans(text: &str, delim: &str, tag: &str) -> String {
    let marker = delim.chars().next().unwrap_or('`');
    let mut out = String::with_capacity(text.len());
    let mut rest = text;

    while let Some(start) = rest.find(delim) {
        let after = &rest[start + delim.len()..];
        let inner = after
            .find(delim)
            .map(|end| &after[..end])
            .filter(|inner| !inner.is_empty() && !inner.contains(marker));
        match inner {
            Some(inner) => {
                out.push_str(&rest[..start]);
                out.push_str(&format!("<{tag}>{inner}</{tag}>"));
                rest = &after[inner.len() + delim.len()..];
            }
            None => {
                out.push_str(&rest[..start + marker.len_utf8()]);
                rest = &rest[start + marker.len_utf8()..];
            }
        }
    }
    out.push_str(rest);
    out
}

fn inline(text: &str) -> String {
    let code = wrap_spans(&escape(text), "`", "code");
    wrap_spans(&code, "**", "strong")
}

fn heading(line: &str) -> Option<(usize, &str)> {
    let level = line.chars().take_while(|&c| c == '#').count();
    let rest = &line[level..];
    if !(1..=6).contains(&level) || !rest.starts_with(char::is_whitespace) {
        return None;
    }
    Some((level, rest.trim_start()))
}

fn list_item(line: &str) -> Option<&str> {
    let trimmed = line.trim_start();
    let rest = trimmed
        .strip_prefix('-')
        .or_else(|| trimmed.strip_prefix('*'))?;
    rest.starts_with(char::is_whitespace).then(|| rest.trim_start())
}

fn flush_paragraph(out: &mut String, lines: &mut Vec<&str>) {
    if lines.is_empty() {
        return;
    }
    let body: Vec<String> = lines.iter().map(|line| inline(line)).collect();
    out.push_str(&format!("<p>{}</p>", body.join("<br>")));
    lines.clear();
}

fn close_list(out: &mut String, open: &mut bool) {
    if *open {
        out.push_str("</ul>");
        *open = false;
    }
}

fn push_code(out: &mut String, lines: &[&str]) {
    out.push_str(&format!("<pre>{}</pre>", escape(&lines.join("\n"))));
}

pub fn to_html(markdown: &str) -> String {
    let mut out = String::new();
    let mut fence: Option<Vec<&str>> = None;
    let mut list = false;
    let mut paragraph = Vec::new();

    for line in markdown.split('\n') {
        if let Some(code) = fence.as_mut() {
            if line.starts_with("```") {
                push_code(&mut out, code);
                fence = None;
            } else {
                code.push(line);
            }
            continue;
        }

        if line.starts_with("```") {
            flush_paragraph(&mut out, &mut paragraph);
            close_list(&mut out, &mut list);
            fence = Some(Vec::new());
        } else if let Some((level, text)) = heading(line) {
            flush_paragraph(&mut out, &mut paragraph);
            close_list(&mut out, &mut list);
            out.push_str(&format!("<h{level}>{}</h{level}>", inline(text)));
        } else if let Some(text) = list_item(line) {
            flush_paragraph(&mut out, &mut paragraph);
            if !list {
                out.push_str("<ul>");
                list = true;
            }
            out.push_str(&format!("<li>{}</li>", inline(text)));
        } else if line.trim().is_empty() {
            flush_paragraph(&mut out, &mut paragraph);
            close_list(&mut out, &mut list);
        } else {
            close_list(&mut out, &mut list);
            paragraph.push(line);
        }
    }

    // Still streaming: show the open fence as code.
    if let Some(code) = fence {
        push_code(&mut out, &code);
    }
    flush_paragraph(&mut out, &mut paragraph);
    close_list(&mut out, &mut list);
    out
}
