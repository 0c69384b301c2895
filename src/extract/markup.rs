//! Minimal markup scanner that locates `<script>` elements.
//!
//! This is not a markup parser: it only understands enough of tags,
//! attributes, comments and raw-text elements to find where script code
//! starts and ends. All positions are character indices.

/// A `<script>` element found in the document
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptElement {
    /// Index of the `<` opening the start tag
    pub tag_start: usize,
    /// First character after the start tag's `>`
    pub content_start: usize,
    /// End of the code, before the closing tag and the blanks preceding it
    pub content_end: usize,
    /// `<![CDATA[` and `]]>` marker ranges inside the code (XML only)
    pub cdata_markers: Vec<(usize, usize)>,
    /// Value of the `type` attribute, if present
    pub type_attr: Option<String>,
}

const CDATA_START: &str = "<![CDATA[";
const CDATA_END: &str = "]]>";

struct Scanner<'a> {
    chars: &'a [char],
    xml: bool,
}

struct StartTag {
    name: String,
    type_attr: Option<String>,
    end: usize,
    self_closing: bool,
}

impl Scanner<'_> {
    fn starts_with(&self, at: usize, needle: &str) -> bool {
        let mut i = at;
        for n in needle.chars() {
            match self.chars.get(i) {
                Some(&c) if c == n => i += 1,
                _ => return false,
            }
        }
        true
    }

    fn starts_with_ignore_case(&self, at: usize, needle: &str) -> bool {
        let mut i = at;
        for n in needle.chars() {
            match self.chars.get(i) {
                Some(c) if c.eq_ignore_ascii_case(&n) => i += 1,
                _ => return false,
            }
        }
        true
    }

    /// Index just past the next occurrence of `needle`, or the end of input
    fn skip_past(&self, from: usize, needle: &str) -> usize {
        let len = needle.chars().count();
        (from..self.chars.len())
            .find(|&i| self.starts_with(i, needle))
            .map_or(self.chars.len(), |i| i + len)
    }

    fn names_match(&self, name: &str, expected: &str) -> bool {
        if self.xml {
            name == expected
        } else {
            name.eq_ignore_ascii_case(expected)
        }
    }

    /// Whether a `</name` closing tag starts at `at`
    fn is_close_tag_at(&self, at: usize, name: &str) -> bool {
        let needle = format!("</{name}");
        let matched = if self.xml {
            self.starts_with(at, &needle)
        } else {
            self.starts_with_ignore_case(at, &needle)
        };
        matched
            && self
                .chars
                .get(at + needle.chars().count())
                .map_or(true, |c| c.is_whitespace() || *c == '>' || *c == '/')
    }

    /// Start of the next `</name` closing tag from `from`
    fn find_close_tag(&self, from: usize, name: &str) -> Option<usize> {
        (from..self.chars.len()).find(|&i| self.chars[i] == '<' && self.is_close_tag_at(i, name))
    }

    /// Parse a start tag whose `<` is at `at`
    fn start_tag(&self, at: usize) -> Option<StartTag> {
        let chars = self.chars;
        let mut i = at + 1;
        if !chars.get(i)?.is_ascii_alphabetic() {
            return None;
        }

        let name_start = i;
        while chars
            .get(i)
            .is_some_and(|c| c.is_alphanumeric() || matches!(c, '-' | '_' | ':' | '.'))
        {
            i += 1;
        }
        let name: String = chars[name_start..i].iter().collect();

        let mut type_attr = None;
        loop {
            while chars.get(i).is_some_and(|c| c.is_whitespace()) {
                i += 1;
            }
            match chars.get(i) {
                None => {
                    return Some(StartTag {
                        name,
                        type_attr,
                        end: chars.len(),
                        self_closing: false,
                    })
                }
                Some('>') => {
                    return Some(StartTag {
                        name,
                        type_attr,
                        end: i + 1,
                        self_closing: false,
                    })
                }
                Some('/') if chars.get(i + 1) == Some(&'>') => {
                    return Some(StartTag {
                        name,
                        type_attr,
                        end: i + 2,
                        self_closing: true,
                    })
                }
                Some('/') => {
                    i += 1;
                    continue;
                }
                Some(_) => {}
            }

            let attr_start = i;
            while chars
                .get(i)
                .is_some_and(|c| !c.is_whitespace() && !matches!(c, '=' | '>' | '/'))
            {
                i += 1;
            }
            let attr_name: String = chars[attr_start..i].iter().collect();
            if attr_start == i {
                // stray '=' and the like
                i += 1;
                continue;
            }

            while chars.get(i).is_some_and(|c| c.is_whitespace()) {
                i += 1;
            }
            let mut value = None;
            if chars.get(i) == Some(&'=') {
                i += 1;
                while chars.get(i).is_some_and(|c| c.is_whitespace()) {
                    i += 1;
                }
                match chars.get(i) {
                    Some(&quote) if quote == '"' || quote == '\'' => {
                        let value_start = i + 1;
                        let value_end = (value_start..chars.len())
                            .find(|&j| chars[j] == quote)
                            .unwrap_or(chars.len());
                        value = Some(chars[value_start..value_end].iter().collect::<String>());
                        i = (value_end + 1).min(chars.len());
                    }
                    _ => {
                        let value_start = i;
                        while chars.get(i).is_some_and(|c| !c.is_whitespace() && *c != '>') {
                            i += 1;
                        }
                        value = Some(chars[value_start..i].iter().collect::<String>());
                    }
                }
            }

            if self.names_match(&attr_name, "type") && type_attr.is_none() {
                type_attr = Some(value.unwrap_or_default());
            }
        }
    }

    /// Scan the content of a script whose code starts at `content_start`
    ///
    /// Returns `(close_tag_start, cdata_markers)`.
    fn script_content(&self, content_start: usize) -> (usize, Vec<(usize, usize)>) {
        let mut markers = Vec::new();
        if !self.xml {
            let close = self
                .find_close_tag(content_start, "script")
                .unwrap_or(self.chars.len());
            return (close, markers);
        }

        let mut i = content_start;
        while i < self.chars.len() {
            if self.starts_with(i, CDATA_START) {
                let open_end = i + CDATA_START.len();
                markers.push((i, open_end));
                let close = (open_end..self.chars.len()).find(|&j| self.starts_with(j, CDATA_END));
                match close {
                    Some(j) => {
                        markers.push((j, j + CDATA_END.len()));
                        i = j + CDATA_END.len();
                    }
                    None => return (self.chars.len(), markers),
                }
                continue;
            }
            if self.chars[i] == '<' && self.is_close_tag_at(i, "script") {
                return (i, markers);
            }
            i += 1;
        }
        (self.chars.len(), markers)
    }
}

/// Find every `<script>` element of the document, in document order
#[must_use]
pub fn scan_scripts(chars: &[char], xml: bool) -> Vec<ScriptElement> {
    let scanner = Scanner { chars, xml };
    let mut scripts = Vec::new();
    let mut i = 0;

    while i < chars.len() {
        if chars[i] != '<' {
            i += 1;
            continue;
        }

        if scanner.starts_with(i, "<!--") {
            i = scanner.skip_past(i + 4, "-->");
            continue;
        }
        if scanner.starts_with(i, CDATA_START) {
            i = scanner.skip_past(i + CDATA_START.len(), CDATA_END);
            continue;
        }
        if scanner.starts_with(i, "<!") || scanner.starts_with(i, "<?") || scanner.starts_with(i, "</")
        {
            i = scanner.skip_past(i + 2, ">");
            continue;
        }

        let Some(tag) = scanner.start_tag(i) else {
            i += 1;
            continue;
        };

        if scanner.names_match(&tag.name, "script") {
            if xml && tag.self_closing {
                i = tag.end;
                continue;
            }

            let (close, cdata_markers) = scanner.script_content(tag.end);
            let mut content_end = close;
            while content_end > tag.end && matches!(chars[content_end - 1], ' ' | '\t') {
                content_end -= 1;
            }

            scripts.push(ScriptElement {
                tag_start: i,
                content_start: tag.end,
                content_end,
                cdata_markers,
                type_attr: tag.type_attr,
            });

            i = if close < chars.len() {
                scanner.skip_past(close, ">")
            } else {
                close
            };
            continue;
        }

        if !xml && tag.name.eq_ignore_ascii_case("style") && !tag.self_closing {
            let close = scanner
                .find_close_tag(tag.end, "style")
                .unwrap_or(chars.len());
            i = close;
            continue;
        }

        i = tag.end;
    }

    scripts
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scan(text: &str, xml: bool) -> Vec<ScriptElement> {
        let chars: Vec<char> = text.chars().collect();
        scan_scripts(&chars, xml)
    }

    fn code(text: &str, script: &ScriptElement) -> String {
        text.chars()
            .skip(script.content_start)
            .take(script.content_end - script.content_start)
            .collect()
    }

    #[test]
    fn test_finds_scripts_in_order() {
        let text = "<div><script>a()</script><p>x</p><SCRIPT type='text/babel'>b()  </SCRIPT></div>";
        let scripts = scan(text, false);
        assert_eq!(scripts.len(), 2);
        assert_eq!(code(text, &scripts[0]), "a()");
        assert_eq!(code(text, &scripts[1]), "b()");
        assert_eq!(scripts[1].type_attr.as_deref(), Some("text/babel"));
    }

    #[test]
    fn test_ignores_commented_and_quoted_scripts() {
        let text = r#"<!-- <script>no()</script> --><a title="<script>">x</a><script>yes()</script>"#;
        let scripts = scan(text, false);
        assert_eq!(scripts.len(), 1);
        assert_eq!(code(text, &scripts[0]), "yes()");
    }

    #[test]
    fn test_raw_text_content() {
        let text = "<script>if (a < b && '</p>') {}</script><style>a::before{content:'<script>'}</style>";
        let scripts = scan(text, false);
        assert_eq!(scripts.len(), 1);
        assert_eq!(code(text, &scripts[0]), "if (a < b && '</p>') {}");
    }

    #[test]
    fn test_unterminated_script_runs_to_end() {
        let text = "<script>\nfoo();\n";
        let scripts = scan(text, false);
        assert_eq!(scripts[0].content_end, text.chars().count());
    }

    #[test]
    fn test_xml_cdata_markers() {
        let text = "<x><script><![CDATA[a < b;]]></script><script/></x>";
        let scripts = scan(text, true);
        assert_eq!(scripts.len(), 1);
        assert_eq!(scripts[0].cdata_markers, vec![(11, 20), (26, 29)]);
    }

    #[test]
    fn test_xml_is_case_sensitive() {
        let text = "<SCRIPT>a()</SCRIPT><script>b()</script>";
        let scripts = scan(text, true);
        assert_eq!(scripts.len(), 1);
        assert_eq!(code(text, &scripts[0]), "b()");
    }
}
