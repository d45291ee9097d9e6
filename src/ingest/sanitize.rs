use super::mentions::MentionSet;

pub const SANITIZE_MAX_CHARS: usize = 65_000;
pub const SANITIZE_TRUNCATE_KEEP_CHARS: usize = 64_900;
pub const SANITIZE_TRUNCATION_SUFFIX: &str = "\n\n[Content truncated due to length]";
const MAX_PASSES: usize = 8;

/// Content sanitization collaborator. Implementations must be idempotent:
/// `sanitize(sanitize(x)) == sanitize(x)`.
pub trait Sanitizer {
    fn sanitize(&self, text: &str, allowed_mentions: &MentionSet) -> String;
}

/// Default sanitizer: drops control characters and ANSI escapes, removes HTML comments,
/// wraps @-mentions that are not allowed in backticks, and truncates long text.
/// `keep_chars` plus the truncation suffix must fit within `max_chars`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContentSanitizer {
    pub max_chars: usize,
    pub keep_chars: usize,
}

impl Default for ContentSanitizer {
    fn default() -> Self {
        Self::DEFAULT
    }
}

impl ContentSanitizer {
    pub const DEFAULT: ContentSanitizer = ContentSanitizer {
        max_chars: SANITIZE_MAX_CHARS,
        keep_chars: SANITIZE_TRUNCATE_KEEP_CHARS,
    };

    fn single_pass(text: &str, allowed_mentions: &MentionSet) -> String {
        let text = strip_control_characters(text);
        let text = strip_html_comments(&text);
        neutralize_mentions(&text, allowed_mentions)
    }

    fn truncate(&self, text: String) -> String {
        if text.chars().count() <= self.max_chars {
            return text;
        }
        let mut truncated = String::new();
        truncated.extend(text.chars().take(self.keep_chars));
        truncated.push_str(SANITIZE_TRUNCATION_SUFFIX);
        truncated
    }
}

impl Sanitizer for ContentSanitizer {
    fn sanitize(&self, text: &str, allowed_mentions: &MentionSet) -> String {
        let mut current = text.to_string();
        for _ in 0..MAX_PASSES {
            let next = Self::single_pass(&current, allowed_mentions);
            if next == current {
                break;
            }
            current = next;
        }
        self.truncate(current.trim().to_string())
    }
}

fn strip_control_characters(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars().peekable();
    while let Some(ch) = chars.next() {
        match ch {
            '\u{1b}' => {
                if chars.peek() == Some(&'[') {
                    chars.next();
                    for next in chars.by_ref() {
                        if ('\u{40}'..='\u{7e}').contains(&next) {
                            break;
                        }
                    }
                }
            }
            '\r' => {
                if chars.peek() != Some(&'\n') {
                    out.push('\n');
                }
            }
            '\n' | '\t' => out.push(ch),
            c if c.is_control() => {}
            c => out.push(c),
        }
    }
    out
}

/// Repeats until no opener is left: removing one comment can splice a new `<!--`
/// together. Every round drops at least one opener, so the loop ends.
fn strip_html_comments(text: &str) -> String {
    let mut current = strip_html_comments_once(text);
    while current.contains("<!--") {
        current = strip_html_comments_once(&current);
    }
    current
}

fn strip_html_comments_once(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut cursor = 0usize;
    while let Some(rel_start) = text[cursor..].find("<!--") {
        let start = cursor + rel_start;
        out.push_str(&text[cursor..start]);
        let body_start = start + "<!--".len();
        match text[body_start..].find("-->") {
            Some(rel_end) => cursor = body_start + rel_end + "-->".len(),
            None => cursor = body_start,
        }
    }
    out.push_str(&text[cursor..]);
    out
}

fn is_username_char(ch: char) -> bool {
    ch.is_ascii_alphanumeric() || ch == '-'
}

fn neutralize_mentions(text: &str, allowed_mentions: &MentionSet) -> String {
    let chars: Vec<char> = text.chars().collect();
    let mut out = String::with_capacity(text.len());
    let mut i = 0usize;
    while i < chars.len() {
        let ch = chars[i];
        let preceded_ok = i == 0 || {
            let prev = chars[i - 1];
            !(prev.is_alphanumeric() || prev == '`' || prev == '_' || prev == '/' || prev == '@')
        };
        if ch != '@' || !preceded_ok || !chars.get(i + 1).is_some_and(|c| c.is_ascii_alphanumeric())
        {
            out.push(ch);
            i += 1;
            continue;
        }

        let mut end = i + 1;
        while end < chars.len() && is_username_char(chars[end]) {
            end += 1;
        }
        if end < chars.len()
            && chars[end] == '/'
            && chars.get(end + 1).is_some_and(|c| c.is_ascii_alphanumeric())
        {
            end += 1;
            while end < chars.len()
                && (is_username_char(chars[end]) || chars[end] == '_' || chars[end] == '.')
            {
                end += 1;
            }
        }

        let handle: String = chars[i + 1..end].iter().collect();
        let mention: String = chars[i..end].iter().collect();
        if allowed_mentions.contains(&handle) {
            out.push_str(&mention);
        } else {
            out.push('`');
            out.push_str(&mention);
            out.push('`');
        }
        i = end;
    }
    out
}
