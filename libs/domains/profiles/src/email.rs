//! Hand-rolled e-mail address syntax validation.
//!
//! Implements a grammar close to RFC 2822: dot-separated local-part
//! sections with double-quoted sections allowed, and a domain that is
//! either a hostname or a bracketed IP literal. Malformed input is never an
//! error; the answer is always a plain `bool`.

use regex::Regex;
use std::net::IpAddr;
use std::sync::LazyLock;

/// Symbols permitted anywhere in the local part, on top of ASCII
/// alphanumerics. Quotes, backslashes, and the restricted punctuation are
/// in this set; their placement rules are enforced per section.
const LOCAL_PART_SYMBOLS: &str = ".!#$%&'*+-/=?^_`{|}~\"(),:;<>@[\\] ";

/// Characters an unquoted local-part section may not contain.
const RESTRICTED_CHARS: [char; 10] = ['(', ',', ':', ';', '<', '>', '@', '[', ']', '\\'];

const MAX_ADDRESS_LEN: usize = 254;
const MAX_LOCAL_PART_LEN: usize = 64;
const MAX_DOMAIN_PART_LEN: usize = 253;

/// Dot-separated hostname labels: alphanumeric with internal hyphens, no
/// leading or trailing hyphen.
static HOSTNAME_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^(([a-zA-Z0-9]|[a-zA-Z0-9][a-zA-Z0-9-]*[a-zA-Z0-9])\.)*([a-zA-Z0-9]|[a-zA-Z0-9][a-zA-Z0-9-]*[a-zA-Z0-9])$",
    )
    .expect("hostname pattern is a valid regex")
});

/// Check whether an e-mail address is syntactically valid.
///
/// The split point is the *last* `@`: a local part may contain an unescaped
/// `@` only inside a quoted section.
pub fn is_valid(address: &str) -> bool {
    if address.is_empty() || address.len() > MAX_ADDRESS_LEN {
        return false;
    }

    let Some(at_index) = address.rfind('@') else {
        return false;
    };
    if at_index == 0 {
        return false;
    }

    let local_part = &address[..at_index];
    let domain_part = &address[at_index + 1..];
    if local_part.len() > MAX_LOCAL_PART_LEN || domain_part.len() > MAX_DOMAIN_PART_LEN {
        return false;
    }

    is_valid_local_part(local_part) && is_valid_domain_part(domain_part)
}

/// One dot-separated section of the local part.
struct Section<'a> {
    text: &'a str,
    quoted: bool,
}

fn is_valid_local_part(local_part: &str) -> bool {
    // Whole-part character set check comes first; it also guarantees the
    // byte-indexed section scan below only ever sees ASCII.
    if !local_part
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || LOCAL_PART_SYMBOLS.contains(c))
    {
        return false;
    }

    split_sections(local_part).iter().all(|section| {
        if section.text.is_empty() {
            // Consecutive or leading dots produce empty sections; tolerated.
            true
        } else if section.quoted {
            is_valid_quoted_section(section.text)
        } else {
            is_valid_unquoted_section(section.text)
        }
    })
}

/// Split the local part at dots, keeping quoted sections whole.
///
/// A quoted section starts with `"` at a section boundary and ends at the
/// next unescaped `"` that is followed by `.` or the end of the string. A
/// quote that never closes demotes the remainder to a single unquoted
/// section, which the restricted-character rules then reject.
fn split_sections(local_part: &str) -> Vec<Section<'_>> {
    let bytes = local_part.as_bytes();
    let mut sections = Vec::new();
    let mut cursor = 0;

    while cursor < bytes.len() {
        if bytes[cursor] == b'"' {
            match find_quoted_end(bytes, cursor) {
                Some(end) => {
                    sections.push(Section {
                        text: &local_part[cursor..=end],
                        quoted: true,
                    });
                    cursor = end + 2;
                }
                None => {
                    sections.push(Section {
                        text: &local_part[cursor..],
                        quoted: false,
                    });
                    break;
                }
            }
        } else {
            match local_part[cursor..].find('.') {
                Some(dot) => {
                    sections.push(Section {
                        text: &local_part[cursor..cursor + dot],
                        quoted: false,
                    });
                    cursor += dot + 1;
                }
                None => {
                    sections.push(Section {
                        text: &local_part[cursor..],
                        quoted: false,
                    });
                    break;
                }
            }
        }
    }

    sections
}

/// Find the closing quote of a quoted section opened at `start`.
///
/// The closer must be unescaped and followed by `.` or end-of-string; an
/// interior unescaped quote does not close the section.
fn find_quoted_end(bytes: &[u8], start: usize) -> Option<usize> {
    let mut i = start + 1;
    while i < bytes.len() {
        match bytes[i] {
            b'\\' => i += 2,
            b'"' if i + 1 == bytes.len() || bytes[i + 1] == b'.' => return Some(i),
            _ => i += 1,
        }
    }
    None
}

/// Validate the interior of a quoted section (delimiters included in
/// `section`): a backslash must escape another backslash or a quote, and
/// quotes may not appear unescaped.
fn is_valid_quoted_section(section: &str) -> bool {
    let interior = &section.as_bytes()[1..section.len() - 1];
    let mut i = 0;

    while i < interior.len() {
        match interior[i] {
            b'\\' => {
                if i + 1 >= interior.len() || !matches!(interior[i + 1], b'\\' | b'"') {
                    return false;
                }
                i += 2;
            }
            b'"' => return false,
            _ => i += 1,
        }
    }

    true
}

fn is_valid_unquoted_section(section: &str) -> bool {
    !section
        .chars()
        .any(|c| c.is_whitespace() || RESTRICTED_CHARS.contains(&c))
}

fn is_valid_domain_part(domain_part: &str) -> bool {
    if domain_part.is_empty() {
        return false;
    }

    if domain_part.starts_with('[') {
        return is_valid_ip_literal(domain_part);
    }

    HOSTNAME_REGEX.is_match(domain_part)
}

/// A bracketed IP literal: `[1.2.3.4]` or `[IPv6:...]`. The brackets must
/// pair and the text between them must parse as an IPv4 or IPv6 address.
fn is_valid_ip_literal(domain_part: &str) -> bool {
    if domain_part.len() < 3 || !domain_part.ends_with(']') {
        return false;
    }

    let literal = &domain_part[1..domain_part.len() - 1];
    let literal = literal.strip_prefix("IPv6:").unwrap_or(literal);
    literal.parse::<IpAddr>().is_ok()
}
