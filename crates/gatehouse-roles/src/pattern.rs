//! Placeholder patterns and distinguished-name helpers.
//!
//! Filters and DN patterns use positional `{N}` placeholders
//! (`(uniqueMember={0})`, `uid={0},ou=users`). A [`Pattern`] can fill them
//! in, and can pull the `{0}` value back out of a string built from it.

/// A template with positional `{N}` placeholders.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pattern {
    template: String,
}

impl Pattern {
    /// Wrap a template.
    pub fn new(template: impl Into<String>) -> Self {
        Self {
            template: template.into(),
        }
    }

    /// The raw template.
    pub fn template(&self) -> &str {
        &self.template
    }

    /// Check if the template references placeholder `{index}`.
    pub fn has_placeholder(&self, index: usize) -> bool {
        self.template.contains(&format!("{{{}}}", index))
    }

    /// Substitute positional arguments.
    ///
    /// Placeholders without a matching argument are left untouched.
    /// Substituted text is never scanned for placeholders again.
    ///
    /// # Examples
    ///
    /// ```
    /// use gatehouse_roles::Pattern;
    ///
    /// let filter = Pattern::new("(|(member={0})(memberUid={1}))");
    /// assert_eq!(filter.format(&["*", "*"]), "(|(member=*)(memberUid=*))");
    /// ```
    pub fn format<S: AsRef<str>>(&self, args: &[S]) -> String {
        let mut formatted = String::with_capacity(self.template.len());
        let mut rest = self.template.as_str();

        while let Some(open) = rest.find('{') {
            formatted.push_str(&rest[..open]);
            let after = &rest[open + 1..];
            let arg = after.find('}').and_then(|close| {
                let digits = &after[..close];
                if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
                    return None;
                }
                let arg = digits.parse::<usize>().ok().and_then(|index| args.get(index))?;
                Some((close, arg))
            });
            match arg {
                Some((close, arg)) => {
                    formatted.push_str(arg.as_ref());
                    rest = &after[close + 1..];
                }
                None => {
                    formatted.push('{');
                    rest = after;
                }
            }
        }
        formatted.push_str(rest);
        formatted
    }

    /// Extract the `{0}` value from a string built from this pattern.
    ///
    /// The literal text before `{0}` must prefix `value` (ASCII
    /// case-insensitively). The captured value ends at the first occurrence
    /// of the literal text following `{0}`; anything after that is ignored,
    /// so a full DN parses against a pattern relative to the root DN.
    ///
    /// # Returns
    ///
    /// `None` if `value` does not match the pattern or the capture is empty
    ///
    /// # Examples
    ///
    /// ```
    /// use gatehouse_roles::Pattern;
    ///
    /// let pattern = Pattern::new("uid={0},ou=users");
    /// assert_eq!(
    ///     pattern.parse_first("uid=alice,ou=users,dc=example,dc=com"),
    ///     Some("alice".to_string())
    /// );
    /// assert_eq!(pattern.parse_first("cn=alice,ou=people"), None);
    /// ```
    pub fn parse_first(&self, value: &str) -> Option<String> {
        let start = self.template.find("{0}")?;
        let prefix = &self.template[..start];
        let rest = &self.template[start + 3..];
        // Literal text up to the next placeholder, if any.
        let suffix = match rest.find('{') {
            Some(index) => &rest[..index],
            None => rest,
        };

        if value.len() < prefix.len()
            || !value.is_char_boundary(prefix.len())
            || !value[..prefix.len()].eq_ignore_ascii_case(prefix)
        {
            return None;
        }
        let remainder = &value[prefix.len()..];

        let captured = if suffix.is_empty() {
            remainder
        } else {
            let end = find_ignore_ascii_case(remainder, suffix)?;
            &remainder[..end]
        };

        if captured.is_empty() {
            None
        } else {
            Some(captured.to_string())
        }
    }
}

fn find_ignore_ascii_case(haystack: &str, needle: &str) -> Option<usize> {
    let haystack_lower = haystack.to_ascii_lowercase();
    let needle_lower = needle.to_ascii_lowercase();
    haystack_lower.find(&needle_lower)
}

/// Escape a value for use inside a DN attribute value (RFC 4514).
///
/// # Examples
///
/// ```
/// use gatehouse_roles::pattern::escape_dn_value;
///
/// assert_eq!(escape_dn_value("smith, john"), "smith\\, john");
/// assert_eq!(escape_dn_value("#admin "), "\\#admin\\ ");
/// ```
pub fn escape_dn_value(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    let last = value.chars().count().saturating_sub(1);

    for (index, c) in value.chars().enumerate() {
        let needs_escape = match c {
            ',' | '+' | '"' | '\\' | '<' | '>' | ';' | '=' => true,
            '#' => index == 0,
            ' ' => index == 0 || index == last,
            _ => false,
        };
        if needs_escape {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

/// Reverse [`escape_dn_value`], including `\XX` hex escapes.
pub fn unescape_dn_value(value: &str) -> String {
    let mut bytes = Vec::with_capacity(value.len());
    let raw = value.as_bytes();
    let mut index = 0;

    while index < raw.len() {
        if raw[index] == b'\\' && index + 1 < raw.len() {
            let hex = raw
                .get(index + 1..index + 3)
                .filter(|pair| pair.iter().all(u8::is_ascii_hexdigit))
                .and_then(|pair| std::str::from_utf8(pair).ok())
                .and_then(|pair| u8::from_str_radix(pair, 16).ok());
            match hex {
                Some(byte) => {
                    bytes.push(byte);
                    index += 3;
                }
                None => {
                    bytes.push(raw[index + 1]);
                    index += 2;
                }
            }
        } else {
            bytes.push(raw[index]);
            index += 1;
        }
    }
    String::from_utf8_lossy(&bytes).into_owned()
}

/// Split a DN into its RDN components on unescaped commas.
pub fn split_rdns(dn: &str) -> Vec<&str> {
    let mut components = Vec::new();
    let mut start = 0;
    let mut escaped = false;

    for (index, c) in dn.char_indices() {
        match c {
            _ if escaped => escaped = false,
            '\\' => escaped = true,
            ',' => {
                components.push(dn[start..index].trim());
                start = index + 1;
            }
            _ => {}
        }
    }
    components.push(dn[start..].trim());
    components
}

fn is_valid_dn(dn: &str) -> bool {
    split_rdns(dn).iter().all(|rdn| match rdn.find('=') {
        Some(index) => !rdn[..index].trim().is_empty(),
        None => false,
    })
}

/// Append the root DN to a DN relative to it.
///
/// # Returns
///
/// `None` if either DN is malformed (a component without an attribute
/// type) or the relative DN is empty
///
/// # Examples
///
/// ```
/// use gatehouse_roles::pattern::assemble_full_dn;
///
/// assert_eq!(
///     assemble_full_dn("dc=example,dc=com", "uid=alice,ou=users"),
///     Some("uid=alice,ou=users,dc=example,dc=com".to_string())
/// );
/// assert_eq!(assemble_full_dn("dc=example,dc=com", "alice"), None);
/// ```
pub fn assemble_full_dn(root_dn: &str, relative_dn: &str) -> Option<String> {
    let relative_dn = relative_dn.trim();
    let root_dn = root_dn.trim();

    if relative_dn.is_empty() || !is_valid_dn(relative_dn) {
        return None;
    }
    if root_dn.is_empty() {
        return Some(relative_dn.to_string());
    }
    if !is_valid_dn(root_dn) {
        return None;
    }
    Some(format!("{},{}", relative_dn, root_dn))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_positional() {
        let pattern = Pattern::new("(&(member={0})(uid={1}))");
        assert_eq!(
            pattern.format(&["uid=a,dc=x", "a"]),
            "(&(member=uid=a,dc=x)(uid=a))"
        );
        assert!(pattern.has_placeholder(1));
        assert!(!pattern.has_placeholder(2));
    }

    #[test]
    fn test_format_repeated_placeholder() {
        let pattern = Pattern::new("(|(member={0})(owner={0}))");
        assert_eq!(pattern.format(&["*"]), "(|(member=*)(owner=*))");
    }

    #[test]
    fn test_format_does_not_rescan_arguments() {
        let pattern = Pattern::new("({0})({1})");
        assert_eq!(pattern.format(&["{1}", "x"]), "({1})(x)");
        assert_eq!(pattern.format(&["{0}"]), "({0})({1})");
    }

    #[test]
    fn test_format_leaves_unknown_placeholders() {
        assert_eq!(Pattern::new("{a}{+0}{}{0").format(&["x"]), "{a}{+0}{}{0");
        assert_eq!(Pattern::new("{{0}}").format(&["x"]), "{x}");
    }

    #[test]
    fn test_parse_first_exact() {
        let pattern = Pattern::new("uid={0},ou=users");
        assert_eq!(pattern.parse_first("uid=bob,ou=users"), Some("bob".to_string()));
        assert_eq!(pattern.parse_first("UID=bob,OU=Users"), Some("bob".to_string()));
    }

    #[test]
    fn test_parse_first_rejects_mismatches() {
        let pattern = Pattern::new("uid={0},ou=users");
        assert_eq!(pattern.parse_first("cn=bob,ou=users"), None);
        assert_eq!(pattern.parse_first("uid=bob,ou=people"), None);
        assert_eq!(pattern.parse_first("uid=,ou=users"), None);
        assert_eq!(pattern.parse_first("uid"), None);
        assert_eq!(Pattern::new("ou=users").parse_first("ou=users"), None);
    }

    #[test]
    fn test_parse_first_trailing_placeholder() {
        let pattern = Pattern::new("uid={0}");
        assert_eq!(pattern.parse_first("uid=carol"), Some("carol".to_string()));
    }

    #[test]
    fn test_escape_round_trip() {
        for raw in ["plain", "smith, john", "#tag", " padded ", "a+b=c;d<e>\"f\\"] {
            assert_eq!(unescape_dn_value(&escape_dn_value(raw)), raw);
        }
    }

    #[test]
    fn test_unescape_hex() {
        assert_eq!(unescape_dn_value("smith\\2c john"), "smith, john");
        assert_eq!(unescape_dn_value("caf\\c3\\a9"), "café");
    }

    #[test]
    fn test_split_rdns_respects_escapes() {
        assert_eq!(
            split_rdns("uid=smith\\, john,ou=users"),
            vec!["uid=smith\\, john", "ou=users"]
        );
    }

    #[test]
    fn test_assemble_full_dn() {
        assert_eq!(
            assemble_full_dn("", "uid=alice,ou=users"),
            Some("uid=alice,ou=users".to_string())
        );
        assert_eq!(assemble_full_dn("dc=example", ""), None);
        assert_eq!(assemble_full_dn("dc=example", "uid=a,,ou=users"), None);
        assert_eq!(assemble_full_dn("example.com", "uid=a"), None);
    }
}
