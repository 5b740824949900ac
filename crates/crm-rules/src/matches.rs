/// Capture groups from matching a resource id against a pattern.
///
/// Used to expand `%0`..`%9` back-references in rule values and score
/// attribute names.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RegexMatch {
    groups: Vec<Option<String>>,
}

impl RegexMatch {
    pub fn from_captures(captures: &regex::Captures<'_>) -> Self {
        Self {
            groups: captures
                .iter()
                .map(|g| g.map(|m| m.as_str().to_string()))
                .collect(),
        }
    }

    pub fn group(&self, n: usize) -> Option<&str> {
        self.groups.get(n).and_then(|g| g.as_deref())
    }

    /// Replace `%N` with capture group N. Groups that did not participate
    /// expand to nothing; out-of-range references are left untouched.
    pub fn expand(&self, template: &str) -> String {
        let mut out = String::with_capacity(template.len());
        let mut chars = template.chars().peekable();
        while let Some(c) = chars.next() {
            if c == '%' {
                if let Some(n) = chars.peek().and_then(|d| d.to_digit(10)) {
                    let n = n as usize;
                    if n < self.groups.len() {
                        chars.next();
                        out.push_str(self.group(n).unwrap_or_default());
                        continue;
                    }
                }
            }
            out.push(c);
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use regex::Regex;

    #[test]
    fn expands_back_references() {
        let re = Regex::new("^ip-(.*)-(\\d+)$").unwrap();
        let caps = re.captures("ip-web-3").unwrap();
        let m = RegexMatch::from_captures(&caps);
        assert_eq!(m.expand("weight-%1"), "weight-web");
        assert_eq!(m.expand("%0/%2"), "ip-web-3/3");
        assert_eq!(m.expand("%7 and 100%"), "%7 and 100%");
    }

    #[test]
    fn unmatched_optional_group_expands_to_nothing() {
        let re = Regex::new("^db(-(primary))?$").unwrap();
        let caps = re.captures("db").unwrap();
        let m = RegexMatch::from_captures(&caps);
        assert_eq!(m.expand("x%2y"), "xy");
    }
}
