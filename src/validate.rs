// Local input checks done before anything is sent to the server.

/// Usernames are 5-50 characters of ASCII letters, digits, `_` or `-`.
pub fn check_username(username: &str) -> bool {
    let len = username.chars().count();
    (5..=50).contains(&len)
        && username
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
}

/// Loose shape check: one `@`, something on both sides and a dotted domain.
pub fn check_email(email: &str) -> bool {
    if email.chars().any(char::is_whitespace) {
        return false;
    }
    match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && !domain.contains('@')
                && domain.contains('.')
                && !domain.starts_with('.')
                && !domain.ends_with('.')
        }
        None => false,
    }
}

/// Which password policy conditions a candidate meets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PasswordReport {
    /// 8 to 64 characters. Mandatory.
    pub length: bool,
    pub uppercase: bool,
    pub lowercase: bool,
    pub digit: bool,
    pub special: bool,
}

impl PasswordReport {
    pub fn of(password: &str) -> Self {
        let len = password.chars().count();
        PasswordReport {
            length: (8..=64).contains(&len),
            uppercase: password.chars().any(|c| c.is_uppercase()),
            lowercase: password.chars().any(|c| c.is_lowercase()),
            digit: password.chars().any(|c| c.is_ascii_digit()),
            special: password
                .chars()
                .any(|c| !c.is_alphanumeric() && !c.is_whitespace()),
        }
    }

    /// Number of optional character classes present.
    pub fn classes(&self) -> usize {
        [self.uppercase, self.lowercase, self.digit, self.special]
            .iter()
            .filter(|ok| **ok)
            .count()
    }

    pub fn is_acceptable(&self) -> bool {
        self.length && self.classes() >= 2
    }

    /// Checklist lines, `[x]` for met conditions.
    pub fn checklist(&self) -> Vec<String> {
        let mark = |ok: bool| if ok { "[x]" } else { "[ ]" };
        vec![
            format!("{} 8 to 64 characters (required)", mark(self.length)),
            format!("{} an uppercase letter", mark(self.uppercase)),
            format!("{} a lowercase letter", mark(self.lowercase)),
            format!("{} a number", mark(self.digit)),
            format!("{} a special character", mark(self.special)),
        ]
    }
}

pub fn check_password(password: &str) -> bool {
    PasswordReport::of(password).is_acceptable()
}

/// Heuristic used by `instance deploy` to tell repo links from local paths.
pub fn is_git_url(s: &str) -> bool {
    if s.contains("github.com") {
        return true;
    }
    (s.starts_with("https://") || s.starts_with("git@")) && s.ends_with(".git")
}
