//! Alert extraction: strip the agency's email boilerplate and decide whether
//! what remains is safe to republish.
//!
//! Pure string/regex work, no I/O. The trailer phrases, the address heuristic
//! and the subject prefixes are data in [`AlertPatterns`] so they can change
//! without touching control flow.

use regex::Regex;

use crate::envelope::Email;

/// Phrases that begin the agency's standard footer.
pub const DEFAULT_TRAILERS: &[&str] = &[
    "See something suspicious?",
    "Plan your trip or find alternate service options.",
];

/// Loose match for an email address embedded in alert text.
pub const DEFAULT_ADDRESS_PATTERN: &str = r"\S+@\S+\.com";

/// Subject prefixes that don't carry information.
pub const DEFAULT_SUBJECT_PREFIXES: &[&str] =
    &["Reminder: ", "All Clear: ", "Resolved: ", "{{p_subject}}"];

/// Why an email was not turned into alert text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    /// The body does not end in a known trailer, or nothing precedes it.
    NotAlertShape,
    /// The text contains something that looks like an email address.
    ContainsAddress,
}

impl Rejection {
    pub fn label(&self) -> &'static str {
        match self {
            Self::NotAlertShape => "not_alert_shape",
            Self::ContainsAddress => "contains_address",
        }
    }
}

/// Configuration data for [`AlertExtractor`].
#[derive(Debug, Clone)]
pub struct AlertPatterns {
    /// Literal phrases; the alert is everything before the first one.
    pub trailers: Vec<String>,
    /// Regex for the privacy guard.
    pub address_pattern: String,
    /// Prefixes stripped (in order) from the subject before comparing it to the body.
    pub subject_prefixes: Vec<String>,
    /// Prepend the subject when the body doesn't already contain it.
    pub merge_subject: bool,
}

impl Default for AlertPatterns {
    fn default() -> Self {
        Self {
            trailers: DEFAULT_TRAILERS.iter().map(|s| s.to_string()).collect(),
            address_pattern: DEFAULT_ADDRESS_PATTERN.to_string(),
            subject_prefixes: DEFAULT_SUBJECT_PREFIXES
                .iter()
                .map(|s| s.to_string())
                .collect(),
            merge_subject: true,
        }
    }
}

impl AlertPatterns {
    /// Body-only variant: the subject line is ignored.
    pub fn without_subject() -> Self {
        Self {
            merge_subject: false,
            ..Self::default()
        }
    }
}

/// Compiled alert extractor.
#[derive(Debug, Clone)]
pub struct AlertExtractor {
    body_regex: Regex,
    address_regex: Regex,
    subject_prefixes: Vec<String>,
    merge_subject: bool,
}

impl AlertExtractor {
    /// Compile an extractor from pattern data.
    pub fn new(patterns: &AlertPatterns) -> Result<Self, regex::Error> {
        let trailers = patterns
            .trailers
            .iter()
            .map(|t| regex::escape(t))
            .collect::<Vec<_>>()
            .join("|");

        // Non-greedy capture from the start of the text up to the first
        // whitespace-preceded trailer; `(?s)` lets it span lines.
        let body_regex = Regex::new(&format!(r"(?s)\A(?P<body>.*?)\s+(?:{trailers})"))?;
        let address_regex = Regex::new(&patterns.address_pattern)?;

        Ok(Self {
            body_regex,
            address_regex,
            subject_prefixes: patterns.subject_prefixes.clone(),
            merge_subject: patterns.merge_subject,
        })
    }

    /// Strip the trailer from `body` and apply the privacy guard.
    pub fn extract_body(&self, body: &str) -> Result<String, Rejection> {
        let captured = self
            .body_regex
            .captures(body)
            .and_then(|caps| caps.name("body"))
            .ok_or(Rejection::NotAlertShape)?;

        let text = captured.as_str().trim();
        if text.is_empty() {
            return Err(Rejection::NotAlertShape);
        }
        if self.contains_address(text) {
            return Err(Rejection::ContainsAddress);
        }
        Ok(text.to_string())
    }

    /// Produce the text to publish for `email`.
    ///
    /// With subject merging on, the normalised subject is prepended unless the
    /// body already contains it.
    pub fn extract(&self, email: &Email) -> Result<String, Rejection> {
        let body = self.extract_body(&email.body)?;
        if !self.merge_subject {
            return Ok(body);
        }

        let subject = self.normalize_subject(&email.subject);
        if subject.is_empty() || body.contains(subject) {
            return Ok(body);
        }
        if self.contains_address(subject) {
            return Err(Rejection::ContainsAddress);
        }
        Ok(format!("{subject}\n\n{body}"))
    }

    /// Strip each configured prefix in turn.
    pub fn normalize_subject<'a>(&self, subject: &'a str) -> &'a str {
        let mut simple = subject.trim();
        for prefix in &self.subject_prefixes {
            if let Some(rest) = simple.strip_prefix(prefix.as_str()) {
                simple = rest.trim();
            }
        }
        simple
    }

    fn contains_address(&self, text: &str) -> bool {
        self.address_regex.is_match(text)
    }
}

impl Default for AlertExtractor {
    fn default() -> Self {
        Self::new(&AlertPatterns::default()).expect("default alert patterns are valid regexes")
    }
}
