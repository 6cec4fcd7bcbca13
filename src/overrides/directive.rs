//! Override directive parsing
//!
//! The override source is a YAML stream of documents, applied in file order:
//!
//! ```yaml
//! ---
//! account: genomics_core
//! owner: jdoe
//! ---
//! username: rroe
//! alist: [doe_j, genomics_core]
//! adef: genomics_core
//! mode: a        # a/append adds to the list, r/replace (default) replaces it
//! ---
//! username: auditor
//! alist: all     # every account known when this record is applied
//! ```
//!
//! Records missing required keys are skipped with a warning; only a stream
//! that is not valid YAML, or cannot be read, is an error.

use std::path::Path;

use serde::Deserialize;
use serde_yaml::Value;
use tracing::{info, warn};

use crate::error::OverrideError;

/// How a directive's `alist` combines with the existing list
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum MergeMode {
    #[default]
    Replace,
    Append,
}

impl MergeMode {
    /// Accepts `r`/`replace` and `a`/`append`, case-insensitively
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "r" | "replace" => Some(MergeMode::Replace),
            "a" | "append" => Some(MergeMode::Append),
            _ => None,
        }
    }
}

/// Creates (or rebinds) an account owned by an existing person
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccountDirective {
    pub account: String,
    pub owner: String,
}

/// Adjusts one subject's account list and default account
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubjectDirective {
    pub username: String,
    /// `None` leaves the subject's list untouched
    pub alist: Option<Vec<String>>,
    pub adef: Option<String>,
    pub mode: MergeMode,
    /// Mode value that was not recognised (the directive falls back to replace)
    pub unrecognized_mode: Option<String>,
}

impl SubjectDirective {
    pub fn new(username: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            alist: None,
            adef: None,
            mode: MergeMode::Replace,
            unrecognized_mode: None,
        }
    }

    pub fn with_alist<I, S>(mut self, alist: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.alist = Some(alist.into_iter().map(Into::into).collect());
        self
    }

    pub fn with_adef(mut self, adef: impl Into<String>) -> Self {
        self.adef = Some(adef.into());
        self
    }

    pub fn with_mode(mut self, mode: MergeMode) -> Self {
        self.mode = mode;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Directive {
    Account(AccountDirective),
    Subject(SubjectDirective),
}

/// A record that was skipped during parsing
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MalformedRecord {
    /// 1-based document number in the stream
    pub record: usize,
    pub reason: String,
}

/// Ordered override directives read from one source
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DirectiveSet {
    directives: Vec<Directive>,
    malformed: Vec<MalformedRecord>,
}

impl DirectiveSet {
    pub fn new(directives: Vec<Directive>) -> Self {
        Self {
            directives,
            malformed: Vec::new(),
        }
    }

    /// Read directives from a YAML file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, OverrideError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| OverrideError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let set = Self::parse(&content)?;
        info!(
            path = %path.display(),
            directives = set.len(),
            malformed = set.malformed.len(),
            "Loaded override directives"
        );
        Ok(set)
    }

    /// Parse a YAML document stream
    pub fn parse(source: &str) -> Result<Self, OverrideError> {
        let mut set = DirectiveSet::default();

        for (index, document) in serde_yaml::Deserializer::from_str(source).enumerate() {
            let value = Value::deserialize(document)?;
            match classify(&value) {
                Ok(Some(directive)) => set.directives.push(directive),
                Ok(None) => {}
                Err(reason) => {
                    warn!(record = index + 1, reason = %reason, "Skipping malformed override record");
                    set.malformed.push(MalformedRecord {
                        record: index + 1,
                        reason,
                    });
                }
            }
        }

        Ok(set)
    }

    pub fn directives(&self) -> &[Directive] {
        &self.directives
    }

    pub fn malformed(&self) -> &[MalformedRecord] {
        &self.malformed
    }

    pub fn len(&self) -> usize {
        self.directives.len()
    }

    pub fn is_empty(&self) -> bool {
        self.directives.is_empty()
    }

    pub fn account_directives(&self) -> impl Iterator<Item = &AccountDirective> {
        self.directives.iter().filter_map(|d| match d {
            Directive::Account(a) => Some(a),
            Directive::Subject(_) => None,
        })
    }

    pub fn subject_directives(&self) -> impl Iterator<Item = &SubjectDirective> {
        self.directives.iter().filter_map(|d| match d {
            Directive::Subject(s) => Some(s),
            Directive::Account(_) => None,
        })
    }

    /// Only the subject directives naming one of `usernames`, in order
    pub fn for_subjects(&self, usernames: &[String]) -> DirectiveSet {
        let directives = self
            .subject_directives()
            .filter(|s| usernames.contains(&s.username))
            .cloned()
            .map(Directive::Subject)
            .collect();
        DirectiveSet::new(directives)
    }
}

fn scalar(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn optional_scalar(value: &Value, key: &str) -> Result<Option<String>, String> {
    match value.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(v) => scalar(v)
            .map(Some)
            .ok_or_else(|| format!("'{}' must be a string", key)),
    }
}

fn classify(value: &Value) -> Result<Option<Directive>, String> {
    if value.is_null() {
        return Ok(None);
    }
    if !value.is_mapping() {
        return Err("record is not a mapping".to_string());
    }

    if let Some(account) = optional_scalar(value, "account")? {
        let owner = optional_scalar(value, "owner")?
            .ok_or_else(|| format!("account directive '{}' has no owner", account))?;
        return Ok(Some(Directive::Account(AccountDirective { account, owner })));
    }

    let Some(username) = optional_scalar(value, "username")? else {
        return Err("record has neither 'username' nor 'account'".to_string());
    };
    if username.is_empty() {
        return Err("'username' is empty".to_string());
    }

    // A single scalar stands for a one-element list.
    let alist = match value.get("alist") {
        None | Some(Value::Null) => None,
        Some(Value::Sequence(items)) => Some(
            items
                .iter()
                .map(scalar)
                .collect::<Option<Vec<_>>>()
                .ok_or_else(|| "'alist' entries must be strings".to_string())?,
        ),
        Some(other) => Some(vec![
            scalar(other).ok_or_else(|| "'alist' must be a string or list".to_string())?
        ]),
    };

    let adef = optional_scalar(value, "adef")?;

    let (mode, unrecognized_mode) = match optional_scalar(value, "mode")? {
        None => (MergeMode::Replace, None),
        Some(raw) => match MergeMode::parse(&raw) {
            Some(mode) => (mode, None),
            None => (MergeMode::Replace, Some(raw)),
        },
    };

    Ok(Some(Directive::Subject(SubjectDirective {
        username,
        alist,
        adef,
        mode,
        unrecognized_mode,
    })))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mode_spellings() {
        assert_eq!(MergeMode::parse("a"), Some(MergeMode::Append));
        assert_eq!(MergeMode::parse("Append"), Some(MergeMode::Append));
        assert_eq!(MergeMode::parse("r"), Some(MergeMode::Replace));
        assert_eq!(MergeMode::parse(" REPLACE "), Some(MergeMode::Replace));
        assert_eq!(MergeMode::parse("merge"), None);
    }

    #[test]
    fn test_parse_stream_in_order() {
        let source = r#"
---
account: genomics_core
owner: jdoe
---
username: rroe
alist: [doe_j, genomics_core]
adef: genomics_core
mode: a
---
username: auditor
alist: all
"#;
        let set = DirectiveSet::parse(source).unwrap();
        assert_eq!(set.len(), 3);
        assert!(set.malformed().is_empty());

        assert_eq!(
            set.directives()[0],
            Directive::Account(AccountDirective {
                account: "genomics_core".to_string(),
                owner: "jdoe".to_string(),
            })
        );
        assert_eq!(
            set.directives()[1],
            Directive::Subject(
                SubjectDirective::new("rroe")
                    .with_alist(["doe_j", "genomics_core"])
                    .with_adef("genomics_core")
                    .with_mode(MergeMode::Append)
            )
        );
        assert_eq!(
            set.directives()[2],
            Directive::Subject(SubjectDirective::new("auditor").with_alist(["all"]))
        );
    }

    #[test]
    fn test_malformed_records_are_skipped() {
        let source = r#"
---
alist: [x]
---
- just
- a list
---
account: orphan
---
username: ok
alist: [{nested: map}]
---
username: fine
"#;
        let set = DirectiveSet::parse(source).unwrap();
        assert_eq!(set.len(), 1);
        let records: Vec<usize> = set.malformed().iter().map(|m| m.record).collect();
        assert_eq!(records, vec![1, 2, 3, 4]);
    }

    #[test]
    fn test_unknown_mode_falls_back_to_replace() {
        let set = DirectiveSet::parse("username: u\nalist: [x]\nmode: merge\n").unwrap();
        let subject = set.subject_directives().next().cloned().unwrap();
        assert_eq!(subject.mode, MergeMode::Replace);
        assert_eq!(subject.unrecognized_mode.as_deref(), Some("merge"));
    }

    #[test]
    fn test_missing_alist_is_none() {
        let set = DirectiveSet::parse("username: u\nadef: doe_j\n").unwrap();
        let subject = set.subject_directives().next().cloned().unwrap();
        assert_eq!(subject.alist, None);
        assert_eq!(subject.adef.as_deref(), Some("doe_j"));
    }

    #[test]
    fn test_invalid_yaml_is_an_error() {
        assert!(DirectiveSet::parse("username: [unclosed\n").is_err());
    }

    #[test]
    fn test_for_subjects_filters() {
        let set = DirectiveSet::new(vec![
            Directive::Subject(SubjectDirective::new("a")),
            Directive::Account(AccountDirective {
                account: "x".to_string(),
                owner: "a".to_string(),
            }),
            Directive::Subject(SubjectDirective::new("b")),
        ]);
        let filtered = set.for_subjects(&["b".to_string()]);
        assert_eq!(filtered.len(), 1);
        assert_eq!(filtered.subject_directives().next().map(|s| s.username.as_str()), Some("b"));
    }
}
