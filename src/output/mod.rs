//! Output records and renderers
//!
//! Rendering is a pure function of the records: same records, same bytes.

pub mod identity;
pub mod records;
pub mod slurm;

use serde::Serialize;

use crate::error::RenderError;

pub use records::{
    identity_records, AccountRecord, HierarchyRecords, IdentityRecord, MemberRecord,
};

/// Pretty JSON with a trailing newline
pub fn to_json<T: Serialize + ?Sized>(value: &T) -> Result<String, RenderError> {
    let mut text = serde_json::to_string_pretty(value)?;
    text.push('\n');
    Ok(text)
}

pub fn to_yaml<T: Serialize + ?Sized>(value: &T) -> Result<String, RenderError> {
    Ok(serde_yaml::to_string(value)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_structured_formats_keep_field_order() {
        let records = vec![IdentityRecord {
            username: "s1".to_string(),
            accounts: vec!["doe_j".to_string()],
            default_account: Some("doe_j".to_string()),
        }];

        let json = to_json(&records).unwrap();
        let username = json.find("\"username\"").unwrap();
        let accounts = json.find("\"accounts\"").unwrap();
        assert!(username < accounts);
        assert!(json.ends_with("]\n"));

        let yaml = to_yaml(&records).unwrap();
        assert!(yaml.starts_with("- username: s1\n"));
        let parsed: serde_yaml::Value = serde_yaml::from_str(&yaml).unwrap();
        assert_eq!(parsed[0]["accounts"][0].as_str(), Some("doe_j"));
        assert_eq!(parsed[0]["default_account"].as_str(), Some("doe_j"));
    }
}
