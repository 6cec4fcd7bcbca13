//! Identity-map line format: `user:<u> alist=<a,b> adef=<d>`

use super::records::IdentityRecord;

pub fn render_line(record: &IdentityRecord) -> String {
    format!(
        "user:{} alist={} adef={}",
        record.username,
        record.accounts.join(","),
        record.default_account.as_deref().unwrap_or("")
    )
}

pub fn render(records: &[IdentityRecord]) -> String {
    let mut out = String::new();
    for record in records {
        out.push_str(&render_line(record));
        out.push('\n');
    }
    out
}
