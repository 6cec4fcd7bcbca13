//! Slurm `sacctmgr load` file rendering

use std::fmt::Write;

use super::records::HierarchyRecords;
use crate::config::{SlurmAccountLine, SlurmConfig, SlurmUserLine};

fn with_attributes(line: String, attributes: Option<&str>) -> String {
    match attributes {
        Some(attrs) if !attrs.is_empty() => format!("{}:{}", line, attrs),
        _ => line,
    }
}

fn account_line(
    name: &str,
    description: &str,
    organization: &str,
    attributes: Option<&str>,
) -> String {
    with_attributes(
        format!(
            "Account - {}:Description='{}':Organization='{}'",
            name, description, organization
        ),
        attributes,
    )
}

fn user_line(name: &str, default_account: &str, attributes: Option<&str>) -> String {
    with_attributes(
        format!("User - {}:DefaultAccount='{}'", name, default_account),
        attributes,
    )
}

fn fixed_account(line: &SlurmAccountLine) -> String {
    account_line(
        &line.name,
        &line.description,
        &line.organization,
        line.attributes.as_deref(),
    )
}

fn fixed_user(line: &SlurmUserLine) -> String {
    user_line(&line.name, &line.default_account, line.attributes.as_deref())
}

/// Render the load file: header, account lines, then one `Parent` block
/// per account listing its users
pub fn render(records: &HierarchyRecords, config: &SlurmConfig) -> String {
    let mut out = String::new();
    let user_attrs = Some(config.user_attributes.as_str());

    // Writing to a String cannot fail.
    let _ = writeln!(out, "Cluster - {}", config.cluster);
    let _ = writeln!(out, "Parent - root");
    let _ = writeln!(out, "{}", fixed_user(&config.root_user));
    for line in &config.top_level_accounts {
        let _ = writeln!(out, "{}", fixed_account(line));
    }

    for account in &records.accounts {
        let _ = writeln!(
            out,
            "{}",
            account_line(
                &account.account_name,
                &account.owner_display_name,
                account.owner_division.as_deref().unwrap_or(""),
                Some(config.account_attributes.as_str()),
            )
        );
    }

    let default_of = |username: &str| -> String {
        records
            .member(username)
            .and_then(|m| m.default_account.clone())
            .unwrap_or_default()
    };

    for account in &records.accounts {
        let _ = writeln!(out, "Parent - {}", account.account_name);
        for user in &config.static_users {
            let _ = writeln!(out, "{}", fixed_user(user));
        }
        let _ = writeln!(
            out,
            "{}",
            user_line(
                &account.owner_username,
                &default_of(&account.owner_username),
                user_attrs
            )
        );
        for member in &account.members {
            if *member == account.owner_username {
                continue;
            }
            let _ = writeln!(out, "{}", user_line(member, &default_of(member), user_attrs));
        }
    }

    out
}
