//! # Role Tokens and Permission Resolution
//!
//! Team configs describe access with role tokens (`admin`, `all-write`,
//! `triage`, …). Each token maps to an integer weight; the effective
//! permission for a team is the GitHub permission string of the highest
//! weight present. An unknown token is a fatal error, raised before any
//! `gh` call is attempted.

use crate::error::{Error, Result};

/// Weight of one role token; `None` for unrecognized tokens.
///
/// Tokens accept an optional `all-` prefix (`all-write` == `write`).
pub fn role_weight(token: &str) -> Option<u8> {
    let base = token.strip_prefix("all-").unwrap_or(token);
    match base {
        "admin" => Some(5),
        "maintain" => Some(4),
        "write" | "push" => Some(3),
        "triage" => Some(2),
        "read" | "pull" => Some(1),
        "none" => Some(0),
        _ => None,
    }
}

/// GitHub permission string for a weight. Weight 0 floors to `pull`; there
/// is no level below the lowest named permission.
pub fn weight_permission(weight: u8) -> &'static str {
    match weight {
        5 => "admin",
        4 => "maintain",
        3 => "push",
        2 => "triage",
        _ => "pull",
    }
}

/// Resolve a role-token list to the effective repo permission.
///
/// Fails on the first unknown token, before any subprocess is spawned.
pub fn effective_permission(roles: &[String]) -> Result<&'static str> {
    let mut max_weight = 0;
    for token in roles {
        let weight = role_weight(token).ok_or_else(|| Error::UnknownRole {
            token: token.clone(),
        })?;
        max_weight = max_weight.max(weight);
    }
    Ok(weight_permission(max_weight))
}

/// Team privacy value from the config's `visible` flag.
pub fn privacy_from_visible(visible: bool) -> &'static str {
    if visible {
        "closed"
    } else {
        "secret"
    }
}

/// Team notification setting from the config's free-form flag.
pub fn notification_setting(flag: &str) -> &'static str {
    match flag {
        "disabled" | "disable" | "off" | "false" => "notifications_disabled",
        _ => "notifications_enabled",
    }
}
