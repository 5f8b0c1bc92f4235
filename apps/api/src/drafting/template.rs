use anyhow::anyhow;

use crate::errors::AppError;

/// Substitutes `{name}` placeholders in one left-to-right pass.
///
/// Substituted values are copied verbatim and never rescanned, so caller text
/// containing `{...}` is safe. Braces that do not enclose a placeholder name
/// (lowercase ASCII and `_`) are left as-is. A placeholder without a value is a
/// template bug and reported as an internal error.
pub fn fill_template(template: &str, fields: &[(&str, &str)]) -> Result<String, AppError> {
    let extra: usize = fields.iter().map(|(_, v)| v.len()).sum();
    let mut out = String::with_capacity(template.len() + extra);
    let mut rest = template;

    while let Some(open) = rest.find('{') {
        out.push_str(&rest[..open]);
        let after = &rest[open + 1..];
        match after.find('}') {
            Some(close) if is_placeholder_name(&after[..close]) => {
                let name = &after[..close];
                let value = fields
                    .iter()
                    .find(|(key, _)| *key == name)
                    .map(|(_, value)| *value)
                    .ok_or_else(|| {
                        AppError::Internal(anyhow!("template placeholder '{name}' has no value"))
                    })?;
                out.push_str(value);
                rest = &after[close + 1..];
            }
            _ => {
                out.push('{');
                rest = after;
            }
        }
    }
    out.push_str(rest);
    Ok(out)
}

fn is_placeholder_name(s: &str) -> bool {
    !s.is_empty() && s.chars().all(|c| c.is_ascii_lowercase() || c == '_')
}

/// Lists the placeholder names a template expects, in order of first appearance.
#[cfg(test)]
pub fn placeholders(template: &str) -> Vec<&str> {
    let mut names: Vec<&str> = Vec::new();
    let mut rest = template;
    while let Some(open) = rest.find('{') {
        let after = &rest[open + 1..];
        match after.find('}') {
            Some(close) if is_placeholder_name(&after[..close]) => {
                let name = &after[..close];
                if !names.contains(&name) {
                    names.push(name);
                }
                rest = &after[close + 1..];
            }
            _ => rest = after,
        }
    }
    names
}
