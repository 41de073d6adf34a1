//! Placeholder substitution for certificate markup.

use crate::models::CertificateRequest;

pub const STUDENT_NAME: &str = "STUDENT_NAME";
pub const CERTIFICATE_ID: &str = "CERTIFICATE_ID";
pub const VERIFY_URL: &str = "VERIFY_URL";
pub const COURSE_TITLE: &str = "COURSE_TITLE";

pub const PLACEHOLDERS: [&str; 4] = [STUDENT_NAME, CERTIFICATE_ID, VERIFY_URL, COURSE_TITLE];

fn token(key: &str) -> String {
    format!("{{{{{}}}}}", key)
}

/// Replace the first `{{key}}` occurrence of each field in `template`.
///
/// Only the first occurrence of a placeholder is substituted; any repeat is
/// left untouched in the output. Templates must carry each placeholder once.
/// Positions are resolved against the original template, so a value that
/// itself contains `{{...}}` is never substituted a second time.
pub fn render_template(template: &str, fields: &[(&str, &str)]) -> String {
    let mut spans: Vec<(usize, usize, &str)> = fields
        .iter()
        .filter_map(|(key, value)| {
            let token = token(key);
            template
                .find(&token)
                .map(|start| (start, start + token.len(), *value))
        })
        .collect();
    spans.sort_by_key(|(start, _, _)| *start);

    let mut result = String::with_capacity(template.len());
    let mut cursor = 0;
    for (start, end, value) in spans {
        // Overlapping tokens cannot happen for distinct `{{key}}` names
        if start < cursor {
            continue;
        }
        result.push_str(&template[cursor..start]);
        result.push_str(value);
        cursor = end;
    }
    result.push_str(&template[cursor..]);
    result
}

/// Verification link embedded in a certificate.
pub fn verify_url(base_url: &str, certificate_id: &str) -> String {
    format!("{}{}", base_url, certificate_id)
}

/// Field values for a request. Free-text fields are HTML-escaped.
pub fn certificate_fields(
    request: &CertificateRequest,
    verify_base_url: &str,
) -> [(&'static str, String); 4] {
    [
        (STUDENT_NAME, escape_html(&request.student_name)),
        (CERTIFICATE_ID, request.certificate_id.clone()),
        (
            VERIFY_URL,
            verify_url(verify_base_url, &request.certificate_id),
        ),
        (COURSE_TITLE, escape_html(&request.course_title)),
    ]
}

/// `{{...}}` tokens still present in rendered markup.
pub fn unresolved_placeholders(html: &str) -> Vec<String> {
    let mut found = Vec::new();
    let mut rest = html;
    while let Some(start) = rest.find("{{") {
        match rest[start + 2..].find("}}") {
            Some(len) => {
                found.push(rest[start..start + 2 + len + 2].to_string());
                rest = &rest[start + 2 + len + 2..];
            }
            None => break,
        }
    }
    found
}

fn escape_html(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}
