//! Identity URI templates.

use lb_model::NormalizedProfile;

/// Fills `{id}`, `{name}` and `{username}` placeholders from the profile.
/// Placeholders for absent fields are left as they are.
#[must_use]
pub fn fill(template: &str, profile: &NormalizedProfile) -> String {
    let fields = [
        ("id", Some(profile.id.as_str())),
        ("name", profile.name.as_deref()),
        ("username", profile.username.as_deref()),
        ("provider", Some(profile.provider_id.as_str())),
    ];

    fields
        .iter()
        .fold(template.to_string(), |uri, (key, value)| match value {
            Some(value) => uri.replace(&format!("{{{key}}}"), value),
            None => uri,
        })
}

/// Sets the profile URI from the template unless the adapter supplied one.
pub fn apply(template: Option<&str>, profile: &mut NormalizedProfile) {
    if profile.uri.is_some() {
        return;
    }
    if let Some(template) = template {
        profile.uri = Some(fill(template, profile));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fills_known_fields() {
        let profile = NormalizedProfile::new("github", "42").with_username("ada");
        assert_eq!(
            fill("https://github.com/{username}#{id}", &profile),
            "https://github.com/ada#42"
        );
    }

    #[test]
    fn missing_field_leaves_placeholder() {
        let profile = NormalizedProfile::new("orcid", "0000-0001");
        assert_eq!(
            fill("https://example.org/{username}", &profile),
            "https://example.org/{username}"
        );
    }

    #[test]
    fn adapter_uri_wins() {
        let mut profile = NormalizedProfile::new("local", "a").with_uri("urn:x");
        apply(Some("https://example.org/{id}"), &mut profile);
        assert_eq!(profile.uri.as_deref(), Some("urn:x"));

        let mut profile = NormalizedProfile::new("orcid", "0000-0001");
        apply(Some("https://orcid.org/{id}"), &mut profile);
        assert_eq!(profile.uri.as_deref(), Some("https://orcid.org/0000-0001"));
    }
}
