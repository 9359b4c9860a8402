use std::collections::HashMap;

use crate::model::RawApplicationDescriptor;

/// Parses the `[Desktop Entry]` group of a freedesktop manifest. Returns `None`
/// for anything that is not a launchable application entry.
pub fn parse_desktop_entry(id: &str, contents: &str) -> Option<RawApplicationDescriptor> {
    let fields = desktop_entry_fields(contents);

    let kind = fields.get("Type").map(String::as_str).unwrap_or("Application");
    if kind != "Application" {
        return None;
    }

    let name = fields.get("Name").cloned();
    let generic_name = fields.get("GenericName").cloned();
    if name.is_none() && generic_name.is_none() {
        return None;
    }

    let mut descriptor = RawApplicationDescriptor::new(id, name.as_deref().unwrap_or_default());
    descriptor.label = name;
    descriptor.raw_label = generic_name;
    descriptor.category_hints = fields
        .get("Categories")
        .map(|raw| {
            raw.split(';')
                .map(str::trim)
                .filter(|token| !token.is_empty())
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default();
    descriptor.enabled = !is_true(fields.get("NoDisplay")) && !is_true(fields.get("Hidden"));
    descriptor.version_label = fields.get("X-AppVersion").cloned().unwrap_or_default();
    descriptor.version_ordinal = fields
        .get("X-Version-Ordinal")
        .and_then(|raw| raw.trim().parse::<i64>().ok())
        .unwrap_or(0);

    Some(descriptor)
}

fn desktop_entry_fields(contents: &str) -> HashMap<String, String> {
    let mut fields = HashMap::new();
    let mut in_entry = false;

    for line in contents.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        if line.starts_with('[') {
            in_entry = line == "[Desktop Entry]";
            continue;
        }
        if !in_entry {
            continue;
        }
        let Some((key, value)) = line.split_once('=') else {
            continue;
        };
        let key = key.trim();
        // Localized keys like `Name[de]` are skipped; the unlocalized value is canonical.
        if key.contains('[') {
            continue;
        }
        fields
            .entry(key.to_string())
            .or_insert_with(|| value.trim().to_string());
    }

    fields
}

fn is_true(value: Option<&String>) -> bool {
    value.is_some_and(|raw| raw.trim().eq_ignore_ascii_case("true"))
}

#[cfg(test)]
mod tests {
    use super::parse_desktop_entry;

    #[test]
    fn parses_application_entry() {
        let raw = "[Desktop Entry]\nType=Application\nName=Firefox\nName[de]=Feuerfuchs\nGenericName=Web Browser\nCategories=Network;WebBrowser;\nX-AppVersion=128.0\n";
        let descriptor = parse_desktop_entry("firefox", raw).unwrap();

        assert_eq!(descriptor.id, "firefox");
        assert_eq!(descriptor.label.as_deref(), Some("Firefox"));
        assert_eq!(descriptor.raw_label.as_deref(), Some("Web Browser"));
        assert_eq!(descriptor.category_hints, vec!["Network", "WebBrowser"]);
        assert_eq!(descriptor.version_label, "128.0");
        assert!(descriptor.enabled);
    }

    #[test]
    fn no_display_entries_are_disabled() {
        let raw = "[Desktop Entry]\nName=Helper\nNoDisplay=true\n";
        let descriptor = parse_desktop_entry("helper", raw).unwrap();
        assert!(!descriptor.enabled);
    }

    #[test]
    fn ignores_links_and_other_groups() {
        assert!(parse_desktop_entry("docs", "[Desktop Entry]\nType=Link\nName=Docs\n").is_none());
        assert!(parse_desktop_entry("x", "[Desktop Action new]\nName=New Window\n").is_none());
    }
}
