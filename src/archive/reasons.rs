use crate::models::ClipKind;

/// Known `event.json` reasons with the classification and display key they
/// map to.
const REASONS: &[(&str, ClipKind, &str)] = &[
    ("user_interaction_honk", ClipKind::Saved, "reason_honk"),
    ("user_interaction_dashcam_panel_save", ClipKind::Saved, "reason_manual_save"),
    ("user_interaction_dashcam_icon_tapped", ClipKind::Saved, "reason_manual_save"),
    ("user_interaction_dashcam_launcher_action_tapped", ClipKind::Saved, "reason_manual_save"),
    ("sentry_aware_object_detection", ClipKind::Sentry, "reason_sentry_object"),
    ("sentry_aware_accel", ClipKind::Sentry, "reason_sentry_accel"),
    ("sentry_panic_accel", ClipKind::Sentry, "reason_sentry_panic"),
    ("sentry_locked_handle_pulled", ClipKind::Sentry, "reason_sentry_handle"),
    ("sentry_aware_battery_voltage", ClipKind::Sentry, "reason_sentry_battery"),
];

/// `sentry_aware_accel_0.42` style reasons carry a sensor reading.
const ACCEL_PREFIX: &str = "sentry_aware_accel_";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReasonInfo {
    pub kind: ClipKind,
    pub display_key: &'static str,
}

pub fn lookup(reason: &str) -> Option<ReasonInfo> {
    let reason = reason.trim();
    let key = if reason.starts_with(ACCEL_PREFIX) {
        "sentry_aware_accel"
    } else {
        reason
    };

    REASONS
        .iter()
        .find(|(known, _, _)| *known == key)
        .map(|&(_, kind, display_key)| ReasonInfo { kind, display_key })
}

/// Outcome of classifying one clip.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classification {
    pub kind: ClipKind,
    pub display_reason: Option<String>,
    /// Set when a reason was present but not in the table.
    pub unrecognized: bool,
}

/// Table entry when the reason is known, otherwise `default` with the raw
/// reason kept as display text.
pub fn classify(reason: Option<&str>, default: ClipKind) -> Classification {
    match reason {
        None => Classification {
            kind: default,
            display_reason: None,
            unrecognized: false,
        },
        Some(raw) => match lookup(raw) {
            Some(info) => Classification {
                kind: info.kind,
                display_reason: Some(info.display_key.to_string()),
                unrecognized: false,
            },
            None => Classification {
                kind: default,
                display_reason: Some(raw.to_string()),
                unrecognized: true,
            },
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn honk_is_saved() {
        let info = lookup("user_interaction_honk").unwrap();
        assert_eq!(info.kind, ClipKind::Saved);
        assert_eq!(info.display_key, "reason_honk");
    }

    #[test]
    fn accel_family_matches_by_prefix() {
        let info = lookup("sentry_aware_accel_0.93").unwrap();
        assert_eq!(info.kind, ClipKind::Sentry);
        assert_eq!(info.display_key, "reason_sentry_accel");
    }

    #[test]
    fn table_overrides_path_default() {
        let result = classify(Some("sentry_aware_object_detection"), ClipKind::Saved);
        assert_eq!(result.kind, ClipKind::Sentry);
        assert_eq!(result.display_reason.as_deref(), Some("reason_sentry_object"));
        assert!(!result.unrecognized);
    }

    #[test]
    fn unknown_reason_keeps_default_and_raw_text() {
        let result = classify(Some("cosmic_ray"), ClipKind::Sentry);
        assert_eq!(result.kind, ClipKind::Sentry);
        assert_eq!(result.display_reason.as_deref(), Some("cosmic_ray"));
        assert!(result.unrecognized);
    }

    #[test]
    fn missing_reason_is_not_reported() {
        let result = classify(None, ClipKind::Saved);
        assert_eq!(result.kind, ClipKind::Saved);
        assert_eq!(result.display_reason, None);
        assert!(!result.unrecognized);
    }
}
