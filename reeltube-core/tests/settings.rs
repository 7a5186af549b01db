use reeltube_core::{render_caption, AppConfig, RunState, Settings, Toggle};
use std::env;
use std::fs;

#[test]
fn test_default_settings_record() {
    let settings = Settings::default();
    assert!(!settings.is_complete());
    assert_eq!(settings.title_template, "{caption}");
    assert!(settings.start_on_boot);
    assert!(settings.battery_optimized);
    assert!(settings.notifications_enabled);
}

#[test]
fn test_whitespace_account_is_incomplete() {
    assert!(!Settings::for_account("   ").is_complete());
    assert!(Settings::for_account("reels.daily").is_complete());
}

#[test]
fn test_toggle_changes_only_one_field() {
    let original = Settings {
        monitored_account: "reels.daily".to_string(),
        title_template: "{caption} video".to_string(),
        description_template: "desc".to_string(),
        start_on_boot: true,
        battery_optimized: false,
        notifications_enabled: true,
    };

    for toggle in Toggle::ALL {
        let flipped = original.clone().with_toggle(toggle, !original.toggle(toggle));
        assert_eq!(flipped.toggle(toggle), !original.toggle(toggle));
        for other in Toggle::ALL.into_iter().filter(|t| *t != toggle) {
            assert_eq!(flipped.toggle(other), original.toggle(other));
        }
        assert_eq!(flipped.monitored_account, original.monitored_account);
        assert_eq!(flipped.title_template, original.title_template);
        assert_eq!(flipped.description_template, original.description_template);
    }
}

#[test]
fn test_settings_json_uses_camel_case() {
    let json = serde_json::to_value(Settings::for_account("reels.daily")).unwrap();
    assert_eq!(json["monitoredAccount"], "reels.daily");
    assert_eq!(json["notificationsEnabled"], true);
    assert!(json.get("monitored_account").is_none());
}

#[test]
fn test_rendered_title_for_caption() {
    let settings = Settings {
        title_template: "{caption} video".to_string(),
        ..Settings::for_account("reels.daily")
    };
    assert_eq!(render_caption(&settings.title_template, "hello"), "hello video");
}

#[test]
fn test_run_state_helpers() {
    assert!(!RunState::Unconfigured.is_configured());
    assert!(RunState::ConfiguredStopped.is_configured());
    assert!(!RunState::ConfiguredStopped.is_running());
    assert!(RunState::ConfiguredRunning.is_running());
}

#[test]
fn test_load_config_from_file() {
    let path = env::temp_dir().join(format!("reeltube_{}.toml", uuid::Uuid::new_v4()));
    fs::write(
        &path,
        "database_url = \"sqlite://custom.db\"\n[timeouts]\nupload_secs = 45\n",
    )
    .unwrap();

    let config = AppConfig::load(&path).unwrap();
    assert_eq!(config.database_url, "sqlite://custom.db");
    assert_eq!(config.timeouts.upload_secs, 45);
    assert_eq!(config.timeouts.call_secs, 30);

    fs::remove_file(&path).ok();
}
