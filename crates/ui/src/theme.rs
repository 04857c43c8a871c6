use gpui::*;
use gpui_component::{Theme, ThemeMode, ThemeRegistry};
use parlor_core::{ClientSettings, ThemePreference};

pub fn theme_mode(preference: ThemePreference) -> ThemeMode {
    match preference {
        ThemePreference::Light => ThemeMode::Light,
        ThemePreference::Dark => ThemeMode::Dark,
    }
}

/// Applies the named preset when the registry knows it, otherwise the plain mode.
pub fn apply_theme(settings: &ClientSettings, window: Option<&mut Window>, cx: &mut App) {
    if let Some(theme_config) = ThemeRegistry::global(cx)
        .themes()
        .get(&SharedString::from(settings.theme_name.clone()))
        .cloned()
    {
        let mode = theme_config.mode;
        let theme = Theme::global_mut(cx);
        if mode.is_dark() {
            theme.dark_theme = theme_config;
        } else {
            theme.light_theme = theme_config;
        }
        Theme::change(mode, window, cx);
        return;
    }

    Theme::change(theme_mode(settings.theme_mode), window, cx);
}
