use std::sync::Arc;

use gpui::*;
use gpui_component::notification::NotificationList;
use gpui_component::{Root, ThemeRegistry};
use tracing_subscriber::EnvFilter;

use parlor::app::{ChatAppShell, NewChat, Quit, ToggleSidebar, ToggleTheme, default_themes_path};
use parlor::theme::apply_theme;
use parlor_core::SettingsStore;

/// Application entry point.
///
/// Bootstraps the GPUI application with:
/// 1. Settings from the user config directory (with `PARLOR_*` overrides)
/// 2. gpui-component initialization (required for Root, themes, notifications)
/// 3. Theme loading/watching from ./themes directory (non-fatal if missing)
/// 4. Global action handlers and key bindings
/// 5. Window creation with Root wrapper for gpui-component composition
fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let settings_store = Arc::new(SettingsStore::load());
    tracing::info!(
        config = ?settings_store.config_path(),
        backend_url = %settings_store.settings().backend_url,
        "loaded settings"
    );

    let app = Application::new().with_assets(gpui_component_assets::Assets);

    app.run(move |cx| {
        gpui_tokio_bridge::init(cx);

        // Initialize gpui-component - REQUIRED before any Root usage
        gpui_component::init(cx);

        // Themes directory is optional; built-in themes are used without it.
        let theme_store = settings_store.clone();
        if let Err(err) = ThemeRegistry::watch_dir(default_themes_path(), cx, move |cx| {
            apply_theme(&theme_store.settings(), None, cx);
            tracing::info!("Theme directory watch initialized");
        }) {
            tracing::warn!(
                "Failed to watch themes directory: {}. Using default themes.",
                err
            );
            apply_theme(&settings_store.settings(), None, cx);
        }

        cx.on_action(|_: &Quit, cx| {
            cx.quit();
        });

        cx.bind_keys([
            KeyBinding::new("cmd-q", Quit, None),
            KeyBinding::new("cmd-n", NewChat, None),
            KeyBinding::new("cmd-b", ToggleSidebar, None),
            KeyBinding::new("cmd-shift-t", ToggleTheme, None),
        ]);

        cx.spawn(async move |cx| {
            cx.update(|cx| {
                let options = WindowOptions {
                    window_bounds: Some(WindowBounds::Windowed(Bounds::centered(
                        None,
                        size(px(1100.), px(760.)),
                        cx,
                    ))),
                    titlebar: Some(TitlebarOptions {
                        title: Some("Parlor".into()),
                        appears_transparent: true,
                        traffic_light_position: Some(point(px(9.), px(9.))),
                        ..Default::default()
                    }),
                    // Client decorations on Linux/FreeBSD so the app draws its own title area.
                    #[cfg(any(target_os = "linux", target_os = "freebsd"))]
                    window_decorations: Some(WindowDecorations::Client),
                    #[cfg(not(any(target_os = "linux", target_os = "freebsd")))]
                    window_decorations: None,
                    ..Default::default()
                };

                // Root is required by gpui-component for notifications.
                cx.open_window(options, |window, cx| {
                    let notification_list = cx.new(|cx| NotificationList::new(window, cx));
                    let shell = cx.new(|cx| {
                        ChatAppShell::new(settings_store, notification_list, window, cx)
                    });
                    cx.new(|cx| Root::new(shell, window, cx))
                })
                .expect("failed to open main window");

                cx.activate(true);
            })
        })
        .detach();
    });
}
