//! Session startup: reads launch parameters, wires every service to one bridge and syncs the
//! host-owned state.

use std::{collections::HashMap, rc::Rc};

use tracing::{debug, warn};
use url::form_urlencoded;

use crate::{
    bridge::HostBridge,
    components::{
        back_button::BackButton, haptic::HapticFeedback, host_app::HostApp,
        main_button::MainButton, popup::Popup, theme::Theme, viewport::Viewport,
    },
    config::BridgeConfig,
    error::BridgeError,
    inbound::ThemeInfo,
    launch_data::LaunchDataStore,
    transport::{HostEnvironment, InboundRoute},
};

/// Service bundle produced by [`bootstrap`].
///
/// Every handle shares the same [`HostBridge`]; clones are cheap and refer to the same services.
#[derive(Debug, Clone)]
pub struct HostSession {
    /// Bridge all services talk through.
    pub bridge: Rc<HostBridge>,
    /// Inbound route that was installed.
    pub route: InboundRoute,
    /// Host metadata, colors and app-level commands.
    pub host_app: Rc<HostApp>,
    /// Host theme.
    pub theme: Rc<Theme>,
    /// Viewport geometry.
    pub viewport: Rc<Viewport>,
    /// Back button.
    pub back_button: Rc<BackButton>,
    /// Main button.
    pub main_button: Rc<MainButton>,
    /// Native popups.
    pub popup: Rc<Popup>,
    /// Haptic feedback.
    pub haptic: Rc<HapticFeedback>,
    /// Launch payload snapshot.
    pub launch_data: Rc<LaunchDataStore>,
}

/// Launch parameters keyed by name; the first occurrence of a key wins.
fn read_launch_params(env: &dyn HostEnvironment) -> HashMap<String, String> {
    let mut params = HashMap::new();
    for (key, value) in form_urlencoded::parse(env.launch_params().as_bytes()).into_owned() {
        params.entry(key).or_insert(value);
    }
    params
}

/// Starts a session over `env`.
///
/// Resolves once the theme and viewport have been synced with the host.
///
/// # Errors
///
/// Fails when inbound routing cannot be installed or a sync request cannot be posted. Malformed
/// optional launch parameters are logged and skipped.
pub async fn bootstrap(
    env: Rc<dyn HostEnvironment>,
    config: BridgeConfig,
) -> Result<HostSession, BridgeError> {
    let params = read_launch_params(env.as_ref());
    let keys = config.launch_param_keys.clone();
    let debug_enabled = config.debug;

    let bridge = HostBridge::new(env, config);
    if debug_enabled {
        bridge.subscribe(|name, event| debug!("host event `{name}`: {event:?}"));
    }
    let route = bridge.install_inbound()?;

    let theme = Theme::new(Rc::clone(&bridge));
    let host_app = Rc::new(HostApp::new(Rc::clone(&bridge), Rc::clone(&theme)));
    host_app.apply_launch_meta(
        params.get(&keys.platform).map(String::as_str),
        params.get(&keys.version).map(String::as_str),
    );

    let launch_data = Rc::new(LaunchDataStore::new());
    if let Some(raw) = params.get(&keys.data) {
        if let Err(err) = launch_data.apply_launch_data(raw) {
            warn!("launch data rejected: {err}");
        }
    }

    if let Some(raw) = params.get(&keys.theme) {
        match ThemeInfo::parse(raw) {
            Ok(info) => theme.apply_theme_info(info),
            Err(err) => warn!("launch theme rejected: {err}"),
        }
    }
    theme.listen();
    theme.sync().await?;

    let viewport = Viewport::new(Rc::clone(&bridge));
    viewport.listen();
    viewport.listen_resize();
    viewport.sync().await?;

    let main_button = Rc::new(MainButton::new(Rc::clone(&bridge)));
    main_button.apply_theme_info(&theme.params());

    Ok(HostSession {
        route,
        host_app,
        theme,
        viewport,
        back_button: Rc::new(BackButton::new(Rc::clone(&bridge))),
        main_button,
        popup: Rc::new(Popup::new(Rc::clone(&bridge))),
        haptic: Rc::new(HapticFeedback::new(Rc::clone(&bridge))),
        launch_data,
        bridge,
    })
}

#[cfg(test)]
mod tests {
    use futures::{executor::block_on, pin_mut, poll};
    use pretty_assertions::assert_eq;
    use serde_json::json;

    use super::*;
    use crate::{color::RgbColor, components::theme::ColorScheme, transport::MemoryHostEnvironment};

    fn encode(pairs: &[(&str, &str)]) -> String {
        form_urlencoded::Serializer::new(String::new())
            .extend_pairs(pairs)
            .finish()
    }

    #[test]
    fn desktop_sessions_start_without_waiting_on_the_host() {
        let env = MemoryHostEnvironment::native();
        env.set_viewport_height(640.0);
        env.set_launch_params(encode(&[
            ("tgWebAppPlatform", "tdesktop"),
            ("tgWebAppVersion", "6.4"),
            ("tgWebAppThemeParams", r##"{"bg_color":"#ffffff","button_color":"#50a8eb"}"##),
            ("tgWebAppData", "auth_date=1662771648&hash=abc&start_param=promo"),
        ]));

        let session =
            block_on(bootstrap(Rc::new(env.clone()), BridgeConfig::default())).expect("bootstrap");

        assert_eq!(session.route, InboundRoute::GlobalEntryPoints);
        assert_eq!(session.host_app.platform(), "tdesktop");
        assert_eq!(session.host_app.version(), "6.4");
        assert_eq!(session.theme.color_scheme(), ColorScheme::Light);
        assert_eq!(session.viewport.height(), 640.0);
        assert_eq!(
            session.main_button.color(),
            RgbColor::parse("#50a8eb").expect("color")
        );
        assert_eq!(
            session.launch_data.snapshot().start_param.as_deref(),
            Some("promo")
        );
        assert!(env.deliveries().is_empty());
    }

    #[test]
    fn framed_sessions_handshake_and_sync_through_the_host() {
        let env = MemoryHostEnvironment::framed();
        env.set_launch_params(encode(&[
            ("tgWebAppPlatform", "ios"),
            ("tgWebAppVersion", "6.7"),
        ]));

        block_on(async {
            let start = bootstrap(Rc::new(env.clone()), BridgeConfig::default().with_debug(true));
            pin_mut!(start);

            assert!(poll!(start.as_mut()).is_pending());
            assert_eq!(
                env.posted_names(),
                vec!["iframe_ready", "web_app_request_theme"]
            );
            env.inject_call("theme_changed", json!({"theme_params": {"bg_color": "#000000"}}));

            assert!(poll!(start.as_mut()).is_pending());
            assert_eq!(
                env.posted_names().last().map(String::as_str),
                Some("web_app_request_viewport")
            );
            env.inject_call(
                "viewport_changed",
                json!({"height": 720, "is_expanded": true, "is_state_stable": true}),
            );

            let session = start.await.expect("bootstrap");
            assert_eq!(session.route, InboundRoute::FrameMessages);
            assert_eq!(session.theme.color_scheme(), ColorScheme::Dark);
            assert_eq!(session.viewport.stable_height(), 720.0);
            assert!(session.viewport.is_expanded());
        });
    }

    #[test]
    fn malformed_launch_parameters_keep_defaults() {
        let env = MemoryHostEnvironment::native();
        env.set_launch_params(encode(&[
            ("tgWebAppPlatform", "tdesktop"),
            ("tgWebAppThemeParams", "not json"),
            ("tgWebAppData", "hash=only"),
        ]));

        let session =
            block_on(bootstrap(Rc::new(env), BridgeConfig::default())).expect("bootstrap");

        assert_eq!(session.host_app.version(), "6.0");
        assert_eq!(session.theme.bg_color(), None);
        assert_eq!(session.launch_data.raw(), "");
    }

    #[test]
    fn repeated_launch_parameters_keep_the_first_value() {
        let env = MemoryHostEnvironment::native();
        env.set_launch_params(encode(&[
            ("tgWebAppPlatform", "tdesktop"),
            ("tgWebAppVersion", "6.4"),
            ("tgWebAppVersion", "7.0"),
        ]));

        let session =
            block_on(bootstrap(Rc::new(env), BridgeConfig::default())).expect("bootstrap");

        assert_eq!(session.host_app.version(), "6.4");
    }

    #[test]
    fn unreachable_hosts_fail_the_first_sync() {
        let env = MemoryHostEnvironment::native();
        env.set_delivery_failure(Some("proxy detached"));

        let result = block_on(bootstrap(Rc::new(env), BridgeConfig::default()));

        assert!(matches!(
            result,
            Err(BridgeError::TransportUnavailable { .. })
        ));
    }
}
