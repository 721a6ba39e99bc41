//! [`HostEnvironment`] backed by the browser window.

use host_bridge::{
    BridgeConfig, Delivery, HostEnvironment, InboundReceiver, InboundRoute, NavigationTarget,
    ResizeListener, TransportChannels,
};
use tracing::{debug, warn};

use crate::{bridge, launch_params::LaunchParams};

#[derive(Debug, Clone)]
/// Browser host environment.
///
/// Channels are probed on every post, so a proxy injected after startup is picked up.
pub struct WebHostEnvironment {
    session_storage_key: String,
}

impl WebHostEnvironment {
    /// Creates an environment persisting launch parameters under the configured key.
    pub fn new(config: &BridgeConfig) -> Self {
        Self {
            session_storage_key: config.session_storage_key.clone(),
        }
    }

    /// Location hash parameters filled in from session storage; the merged set is written back.
    pub fn collect_launch_params(&self) -> LaunchParams {
        let mut params = LaunchParams::from_location(&bridge::location_href());
        if let Some(stored) = bridge::session_get(&self.session_storage_key) {
            if let Err(err) = params.fill_from_persisted(&stored) {
                warn!("persisted launch params ignored: {err}");
            }
        }
        match params.to_persisted() {
            Ok(raw) => {
                if let Err(err) = bridge::session_set(&self.session_storage_key, &raw) {
                    debug!("launch params not persisted: {err}");
                }
            }
            Err(err) => debug!("launch params not persisted: {err}"),
        }
        params
    }
}

impl HostEnvironment for WebHostEnvironment {
    fn channels(&self) -> TransportChannels {
        bridge::probe_channels()
    }

    fn deliver(&self, delivery: &Delivery) -> Result<(), String> {
        bridge::deliver(delivery)
    }

    fn viewport_height(&self) -> f64 {
        bridge::inner_height()
    }

    fn launch_params(&self) -> String {
        self.collect_launch_params().to_query()
    }

    fn install_inbound(
        &self,
        route: InboundRoute,
        receiver: InboundReceiver,
    ) -> Result<(), String> {
        bridge::install_inbound(route, receiver)
    }

    fn apply_custom_style(&self, css: &str) {
        if let Err(err) = bridge::set_custom_style(css) {
            warn!("custom style not applied: {err}");
        }
    }

    fn on_resize(&self, listener: ResizeListener) {
        if let Err(err) = bridge::listen_resize(listener) {
            warn!("resize listener not installed: {err}");
        }
    }

    fn navigate(&self, url: &str, target: NavigationTarget) -> Result<(), String> {
        bridge::navigate(url, target)
    }
}
