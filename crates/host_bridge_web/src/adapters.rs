use std::rc::Rc;

use host_bridge::{bootstrap, BridgeConfig, BridgeError, HostEnvironment, HostSession};

use crate::WebHostEnvironment;

/// Browser environment behind the trait object the bridge consumes.
pub fn web_host_environment(config: &BridgeConfig) -> Rc<dyn HostEnvironment> {
    Rc::new(WebHostEnvironment::new(config))
}

/// Bootstraps a session over the browser environment.
///
/// # Errors
///
/// Propagates [`bootstrap`] failures.
pub async fn connect(config: BridgeConfig) -> Result<HostSession, BridgeError> {
    bootstrap(web_host_environment(&config), config).await
}

/// Spawns [`connect`] on the browser event loop and hands the outcome to `on_ready`.
pub fn start(
    config: BridgeConfig,
    on_ready: impl FnOnce(Result<HostSession, BridgeError>) + 'static,
) {
    wasm_bindgen_futures::spawn_local(async move {
        on_ready(connect(config).await);
    });
}

#[cfg(test)]
mod tests {
    use futures::executor::block_on;

    use super::*;

    #[cfg(not(target_arch = "wasm32"))]
    #[test]
    fn connect_without_a_host_fails_on_the_first_request() {
        let result = block_on(connect(BridgeConfig::default()));
        assert!(matches!(
            result,
            Err(BridgeError::TransportUnavailable { .. })
        ));
    }
}
