//! Wiring for the commands that talk to the server.

use auth_gate::{AuthGate, GateConfig, SessionProbe, SupabaseSessionProbe};
use conf_storage::{create_conf_manager, ConfManager};
use refresh_coalescer::{CoalescerConfig, RefreshCoordinator};
use remote_data_loaders::{register_surface_steps, ClientBootstrapLoader, RestClient, SurfaceSnapshots};
use resilient_request::{RequestConfig, ResilientRequest};
use std::sync::Arc;
use token_header_cache::{HeaderCacheConfig, TokenHeaderCache};
use tracing::{info, warn};
use ui_signal_ports::{DiagnosticSink, TracingDiagnosticSink, TracingUiSignals, UiSignals};
use vitals_config_and_utils::{Config, Paths};

/// Everything one CLI invocation shares.
pub struct SyncApp {
    pub conf: ConfManager,
    pub gate: AuthGate,
    pub headers: Arc<TokenHeaderCache>,
    pub request: Arc<ResilientRequest>,
    pub coordinator: RefreshCoordinator,
    pub bootstrap: Arc<ClientBootstrapLoader>,
    pub snapshots: Arc<SurfaceSnapshots>,
}

impl SyncApp {
    /// Build the component graph. Must run inside the Tokio runtime.
    pub fn build(config: &Config, paths: &Paths) -> anyhow::Result<Self> {
        let conf = create_conf_manager(paths)?;
        let signals: Arc<dyn UiSignals> = Arc::new(TracingUiSignals);
        let diagnostics: Arc<dyn DiagnosticSink> = Arc::new(TracingDiagnosticSink);

        let probe: Arc<dyn SessionProbe> = Arc::new(SupabaseSessionProbe::new(conf.clone()));
        let gate = AuthGate::new(probe.clone(), signals.clone(), GateConfig::from(config));

        let headers = Arc::new(TokenHeaderCache::new(
            conf.clone(),
            probe,
            HeaderCacheConfig::from(config),
        ));
        let request = Arc::new(ResilientRequest::new(
            headers.clone(),
            signals.clone(),
            diagnostics.clone(),
            RequestConfig::from(config),
        ));
        let client = Arc::new(RestClient::new(conf.clone(), request.clone(), signals.clone()));

        let coordinator = RefreshCoordinator::new(CoalescerConfig::from(config), diagnostics);
        let snapshots = Arc::new(SurfaceSnapshots::new());
        let bootstrap = register_surface_steps(&coordinator, client, signals, snapshots.clone());

        let app = Self {
            conf,
            gate,
            headers,
            request,
            coordinator,
            bootstrap,
            snapshots,
        };
        app.install_sign_out_cleanup();
        info!(base_dir = %paths.base_dir().display(), "Sync components ready");
        Ok(app)
    }

    fn install_sign_out_cleanup(&self) {
        let conf = self.conf.clone();
        let headers = self.headers.clone();
        let bootstrap = self.bootstrap.clone();
        let snapshots = self.snapshots.clone();
        self.gate.on_sign_out(move || {
            let conf = conf.clone();
            let headers = headers.clone();
            let bootstrap = bootstrap.clone();
            let snapshots = snapshots.clone();
            async move {
                if let Err(e) = conf.clear_session() {
                    warn!(error = %e, "Failed to clear stored session");
                }
                headers.invalidate();
                bootstrap.invalidate();
                snapshots.clear();
                info!("Signed-out state cleared");
            }
        });
    }
}
