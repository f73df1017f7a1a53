use log::{debug, warn};
use std::sync::Arc;
use tokio::sync::watch;

use crate::Result;
use crate::api::config::PollPolicy;
use crate::api::intent::{ConnectRequest, normalize};
use crate::api::models::{
    AttemptState, BindingState, ConnectIntent, ErrorKind, JoinError, PermissionState,
};
use crate::core::binding::TrafficBinder;
use crate::core::error_map::to_join_error;
use crate::core::orchestrator::Orchestrator;
use crate::platform::PlatformAdapter;
use crate::platform::nm::NetworkManagerAdapter;

/// On-demand Wi-Fi joins with verification and rollback.
///
/// This is the main entry point. It owns the attempt state machine and the
/// traffic binding for one wireless radio; create one per process and share
/// it behind an `Arc`.
///
/// # Creating an Instance
///
/// ```no_run
/// use wifijoin::WifiJoin;
///
/// # async fn example() -> wifijoin::Result<()> {
/// let join = WifiJoin::system().await?;
/// # Ok(())
/// # }
/// ```
///
/// # Examples
///
/// ## Joining an IoT access point
///
/// ```no_run
/// use wifijoin::{ConnectRequest, WifiJoin};
///
/// # async fn example() -> wifijoin::Result<()> {
/// let join = WifiJoin::system().await?;
///
/// // Open AP, forgotten on failure, traffic pinned even without internet.
/// join.connect_request(
///     ConnectRequest::open("IoT-Device-42")
///         .join_once()
///         .bind_traffic(true),
/// )
/// .await?;
///
/// // ... talk to the device ...
///
/// join.disconnect("IoT-Device-42").await;
/// # Ok(())
/// # }
/// ```
///
/// ## Watching progress
///
/// ```no_run
/// use wifijoin::WifiJoin;
///
/// # async fn example() -> wifijoin::Result<()> {
/// let join = WifiJoin::system().await?;
/// let mut states = join.watch_attempt_state();
///
/// tokio::spawn(async move {
///     while states.changed().await.is_ok() {
///         println!("{}", *states.borrow());
///     }
/// });
/// # Ok(())
/// # }
/// ```
pub struct WifiJoin {
    adapter: Arc<dyn PlatformAdapter>,
    binder: Arc<TrafficBinder>,
    orchestrator: Orchestrator,
}

impl WifiJoin {
    /// Creates a handle over `adapter` with the default [`PollPolicy`].
    pub fn new(adapter: Arc<dyn PlatformAdapter>) -> Self {
        Self::with_policy(adapter, PollPolicy::default())
    }

    /// Creates a handle over `adapter` with a custom verification policy.
    ///
    /// # Example
    ///
    /// ```no_run
    /// use std::sync::Arc;
    /// use std::time::Duration;
    /// use wifijoin::{NetworkManagerAdapter, PollPolicy, WifiJoin};
    ///
    /// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
    /// let adapter = Arc::new(NetworkManagerAdapter::system().await?);
    /// let policy = PollPolicy::new().with_interval(Duration::from_secs(1));
    /// let join = WifiJoin::with_policy(adapter, policy);
    /// assert_eq!(join.poll_policy().interval, Duration::from_secs(1));
    /// # Ok(())
    /// # }
    /// ```
    pub fn with_policy(adapter: Arc<dyn PlatformAdapter>, policy: PollPolicy) -> Self {
        let binder = Arc::new(TrafficBinder::new(Arc::clone(&adapter)));
        let orchestrator = Orchestrator::new(Arc::clone(&adapter), Arc::clone(&binder), policy);
        Self {
            adapter,
            binder,
            orchestrator,
        }
    }

    /// Creates a handle bound to NetworkManager on the system D-Bus.
    pub async fn system() -> Result<Self> {
        let adapter = NetworkManagerAdapter::system().await.map_err(to_join_error)?;
        Ok(Self::new(Arc::new(adapter)))
    }

    /// Returns the verification policy in use.
    pub fn poll_policy(&self) -> PollPolicy {
        self.orchestrator.policy()
    }

    /// Returns the SSID of the current wireless link.
    ///
    /// # Errors
    ///
    /// - [`ErrorKind::PermissionDenied`] / [`ErrorKind::PermissionRestricted`]
    ///   when the platform will not reveal the SSID
    /// - [`ErrorKind::IdentityUndetectable`] when there is no link or the SSID
    ///   cannot be read
    pub async fn get_current_identity(&self) -> Result<String> {
        match self.adapter.permission_state().await {
            PermissionState::Denied => {
                return Err(JoinError::new(
                    ErrorKind::PermissionDenied,
                    "not permitted to read the current SSID",
                ));
            }
            PermissionState::Restricted => {
                return Err(JoinError::new(
                    ErrorKind::PermissionRestricted,
                    "reading the current SSID is restricted by policy",
                ));
            }
            PermissionState::Granted | PermissionState::Undetermined => {}
        }

        self.adapter.current_identity().await.ok_or_else(|| {
            JoinError::new(
                ErrorKind::IdentityUndetectable,
                "no wireless link or SSID unavailable",
            )
        })
    }

    /// Joins the network described by `intent` and verifies the link.
    ///
    /// Resolves once the radio reports the target SSID. Succeeds immediately,
    /// without touching the platform configuration, if already joined.
    ///
    /// # Errors
    ///
    /// Exactly one [`JoinError`]: validation, permission, platform or
    /// verification failure. A call while another attempt is in flight fails
    /// with [`ErrorKind::InvalidIntent`].
    pub async fn connect(&self, intent: ConnectIntent) -> Result<()> {
        self.orchestrator.connect(&intent).await
    }

    /// Normalises a raw request and joins it. See [`connect`](Self::connect).
    pub async fn connect_request(&self, request: ConnectRequest) -> Result<()> {
        let intent = normalize(request)?;
        self.connect(intent).await
    }

    /// Releases `identity`: cancels an attempt in flight, drops any traffic
    /// binding and removes the platform configuration.
    ///
    /// Every step is best-effort; failures are logged, never returned.
    pub async fn disconnect(&self, identity: &str) {
        debug!("Disconnecting from '{identity}'");

        if self.orchestrator.cancel() {
            debug!("Cancelled attempt in flight");
        }

        if let Err(e) = self.binder.unbind().await {
            warn!("Disconnect could not release traffic binding: {e}");
        }

        if let Err(e) = self.adapter.remove_configuration(identity).await {
            warn!("Disconnect could not remove configuration for '{identity}': {e}");
        }
    }

    /// Pins application traffic to the current link, or releases it.
    ///
    /// Both directions are idempotent.
    ///
    /// # Errors
    ///
    /// [`ErrorKind::BindFailed`] if the platform refuses.
    pub async fn set_traffic_binding(&self, bind: bool, no_internet_allowed: bool) -> Result<()> {
        if bind {
            self.binder.bind(no_internet_allowed).await
        } else {
            self.binder.unbind().await
        }
    }

    /// Cancels the attempt in flight. Returns `false` if there is none.
    pub fn cancel(&self) -> bool {
        self.orchestrator.cancel()
    }

    /// Current attempt state.
    pub fn attempt_state(&self) -> AttemptState {
        self.orchestrator.state()
    }

    /// Subscribes to attempt state changes.
    pub fn watch_attempt_state(&self) -> watch::Receiver<AttemptState> {
        self.orchestrator.subscribe()
    }

    /// Current traffic binding state.
    pub async fn binding_state(&self) -> BindingState {
        self.binder.state().await
    }
}
