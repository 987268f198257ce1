//! Viewer identity: asks the host platform for its context once per mount and
//! falls back to a default id when the host has none or fails.

use std::fmt;

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::OnceCell;
use tracing::Instrument;

use crate::telemetry::{self};
use crate::telemetry::ops::feed::Phase as FeedPhase;

mod host;

pub use host::CliHost;

pub const IDENTITY_UNAVAILABLE: &str = "Failed to load Farcaster SDK. Using default FID.";

/// Numeric host-platform user id. Unrelated to any GitHub account id.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ViewerId(pub u64);

impl fmt::Display for ViewerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
pub struct HostUser {
    #[serde(default, alias = "fid")]
    pub id: Option<u64>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
pub struct HostContext {
    #[serde(default)]
    pub user: Option<HostUser>,
}

impl HostContext {
    pub fn for_user(id: u64) -> Self {
        Self { user: Some(HostUser { id: Some(id) }) }
    }

    /// A zero id counts as absent.
    pub fn viewer_id(&self) -> Option<ViewerId> {
        self.user.as_ref().and_then(|u| u.id).filter(|id| *id != 0).map(ViewerId)
    }
}

/// What the core needs from the embedding platform.
#[async_trait]
pub trait HostPlatform: Send + Sync {
    async fn context(&self) -> Result<Option<HostContext>>;

    /// Lifecycle signal sent once the first context attempt has finished.
    fn ready(&self);

    fn open_url(&self, url: &str) -> Result<()>;
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum IdentitySource {
    Host,
    /// host answered without a user id
    Default,
    /// host context failed to load
    Fallback,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ResolvedIdentity {
    pub viewer: ViewerId,
    pub source: IdentitySource,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub advisory: Option<String>,
}

pub struct IdentityResolver {
    default: ViewerId,
    cell: OnceCell<ResolvedIdentity>,
}

impl IdentityResolver {
    pub fn new(default: ViewerId) -> Self {
        Self { default, cell: OnceCell::new() }
    }

    /// Runs the context request on first call; later and concurrent callers
    /// get the same answer. Never fails: errors turn into the default id
    /// plus an advisory message.
    pub async fn resolve(&self, host: &dyn HostPlatform) -> &ResolvedIdentity {
        self.cell
            .get_or_init(|| {
                let log = telemetry::feed();
                let span = log.span(&FeedPhase::Identity);
                async move {
                    let resolved = match host.context().await {
                        Ok(ctx) => match ctx.as_ref().and_then(HostContext::viewer_id) {
                            Some(viewer) => ResolvedIdentity { viewer, source: IdentitySource::Host, advisory: None },
                            None => ResolvedIdentity { viewer: self.default, source: IdentitySource::Default, advisory: None },
                        },
                        Err(err) => {
                            log.error_kv("host context failed", [("error", format!("{err:#}"))]);
                            ResolvedIdentity {
                                viewer: self.default,
                                source: IdentitySource::Fallback,
                                advisory: Some(IDENTITY_UNAVAILABLE.to_string()),
                            }
                        }
                    };
                    host.ready();
                    log.debug_kv("identity resolved", [
                        ("viewer", resolved.viewer.to_string()),
                        ("source", format!("{:?}", resolved.source)),
                    ]);
                    resolved
                }
                .instrument(span)
            })
            .await
    }

    /// True once the context attempt has finished, whatever its outcome.
    pub fn is_ready(&self) -> bool {
        self.cell.initialized()
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use anyhow::bail;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    pub(crate) struct StubHost {
        ctx: Option<HostContext>,
        fail: bool,
        pub context_calls: AtomicUsize,
        pub ready_calls: AtomicUsize,
    }

    impl StubHost {
        pub(crate) fn with(ctx: Option<HostContext>) -> Self {
            Self { ctx, fail: false, context_calls: AtomicUsize::new(0), ready_calls: AtomicUsize::new(0) }
        }

        pub(crate) fn failing() -> Self {
            Self { fail: true, ..Self::with(None) }
        }
    }

    #[async_trait]
    impl HostPlatform for StubHost {
        async fn context(&self) -> Result<Option<HostContext>> {
            self.context_calls.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(5)).await;
            if self.fail {
                bail!("sdk not injected");
            }
            Ok(self.ctx.clone())
        }

        fn ready(&self) {
            self.ready_calls.fetch_add(1, Ordering::SeqCst);
        }

        fn open_url(&self, _url: &str) -> Result<()> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn host_id_wins() {
        let host = StubHost::with(Some(HostContext::for_user(42)));
        let resolver = IdentityResolver::new(ViewerId(6023));
        assert!(!resolver.is_ready());
        let id = resolver.resolve(&host).await.clone();
        assert!(resolver.is_ready());
        assert_eq!(id.viewer, ViewerId(42));
        assert_eq!(id.source, IdentitySource::Host);
        assert!(id.advisory.is_none());
        assert_eq!(resolver.resolve(&host).await, &id);
        assert_eq!(host.context_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn missing_user_uses_default_without_advisory() {
        let host = StubHost::with(Some(HostContext::default()));
        let resolver = IdentityResolver::new(ViewerId(6023));
        let id = resolver.resolve(&host).await;
        assert_eq!(id.viewer, ViewerId(6023));
        assert_eq!(id.source, IdentitySource::Default);
        assert!(id.advisory.is_none());
    }

    #[tokio::test]
    async fn failure_unblocks_with_default_and_advisory() {
        let host = StubHost::failing();
        let resolver = IdentityResolver::new(ViewerId(6023));
        let id = resolver.resolve(&host).await;
        assert_eq!(id.viewer, ViewerId(6023));
        assert_eq!(id.source, IdentitySource::Fallback);
        assert_eq!(id.advisory.as_deref(), Some(IDENTITY_UNAVAILABLE));
        assert_eq!(host.ready_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn concurrent_callers_share_one_attempt() {
        let host = StubHost::with(Some(HostContext::for_user(7)));
        let resolver = IdentityResolver::new(ViewerId(6023));
        let (a, b) = tokio::join!(resolver.resolve(&host), resolver.resolve(&host));
        assert_eq!(a, b);
        assert_eq!(host.context_calls.load(Ordering::SeqCst), 1);
        assert_eq!(host.ready_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn zero_fid_falls_back_to_default() {
        let host = StubHost::with(Some(HostContext::for_user(0)));
        let resolver = IdentityResolver::new(ViewerId(6023));
        let id = resolver.resolve(&host).await;
        assert_eq!(id.viewer, ViewerId(6023));
        assert_eq!(id.source, IdentitySource::Default);
        let ctx: HostContext = serde_json::from_str(r#"{"user":{"fid":0}}"#).unwrap();
        assert_eq!(ctx.viewer_id(), None);
    }

    #[test]
    fn context_accepts_fid_alias() {
        let ctx: HostContext = serde_json::from_str(r#"{"user":{"fid":99,"username":"x"}}"#).unwrap();
        assert_eq!(ctx.viewer_id(), Some(ViewerId(99)));
        let ctx: HostContext = serde_json::from_str(r#"{"user":{"id":3}}"#).unwrap();
        assert_eq!(ctx.viewer_id(), Some(ViewerId(3)));
    }
}
