use async_trait::async_trait;
use std::future::Future;
use std::sync::Arc;

/// One surface's refresh work.
///
/// Errors are recorded by the coordinator, never propagated to callers.
#[async_trait]
pub trait RefreshStep: Send + Sync {
    async fn run(&self) -> anyhow::Result<()>;
}

/// Adapts a closure returning a future into a [`RefreshStep`].
pub struct FnStep<F>(F);

#[async_trait]
impl<F, Fut> RefreshStep for FnStep<F>
where
    F: Fn() -> Fut + Send + Sync,
    Fut: Future<Output = anyhow::Result<()>> + Send,
{
    async fn run(&self) -> anyhow::Result<()> {
        (self.0)().await
    }
}

pub fn step_fn<F, Fut>(f: F) -> Arc<dyn RefreshStep>
where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
{
    Arc::new(FnStep(f))
}
