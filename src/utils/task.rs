//! Async Task Plumbing
//!
//! The engine never blocks the frame loop. Asset loads and tracking
//! acquisition are handed to a [`TaskSpawner`] and report back through a
//! channel that the frame loop drains.
//!
//! On native targets the default spawner drives a shared multi-threaded Tokio
//! runtime; on wasm32 tasks run on the browser's microtask queue.

use std::future::Future;
use std::pin::Pin;

use crate::errors::LoadError;

#[cfg(not(target_arch = "wasm32"))]
use std::sync::OnceLock;
#[cfg(not(target_arch = "wasm32"))]
use tokio::runtime::Runtime;

// ============================================================================
// Send bounds that vanish on wasm32
// ============================================================================

/// `Send` on native targets, no bound on wasm32 where platform objects are
/// tied to the JS thread.
#[cfg(not(target_arch = "wasm32"))]
pub trait MaybeSend: Send {}
#[cfg(not(target_arch = "wasm32"))]
impl<T: Send + ?Sized> MaybeSend for T {}

#[cfg(target_arch = "wasm32")]
pub trait MaybeSend {}
#[cfg(target_arch = "wasm32")]
impl<T: ?Sized> MaybeSend for T {}

/// `Sync` on native targets, no bound on wasm32.
#[cfg(not(target_arch = "wasm32"))]
pub trait MaybeSync: Sync {}
#[cfg(not(target_arch = "wasm32"))]
impl<T: Sync + ?Sized> MaybeSync for T {}

#[cfg(target_arch = "wasm32")]
pub trait MaybeSync {}
#[cfg(target_arch = "wasm32")]
impl<T: ?Sized> MaybeSync for T {}

/// Boxed future returned by platform calls and accepted by spawners.
#[cfg(not(target_arch = "wasm32"))]
pub type PlatformFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;
#[cfg(target_arch = "wasm32")]
pub type PlatformFuture<'a, T> = Pin<Box<dyn Future<Output = T> + 'a>>;

// ============================================================================
// Spawners
// ============================================================================

/// Runs detached background work.
pub trait TaskSpawner {
    fn spawn(&self, task: PlatformFuture<'static, ()>);
}

#[cfg(not(target_arch = "wasm32"))]
pub(crate) fn get_asset_runtime() -> &'static Runtime {
    static RUNTIME: OnceLock<Runtime> = OnceLock::new();
    RUNTIME.get_or_init(|| Runtime::new().expect("Failed to create asset loader runtime"))
}

/// Spawns onto the shared asset runtime.
#[cfg(not(target_arch = "wasm32"))]
#[derive(Debug, Clone, Copy, Default)]
pub struct AssetRuntimeSpawner;

#[cfg(not(target_arch = "wasm32"))]
impl TaskSpawner for AssetRuntimeSpawner {
    fn spawn(&self, task: PlatformFuture<'static, ()>) {
        get_asset_runtime().spawn(task);
    }
}

/// Spawns onto the browser event loop.
#[cfg(target_arch = "wasm32")]
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalSpawner;

#[cfg(target_arch = "wasm32")]
impl TaskSpawner for LocalSpawner {
    fn spawn(&self, task: PlatformFuture<'static, ()>) {
        wasm_bindgen_futures::spawn_local(task);
    }
}

/// Runs every task to completion on the calling thread before returning.
///
/// Useful for headless hosts and tests where completions should be ready by
/// the next frame.
#[derive(Debug, Clone, Copy, Default)]
pub struct InlineSpawner;

impl TaskSpawner for InlineSpawner {
    fn spawn(&self, task: PlatformFuture<'static, ()>) {
        futures::executor::block_on(task);
    }
}

/// The spawner used when the host does not supply one.
#[must_use]
pub fn default_spawner() -> std::sync::Arc<dyn TaskSpawner> {
    #[cfg(not(target_arch = "wasm32"))]
    {
        std::sync::Arc::new(AssetRuntimeSpawner)
    }
    #[cfg(target_arch = "wasm32")]
    {
        std::sync::Arc::new(LocalSpawner)
    }
}

// ============================================================================
// CPU-bound work
// ============================================================================

/// Runs CPU-heavy work off the async workers when a Tokio runtime is
/// available, inline otherwise.
pub async fn run_blocking<T, F>(f: F) -> Result<T, LoadError>
where
    T: Send + 'static,
    F: FnOnce() -> T + Send + 'static,
{
    #[cfg(not(target_arch = "wasm32"))]
    {
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => Ok(handle.spawn_blocking(f).await?),
            Err(_) => Ok(f()),
        }
    }
    #[cfg(target_arch = "wasm32")]
    {
        Ok(f())
    }
}
