//! Optional puffin instrumentation, compiled in with the `profiling` feature.

#[cfg(feature = "profiling")]
pub use puffin;

const PUFFIN_ADDR: &str = "127.0.0.1:8585";

/// Turns scopes on and serves them to `puffin_viewer`.
pub fn init_profiling() {
  #[cfg(feature = "profiling")]
  {
    puffin::set_scopes_on(true);
    match puffin_http::Server::new(PUFFIN_ADDR) {
      Ok(server) => {
        log::info!("Serving profiles at {PUFFIN_ADDR}, connect with `puffin_viewer --url {PUFFIN_ADDR}`");
        // Lives as long as the process.
        std::mem::forget(server);
      }
      Err(e) => log::warn!("Failed to start puffin server: {e}"),
    }
  }

  #[cfg(not(feature = "profiling"))]
  log::debug!("Built without profiling, {PUFFIN_ADDR} stays closed");
}

/// Scope that is only recorded with the `profiling` feature.
#[macro_export]
macro_rules! profile_scope {
  ($name:expr) => {
    #[cfg(feature = "profiling")]
    $crate::profiling::puffin::profile_scope!($name);
  };
  ($name:expr, $data:expr) => {
    #[cfg(feature = "profiling")]
    $crate::profiling::puffin::profile_scope!($name, $data);
  };
}

/// Marks the end of a ui frame.
pub fn new_frame() {
  #[cfg(feature = "profiling")]
  puffin::GlobalProfiler::lock().new_frame();
}
