//! Build script for LeafGuard.
//!
//! Only the desktop shell needs a build step: Tauri generates its context
//! (config, capabilities, frontend assets) at compile time. The CLI and
//! library build without it.

fn main() {
    #[cfg(feature = "desktop")]
    tauri_build::build();
}
