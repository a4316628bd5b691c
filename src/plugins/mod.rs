//! Built-in plugins.
//!
//! - `example_plugin`: constant sample value with a timestamp
//! - `another_plugin`: second constant sample value with a timestamp
//! - `system`: load average, memory and uptime from /proc

pub mod another;
pub mod example;
pub mod system;

use std::sync::Arc;

use crate::plugin::Plugin;

pub use another::AnotherPlugin;
pub use example::ExamplePlugin;
pub use system::SystemPlugin;

/// Returns the built-in plugin set in registration order.
pub fn builtin_plugins() -> Vec<Arc<dyn Plugin>> {
    vec![
        Arc::new(ExamplePlugin::new()),
        Arc::new(AnotherPlugin::new()),
        Arc::new(SystemPlugin::new()),
    ]
}

/// Names of the built-in plugins, without instantiating them.
pub fn builtin_plugin_names() -> Vec<&'static str> {
    vec![example::NAME, another::NAME, system::NAME]
}
