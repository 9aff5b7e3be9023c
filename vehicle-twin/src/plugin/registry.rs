//! Compile-time table of plugin constructors keyed by descriptor reference.

use crate::error::TwinError;
use crate::plugin::listener_plugin::{ListenerPlugin, PluginSpec};
use crate::plugins::{RecordSink, RpcResponder, TriggerRepublisher};
use std::collections::HashMap;

pub type PluginConstructor = fn(PluginSpec) -> Result<Box<dyn ListenerPlugin>, TwinError>;

pub struct PluginRegistry {
    constructors: HashMap<String, PluginConstructor>,
}

impl PluginRegistry {
    /// A registry with no constructors at all.
    pub fn empty() -> Self {
        Self {
            constructors: HashMap::new(),
        }
    }

    /// A registry holding the plugins shipped with this crate.
    pub fn with_builtin_plugins() -> Self {
        let mut registry = Self::empty();
        registry.register(
            RpcResponder::MODULE,
            RpcResponder::IMPLEMENTATION,
            build_rpc_responder,
        );
        registry.register(
            TriggerRepublisher::MODULE,
            TriggerRepublisher::IMPLEMENTATION,
            build_trigger_republisher,
        );
        registry.register(
            RecordSink::MODULE,
            RecordSink::IMPLEMENTATION,
            build_record_sink,
        );
        registry
    }

    pub fn reference(module: &str, implementation: &str) -> String {
        format!("{module}::{implementation}")
    }

    /// Registers `constructor`, returning the one it replaced, if any.
    pub fn register(
        &mut self,
        module: &str,
        implementation: &str,
        constructor: PluginConstructor,
    ) -> Option<PluginConstructor> {
        self.constructors
            .insert(Self::reference(module, implementation), constructor)
    }

    pub fn resolve(
        &self,
        module: &str,
        implementation: &str,
    ) -> Result<PluginConstructor, TwinError> {
        let reference = Self::reference(module, implementation);
        self.constructors
            .get(&reference)
            .copied()
            .ok_or(TwinError::UnknownPlugin { reference })
    }

    pub fn references(&self) -> Vec<String> {
        let mut references: Vec<String> = self.constructors.keys().cloned().collect();
        references.sort();
        references
    }
}

fn build_rpc_responder(spec: PluginSpec) -> Result<Box<dyn ListenerPlugin>, TwinError> {
    Ok(Box::new(RpcResponder::new(spec)))
}

fn build_trigger_republisher(spec: PluginSpec) -> Result<Box<dyn ListenerPlugin>, TwinError> {
    Ok(Box::new(TriggerRepublisher::new(spec)))
}

fn build_record_sink(spec: PluginSpec) -> Result<Box<dyn ListenerPlugin>, TwinError> {
    Ok(Box::new(RecordSink::new(spec)))
}

impl Default for PluginRegistry {
    fn default() -> Self {
        Self::with_builtin_plugins()
    }
}

#[cfg(test)]
mod tests {
    use super::PluginRegistry;
    use crate::error::TwinError;

    #[test]
    fn builtin_plugins_are_registered() {
        assert_eq!(
            PluginRegistry::with_builtin_plugins().references(),
            vec![
                "record_sink::RecordSink".to_string(),
                "rpc_responder::RpcResponder".to_string(),
                "trigger_republisher::TriggerRepublisher".to_string(),
            ]
        );
    }

    #[test]
    fn unknown_reference_fails_resolution() {
        let registry = PluginRegistry::empty();

        match registry.resolve("plugins.rpc_server_plugin", "RpcServerPlugin") {
            Err(TwinError::UnknownPlugin { reference }) => {
                assert_eq!(reference, "plugins.rpc_server_plugin::RpcServerPlugin")
            }
            _ => panic!("expected an unknown plugin error"),
        }
    }

    #[test]
    fn register_replaces_existing_constructor() {
        let mut registry = PluginRegistry::with_builtin_plugins();

        let replaced = registry.register("record_sink", "RecordSink", |_| {
            Err(TwinError::Protocol("replaced".to_string()))
        });

        assert!(replaced.is_some());
        assert!(registry.resolve("record_sink", "RecordSink").is_ok());
    }
}
