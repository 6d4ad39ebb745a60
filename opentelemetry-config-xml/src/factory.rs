//! # Configuration factory
//!
//! Startup entry point: installs the default pipeline components, binds the
//! configuration document onto a [`TelemetryConfiguration`] and notifies the
//! telemetry modules found in the result.

use std::{fs, path::Path};

use opentelemetry::otel_debug;
use roxmltree::Document;

use crate::{
    binder::Binder,
    channel::InMemoryChannel,
    component::Component,
    initializers::{SdkVersionPropertyContextInitializer, TimestampPropertyInitializer},
    registry::TypeRegistry,
    Result, TelemetryConfiguration,
};

/// Builds [`TelemetryConfiguration`] instances from XML.
#[derive(Debug)]
pub struct TelemetryConfigurationFactory {
    registry: TypeRegistry,
}

impl TelemetryConfigurationFactory {
    /// Creates a factory resolving types through `registry`.
    pub fn new(registry: TypeRegistry) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &TypeRegistry {
        &self.registry
    }

    pub fn registry_mut(&mut self) -> &mut TypeRegistry {
        &mut self.registry
    }

    pub fn binder(&self) -> Binder<'_> {
        Binder::new(&self.registry)
    }

    /// Initializes `configuration` from the optional XML document text.
    ///
    /// Defaults are installed first, so the document can update them in
    /// place. Every bound component that is also a telemetry module is then
    /// initialized with the finished configuration.
    pub fn initialize(
        &self,
        configuration: &mut TelemetryConfiguration,
        xml: Option<&str>,
    ) -> Result<()> {
        install_defaults(configuration);

        if let Some(xml) = xml {
            let document = Document::parse(xml)?;
            self.binder().load_from_xml(configuration, &document)?;
        }

        initialize_modules(configuration);
        Ok(())
    }

    /// Initializes `configuration` from the XML file at `path`.
    pub fn initialize_from_file(
        &self,
        configuration: &mut TelemetryConfiguration,
        path: impl AsRef<Path>,
    ) -> Result<()> {
        let xml = fs::read_to_string(path.as_ref())?;
        otel_debug!(
            name: "ConfigXml.FileRead",
            path = path.as_ref().display().to_string().as_str(),
            size = xml.len()
        );
        self.initialize(configuration, Some(&xml))
    }
}

impl Default for TelemetryConfigurationFactory {
    fn default() -> Self {
        Self::new(TypeRegistry::new())
    }
}

fn install_defaults(configuration: &mut TelemetryConfiguration) {
    if configuration.telemetry_channel_component().is_none() {
        configuration.set_telemetry_channel(InMemoryChannel::new());
    }

    let initializers = configuration.telemetry_initializers_mut();
    if !initializers.contains_type::<TimestampPropertyInitializer>() {
        initializers.add(TimestampPropertyInitializer);
    }

    let context_initializers = configuration.context_initializers_mut();
    if !context_initializers.contains_type::<SdkVersionPropertyContextInitializer>() {
        context_initializers.insert(0, SdkVersionPropertyContextInitializer);
    }
}

fn initialize_modules(configuration: &TelemetryConfiguration) {
    let components = configuration
        .telemetry_initializers()
        .iter()
        .chain(configuration.context_initializers().iter())
        .chain(configuration.telemetry_channel_component())
        .chain(configuration.telemetry_modules().iter());

    for component in components {
        if let Some(module) = component.as_telemetry_module() {
            otel_debug!(name: "ConfigXml.ModuleInitialize", type_name = component.type_name());
            module.initialize(configuration);
        }
    }
}
