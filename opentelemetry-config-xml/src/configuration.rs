//! Root configuration object the XML document is bound onto.

use crate::{
    collection::ComponentList,
    component::{Capability, Component, TelemetryChannel},
    registry::TypeRegistry,
};

/// Telemetry pipeline produced by loading configuration.
///
/// Binds from the `ApplicationInsights` root element. Unknown sections of the
/// document are ignored so other tools can keep their own settings in the
/// same file.
#[derive(Debug)]
pub struct TelemetryConfiguration {
    instrumentation_key: String,
    disable_telemetry: bool,
    telemetry_channel: Option<Box<dyn Component>>,
    telemetry_initializers: ComponentList,
    context_initializers: ComponentList,
    telemetry_modules: ComponentList,
}

impl TelemetryConfiguration {
    pub fn new() -> Self {
        TelemetryConfiguration {
            instrumentation_key: String::new(),
            disable_telemetry: false,
            telemetry_channel: None,
            telemetry_initializers: ComponentList::new(Capability::TelemetryInitializer),
            context_initializers: ComponentList::new(Capability::ContextInitializer),
            telemetry_modules: ComponentList::new(Capability::TelemetryModule),
        }
    }

    pub fn instrumentation_key(&self) -> &str {
        &self.instrumentation_key
    }

    pub fn set_instrumentation_key(&mut self, instrumentation_key: impl Into<String>) {
        self.instrumentation_key = instrumentation_key.into();
    }

    pub fn disable_telemetry(&self) -> bool {
        self.disable_telemetry
    }

    pub fn set_disable_telemetry(&mut self, disable_telemetry: bool) {
        self.disable_telemetry = disable_telemetry;
    }

    pub fn telemetry_channel(&self) -> Option<&dyn TelemetryChannel> {
        self.telemetry_channel
            .as_deref()
            .and_then(|channel| channel.as_telemetry_channel())
    }

    /// The bound channel as a plain component, e.g. for downcasting.
    pub fn telemetry_channel_component(&self) -> Option<&dyn Component> {
        self.telemetry_channel.as_deref()
    }

    pub fn set_telemetry_channel(&mut self, channel: impl TelemetryChannel) {
        self.telemetry_channel = Some(Box::new(channel));
    }

    pub fn telemetry_initializers(&self) -> &ComponentList {
        &self.telemetry_initializers
    }

    pub fn telemetry_initializers_mut(&mut self) -> &mut ComponentList {
        &mut self.telemetry_initializers
    }

    pub fn context_initializers(&self) -> &ComponentList {
        &self.context_initializers
    }

    pub fn context_initializers_mut(&mut self) -> &mut ComponentList {
        &mut self.context_initializers
    }

    pub fn telemetry_modules(&self) -> &ComponentList {
        &self.telemetry_modules
    }

    pub fn telemetry_modules_mut(&mut self) -> &mut ComponentList {
        &mut self.telemetry_modules
    }
}

impl Default for TelemetryConfiguration {
    fn default() -> Self {
        Self::new()
    }
}

impl Component for TelemetryConfiguration {}

pub(crate) fn register(registry: &mut TypeRegistry) {
    registry
        .register::<TelemetryConfiguration>()
        .alias("TelemetryConfiguration")
        .lenient()
        .property("InstrumentationKey", |c| &mut c.instrumentation_key)
        .property("DisableTelemetry", |c| &mut c.disable_telemetry)
        .component("TelemetryChannel", Capability::TelemetryChannel, |c| {
            &mut c.telemetry_channel
        })
        .collection("TelemetryInitializers", |c| &mut c.telemetry_initializers)
        .collection("ContextInitializers", |c| &mut c.context_initializers)
        .collection("TelemetryModules", |c| &mut c.telemetry_modules);
}
