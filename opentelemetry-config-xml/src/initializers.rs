//! Built-in telemetry and context initializers.

use std::time::SystemTime;

use crate::{
    component::{Component, ContextInitializer, TelemetryInitializer},
    registry::TypeRegistry,
    telemetry::{TelemetryContext, TelemetryItem},
};

/// Context key holding the SDK version.
pub const SDK_VERSION_KEY: &str = "ai.internal.sdkVersion";

/// Stamps items that have no timestamp with the current time.
#[derive(Debug, Default)]
pub struct TimestampPropertyInitializer;

impl Component for TimestampPropertyInitializer {
    fn as_telemetry_initializer(&self) -> Option<&dyn TelemetryInitializer> {
        Some(self)
    }
}

impl TelemetryInitializer for TimestampPropertyInitializer {
    fn initialize(&self, item: &mut TelemetryItem) {
        if item.timestamp().is_none() {
            item.set_timestamp(SystemTime::now());
        }
    }
}

/// Records the SDK version in the telemetry context unless one is set.
#[derive(Debug, Default)]
pub struct SdkVersionPropertyContextInitializer;

impl SdkVersionPropertyContextInitializer {
    pub fn sdk_version() -> String {
        format!("rust:{}", env!("CARGO_PKG_VERSION"))
    }
}

impl Component for SdkVersionPropertyContextInitializer {
    fn as_context_initializer(&self) -> Option<&dyn ContextInitializer> {
        Some(self)
    }
}

impl ContextInitializer for SdkVersionPropertyContextInitializer {
    fn initialize(&self, context: &mut TelemetryContext) {
        if context.get(SDK_VERSION_KEY).is_none() {
            context.set(SDK_VERSION_KEY, Self::sdk_version());
        }
    }
}

pub(crate) fn register(registry: &mut TypeRegistry) {
    registry
        .register::<TimestampPropertyInitializer>()
        .alias("TimestampPropertyInitializer");
    registry
        .register::<SdkVersionPropertyContextInitializer>()
        .alias("SdkVersionPropertyContextInitializer");
}
