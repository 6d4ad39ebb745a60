//! # Example XML Config Console
//!
//! This example demonstrates how to bind a telemetry pipeline from an XML
//! configuration file with the OpenTelemetry Config XML crate, including
//! custom components registered by the application.

use std::env;

use opentelemetry_config_xml::{
    Component, TelemetryConfiguration, TelemetryConfigurationFactory, TelemetryInitializer,
    TelemetryItem, TelemetryModule, TypeRegistry,
};
use tracing_subscriber::{prelude::*, EnvFilter};

pub fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args: Vec<String> = env::args().collect();

    if args.len() == 1 || (args.len() > 1 && args[1] == "--help") {
        println!("Usage: cargo run -- --file ../ApplicationInsights.config");
        println!("This example demonstrates how to bind a telemetry pipeline from an XML configuration file.");
        return Ok(());
    }
    if args.len() < 3 || args[1] != "--file" {
        println!("Error: Configuration file path not provided.");
        println!("Usage: cargo run -- --file ../ApplicationInsights.config");
        return Ok(());
    }
    let config_file = &args[2];

    // Internal logs of the binder are emitted through tracing.
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug"));
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_filter(filter))
        .init();

    // Register the application's own components next to the built-in ones.
    let mut registry = TypeRegistry::new();
    registry
        .register::<ConsoleRoleNameInitializer>()
        .alias("ConsoleRoleNameInitializer")
        .property("RoleName", |initializer| &mut initializer.role_name);
    registry
        .register::<ConsoleHeartbeatModule>()
        .alias("ConsoleHeartbeatModule");

    let factory = TelemetryConfigurationFactory::new(registry);
    let mut configuration = TelemetryConfiguration::new();
    factory.initialize_from_file(&mut configuration, config_file)?;

    println!("Instrumentation key: {}", configuration.instrumentation_key());
    println!("Telemetry disabled: {}", configuration.disable_telemetry());
    if let Some(channel) = configuration.telemetry_channel() {
        println!(
            "Telemetry channel: {} (endpoint: {}, developer mode: {:?})",
            channel.type_name(),
            channel.endpoint_address(),
            channel.developer_mode()
        );
    }
    for initializer in configuration.telemetry_initializers().iter() {
        println!("Telemetry initializer: {}", initializer.type_name());
    }
    for initializer in configuration.context_initializers().iter() {
        println!("Context initializer: {}", initializer.type_name());
    }
    for module in configuration.telemetry_modules().iter() {
        println!("Telemetry module: {}", module.type_name());
    }

    // Run one item through the bound pipeline.
    let mut item = TelemetryItem::new("console-example-event");
    for initializer in configuration.context_initializers().iter() {
        if let Some(initializer) = initializer.as_context_initializer() {
            initializer.initialize(item.context_mut());
        }
    }
    for initializer in configuration.telemetry_initializers().iter() {
        if let Some(initializer) = initializer.as_telemetry_initializer() {
            initializer.initialize(&mut item);
        }
    }
    println!("Telemetry item: {:?}", item);

    if let Some(channel) = configuration.telemetry_channel() {
        channel.send(item);
        println!("Telemetry item sent to {}", channel.type_name());
    }

    Ok(())
}

#[derive(Debug, Default)]
pub struct ConsoleRoleNameInitializer {
    role_name: String,
}

impl Component for ConsoleRoleNameInitializer {
    fn as_telemetry_initializer(&self) -> Option<&dyn TelemetryInitializer> {
        Some(self)
    }
}

impl TelemetryInitializer for ConsoleRoleNameInitializer {
    fn initialize(&self, item: &mut TelemetryItem) {
        item.context_mut().set("ai.cloud.role", self.role_name.clone());
    }
}

#[derive(Debug, Default)]
pub struct ConsoleHeartbeatModule;

impl Component for ConsoleHeartbeatModule {
    fn as_telemetry_module(&self) -> Option<&dyn TelemetryModule> {
        Some(self)
    }
}

impl TelemetryModule for ConsoleHeartbeatModule {
    fn initialize(&self, configuration: &TelemetryConfiguration) {
        println!(
            "Heartbeat module initialized for instrumentation key {}",
            configuration.instrumentation_key()
        );
    }
}

