//! # Library for XML declarative configuration of telemetry pipelines.
//!
//! This library binds an XML configuration document onto a graph of
//! telemetry components. Types named in `Type` attributes are looked up in a
//! [`TypeRegistry`], instantiated, and populated from child elements and
//! attributes; collections are filled from `Add` elements.
//!
//! ```
//! use opentelemetry_config_xml::{TelemetryConfiguration, TelemetryConfigurationFactory};
//!
//! let xml = r#"<ApplicationInsights xmlns="http://schemas.microsoft.com/ApplicationInsights/2013/Settings">
//!     <InstrumentationKey>F8474271-D231-45B6-8DD4-D344C309AE69</InstrumentationKey>
//! </ApplicationInsights>"#;
//!
//! let factory = TelemetryConfigurationFactory::default();
//! let mut configuration = TelemetryConfiguration::new();
//! factory.initialize(&mut configuration, Some(xml)).unwrap();
//!
//! assert_eq!(
//!     configuration.instrumentation_key(),
//!     "F8474271-D231-45B6-8DD4-D344C309AE69"
//! );
//! assert!(configuration.telemetry_channel().is_some());
//! ```

pub mod binder;
pub mod channel;
pub mod collection;
pub mod component;
pub mod configuration;
pub mod factory;
pub mod initializers;
pub mod registry;
pub mod telemetry;
pub mod value;

pub use binder::Binder;
pub use channel::InMemoryChannel;
pub use collection::{Collection, ComponentList};
pub use component::{
    Capability, Component, ContextInitializer, TelemetryChannel, TelemetryInitializer,
    TelemetryModule,
};
pub use configuration::TelemetryConfiguration;
pub use factory::TelemetryConfigurationFactory;
pub use initializers::{SdkVersionPropertyContextInitializer, TimestampPropertyInitializer};
pub use registry::{Property, PropertyKind, Registration, TypeBuilder, TypeRegistry};
pub use telemetry::{TelemetryContext, TelemetryItem};
pub use value::{ComponentType, Primitive, Value, ValueError, ValueType};

/// Errors raised while loading configuration.
///
/// Any error aborts the load; components bound before the failure keep the
/// values already assigned to them.
#[derive(Debug, thiserror::Error)]
pub enum ConfigurationError {
    /// A type identifier could not be resolved, is malformed, or names a type
    /// that does not fit where it is used.
    #[error("type '{type_name}' could not be loaded: {reason}")]
    TypeResolution { type_name: String, reason: String },

    #[error("value '{text}' of element '{element}' cannot be converted to {target}")]
    ValueFormat {
        element: String,
        text: String,
        target: String,
        #[source]
        source: ValueError,
    },

    #[error("element '{element}' does not match any property of type '{type_name}'")]
    UnknownProperty { element: String, type_name: String },

    #[error("element '{element}' must specify the type of the instance in a 'Type' attribute")]
    MissingTypeInformation { element: String },

    #[error("invalid configuration document: {0}")]
    InvalidDocument(#[from] roxmltree::Error),

    #[error("configuration file could not be read: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, ConfigurationError>;
