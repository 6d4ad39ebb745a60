//! # Configurable components
//!
//! Every object the binder constructs or updates is a [`Component`]. The
//! capability traits describe the roles a component can play in the
//! telemetry pipeline; a component advertises them through the `as_*`
//! accessors so the binder can check assignability without reflection.

use std::{
    any::Any,
    fmt::{self, Debug, Display},
};

use crate::{
    telemetry::{TelemetryContext, TelemetryItem},
    TelemetryConfiguration,
};

/// Access to the concrete type behind a trait object.
pub trait AsAny: Any {
    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

impl<T: Any> AsAny for T {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

/// An object that can be created and populated from XML configuration.
///
/// Only the capability accessors matching the traits a type implements need
/// to be overridden, e.g.
///
/// ```
/// use opentelemetry_config_xml::{Component, TelemetryInitializer, TelemetryItem};
///
/// #[derive(Debug, Default)]
/// struct RoleNameInitializer {
///     role_name: String,
/// }
///
/// impl Component for RoleNameInitializer {
///     fn as_telemetry_initializer(&self) -> Option<&dyn TelemetryInitializer> {
///         Some(self)
///     }
/// }
///
/// impl TelemetryInitializer for RoleNameInitializer {
///     fn initialize(&self, item: &mut TelemetryItem) {
///         item.context_mut().set("ai.cloud.role", self.role_name.clone());
///     }
/// }
/// ```
pub trait Component: AsAny + Debug + Send + Sync + 'static {
    /// Identity of the concrete type, used as its registered name.
    fn type_name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }

    fn as_telemetry_channel(&self) -> Option<&dyn TelemetryChannel> {
        None
    }

    fn as_telemetry_initializer(&self) -> Option<&dyn TelemetryInitializer> {
        None
    }

    fn as_context_initializer(&self) -> Option<&dyn ContextInitializer> {
        None
    }

    fn as_telemetry_module(&self) -> Option<&dyn TelemetryModule> {
        None
    }
}

impl dyn Component {
    pub fn is<T: Component>(&self) -> bool {
        self.as_any().is::<T>()
    }

    pub fn downcast_ref<T: Component>(&self) -> Option<&T> {
        self.as_any().downcast_ref::<T>()
    }

    pub fn downcast_mut<T: Component>(&mut self) -> Option<&mut T> {
        self.as_any_mut().downcast_mut::<T>()
    }
}

/// Sends telemetry items to their destination.
pub trait TelemetryChannel: Component {
    /// Whether the channel runs in developer mode; `None` when not configured.
    fn developer_mode(&self) -> Option<bool>;

    fn endpoint_address(&self) -> &str;

    fn send(&self, item: TelemetryItem);
}

/// Populates properties of every telemetry item before it is sent.
pub trait TelemetryInitializer: Component {
    fn initialize(&self, item: &mut TelemetryItem);
}

/// Populates the shared context once per telemetry client.
pub trait ContextInitializer: Component {
    fn initialize(&self, context: &mut TelemetryContext);
}

/// Receives the fully bound configuration once loading completes.
pub trait TelemetryModule: Component {
    fn initialize(&self, configuration: &TelemetryConfiguration);
}

/// Roles a component can be bound to when its concrete type is not known
/// up front.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Capability {
    /// Any registered component.
    Component,
    TelemetryChannel,
    TelemetryInitializer,
    ContextInitializer,
    TelemetryModule,
}

impl Capability {
    pub fn name(self) -> &'static str {
        match self {
            Capability::Component => "Component",
            Capability::TelemetryChannel => "TelemetryChannel",
            Capability::TelemetryInitializer => "TelemetryInitializer",
            Capability::ContextInitializer => "ContextInitializer",
            Capability::TelemetryModule => "TelemetryModule",
        }
    }

    pub fn is_implemented_by(self, component: &dyn Component) -> bool {
        match self {
            Capability::Component => true,
            Capability::TelemetryChannel => component.as_telemetry_channel().is_some(),
            Capability::TelemetryInitializer => component.as_telemetry_initializer().is_some(),
            Capability::ContextInitializer => component.as_context_initializer().is_some(),
            Capability::TelemetryModule => component.as_telemetry_module().is_some(),
        }
    }
}

impl Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
