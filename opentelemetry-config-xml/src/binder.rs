//! # XML to component binder
//!
//! Walks a configuration XML tree and binds it onto components:
//!
//! - [`Binder::load_instance`] resolves the type of a definition element,
//!   creates or reuses an instance and converts primitive text;
//! - [`Binder::load_properties`] populates the properties of an instance from
//!   child elements and attributes, elements taking precedence;
//! - [`Binder::load_instances`] populates a collection from `Add` elements,
//!   updating elements of a matching type in place.

use opentelemetry::{otel_debug, otel_warn};
use roxmltree::{Document, Node};

use crate::{
    collection::Collection,
    component::Component,
    registry::{Property, PropertyKind, Registration, TypeRegistry},
    value::{ComponentType, Value, ValueError, ValueType},
    ConfigurationError, Result,
};

/// Attribute selecting the concrete type of a definition.
pub const TYPE_ATTRIBUTE: &str = "Type";
/// Element adding an entry to a collection.
pub const ADD_ELEMENT: &str = "Add";

const NAMESPACE_DECLARATION: &str = "xmlns";

/// Binds configuration XML onto components known to a [`TypeRegistry`].
///
/// The binder holds no state of its own; it can be shared freely and used
/// for any number of loads.
#[derive(Clone, Copy, Debug)]
pub struct Binder<'r> {
    registry: &'r TypeRegistry,
}

impl<'r> Binder<'r> {
    pub fn new(registry: &'r TypeRegistry) -> Self {
        Binder { registry }
    }

    pub fn registry(&self) -> &'r TypeRegistry {
        self.registry
    }

    /// Binds the root element of `document` onto `instance`.
    pub fn load_from_xml(
        &self,
        instance: &mut dyn Component,
        document: &Document<'_>,
    ) -> Result<()> {
        let root = document.root_element();
        otel_debug!(
            name: "ConfigXml.LoadStart",
            root = root.tag_name().name(),
            type_name = instance.type_name()
        );
        self.load_properties(root, instance)?;
        otel_debug!(name: "ConfigXml.LoadComplete", type_name = instance.type_name());
        Ok(())
    }

    /// Creates an instance of the type named by `type_name`, checking that it
    /// can be assigned to `expected`.
    pub fn create_instance(
        &self,
        expected: &ValueType,
        type_name: &str,
    ) -> Result<Box<dyn Component>> {
        let registration = self.registry.resolve(type_name)?;
        let instance = registration.create();
        if !is_assignable(expected, registration, &*instance) {
            return Err(ConfigurationError::TypeResolution {
                type_name: type_name.to_string(),
                reason: format!("the type is not assignable to '{expected}'"),
            });
        }
        otel_debug!(
            name: "ConfigXml.InstanceCreated",
            type_name = registration.type_name(),
            expected = expected.to_string().as_str()
        );
        Ok(instance)
    }

    /// Loads the value described by `definition`.
    ///
    /// A missing definition returns `existing` untouched. A `Type` attribute
    /// always creates a new instance; otherwise nested content updates
    /// `existing`, or a new instance of a concrete `expected` type, and plain
    /// text is converted to `expected`.
    pub fn load_instance(
        &self,
        definition: Option<Node<'_, '_>>,
        expected: &ValueType,
        existing: Value,
    ) -> Result<Value> {
        let mut value = existing;
        self.bind_instance(definition, expected, &mut value)?;
        Ok(value)
    }

    /// Binds `definition` into `slot`. The slot is only replaced once the new
    /// value is complete, so on error it still holds the previous value or
    /// the partially updated instance.
    fn bind_instance(
        &self,
        definition: Option<Node<'_, '_>>,
        expected: &ValueType,
        slot: &mut Value,
    ) -> Result<()> {
        let Some(definition) = definition else {
            return Ok(());
        };

        if let Some(type_name) = definition.attribute(TYPE_ATTRIBUTE) {
            let mut instance = self.create_instance(expected, type_name)?;
            self.load_properties(definition, &mut *instance)?;
            *slot = Value::Component(instance);
            return Ok(());
        }

        if !has_nested_content(definition) {
            let text = element_text(definition);
            *slot = self.convert(definition.tag_name().name(), text.trim(), expected)?;
            return Ok(());
        }

        if let Value::Component(instance) = slot {
            return self.load_properties(definition, &mut **instance);
        }

        match expected {
            ValueType::Component(ComponentType::Named(type_name)) => {
                let mut instance = self.registry.resolve(type_name)?.create();
                self.load_properties(definition, &mut *instance)?;
                *slot = Value::Component(instance);
                Ok(())
            }
            _ => Err(ConfigurationError::MissingTypeInformation {
                element: definition.tag_name().name().to_string(),
            }),
        }
    }

    /// Populates the properties of `instance` from `definition`.
    ///
    /// Child elements take precedence over attributes of the same name.
    /// Child elements that match no property fail the load unless the type
    /// is registered as lenient; `Add` elements are always accepted.
    pub fn load_properties(
        &self,
        definition: Node<'_, '_>,
        instance: &mut dyn Component,
    ) -> Result<()> {
        let registration = self.registry.registration_of(instance).ok_or_else(|| {
            ConfigurationError::TypeResolution {
                type_name: instance.type_name().to_string(),
                reason: "the type is not registered".to_string(),
            }
        })?;

        self.check_unknown_elements(definition, registration)?;

        for property in registration.properties() {
            let name = property.name();
            if let Some(element) = child_element(definition, name) {
                self.load_property_element(registration, property, element, instance)?;
            } else if let Some(text) = property_attribute(definition, name) {
                self.load_property_attribute(property, text.trim(), instance)?;
            }
        }

        Ok(())
    }

    fn load_property_element(
        &self,
        registration: &Registration,
        property: &Property,
        element: Node<'_, '_>,
        instance: &mut dyn Component,
    ) -> Result<()> {
        let name = property.name();
        match property.kind() {
            PropertyKind::Collection => {
                let collection = property.collection(instance).ok_or_else(|| {
                    ConfigurationError::TypeResolution {
                        type_name: registration.type_name().to_string(),
                        reason: format!("'{name}' is not a collection"),
                    }
                })?;
                self.load_instances(element, collection)
            }
            PropertyKind::ReadWrite(value_type) => {
                let mut value = property
                    .get(instance)
                    .map_err(|source| value_error(name, "", &value_type, source))?;
                let bound = self.bind_instance(Some(element), &value_type, &mut value);
                // `get` moved the value out, so restore it even on error.
                property
                    .set(instance, value)
                    .map_err(|source| value_error(name, "", &value_type, source))?;
                bound
            }
            PropertyKind::ReadOnly(value_type) => {
                let current = property
                    .get(instance)
                    .map_err(|source| value_error(name, "", &value_type, source))?;
                self.load_instance(Some(element), &value_type, current)
                    .map(drop)
            }
            PropertyKind::ReadOnlyComponent(component_type) => {
                let expected = ValueType::Component(component_type);
                if element.attribute(TYPE_ATTRIBUTE).is_some() || !has_nested_content(element) {
                    // Nothing to assign the result to.
                    return self
                        .load_instance(Some(element), &expected, Value::Null)
                        .map(drop);
                }
                let target = property.component(instance).ok_or_else(|| {
                    ConfigurationError::TypeResolution {
                        type_name: registration.type_name().to_string(),
                        reason: format!("'{name}' is not a component property"),
                    }
                })?;
                self.load_properties(element, target)
            }
        }
    }

    fn load_property_attribute(
        &self,
        property: &Property,
        text: &str,
        instance: &mut dyn Component,
    ) -> Result<()> {
        let name = property.name();
        match property.kind() {
            PropertyKind::Collection if text.is_empty() => Ok(()),
            PropertyKind::Collection => {
                let target = match property.collection(instance) {
                    Some(collection) => format!("a collection of {}", collection.element_type()),
                    None => "a collection".to_string(),
                };
                Err(ConfigurationError::ValueFormat {
                    element: name.to_string(),
                    text: text.to_string(),
                    target,
                    source: ValueError::NotAValue,
                })
            }
            PropertyKind::ReadWrite(value_type) => {
                let value = self.convert(name, text, &value_type)?;
                property
                    .set(instance, value)
                    .map_err(|source| value_error(name, text, &value_type, source))
            }
            PropertyKind::ReadOnly(value_type) => self.convert(name, text, &value_type).map(drop),
            PropertyKind::ReadOnlyComponent(component_type) => self
                .convert(name, text, &ValueType::Component(component_type))
                .map(drop),
        }
    }

    /// Populates `target` from the `Add` child elements of `definition`.
    ///
    /// Other child elements are ignored. When an element of the resolved
    /// type is already present it is updated in place rather than appended.
    pub fn load_instances(
        &self,
        definition: Node<'_, '_>,
        target: &mut dyn Collection,
    ) -> Result<()> {
        let element_type = target.element_type();

        for add in definition
            .children()
            .filter(|child| child.is_element() && child.tag_name().name() == ADD_ELEMENT)
        {
            let resolved = match add.attribute(TYPE_ATTRIBUTE) {
                Some(type_name) => Some(self.registry.resolve(type_name)?.type_name()),
                None => match element_type {
                    ValueType::Component(ComponentType::Named(type_name)) => Some(type_name),
                    _ => None,
                },
            };

            let existing = match resolved {
                Some(type_name) => target.find_by_type(type_name),
                None => None,
            };
            if let Some(existing) = existing {
                otel_debug!(
                    name: "ConfigXml.CollectionElementUpdated",
                    type_name = existing.type_name()
                );
                self.load_properties(add, existing)?;
                continue;
            }

            let value = self.load_instance(Some(add), &element_type, Value::Null)?;
            target.push(value).map_err(|source| {
                value_error(ADD_ELEMENT, element_text(add).trim(), &element_type, source)
            })?;
        }

        Ok(())
    }

    fn convert(&self, element: &str, text: &str, expected: &ValueType) -> Result<Value> {
        expected
            .parse(text)
            .map_err(|source| value_error(element, text, expected, source))
    }

    fn check_unknown_elements(
        &self,
        definition: Node<'_, '_>,
        registration: &Registration,
    ) -> Result<()> {
        for child in definition.children().filter(|child| child.is_element()) {
            let name = child.tag_name().name();
            if name == ADD_ELEMENT || registration.property(name).is_some() {
                continue;
            }
            if registration.is_lenient() {
                otel_warn!(
                    name: "ConfigXml.UnknownElementIgnored",
                    element = name,
                    type_name = registration.type_name()
                );
                continue;
            }
            return Err(ConfigurationError::UnknownProperty {
                element: name.to_string(),
                type_name: registration.type_name().to_string(),
            });
        }
        Ok(())
    }
}

fn is_assignable(
    expected: &ValueType,
    registration: &Registration,
    instance: &dyn Component,
) -> bool {
    match expected {
        ValueType::Component(ComponentType::Named(type_name)) => {
            registration.type_name() == *type_name
        }
        ValueType::Component(ComponentType::Capability(capability)) => {
            capability.is_implemented_by(instance)
        }
        ValueType::Primitive(_) | ValueType::Nullable(_) => false,
    }
}

fn value_error(
    element: &str,
    text: &str,
    target: &ValueType,
    source: ValueError,
) -> ConfigurationError {
    ConfigurationError::ValueFormat {
        element: element.to_string(),
        text: text.to_string(),
        target: target.to_string(),
        source,
    }
}

fn is_reserved_attribute(name: &str) -> bool {
    name == TYPE_ATTRIBUTE || name == NAMESPACE_DECLARATION
}

fn has_nested_content(definition: Node<'_, '_>) -> bool {
    definition.children().any(|child| child.is_element())
        || definition
            .attributes()
            .any(|attribute| !is_reserved_attribute(attribute.name()))
}

fn child_element<'a, 'input>(definition: Node<'a, 'input>, name: &str) -> Option<Node<'a, 'input>> {
    definition
        .children()
        .find(|child| child.is_element() && child.tag_name().name() == name)
}

fn property_attribute<'a>(definition: Node<'a, '_>, name: &str) -> Option<&'a str> {
    if is_reserved_attribute(name) {
        return None;
    }
    definition
        .attributes()
        .find(|attribute| attribute.name() == name)
        .map(|attribute| attribute.value())
}

fn element_text(definition: Node<'_, '_>) -> String {
    definition
        .children()
        .filter(|child| child.is_text())
        .filter_map(|child| child.text())
        .collect()
}

#[cfg(test)]
mod tests {
    use std::{
        ptr,
        sync::atomic::{AtomicI32, Ordering},
        time::Duration,
    };

    use super::*;
    use crate::{
        collection::ComponentList,
        component::{Capability, TelemetryInitializer, TelemetryModule},
        initializers::TimestampPropertyInitializer,
        telemetry::TelemetryItem,
        value::Primitive,
        TelemetryConfiguration,
    };

    const SETTINGS_NAMESPACE: &str = "http://schemas.microsoft.com/ApplicationInsights/2013/Settings";

    #[derive(Debug, Default)]
    struct StubClassWithProperties {
        int32_property: i32,
        string_property: Option<String>,
        time_span_property: Duration,
        child_property: Option<Box<dyn Component>>,
        read_only_property: String,
    }

    impl Component for StubClassWithProperties {}

    #[derive(Debug, Default)]
    struct StubTelemetryInitializer;

    impl Component for StubTelemetryInitializer {
        fn as_telemetry_initializer(&self) -> Option<&dyn TelemetryInitializer> {
            Some(self)
        }
    }

    impl TelemetryInitializer for StubTelemetryInitializer {
        fn initialize(&self, _item: &mut TelemetryItem) {}
    }

    #[derive(Debug, Default)]
    struct StubConfigurableWithProperties {
        int32_property: AtomicI32,
        string_property: Option<String>,
    }

    impl StubConfigurableWithProperties {
        fn int32(&self) -> i32 {
            self.int32_property.load(Ordering::SeqCst)
        }
    }

    impl Component for StubConfigurableWithProperties {
        fn as_telemetry_module(&self) -> Option<&dyn TelemetryModule> {
            Some(self)
        }
    }

    impl TelemetryModule for StubConfigurableWithProperties {
        fn initialize(&self, _configuration: &TelemetryConfiguration) {}
    }

    #[derive(Debug, Default)]
    struct StubClassWithReadOnlyChild {
        child: StubClassWithProperties,
    }

    impl Component for StubClassWithReadOnlyChild {}

    fn registry() -> TypeRegistry {
        let mut registry = TypeRegistry::new();
        registry
            .register::<StubClassWithProperties>()
            .alias("StubClassWithProperties")
            .property("Int32Property", |s| &mut s.int32_property)
            .property("StringProperty", |s| &mut s.string_property)
            .property("TimeSpanProperty", |s| &mut s.time_span_property)
            .component(
                "ChildProperty",
                ComponentType::of::<StubClassWithProperties>(),
                |s| &mut s.child_property,
            )
            .read_only("ReadOnlyProperty", |s| &s.read_only_property);
        registry
            .register::<StubTelemetryInitializer>()
            .alias("StubTelemetryInitializer");
        registry
            .register::<StubConfigurableWithProperties>()
            .alias("StubConfigurableWithProperties")
            .property("Int32Property", |s| s.int32_property.get_mut())
            .property("StringProperty", |s| &mut s.string_property);
        registry
            .register::<StubClassWithReadOnlyChild>()
            .alias("StubClassWithReadOnlyChild")
            .read_only_component(
                "Child",
                ComponentType::of::<StubClassWithProperties>(),
                |s| &mut s.child,
            );
        registry
    }

    fn stub_type() -> ValueType {
        ValueType::Component(ComponentType::of::<StubClassWithProperties>())
    }

    fn into_stub(value: Value) -> Box<dyn Component> {
        match value {
            Value::Component(component) => component,
            other => panic!("Expected component, got {:?}", other),
        }
    }

    fn stub(component: &dyn Component) -> &StubClassWithProperties {
        component
            .downcast_ref::<StubClassWithProperties>()
            .expect("Expected StubClassWithProperties")
    }

    fn configuration(inner_xml: &str) -> String {
        format!(
            r#"<?xml version="1.0" encoding="utf-8" ?>
            <ApplicationInsights xmlns="{SETTINGS_NAMESPACE}">
            {inner_xml}
            </ApplicationInsights>"#
        )
    }

    // create_instance

    #[test]
    fn test_create_instance_returns_instance_of_type_specified_by_type_name() {
        let registry = registry();
        let binder = Binder::new(&registry);
        let expected = ValueType::Component(Capability::TelemetryInitializer.into());

        let instance = binder
            .create_instance(&expected, std::any::type_name::<StubTelemetryInitializer>())
            .unwrap();

        assert!(instance.is::<StubTelemetryInitializer>());
    }

    #[test]
    fn test_create_instance_fails_when_type_cannot_be_found() {
        let registry = registry();
        let binder = Binder::new(&registry);
        let expected = ValueType::Component(Capability::TelemetryInitializer.into());

        let err = binder
            .create_instance(&expected, "MissingType, MissingAssembly")
            .unwrap_err();

        assert!(matches!(err, ConfigurationError::TypeResolution { .. }));
        assert!(err.to_string().contains("MissingType"));
    }

    #[test]
    fn test_create_instance_fails_when_type_name_is_invalid() {
        let registry = registry();
        let binder = Binder::new(&registry);
        let expected = ValueType::Component(Capability::TelemetryInitializer.into());

        let err = binder
            .create_instance(&expected, "Invalid Type Name")
            .unwrap_err();

        assert!(err.to_string().contains("Invalid Type Name"));
    }

    #[test]
    fn test_create_instance_fails_when_type_does_not_implement_expected_capability() {
        let registry = registry();
        let binder = Binder::new(&registry);
        let expected = ValueType::Component(Capability::TelemetryInitializer.into());

        let err = binder
            .create_instance(&expected, "StubClassWithProperties")
            .unwrap_err();

        let message = err.to_string();
        assert!(matches!(err, ConfigurationError::TypeResolution { .. }));
        assert!(message.contains("StubClassWithProperties"));
        assert!(message.contains("TelemetryInitializer"));
    }

    // load_from_xml

    #[test]
    fn test_load_from_xml_initializes_configuration_from_xml() {
        let registry = registry();
        let binder = Binder::new(&registry);
        let expected = "F8474271-D231-45B6-8DD4-D344C309AE69";
        let xml = configuration(&format!("<InstrumentationKey>{expected}</InstrumentationKey>"));
        let document = Document::parse(&xml).unwrap();

        let mut configuration = TelemetryConfiguration::default();
        binder.load_from_xml(&mut configuration, &document).unwrap();

        assert_eq!(configuration.instrumentation_key(), expected);
    }

    // load_instance

    #[test]
    fn test_load_instance_returns_instance_of_type_specified_in_type_attribute() {
        let registry = registry();
        let binder = Binder::new(&registry);
        let document = Document::parse(r#"<Definition Type="StubClassWithProperties"/>"#).unwrap();

        let value = binder
            .load_instance(Some(document.root_element()), &stub_type(), Value::Null)
            .unwrap();

        assert!(into_stub(value).is::<StubClassWithProperties>());
    }

    #[test]
    fn test_load_instance_sets_properties_from_child_elements() {
        let registry = registry();
        let binder = Binder::new(&registry);
        let document = Document::parse(
            r#"<Definition Type="StubClassWithProperties">
                   <StringProperty>TestValue</StringProperty>
               </Definition>"#,
        )
        .unwrap();

        let value = binder
            .load_instance(Some(document.root_element()), &stub_type(), Value::Null)
            .unwrap();

        let instance = into_stub(value);
        assert_eq!(stub(&*instance).string_property.as_deref(), Some("TestValue"));
    }

    #[test]
    fn test_load_instance_parses_duration_in_time_format() {
        let registry = registry();
        let binder = Binder::new(&registry);
        let document = Document::parse(
            r#"<Definition Type="StubClassWithProperties">
                   <TimeSpanProperty>00:00:07</TimeSpanProperty>
               </Definition>"#,
        )
        .unwrap();

        let value = binder
            .load_instance(Some(document.root_element()), &stub_type(), Value::Null)
            .unwrap();

        let instance = into_stub(value);
        assert_eq!(stub(&*instance).time_span_property, Duration::from_secs(7));
    }

    #[test]
    fn test_load_instance_parses_duration_from_one_integer_as_days() {
        let registry = registry();
        let binder = Binder::new(&registry);
        let document = Document::parse(
            r#"<Definition Type="StubClassWithProperties">
                   <TimeSpanProperty>7</TimeSpanProperty>
               </Definition>"#,
        )
        .unwrap();

        let value = binder
            .load_instance(Some(document.root_element()), &stub_type(), Value::Null)
            .unwrap();

        let instance = into_stub(value);
        assert_eq!(
            stub(&*instance).time_span_property,
            Duration::from_secs(7 * 24 * 60 * 60)
        );
    }

    #[test]
    fn test_load_instance_fails_on_invalid_duration() {
        let registry = registry();
        let binder = Binder::new(&registry);
        let document = Document::parse(
            r#"<Definition Type="StubClassWithProperties">
                   <TimeSpanProperty>TestValue</TimeSpanProperty>
               </Definition>"#,
        )
        .unwrap();

        let err = binder
            .load_instance(Some(document.root_element()), &stub_type(), Value::Null)
            .unwrap_err();

        match err {
            ConfigurationError::ValueFormat {
                element,
                text,
                target,
                source,
            } => {
                assert_eq!(element, "TimeSpanProperty");
                assert_eq!(text, "TestValue");
                assert_eq!(target, "Duration");
                assert!(matches!(source, ValueError::InvalidDuration));
            }
            other => panic!("Expected ValueFormat error, got {:?}", other),
        }
    }

    #[test]
    fn test_load_instance_updates_given_instance_without_type_attribute() {
        let registry = registry();
        let binder = Binder::new(&registry);
        let document = Document::parse(
            r#"<Definition><StringProperty>TestValue</StringProperty></Definition>"#,
        )
        .unwrap();
        let original: Box<dyn Component> = Box::new(StubClassWithProperties::default());
        let original_ptr = stub(&*original) as *const StubClassWithProperties;

        let value = binder
            .load_instance(
                Some(document.root_element()),
                &stub_type(),
                Value::Component(original),
            )
            .unwrap();

        let instance = into_stub(value);
        assert!(ptr::eq(stub(&*instance), original_ptr));
        assert_eq!(stub(&*instance).string_property.as_deref(), Some("TestValue"));
    }

    #[test]
    fn test_load_instance_converts_text_to_expected_type() {
        let registry = registry();
        let binder = Binder::new(&registry);
        let document = Document::parse("<Definition>42</Definition>").unwrap();

        let value = binder
            .load_instance(
                Some(document.root_element()),
                &ValueType::Primitive(Primitive::Int32),
                Value::Null,
            )
            .unwrap();

        assert!(matches!(value, Value::Int32(42)));
    }

    #[test]
    fn test_load_instance_trims_whitespace_around_text() {
        let registry = registry();
        let binder = Binder::new(&registry);
        let expected = "0a4b8f93-52b4-4f9b-9d44-5e1ad6ae0a83";
        let xml = format!("<InstrumentationKey>\n{expected}\n</InstrumentationKey>");
        let document = Document::parse(&xml).unwrap();

        let value = binder
            .load_instance(
                Some(document.root_element()),
                &ValueType::Primitive(Primitive::String),
                Value::Null,
            )
            .unwrap();

        assert!(matches!(value, Value::String(ref key) if key == expected));
    }

    #[test]
    fn test_load_instance_returns_null_for_empty_element_of_reference_type() {
        let registry = registry();
        let binder = Binder::new(&registry);
        let document = Document::parse("<Definition/>").unwrap();

        let value = binder
            .load_instance(
                Some(document.root_element()),
                &ValueType::Primitive(Primitive::String),
                Value::String("Test Value".into()),
            )
            .unwrap();

        assert!(value.is_null());
    }

    #[test]
    fn test_load_instance_returns_zero_value_for_empty_element_of_value_type() {
        let registry = registry();
        let binder = Binder::new(&registry);
        let document = Document::parse("<Definition/>").unwrap();

        let value = binder
            .load_instance(
                Some(document.root_element()),
                &ValueType::Primitive(Primitive::Int32),
                Value::Int32(12),
            )
            .unwrap();

        assert!(matches!(value, Value::Int32(0)));
    }

    #[test]
    fn test_load_instance_returns_existing_value_given_no_definition() {
        let registry = registry();
        let binder = Binder::new(&registry);

        let value = binder
            .load_instance(
                None,
                &ValueType::Primitive(Primitive::String),
                Value::String("Test Value".into()),
            )
            .unwrap();
        assert!(matches!(value, Value::String(ref text) if text == "Test Value"));

        let original: Box<dyn Component> = Box::new(StubClassWithProperties::default());
        let original_ptr = stub(&*original) as *const StubClassWithProperties;
        let value = binder
            .load_instance(None, &stub_type(), Value::Component(original))
            .unwrap();
        assert!(ptr::eq(stub(&*into_stub(value)), original_ptr));
    }

    #[test]
    fn test_load_instance_fails_without_type_attribute_or_existing_instance() {
        let registry = registry();
        let binder = Binder::new(&registry);
        let document = Document::parse("<Add><PropertyName/></Add>").unwrap();

        let err = binder
            .load_instance(
                Some(document.root_element()),
                &ValueType::Component(Capability::Component.into()),
                Value::Null,
            )
            .unwrap_err();

        assert!(matches!(err, ConfigurationError::MissingTypeInformation { .. }));
        let message = err.to_string();
        assert!(message.contains("Add"));
        assert!(message.contains("Type"));
    }

    #[test]
    fn test_load_instance_fails_on_text_content_without_type_attribute() {
        let registry = registry();
        let binder = Binder::new(&registry);
        let document = Document::parse("<InvalidElement>InvalidText</InvalidElement>").unwrap();

        let err = binder
            .load_instance(
                Some(document.root_element()),
                &ValueType::Component(Capability::TelemetryChannel.into()),
                Value::Null,
            )
            .unwrap_err();

        let message = err.to_string();
        assert!(message.contains("InvalidElement"));
        assert!(message.contains("InvalidText"));
        assert!(std::error::Error::source(&err).is_some());
    }

    #[test]
    fn test_load_instance_creates_expected_type_when_type_attribute_is_not_specified() {
        let registry = registry();
        let binder = Binder::new(&registry);
        let document =
            Document::parse("<Definition><Int32Property>42</Int32Property></Definition>").unwrap();

        let value = binder
            .load_instance(Some(document.root_element()), &stub_type(), Value::Null)
            .unwrap();

        assert_eq!(stub(&*into_stub(value)).int32_property, 42);
    }

    #[test]
    fn test_load_instance_creates_expected_type_from_attributes_only() {
        let registry = registry();
        let binder = Binder::new(&registry);
        let document = Document::parse(r#"<Definition Int32Property="42"/>"#).unwrap();

        let value = binder
            .load_instance(Some(document.root_element()), &stub_type(), Value::Null)
            .unwrap();

        assert_eq!(stub(&*into_stub(value)).int32_property, 42);
    }

    // load_instances

    #[test]
    fn test_load_instances_populates_list_with_instances_of_specified_type() {
        let registry = registry();
        let binder = Binder::new(&registry);
        let xml = format!(
            r#"<List xmlns="{SETTINGS_NAMESPACE}">
                   <Add Type="StubTelemetryInitializer" />
               </List>"#
        );
        let document = Document::parse(&xml).unwrap();
        let mut instances = ComponentList::new(Capability::TelemetryInitializer);

        binder
            .load_instances(document.root_element(), &mut instances)
            .unwrap();

        assert_eq!(instances.len(), 1);
        assert!(instances
            .get(0)
            .is_some_and(|instance| instance.is::<StubTelemetryInitializer>()));
    }

    #[test]
    fn test_load_instances_updates_instance_with_matching_type() {
        let registry = registry();
        let binder = Binder::new(&registry);
        let xml = format!(
            r#"<List xmlns="{SETTINGS_NAMESPACE}">
                   <Add Type="StubConfigurableWithProperties">
                       <Int32Property>77</Int32Property>
                   </Add>
               </List>"#
        );
        let document = Document::parse(&xml).unwrap();
        let mut instances = ComponentList::new(Capability::Component);
        instances.add(StubConfigurableWithProperties::default());
        let original_ptr = instances
            .get(0)
            .and_then(|instance| instance.downcast_ref::<StubConfigurableWithProperties>())
            .map(|instance| instance as *const StubConfigurableWithProperties);

        binder
            .load_instances(document.root_element(), &mut instances)
            .unwrap();

        assert_eq!(instances.len(), 1);
        let updated = instances
            .get(0)
            .and_then(|instance| instance.downcast_ref::<StubConfigurableWithProperties>())
            .unwrap();
        assert_eq!(Some(updated as *const _), original_ptr);
        assert_eq!(updated.int32(), 77);
    }

    #[test]
    fn test_load_instances_populates_list_with_primitive_values() {
        let registry = registry();
        let binder = Binder::new(&registry);
        let xml = format!(
            r#"<List xmlns="{SETTINGS_NAMESPACE}">
                   <Add>41</Add>
                   <Add>42</Add>
               </List>"#
        );
        let document = Document::parse(&xml).unwrap();
        let mut instances: Vec<i32> = Vec::new();

        binder
            .load_instances(document.root_element(), &mut instances)
            .unwrap();

        assert_eq!(instances, vec![41, 42]);
    }

    #[test]
    fn test_load_instances_ignores_elements_other_than_add() {
        let registry = registry();
        let binder = Binder::new(&registry);
        let xml = format!(
            r#"<List xmlns="{SETTINGS_NAMESPACE}">
                   <Unknown/>
                   <Add>42</Add>
               </List>"#
        );
        let document = Document::parse(&xml).unwrap();
        let mut instances: Vec<i32> = Vec::new();

        let result = binder.load_instances(document.root_element(), &mut instances);

        assert!(result.is_ok());
        assert_eq!(instances, vec![42]);
    }

    #[test]
    fn test_load_instances_appends_new_type_after_existing_elements() {
        let registry = registry();
        let binder = Binder::new(&registry);
        let document = Document::parse(
            r#"<List>
                   <Add Type="StubTelemetryInitializer"/>
                   <Add Type="StubTelemetryInitializer"/>
               </List>"#,
        )
        .unwrap();
        let mut instances = ComponentList::new(Capability::TelemetryInitializer);
        instances.add(TimestampPropertyInitializer::default());

        binder
            .load_instances(document.root_element(), &mut instances)
            .unwrap();

        // The second Add merges into the instance appended by the first.
        assert_eq!(instances.len(), 2);
        assert!(instances
            .get(1)
            .is_some_and(|instance| instance.is::<StubTelemetryInitializer>()));
    }

    #[test]
    fn test_load_instances_fails_on_add_without_type_for_capability_list() {
        let registry = registry();
        let binder = Binder::new(&registry);
        let document = Document::parse("<List><Add><Int32Property>1</Int32Property></Add></List>")
            .unwrap();
        let mut instances = ComponentList::new(Capability::TelemetryInitializer);

        let err = binder
            .load_instances(document.root_element(), &mut instances)
            .unwrap_err();

        assert!(matches!(err, ConfigurationError::MissingTypeInformation { .. }));
        assert!(instances.is_empty());
    }

    // load_properties

    #[test]
    fn test_load_properties_converts_values_to_property_type() {
        let registry = registry();
        let binder = Binder::new(&registry);
        let document =
            Document::parse("<Definition><Int32Property>42</Int32Property></Definition>").unwrap();

        let mut instance = StubClassWithProperties::default();
        binder
            .load_properties(document.root_element(), &mut instance)
            .unwrap();

        assert_eq!(instance.int32_property, 42);
    }

    #[test]
    fn test_load_properties_fails_when_instance_has_no_property_with_specified_name() {
        let registry = registry();
        let binder = Binder::new(&registry);
        let document =
            Document::parse("<Definition><InvalidProperty>AnyValue</InvalidProperty></Definition>")
                .unwrap();

        let err = binder
            .load_properties(document.root_element(), &mut StubClassWithProperties::default())
            .unwrap_err();

        assert!(matches!(err, ConfigurationError::UnknownProperty { .. }));
        let message = err.to_string();
        assert!(message.contains("InvalidProperty"));
        assert!(message.contains(std::any::type_name::<StubClassWithProperties>()));
    }

    #[test]
    fn test_load_properties_ignores_unknown_sections_of_configuration() {
        let registry = registry();
        let binder = Binder::new(&registry);
        let xml = configuration("<UnknownSection/>");
        let document = Document::parse(&xml).unwrap();

        let result = binder.load_properties(
            document.root_element(),
            &mut TelemetryConfiguration::default(),
        );

        assert!(result.is_ok());
    }

    #[test]
    fn test_load_properties_instantiates_type_specified_in_type_attribute() {
        let registry = registry();
        let binder = Binder::new(&registry);
        let document = Document::parse(
            r#"<Definition><ChildProperty Type="StubClassWithProperties"/></Definition>"#,
        )
        .unwrap();

        let mut instance = StubClassWithProperties::default();
        binder
            .load_properties(document.root_element(), &mut instance)
            .unwrap();

        assert!(instance
            .child_property
            .as_deref()
            .is_some_and(|child| child.is::<StubClassWithProperties>()));
    }

    #[test]
    fn test_load_properties_recursively_loads_instance_specified_by_type_attribute() {
        let registry = registry();
        let binder = Binder::new(&registry);
        let document = Document::parse(
            r#"<Definition>
                   <ChildProperty Type="StubClassWithProperties">
                       <StringProperty>TestValue</StringProperty>
                   </ChildProperty>
               </Definition>"#,
        )
        .unwrap();

        let mut instance = StubClassWithProperties::default();
        binder
            .load_properties(document.root_element(), &mut instance)
            .unwrap();

        let child = instance.child_property.as_deref().map(stub).unwrap();
        assert_eq!(child.string_property.as_deref(), Some("TestValue"));
    }

    #[test]
    fn test_load_properties_does_not_attempt_to_set_read_only_property() {
        let registry = registry();
        let binder = Binder::new(&registry);
        let xml = configuration("<TelemetryModules/>");
        let document = Document::parse(&xml).unwrap();

        let mut instance = TelemetryConfiguration::default();
        let result = binder.load_properties(document.root_element(), &mut instance);

        assert!(result.is_ok());
        assert!(instance.telemetry_modules().is_empty());
    }

    #[test]
    fn test_load_properties_leaves_read_only_property_unchanged() {
        let registry = registry();
        let binder = Binder::new(&registry);
        let document = Document::parse(
            r#"<Definition ReadOnlyProperty="Attribute">
                   <ReadOnlyProperty>Element</ReadOnlyProperty>
               </Definition>"#,
        )
        .unwrap();

        let mut instance = StubClassWithProperties {
            read_only_property: "Original".to_string(),
            ..Default::default()
        };
        let result = binder.load_properties(document.root_element(), &mut instance);

        assert!(result.is_ok());
        assert_eq!(instance.read_only_property, "Original");
    }

    #[test]
    fn test_load_properties_updates_read_only_component_in_place() {
        let registry = registry();
        let binder = Binder::new(&registry);
        let document = Document::parse(
            r#"<Definition>
                   <Child>
                       <Int32Property>42</Int32Property>
                   </Child>
               </Definition>"#,
        )
        .unwrap();

        let mut instance = StubClassWithReadOnlyChild::default();
        instance.child.string_property = Some("Original".to_string());
        binder
            .load_properties(document.root_element(), &mut instance)
            .unwrap();

        assert_eq!(instance.child.int32_property, 42);
        assert_eq!(instance.child.string_property.as_deref(), Some("Original"));
    }

    #[test]
    fn test_load_properties_does_not_replace_read_only_component() {
        let registry = registry();
        let binder = Binder::new(&registry);
        let document = Document::parse(
            r#"<Definition>
                   <Child Type="StubClassWithProperties">
                       <Int32Property>42</Int32Property>
                   </Child>
               </Definition>"#,
        )
        .unwrap();

        let mut instance = StubClassWithReadOnlyChild::default();
        let result = binder.load_properties(document.root_element(), &mut instance);

        assert!(result.is_ok());
        assert_eq!(instance.child.int32_property, 0);
    }

    #[test]
    fn test_load_properties_keeps_existing_child_when_nested_load_fails() {
        let registry = registry();
        let binder = Binder::new(&registry);
        let document = Document::parse(
            r#"<Definition>
                   <ChildProperty>
                       <StringProperty>Updated</StringProperty>
                       <TimeSpanProperty>abc</TimeSpanProperty>
                   </ChildProperty>
               </Definition>"#,
        )
        .unwrap();

        let mut instance = StubClassWithProperties {
            child_property: Some(Box::new(StubClassWithProperties {
                int32_property: 7,
                ..Default::default()
            })),
            ..Default::default()
        };
        let err = binder
            .load_properties(document.root_element(), &mut instance)
            .unwrap_err();

        assert!(matches!(err, ConfigurationError::ValueFormat { .. }));
        let child = instance.child_property.as_deref().map(stub).unwrap();
        assert_eq!(child.int32_property, 7);
        assert_eq!(child.string_property.as_deref(), Some("Updated"));
    }

    #[test]
    fn test_load_properties_keeps_existing_value_when_element_has_no_type() {
        let registry = registry();
        let binder = Binder::new(&registry);
        let document = Document::parse(
            r#"<Definition>
                   <StringProperty><Bogus/></StringProperty>
               </Definition>"#,
        )
        .unwrap();

        let mut instance = StubClassWithProperties {
            string_property: Some("Original".to_string()),
            ..Default::default()
        };
        let err = binder
            .load_properties(document.root_element(), &mut instance)
            .unwrap_err();

        assert!(matches!(err, ConfigurationError::MissingTypeInformation { .. }));
        assert_eq!(instance.string_property.as_deref(), Some("Original"));
    }

    #[cfg(feature = "internal-logs")]
    #[test]
    fn test_load_properties_logs_ignored_sections() {
        use std::sync::{Arc, Mutex};

        use tracing::{Event, Subscriber};
        use tracing_subscriber::{layer::Context, prelude::*, Layer};

        #[derive(Clone, Default)]
        struct EventNames(Arc<Mutex<Vec<String>>>);

        impl<S: Subscriber> Layer<S> for EventNames {
            fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
                self.0.lock().unwrap().push(event.metadata().name().to_string());
            }
        }

        let names = EventNames::default();
        let _guard = tracing_subscriber::registry()
            .with(names.clone())
            .set_default();

        let registry = registry();
        let binder = Binder::new(&registry);
        let xml = configuration("<UnknownSection/>");
        let document = Document::parse(&xml).unwrap();
        binder
            .load_properties(document.root_element(), &mut TelemetryConfiguration::default())
            .unwrap();

        let names = names.0.lock().unwrap();
        assert!(names.iter().any(|name| name == "ConfigXml.UnknownElementIgnored"));
    }

    #[test]
    fn test_load_properties_loads_properties_from_attributes() {
        let registry = registry();
        let binder = Binder::new(&registry);
        let document = Document::parse(r#"<Definition Int32Property="42"/>"#).unwrap();

        let mut instance = StubClassWithProperties::default();
        binder
            .load_properties(document.root_element(), &mut instance)
            .unwrap();

        assert_eq!(instance.int32_property, 42);
    }

    #[test]
    fn test_load_properties_gives_precedence_to_elements_over_attributes() {
        let registry = registry();
        let binder = Binder::new(&registry);
        let document = Document::parse(
            r#"<Definition Int32Property="41"><Int32Property>42</Int32Property></Definition>"#,
        )
        .unwrap();

        let mut instance = StubClassWithProperties::default();
        binder
            .load_properties(document.root_element(), &mut instance)
            .unwrap();

        assert_eq!(instance.int32_property, 42);
    }

    #[test]
    fn test_load_properties_ignores_namespace_declaration() {
        let registry = registry();
        let binder = Binder::new(&registry);
        let document = Document::parse(r#"<Definition xmlns="http://somenamespace"/>"#).unwrap();

        let mut instance = StubClassWithProperties::default();
        let result = binder.load_properties(document.root_element(), &mut instance);

        assert!(result.is_ok());
    }

    #[test]
    fn test_load_properties_leaves_unmatched_properties_untouched() {
        let registry = registry();
        let binder = Binder::new(&registry);
        let document =
            Document::parse("<Definition><StringProperty>Set</StringProperty></Definition>")
                .unwrap();

        let mut instance = StubClassWithProperties {
            int32_property: 5,
            ..Default::default()
        };
        binder
            .load_properties(document.root_element(), &mut instance)
            .unwrap();

        assert_eq!(instance.int32_property, 5);
        assert_eq!(instance.string_property.as_deref(), Some("Set"));
    }

    #[test]
    fn test_load_properties_fails_on_unregistered_instance_type() {
        let registry = TypeRegistry::empty();
        let binder = Binder::new(&registry);
        let document = Document::parse("<Definition/>").unwrap();

        let err = binder
            .load_properties(document.root_element(), &mut StubClassWithProperties::default())
            .unwrap_err();

        assert!(matches!(err, ConfigurationError::TypeResolution { .. }));
    }

    fn load_developer_mode(value: &str) -> Option<bool> {
        let registry = registry();
        let binder = Binder::new(&registry);
        let xml = configuration(&format!(
            r#"<TelemetryChannel Type="InMemoryChannel">
                   <DeveloperMode>{value}</DeveloperMode>
               </TelemetryChannel>"#
        ));
        let document = Document::parse(&xml).unwrap();

        let mut instance = TelemetryConfiguration::default();
        binder
            .load_properties(document.root_element(), &mut instance)
            .unwrap();
        instance
            .telemetry_channel()
            .expect("Expected a telemetry channel")
            .developer_mode()
    }

    #[test]
    fn test_developer_mode_property_can_load_true_value() {
        assert_eq!(load_developer_mode("true"), Some(true));
    }

    #[test]
    fn test_developer_mode_property_can_load_false_value() {
        assert_eq!(load_developer_mode("false"), Some(false));
    }

    #[test]
    fn test_developer_mode_property_can_load_null_value() {
        assert_eq!(load_developer_mode("null"), None);
    }

    #[test]
    fn test_developer_mode_property_can_load_empty_value() {
        assert_eq!(load_developer_mode(""), None);
    }
}
