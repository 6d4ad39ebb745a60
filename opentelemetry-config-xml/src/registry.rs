//! # Type registry
//!
//! Maps type identifiers used in `Type` attributes to factories, and keeps a
//! property table per registered type. Tables are built once when the type
//! is registered and reused by every load.

use std::{any::type_name, collections::HashMap, marker::PhantomData, mem};

use crate::{
    collection::Collection,
    component::Component,
    value::{ComponentType, FromValue, IntoValue, Value, ValueError, ValueType},
    ConfigurationError,
};

/// How a property is bound.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PropertyKind {
    /// Read and assigned back after binding.
    ReadWrite(ValueType),
    /// Bound against the current value, never assigned.
    ReadOnly(ValueType),
    /// A component without a setter, updated in place.
    ReadOnlyComponent(ComponentType),
    /// Populated in place from `Add` elements.
    Collection,
}

trait PropertyAccess: Send + Sync {
    fn get(&self, _instance: &mut dyn Component) -> Result<Value, ValueError> {
        Err(ValueError::Mismatch {
            expected: "readable property",
            found: "collection",
        })
    }

    fn set(&self, _instance: &mut dyn Component, _value: Value) -> Result<(), ValueError> {
        Err(ValueError::Mismatch {
            expected: "writable property",
            found: "read-only property",
        })
    }

    fn collection<'a>(&self, _instance: &'a mut dyn Component) -> Option<&'a mut dyn Collection> {
        None
    }

    fn component<'a>(&self, _instance: &'a mut dyn Component) -> Option<&'a mut dyn Component> {
        None
    }
}

fn downcast<T: Component>(instance: &mut dyn Component) -> Result<&mut T, ValueError> {
    instance
        .downcast_mut::<T>()
        .ok_or(ValueError::Mismatch {
            expected: type_name::<T>(),
            found: "component of another type",
        })
}

struct FieldAccess<T, V> {
    field: fn(&mut T) -> &mut V,
}

impl<T, V> PropertyAccess for FieldAccess<T, V>
where
    T: Component,
    V: FromValue + IntoValue + Default + 'static,
{
    fn get(&self, instance: &mut dyn Component) -> Result<Value, ValueError> {
        let target = downcast::<T>(instance)?;
        Ok(mem::take((self.field)(target)).into_value())
    }

    fn set(&self, instance: &mut dyn Component, value: Value) -> Result<(), ValueError> {
        let target = downcast::<T>(instance)?;
        *(self.field)(target) = V::from_value(value)?;
        Ok(())
    }
}

struct ComponentAccess<T> {
    field: fn(&mut T) -> &mut Option<Box<dyn Component>>,
}

impl<T: Component> PropertyAccess for ComponentAccess<T> {
    fn get(&self, instance: &mut dyn Component) -> Result<Value, ValueError> {
        let target = downcast::<T>(instance)?;
        Ok((self.field)(target).take().into())
    }

    fn set(&self, instance: &mut dyn Component, value: Value) -> Result<(), ValueError> {
        let target = downcast::<T>(instance)?;
        *(self.field)(target) = value.into_component()?;
        Ok(())
    }
}

struct ReadOnlyAccess<T, V> {
    field: fn(&T) -> &V,
}

impl<T, V> PropertyAccess for ReadOnlyAccess<T, V>
where
    T: Component,
    V: IntoValue + Clone + Send + Sync + 'static,
{
    fn get(&self, instance: &mut dyn Component) -> Result<Value, ValueError> {
        let target = downcast::<T>(instance)?;
        Ok((self.field)(target).clone().into_value())
    }
}

struct CollectionAccess<T> {
    field: fn(&mut T) -> &mut dyn Collection,
}

impl<T: Component> PropertyAccess for CollectionAccess<T> {
    fn collection<'a>(&self, instance: &'a mut dyn Component) -> Option<&'a mut dyn Collection> {
        instance.downcast_mut::<T>().map(self.field)
    }
}

struct ReadOnlyComponentAccess<T> {
    field: fn(&mut T) -> &mut dyn Component,
}

impl<T: Component> PropertyAccess for ReadOnlyComponentAccess<T> {
    fn component<'a>(&self, instance: &'a mut dyn Component) -> Option<&'a mut dyn Component> {
        instance.downcast_mut::<T>().map(self.field)
    }
}

/// A bindable property of a registered type.
pub struct Property {
    name: &'static str,
    kind: PropertyKind,
    access: Box<dyn PropertyAccess>,
}

impl Property {
    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn kind(&self) -> PropertyKind {
        self.kind
    }

    /// Current value. Read-write properties are moved out and must be
    /// assigned back with [`Property::set`].
    pub fn get(&self, instance: &mut dyn Component) -> Result<Value, ValueError> {
        self.access.get(instance)
    }

    pub fn set(&self, instance: &mut dyn Component, value: Value) -> Result<(), ValueError> {
        self.access.set(instance, value)
    }

    pub fn collection<'a>(
        &self,
        instance: &'a mut dyn Component,
    ) -> Option<&'a mut dyn Collection> {
        self.access.collection(instance)
    }

    /// The component held by a read-only component property.
    pub fn component<'a>(
        &self,
        instance: &'a mut dyn Component,
    ) -> Option<&'a mut dyn Component> {
        self.access.component(instance)
    }
}

impl std::fmt::Debug for Property {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Property")
            .field("name", &self.name)
            .field("kind", &self.kind)
            .finish()
    }
}

/// Factory and property table of a registered type.
pub struct Registration {
    type_name: &'static str,
    factory: Box<dyn Fn() -> Box<dyn Component> + Send + Sync>,
    properties: Vec<Property>,
    lenient: bool,
}

impl Registration {
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    pub fn properties(&self) -> &[Property] {
        &self.properties
    }

    pub fn property(&self, name: &str) -> Option<&Property> {
        self.properties.iter().find(|property| property.name == name)
    }

    /// Whether unknown child elements are ignored instead of rejected.
    pub fn is_lenient(&self) -> bool {
        self.lenient
    }

    /// Creates a default instance of the registered type.
    pub fn create(&self) -> Box<dyn Component> {
        (self.factory)()
    }
}

impl std::fmt::Debug for Registration {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registration")
            .field("type_name", &self.type_name)
            .field("properties", &self.properties)
            .field("lenient", &self.lenient)
            .finish()
    }
}

/// Registry of the types that can be named in configuration.
///
/// A new registry already knows the configuration object itself and the
/// built-in channel and initializers.
pub struct TypeRegistry {
    registrations: Vec<Registration>,
    names: HashMap<String, usize>,
}

impl TypeRegistry {
    pub fn new() -> Self {
        let mut registry = Self::empty();
        crate::configuration::register(&mut registry);
        crate::channel::register(&mut registry);
        crate::initializers::register(&mut registry);
        registry
    }

    /// A registry without any registrations.
    pub fn empty() -> Self {
        TypeRegistry {
            registrations: Vec::new(),
            names: HashMap::new(),
        }
    }

    /// Registers `T`, created through its `Default` implementation.
    pub fn register<T: Component + Default>(&mut self) -> TypeBuilder<'_, T> {
        self.register_with(T::default)
    }

    /// Registers `T` under its type name with a custom factory. Registering a
    /// type again replaces its previous registration.
    pub fn register_with<T: Component>(
        &mut self,
        factory: impl Fn() -> T + Send + Sync + 'static,
    ) -> TypeBuilder<'_, T> {
        let type_name = type_name::<T>();
        let registration = Registration {
            type_name,
            factory: Box::new(move || Box::new(factory()) as Box<dyn Component>),
            properties: Vec::new(),
            lenient: false,
        };
        let index = match self.names.get(type_name) {
            Some(&index) => {
                self.registrations[index] = registration;
                index
            }
            None => {
                self.registrations.push(registration);
                let index = self.registrations.len() - 1;
                self.names.insert(type_name.to_string(), index);
                index
            }
        };

        TypeBuilder {
            registry: self,
            index,
            _type: PhantomData,
        }
    }

    /// Resolves a type identifier.
    ///
    /// Identifiers may be qualified (`Type, Library`); when the full
    /// identifier is not registered the leading type part is tried.
    pub fn resolve(&self, identifier: &str) -> Result<&Registration, ConfigurationError> {
        if !is_well_formed(identifier) {
            return Err(ConfigurationError::TypeResolution {
                type_name: identifier.to_string(),
                reason: "the type name is malformed".to_string(),
            });
        }

        let type_part = identifier.split(',').next().unwrap_or(identifier).trim();
        self.names
            .get(identifier.trim())
            .or_else(|| self.names.get(type_part))
            .map(|&index| &self.registrations[index])
            .ok_or_else(|| ConfigurationError::TypeResolution {
                type_name: identifier.to_string(),
                reason: "the type is not registered".to_string(),
            })
    }

    /// Registration of the concrete type behind `component`.
    pub fn registration_of(&self, component: &dyn Component) -> Option<&Registration> {
        self.names
            .get(component.type_name())
            .map(|&index| &self.registrations[index])
    }

    pub fn contains(&self, identifier: &str) -> bool {
        self.resolve(identifier).is_ok()
    }
}

impl Default for TypeRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for TypeRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TypeRegistry")
            .field("registrations", &self.registrations)
            .finish()
    }
}

fn is_well_formed(identifier: &str) -> bool {
    !identifier.trim().is_empty()
        && identifier.split(',').all(|part| {
            let part = part.trim();
            !part.is_empty() && !part.contains(char::is_whitespace)
        })
}

/// Declares aliases and properties of a registered type.
pub struct TypeBuilder<'a, T> {
    registry: &'a mut TypeRegistry,
    index: usize,
    _type: PhantomData<fn() -> T>,
}

impl<'a, T: Component> TypeBuilder<'a, T> {
    fn registration(&mut self) -> &mut Registration {
        &mut self.registry.registrations[self.index]
    }

    fn with_property(
        mut self,
        name: &'static str,
        kind: PropertyKind,
        access: Box<dyn PropertyAccess>,
    ) -> Self {
        let properties = &mut self.registration().properties;
        properties.retain(|property| property.name != name);
        properties.push(Property { name, kind, access });
        self
    }

    /// Additional identifier the type can be named by in `Type` attributes.
    pub fn alias(mut self, alias: impl Into<String>) -> Self {
        let index = self.index;
        self.registry.names.insert(alias.into(), index);
        self
    }

    /// Ignore unknown child elements instead of failing the load.
    pub fn lenient(mut self) -> Self {
        self.registration().lenient = true;
        self
    }

    /// A read-write property backed by a primitive field.
    pub fn property<V>(self, name: &'static str, field: fn(&mut T) -> &mut V) -> Self
    where
        V: FromValue + IntoValue + Default + 'static,
    {
        self.with_property(
            name,
            PropertyKind::ReadWrite(V::VALUE_TYPE),
            Box::new(FieldAccess { field }),
        )
    }

    /// A read-write property holding a component.
    pub fn component(
        self,
        name: &'static str,
        component_type: impl Into<ComponentType>,
        field: fn(&mut T) -> &mut Option<Box<dyn Component>>,
    ) -> Self {
        self.with_property(
            name,
            PropertyKind::ReadWrite(ValueType::Component(component_type.into())),
            Box::new(ComponentAccess { field }),
        )
    }

    /// A property without a setter.
    pub fn read_only<V>(self, name: &'static str, field: fn(&T) -> &V) -> Self
    where
        V: FromValue + IntoValue + Clone + Send + Sync + 'static,
    {
        self.with_property(
            name,
            PropertyKind::ReadOnly(V::VALUE_TYPE),
            Box::new(ReadOnlyAccess { field }),
        )
    }

    /// A component without a setter. Nested elements update it in place.
    pub fn read_only_component(
        self,
        name: &'static str,
        component_type: impl Into<ComponentType>,
        field: fn(&mut T) -> &mut dyn Component,
    ) -> Self {
        self.with_property(
            name,
            PropertyKind::ReadOnlyComponent(component_type.into()),
            Box::new(ReadOnlyComponentAccess { field }),
        )
    }

    /// A collection populated in place from `Add` elements.
    pub fn collection(self, name: &'static str, field: fn(&mut T) -> &mut dyn Collection) -> Self {
        self.with_property(
            name,
            PropertyKind::Collection,
            Box::new(CollectionAccess { field }),
        )
    }
}
