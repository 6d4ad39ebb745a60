//! # Bindable collections
//!
//! Collections are populated in place from `Add` elements. Component
//! collections can be merged: an `Add` whose type matches an element that is
//! already present updates that element instead of appending a new one.

use crate::{
    component::Component,
    value::{ComponentType, FromValue, Value, ValueError, ValueType},
};

/// An ordered, mutable sequence the binder can append to.
pub trait Collection: Send + Sync {
    /// Declared type of the elements.
    fn element_type(&self) -> ValueType;

    /// Existing element whose concrete type has the given registered name.
    fn find_by_type(&mut self, type_name: &str) -> Option<&mut dyn Component>;

    fn push(&mut self, value: Value) -> Result<(), ValueError>;
}

impl<T> Collection for Vec<T>
where
    T: FromValue + Send + Sync,
{
    fn element_type(&self) -> ValueType {
        T::VALUE_TYPE
    }

    // Primitive elements have no identity to update.
    fn find_by_type(&mut self, _type_name: &str) -> Option<&mut dyn Component> {
        None
    }

    fn push(&mut self, value: Value) -> Result<(), ValueError> {
        Vec::push(self, T::from_value(value)?);
        Ok(())
    }
}

/// A list of components of a declared [`ComponentType`].
#[derive(Debug)]
pub struct ComponentList {
    element_type: ComponentType,
    items: Vec<Box<dyn Component>>,
}

impl ComponentList {
    pub fn new(element_type: impl Into<ComponentType>) -> Self {
        ComponentList {
            element_type: element_type.into(),
            items: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&dyn Component> {
        self.items.get(index).map(|item| &**item)
    }

    pub fn iter(&self) -> impl Iterator<Item = &dyn Component> + '_ {
        self.items.iter().map(|item| &**item)
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut dyn Component> + '_ {
        self.items.iter_mut().map(|item| &mut **item as &mut dyn Component)
    }

    pub fn contains_type<T: Component>(&self) -> bool {
        self.iter().any(|item| item.is::<T>())
    }

    pub fn add(&mut self, component: impl Component) {
        self.items.push(Box::new(component));
    }

    pub fn insert(&mut self, index: usize, component: impl Component) {
        self.items.insert(index, Box::new(component));
    }
}

impl Collection for ComponentList {
    fn element_type(&self) -> ValueType {
        ValueType::Component(self.element_type)
    }

    fn find_by_type(&mut self, type_name: &str) -> Option<&mut dyn Component> {
        self.items
            .iter_mut()
            .find(|item| item.type_name() == type_name)
            .map(|item| &mut **item as &mut dyn Component)
    }

    fn push(&mut self, value: Value) -> Result<(), ValueError> {
        match value.into_component()? {
            Some(component) => {
                self.items.push(component);
                Ok(())
            }
            None => Err(ValueError::Mismatch {
                expected: "component",
                found: "null",
            }),
        }
    }
}
