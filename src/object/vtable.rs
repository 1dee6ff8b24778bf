//! V-table items and their registration builders.
//!
//! Generated adaptor code registers its members through the builders in this
//! module:
//!
//! ```
//! use busline::vtable;
//!
//! let items = vec![
//!     vtable::method("Concatenate")
//!         .with_inputs::<(Vec<i32>, String)>()
//!         .with_input_param_names(["numbers", "separator"])
//!         .with_outputs::<String>()
//!         .with_output_param_names(["concatenated"])
//!         .implemented_as(|_call, result| {
//!             let _ = result.send(&"1:2:3");
//!         })?,
//!     vtable::signal("Concatenated")
//!         .with_parameters::<String>()
//!         .with_parameter_names(["concatenated"])
//!         .build()?,
//!     vtable::property("Separator")
//!         .of::<String>()
//!         .with_getter(|| String::from(":"))
//!         .build()?,
//! ];
//! # Ok::<_, busline::Error>(())
//! ```

use std::sync::Arc;

use crate::{
    signature_of, Error, Message, Result, Signature, SignatureBuf, SignatureError, Storable,
    Loadable, Variant,
};

use super::MethodResult;

/// The handler implementing a method.
///
/// Receives the sealed call message, positioned at the start of its
/// arguments, and the movable [`MethodResult`] reply slot.
pub type MethodHandler = Arc<dyn Fn(&mut Message, MethodResult) + Send + Sync>;

pub(crate) type PropertyGetterFn = Arc<dyn Fn() -> Result<Variant> + Send + Sync>;
pub(crate) type PropertySetterFn = Arc<dyn Fn(Variant) -> Result<()> + Send + Sync>;

/// An ordered list of interface members registered on an [`Object`] for one
/// interface.
///
/// [`Object`]: super::Object
#[derive(Clone)]
pub struct VTable {
    items: Vec<VTableItem>,
}

impl VTable {
    /// Construct a v-table from its items.
    pub fn new(items: Vec<VTableItem>) -> Self {
        Self { items }
    }

    /// The items of the v-table, in registration order.
    pub fn items(&self) -> &[VTableItem] {
        &self.items
    }

    pub(crate) fn find_method(&self, name: &str) -> Option<&MethodItem> {
        self.items.iter().find_map(|item| match item {
            VTableItem::Method(method) if &*method.name == name => Some(method),
            _ => None,
        })
    }

    pub(crate) fn find_signal(&self, name: &str) -> Option<&SignalItem> {
        self.items.iter().find_map(|item| match item {
            VTableItem::Signal(signal) if &*signal.name == name => Some(signal),
            _ => None,
        })
    }

    pub(crate) fn find_property(&self, name: &str) -> Option<&PropertyItem> {
        self.items.iter().find_map(|item| match item {
            VTableItem::Property(property) if &*property.name == name => Some(property),
            _ => None,
        })
    }

    pub(crate) fn properties(&self) -> impl Iterator<Item = &PropertyItem> {
        self.items.iter().filter_map(|item| match item {
            VTableItem::Property(property) => Some(property),
            _ => None,
        })
    }
}

/// A single member of a [`VTable`].
#[derive(Clone)]
pub enum VTableItem {
    /// A callable method.
    Method(MethodItem),
    /// A signal declaration.
    Signal(SignalItem),
    /// A property with optional getter and setter.
    Property(PropertyItem),
}

/// A method registered on an interface.
#[derive(Clone)]
pub struct MethodItem {
    pub(crate) name: Box<str>,
    pub(crate) input_signature: SignatureBuf,
    pub(crate) output_signature: SignatureBuf,
    pub(crate) input_names: Vec<Box<str>>,
    pub(crate) output_names: Vec<Box<str>>,
    pub(crate) handler: MethodHandler,
}

impl MethodItem {
    /// The name of the method.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The signature of the method's arguments.
    pub fn input_signature(&self) -> &Signature {
        &self.input_signature
    }

    /// The signature of the method's reply.
    pub fn output_signature(&self) -> &Signature {
        &self.output_signature
    }

    /// The declared names of the method's arguments.
    pub fn input_param_names(&self) -> impl Iterator<Item = &str> {
        self.input_names.iter().map(|name| &**name)
    }

    /// The declared names of the method's reply values.
    pub fn output_param_names(&self) -> impl Iterator<Item = &str> {
        self.output_names.iter().map(|name| &**name)
    }
}

/// A signal declared on an interface.
#[derive(Clone)]
pub struct SignalItem {
    pub(crate) name: Box<str>,
    pub(crate) signature: SignatureBuf,
    pub(crate) parameter_names: Vec<Box<str>>,
}

impl SignalItem {
    /// The name of the signal.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The signature of the signal's payload.
    pub fn signature(&self) -> &Signature {
        &self.signature
    }

    /// The declared names of the signal's payload values.
    pub fn parameter_names(&self) -> impl Iterator<Item = &str> {
        self.parameter_names.iter().map(|name| &**name)
    }
}

/// A property declared on an interface.
#[derive(Clone)]
pub struct PropertyItem {
    pub(crate) name: Box<str>,
    pub(crate) signature: SignatureBuf,
    pub(crate) getter: Option<PropertyGetterFn>,
    pub(crate) setter: Option<PropertySetterFn>,
    pub(crate) emits_changed: bool,
}

impl PropertyItem {
    /// The name of the property.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The signature of the property value.
    pub fn signature(&self) -> &Signature {
        &self.signature
    }
}

/// Start building a method item.
pub fn method(name: &str) -> MethodBuilder {
    MethodBuilder {
        name: Box::from(name),
        input_signature: SignatureBuf::empty(),
        output_signature: SignatureBuf::empty(),
        input_names: Vec::new(),
        output_names: Vec::new(),
        error: None,
    }
}

/// Start building a signal declaration.
pub fn signal(name: &str) -> SignalBuilder {
    SignalBuilder {
        name: Box::from(name),
        signature: SignatureBuf::empty(),
        parameter_names: Vec::new(),
        error: None,
    }
}

/// Start building a property item.
pub fn property(name: &str) -> PropertyBuilder {
    PropertyBuilder {
        name: Box::from(name),
        signature: None,
        getter: None,
        setter: None,
        emits_changed: true,
        error: None,
    }
}

fn collect_names<'a>(names: impl IntoIterator<Item = &'a str>) -> Vec<Box<str>> {
    names.into_iter().map(Box::from).collect()
}

/// Builder for a [`MethodItem`].
#[must_use]
pub struct MethodBuilder {
    name: Box<str>,
    input_signature: SignatureBuf,
    output_signature: SignatureBuf,
    input_names: Vec<Box<str>>,
    output_names: Vec<Box<str>>,
    error: Option<SignatureError>,
}

impl MethodBuilder {
    /// Declare the argument types of the method.
    ///
    /// Tuples flatten into an argument list.
    pub fn with_inputs<T>(mut self) -> Self
    where
        T: ?Sized + Storable,
    {
        match signature_of::<T>() {
            Ok(signature) => self.input_signature = signature,
            Err(error) => self.error = Some(error),
        }

        self
    }

    /// Declare the reply types of the method.
    pub fn with_outputs<T>(mut self) -> Self
    where
        T: ?Sized + Storable,
    {
        match signature_of::<T>() {
            Ok(signature) => self.output_signature = signature,
            Err(error) => self.error = Some(error),
        }

        self
    }

    /// Name the arguments of the method.
    pub fn with_input_param_names<'a>(mut self, names: impl IntoIterator<Item = &'a str>) -> Self {
        self.input_names = collect_names(names);
        self
    }

    /// Name the reply values of the method.
    pub fn with_output_param_names<'a>(mut self, names: impl IntoIterator<Item = &'a str>) -> Self {
        self.output_names = collect_names(names);
        self
    }

    /// Attach the implementation and finish the item.
    pub fn implemented_as<F>(self, handler: F) -> Result<VTableItem>
    where
        F: Fn(&mut Message, MethodResult) + Send + Sync + 'static,
    {
        if let Some(error) = self.error {
            return Err(Error::from(error));
        }

        Ok(VTableItem::Method(MethodItem {
            name: self.name,
            input_signature: self.input_signature,
            output_signature: self.output_signature,
            input_names: self.input_names,
            output_names: self.output_names,
            handler: Arc::new(handler),
        }))
    }
}

/// Builder for a [`SignalItem`].
#[must_use]
pub struct SignalBuilder {
    name: Box<str>,
    signature: SignatureBuf,
    parameter_names: Vec<Box<str>>,
    error: Option<SignatureError>,
}

impl SignalBuilder {
    /// Declare the payload types of the signal.
    pub fn with_parameters<T>(mut self) -> Self
    where
        T: ?Sized + Storable,
    {
        match signature_of::<T>() {
            Ok(signature) => self.signature = signature,
            Err(error) => self.error = Some(error),
        }

        self
    }

    /// Name the payload values of the signal.
    pub fn with_parameter_names<'a>(mut self, names: impl IntoIterator<Item = &'a str>) -> Self {
        self.parameter_names = collect_names(names);
        self
    }

    /// Finish the item.
    pub fn build(self) -> Result<VTableItem> {
        if let Some(error) = self.error {
            return Err(Error::from(error));
        }

        Ok(VTableItem::Signal(SignalItem {
            name: self.name,
            signature: self.signature,
            parameter_names: self.parameter_names,
        }))
    }
}

/// Builder for a [`PropertyItem`].
#[must_use]
pub struct PropertyBuilder {
    name: Box<str>,
    signature: Option<SignatureBuf>,
    getter: Option<PropertyGetterFn>,
    setter: Option<PropertySetterFn>,
    emits_changed: bool,
    error: Option<SignatureError>,
}

impl PropertyBuilder {
    /// Declare the value type of the property.
    pub fn of<T>(mut self) -> Self
    where
        T: Storable,
    {
        match signature_of::<T>() {
            Ok(signature) => self.signature = Some(signature),
            Err(error) => self.error = Some(error),
        }

        self
    }

    /// Attach a getter callable.
    pub fn with_getter<T, F>(mut self, getter: F) -> Self
    where
        T: Storable,
        F: Fn() -> T + Send + Sync + 'static,
    {
        self.getter = Some(Arc::new(move || Variant::new(&getter())));
        self
    }

    /// Attach a setter callable.
    pub fn with_setter<T, F>(mut self, setter: F) -> Self
    where
        T: Loadable,
        F: Fn(T) + Send + Sync + 'static,
    {
        self.setter = Some(Arc::new(move |value: Variant| {
            setter(value.get::<T>()?);
            Ok(())
        }));
        self
    }

    /// Control whether assignment emits `PropertiesChanged`.
    ///
    /// Enabled by default.
    pub fn emits_changed(mut self, emits_changed: bool) -> Self {
        self.emits_changed = emits_changed;
        self
    }

    /// Finish the item.
    ///
    /// # Errors
    ///
    /// Errors if the value type was not declared with [`of`].
    ///
    /// [`of`]: PropertyBuilder::of
    pub fn build(self) -> Result<VTableItem> {
        if let Some(error) = self.error {
            return Err(Error::from(error));
        }

        let Some(signature) = self.signature else {
            return Err(Error::invalid_args(format!(
                "property {} has no declared value type",
                self.name
            )));
        };

        Ok(VTableItem::Property(PropertyItem {
            name: self.name,
            signature,
            getter: self.getter,
            setter: self.setter,
            emits_changed: self.emits_changed,
        }))
    }
}
