//! Bean type descriptors.

use std::any::{Any, TypeId};
use std::fmt;
use std::marker::PhantomData;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::SchemaError;
use crate::value::{DataType, Value};

use super::schema::SchemaDeclaration;
use super::{Bean, BeanRef, ChildrenError, TypeHandle};

/// Type-erased read accessor. `None` means the instance is not of the
/// expected concrete type.
pub(crate) type ReadFn = Arc<dyn Fn(&dyn Any) -> Option<Value> + Send + Sync>;

type ChildrenFn =
    Arc<dyn Fn(&dyn Any) -> Option<Result<Vec<BeanRef>, ChildrenError>> + Send + Sync>;

type UpcastFn = fn(&dyn Any) -> Option<&dyn Any>;

static NEXT_DESCRIPTOR_ID: AtomicU64 = AtomicU64::new(0);

fn upcast<T, P>(instance: &dyn Any) -> Option<&dyn Any>
where
    T: AsRef<P> + 'static,
    P: 'static,
{
    instance
        .downcast_ref::<T>()
        .map(|t| t.as_ref() as &dyn Any)
}

fn erase<T, F>(read: F) -> ReadFn
where
    T: 'static,
    F: Fn(&T) -> Value + Send + Sync + 'static,
{
    Arc::new(move |instance: &dyn Any| instance.downcast_ref::<T>().map(&read))
}

/// Method visibility.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Visibility {
    /// Callable from anywhere.
    Public,
    /// Callable within the declaring crate.
    Crate,
    /// Callable only by the declaring type.
    Private,
}

/// A declared instance field.
#[derive(Clone)]
pub struct FieldDescriptor {
    name: String,
    data_type: DataType,
    read: ReadFn,
}

impl FieldDescriptor {
    /// Field name as declared.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Declared type of the field.
    #[must_use]
    pub const fn data_type(&self) -> &DataType {
        &self.data_type
    }
}

impl fmt::Debug for FieldDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FieldDescriptor")
            .field("name", &self.name)
            .field("data_type", &self.data_type)
            .finish_non_exhaustive()
    }
}

/// A declared method signature, callable when it takes no arguments and an
/// accessor was registered for it.
#[derive(Clone)]
pub struct MethodDescriptor {
    name: String,
    visibility: Visibility,
    arity: usize,
    return_type: Option<DataType>,
    invoke: Option<ReadFn>,
}

impl MethodDescriptor {
    /// Method name as declared.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Declared visibility.
    #[must_use]
    pub const fn visibility(&self) -> Visibility {
        self.visibility
    }

    /// Number of declared arguments.
    #[must_use]
    pub const fn arity(&self) -> usize {
        self.arity
    }

    /// `None` for methods returning nothing.
    #[must_use]
    pub const fn return_type(&self) -> Option<&DataType> {
        self.return_type.as_ref()
    }

    /// Returns true if an accessor was registered.
    #[must_use]
    pub const fn is_callable(&self) -> bool {
        self.invoke.is_some()
    }

    pub(crate) fn invoker(&self) -> Option<ReadFn> {
        self.invoke.clone()
    }
}

impl fmt::Debug for MethodDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MethodDescriptor")
            .field("name", &self.name)
            .field("visibility", &self.visibility)
            .field("arity", &self.arity)
            .field("return_type", &self.return_type)
            .finish_non_exhaustive()
    }
}

#[derive(Clone, Copy)]
struct ParentLink {
    handle: TypeHandle,
    upcast: UpcastFn,
}

/// A field located on a type, carrying the accessors needed to read it from
/// an instance of that Rust type without another lookup.
#[derive(Clone)]
pub(crate) struct FieldLocation {
    /// Number of parent links to follow.
    pub hops: usize,
    pub data_type: DataType,
    owner: TypeId,
    upcasts: Vec<UpcastFn>,
    read: ReadFn,
}

impl FieldLocation {
    /// `None` when `instance` is not of the Rust type the field was located on.
    pub fn read(&self, instance: &dyn Any) -> Option<Value> {
        if (*instance).type_id() != self.owner {
            return None;
        }
        let mut view = instance;
        for upcast in &self.upcasts {
            view = upcast(view)?;
        }
        (self.read)(view)
    }
}

impl fmt::Debug for FieldLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FieldLocation")
            .field("hops", &self.hops)
            .field("data_type", &self.data_type)
            .finish_non_exhaustive()
    }
}

/// Descriptor of a bean type: the explicit stand-in for runtime reflection.
pub struct BeanType {
    id: u64,
    name: String,
    type_id: TypeId,
    parent: Option<ParentLink>,
    fields: Vec<FieldDescriptor>,
    methods: Vec<MethodDescriptor>,
    schema: Option<SchemaDeclaration>,
    children: Option<ChildrenFn>,
}

impl BeanType {
    /// Starts describing `T` under the given display name.
    pub fn builder<T: Bean>(name: impl Into<String>) -> BeanTypeBuilder<T> {
        BeanTypeBuilder {
            name: name.into(),
            parent: None,
            fields: Vec::new(),
            methods: Vec::new(),
            schema: None,
            children: None,
            _marker: PhantomData,
        }
    }

    /// Display name given to the builder.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Identity of this descriptor.
    ///
    /// Unique per built descriptor: two descriptors of one Rust type never
    /// share an id.
    #[must_use]
    pub const fn id(&self) -> u64 {
        self.id
    }

    /// `TypeId` of the described Rust type.
    #[must_use]
    pub const fn type_id(&self) -> TypeId {
        self.type_id
    }

    /// The parent type, if this type extends one.
    #[must_use]
    pub fn parent(&self) -> Option<&'static BeanType> {
        self.parent.map(|link| link.handle.get())
    }

    /// This type followed by its ancestors, most derived first.
    #[must_use]
    pub fn lineage(&self) -> Lineage<'_> {
        Lineage { next: Some(self) }
    }

    /// Returns true if this type is `other` or descends from it.
    #[must_use]
    pub fn is_a(&self, other: &BeanType) -> bool {
        self.lineage().any(|t| t.type_id == other.type_id)
    }

    /// Fields declared directly on this type, in declaration order.
    #[must_use]
    pub fn declared_fields(&self) -> &[FieldDescriptor] {
        &self.fields
    }

    /// Methods declared directly on this type, in declaration order.
    #[must_use]
    pub fn declared_methods(&self) -> &[MethodDescriptor] {
        &self.methods
    }

    /// Schema declaration attached directly to this type.
    #[must_use]
    pub const fn schema(&self) -> Option<&SchemaDeclaration> {
        self.schema.as_ref()
    }

    /// Locates a field by name on this type or its ancestors.
    pub(crate) fn find_field(&self, name: &str) -> Option<FieldLocation> {
        let mut upcasts = Vec::new();
        let mut current: &BeanType = self;
        loop {
            if let Some(field) = current.fields.iter().find(|f| f.name == name) {
                return Some(FieldLocation {
                    hops: upcasts.len(),
                    data_type: field.data_type.clone(),
                    owner: self.type_id,
                    upcasts,
                    read: Arc::clone(&field.read),
                });
            }
            let link = current.parent?;
            upcasts.push(link.upcast);
            current = link.handle.get();
        }
    }

    /// Follows `hops` parent links, projecting the instance at each step.
    fn ancestor_view<'a>(
        &'a self,
        instance: &'a dyn Any,
        hops: usize,
    ) -> Option<(&'a BeanType, &'a dyn Any)> {
        let mut ty: &BeanType = self;
        let mut view = instance;
        for _ in 0..hops {
            let link = ty.parent?;
            view = (link.upcast)(view)?;
            ty = link.handle.get();
        }
        Some((ty, view))
    }

    /// Projects an instance of this type onto the ancestor whose Rust type is
    /// `target`.
    pub(crate) fn view_as<'a>(
        &'a self,
        instance: &'a dyn Any,
        target: TypeId,
    ) -> Option<&'a dyn Any> {
        let hops = self.lineage().position(|t| t.type_id == target)?;
        self.ancestor_view(instance, hops).map(|(_, view)| view)
    }

    /// Reads a previously located field from an instance of this type.
    pub(crate) fn read_at(
        &self,
        instance: &dyn Any,
        location: &FieldLocation,
    ) -> Result<Value, SchemaError> {
        location
            .read(instance)
            .ok_or_else(|| SchemaError::TypeMismatch {
                expected: self.name.clone(),
                actual: "an unrelated type".to_string(),
            })
    }

    /// Reads a field by name from an instance of this type.
    pub(crate) fn read_field(&self, instance: &dyn Any, name: &str) -> Result<Value, SchemaError> {
        let location = self.find_field(name).ok_or_else(|| SchemaError::NoSuchField {
            segment: name.to_string(),
            class: self.name.clone(),
        })?;
        self.read_at(instance, &location)
    }

    /// Invokes the nearest children accessor along the lineage.
    pub(crate) fn read_children(
        &self,
        instance: &dyn Any,
    ) -> Option<Result<Vec<BeanRef>, ChildrenError>> {
        let hops = self.lineage().position(|t| t.children.is_some())?;
        let (ty, view) = self.ancestor_view(instance, hops)?;
        ty.children.as_ref().and_then(|read| read(view))
    }

    /// Returns true if this type or an ancestor declares a children accessor.
    #[must_use]
    pub fn has_children_accessor(&self) -> bool {
        self.lineage().any(|t| t.children.is_some())
    }
}

impl fmt::Debug for BeanType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BeanType")
            .field("name", &self.name)
            .field("parent", &self.parent().map(BeanType::name))
            .field("fields", &self.fields)
            .field("methods", &self.methods)
            .field("schema", &self.schema)
            .finish_non_exhaustive()
    }
}

/// Iterator over a type and its ancestors.
#[derive(Debug, Clone)]
pub struct Lineage<'a> {
    next: Option<&'a BeanType>,
}

impl<'a> Iterator for Lineage<'a> {
    type Item = &'a BeanType;

    fn next(&mut self) -> Option<Self::Item> {
        let current = self.next?;
        self.next = current.parent();
        Some(current)
    }
}

/// Builder for [`BeanType`].
///
/// Registering a field or method under a name that already exists replaces
/// the earlier declaration in place.
pub struct BeanTypeBuilder<T> {
    name: String,
    parent: Option<ParentLink>,
    fields: Vec<FieldDescriptor>,
    methods: Vec<MethodDescriptor>,
    schema: Option<SchemaDeclaration>,
    children: Option<ChildrenFn>,
    _marker: PhantomData<fn() -> T>,
}

impl<T: Bean> BeanTypeBuilder<T> {
    /// Declares `P` as the parent type. `T` reaches its parent part through `AsRef`.
    #[must_use]
    pub fn extends<P: Bean>(mut self) -> Self
    where
        T: AsRef<P>,
    {
        self.parent = Some(ParentLink {
            handle: TypeHandle::of::<P>(),
            upcast: upcast::<T, P>,
        });
        self
    }

    /// Declares an instance field.
    #[must_use]
    pub fn field<F>(mut self, name: impl Into<String>, data_type: DataType, read: F) -> Self
    where
        F: Fn(&T) -> Value + Send + Sync + 'static,
    {
        let field = FieldDescriptor {
            name: name.into(),
            data_type,
            read: erase(read),
        };
        match self.fields.iter_mut().find(|f| f.name == field.name) {
            Some(slot) => *slot = field,
            None => self.fields.push(field),
        }
        self
    }

    /// Declares a public, zero-argument accessor method.
    #[must_use]
    pub fn getter<F>(self, name: impl Into<String>, return_type: DataType, read: F) -> Self
    where
        F: Fn(&T) -> Value + Send + Sync + 'static,
    {
        self.push_method(MethodDescriptor {
            name: name.into(),
            visibility: Visibility::Public,
            arity: 0,
            return_type: Some(return_type),
            invoke: Some(erase(read)),
        })
    }

    /// Declares a method signature without an accessor.
    #[must_use]
    pub fn method(
        self,
        name: impl Into<String>,
        visibility: Visibility,
        arity: usize,
        return_type: Option<DataType>,
    ) -> Self {
        self.push_method(MethodDescriptor {
            name: name.into(),
            visibility,
            arity,
            return_type,
            invoke: None,
        })
    }

    fn push_method(mut self, method: MethodDescriptor) -> Self {
        match self.methods.iter_mut().find(|m| m.name == method.name) {
            Some(slot) => *slot = method,
            None => self.methods.push(method),
        }
        self
    }

    /// Attaches a schema declaration.
    #[must_use]
    pub fn schema(mut self, schema: SchemaDeclaration) -> Self {
        self.schema = Some(schema);
        self
    }

    /// Declares the children accessor used for flattening and tree population.
    #[must_use]
    pub fn children<F>(mut self, read: F) -> Self
    where
        F: Fn(&T) -> Result<Vec<BeanRef>, ChildrenError> + Send + Sync + 'static,
    {
        self.children = Some(Arc::new(move |instance: &dyn Any| {
            instance.downcast_ref::<T>().map(&read)
        }));
        self
    }

    /// Finishes the descriptor.
    #[must_use]
    pub fn build(self) -> BeanType {
        BeanType {
            id: NEXT_DESCRIPTOR_ID.fetch_add(1, Ordering::Relaxed),
            name: self.name,
            type_id: TypeId::of::<T>(),
            parent: self.parent,
            fields: self.fields,
            methods: self.methods,
            schema: self.schema,
            children: self.children,
        }
    }
}
