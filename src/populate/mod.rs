//! Store population from bean collections.
//!
//! A [`Populator`] resolves a property schema for one bean type, declares it
//! on a record store, and replaces the store's records with one record per
//! bean. Beans exposing children are descended into: a flat store receives
//! descendants as sibling records, a tree store receives them as child
//! records of their parent.
//!
//! Population is staged. Every value, id and relation is computed before the
//! store is touched, and the store validates the whole batch before swapping
//! it in, so a failed population leaves the store as it was.
//!
//! ```
//! use std::sync::LazyLock;
//! use beanbind::{
//!     AttributeReaderAlgorithm, Bean, BeanRef, BeanType, Capability, DataType, ItemId,
//!     Populator, Value,
//! };
//!
//! struct Task {
//!     title: String,
//! }
//!
//! impl Bean for Task {
//!     fn bean_type() -> &'static BeanType {
//!         static TYPE: LazyLock<BeanType> = LazyLock::new(|| {
//!             BeanType::builder::<Task>("Task")
//!                 .field("title", DataType::Text, |t: &Task| Value::from(&t.title))
//!                 .build()
//!         });
//!         &TYPE
//!     }
//! }
//!
//! let populator = Populator::builder()
//!     .bean::<Task>()
//!     .algorithm(AttributeReaderAlgorithm::new())
//!     .build()
//!     .unwrap();
//! let beans = vec![BeanRef::new(Task { title: "write docs".to_string() })];
//! let store = populator
//!     .build(None, &beans, &Capability::Filterable.into())
//!     .unwrap();
//! assert_eq!(store.size(), 1);
//! assert_eq!(
//!     store.value(&ItemId::Int(0), "title").unwrap(),
//!     &Value::from("write docs")
//! );
//! ```

mod config;

use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

use tracing::{debug, warn};

use crate::bean::{Bean, BeanRef, BeanType, TypeHandle};
use crate::error::{BindResult, PopulateError, SchemaError, ValidationError};
use crate::path::{NestedPathResolver, ResolvedPath};
use crate::property::{GeneratedProperty, PropertyMetadata, PropertyReaderAlgorithm};
use crate::store::{
    Batch, Capability, Hierarchy, ItemId, PropertyDef, RecordStore, Row, StoreKind, StoreRegistry,
};
use crate::value::{DataType, Value};

pub use config::{ChildrenPolicy, PopulatorConfig, DEFAULT_BACK_REFERENCE};

/// Derives an item id from a bean.
pub type IdResolverFn = Arc<dyn Fn(&BeanRef) -> BindResult<ItemId> + Send + Sync>;

/// How item ids are assigned to records.
#[derive(Clone, Default)]
pub enum IdStrategy {
    /// Sequential integers from 0, in population order.
    #[default]
    Generated,
    /// The value at a dotted path of the bean; must be an integer or non-blank text.
    Property(String),
    /// An application callback.
    Resolver(IdResolverFn),
}

impl IdStrategy {
    /// Wraps a callback deriving the id from the bean.
    pub fn resolver<F>(resolve: F) -> Self
    where
        F: Fn(&BeanRef) -> BindResult<ItemId> + Send + Sync + 'static,
    {
        Self::Resolver(Arc::new(resolve))
    }
}

impl fmt::Debug for IdStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Generated => write!(f, "Generated"),
            Self::Property(path) => write!(f, "Property({path})"),
            Self::Resolver(_) => write!(f, "Resolver"),
        }
    }
}

enum IdSource {
    Generated(i64),
    Path(ResolvedPath),
    Resolver(IdResolverFn),
}

impl IdSource {
    fn next(&mut self, bean: &BeanRef) -> BindResult<ItemId> {
        match self {
            Self::Generated(next) => {
                let id = ItemId::Int(*next);
                *next += 1;
                Ok(id)
            }
            Self::Path(path) => {
                let value = path.read(bean)?;
                ItemId::try_from(&value).map_err(|rejected| {
                    PopulateError::InvalidId {
                        value: rejected.to_string(),
                    }
                    .into()
                })
            }
            Self::Resolver(resolve) => resolve(bean),
        }
    }
}

/// Builder for [`Populator`].
#[derive(Default)]
pub struct PopulatorBuilder {
    bean_type: Option<&'static BeanType>,
    algorithm: Option<Arc<dyn PropertyReaderAlgorithm>>,
    generated: Vec<GeneratedProperty>,
    config: PopulatorConfig,
    id_strategy: IdStrategy,
    registry: StoreRegistry,
}

impl PopulatorBuilder {
    /// Type of the beans to populate from. Required.
    #[must_use]
    pub fn bean_type(mut self, bean_type: &'static BeanType) -> Self {
        self.bean_type = Some(bean_type);
        self
    }

    /// Shorthand for [`Self::bean_type`] with `T`'s registered descriptor.
    #[must_use]
    pub fn bean<T: Bean>(self) -> Self {
        self.bean_type(T::bean_type())
    }

    /// Reader algorithm for the property schema. Without one, records only
    /// carry generated properties and the back-reference.
    #[must_use]
    pub fn algorithm(self, algorithm: impl PropertyReaderAlgorithm + 'static) -> Self {
        self.shared_algorithm(Arc::new(algorithm))
    }

    /// Like [`Self::algorithm`], sharing an algorithm (and its cache).
    #[must_use]
    pub fn shared_algorithm(mut self, algorithm: Arc<dyn PropertyReaderAlgorithm>) -> Self {
        self.algorithm = Some(algorithm);
        self
    }

    /// Adds a computed property, declared after the reader properties.
    #[must_use]
    pub fn generated(mut self, property: GeneratedProperty) -> Self {
        self.generated.push(property);
        self
    }

    /// Name of the back-reference property. Blank falls back to `bean`.
    #[must_use]
    pub fn back_reference(mut self, name: impl Into<String>) -> Self {
        self.config.back_reference = name.into();
        self
    }

    /// How a failing children accessor is handled. Defaults to failing the population.
    #[must_use]
    pub fn children_policy(mut self, policy: ChildrenPolicy) -> Self {
        self.config.children_policy = policy;
        self
    }

    /// How item ids are derived. Defaults to [`IdStrategy::Generated`].
    #[must_use]
    pub fn id_strategy(mut self, strategy: IdStrategy) -> Self {
        self.id_strategy = strategy;
        self
    }

    /// Shorthand for [`IdStrategy::Property`].
    #[must_use]
    pub fn id_property(self, path: impl Into<String>) -> Self {
        self.id_strategy(IdStrategy::Property(path.into()))
    }

    /// Applies plain-data settings.
    #[must_use]
    pub fn config(mut self, config: PopulatorConfig) -> Self {
        if let Some(path) = &config.id_property {
            self.id_strategy = IdStrategy::Property(path.clone());
        }
        self.config = config;
        self
    }

    /// Registry consulted for named store kinds.
    #[must_use]
    pub fn registry(mut self, registry: StoreRegistry) -> Self {
        self.registry = registry;
        self
    }

    /// # Errors
    /// - `InvalidArgument` when the bean type is missing or a setting is invalid
    /// - any error resolving the id property path
    pub fn build(self) -> BindResult<Populator> {
        let bean_type = self
            .bean_type
            .ok_or_else(|| ValidationError::invalid("bean_type", "is required"))?;

        let mut config = self.config;
        if let IdStrategy::Property(path) = &self.id_strategy {
            config.id_property = Some(path.clone());
        }
        config.validate()?;

        let id_path = match &self.id_strategy {
            IdStrategy::Property(path) => Some(NestedPathResolver::resolve(bean_type, path)?),
            _ => None,
        };

        Ok(Populator {
            bean_type,
            algorithm: self.algorithm,
            generated: self.generated,
            back_reference: config.back_reference().to_string(),
            children_policy: config.children_policy,
            id_strategy: self.id_strategy,
            id_path,
            registry: self.registry,
        })
    }
}

/// Builds and fills record stores from beans of one type.
pub struct Populator {
    bean_type: &'static BeanType,
    algorithm: Option<Arc<dyn PropertyReaderAlgorithm>>,
    generated: Vec<GeneratedProperty>,
    back_reference: String,
    children_policy: ChildrenPolicy,
    id_strategy: IdStrategy,
    id_path: Option<ResolvedPath>,
    registry: StoreRegistry,
}

impl fmt::Debug for Populator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Populator")
            .field("bean_type", &self.bean_type.name())
            .field("has_algorithm", &self.algorithm.is_some())
            .field("generated", &self.generated)
            .field("back_reference", &self.back_reference)
            .field("children_policy", &self.children_policy)
            .field("id_strategy", &self.id_strategy)
            .finish_non_exhaustive()
    }
}

impl Populator {
    /// Starts configuring a populator.
    #[must_use]
    pub fn builder() -> PopulatorBuilder {
        PopulatorBuilder::default()
    }

    /// Type of the beans this populator accepts.
    #[must_use]
    pub const fn bean_type(&self) -> &'static BeanType {
        self.bean_type
    }

    /// Name of the property holding each record's source bean.
    #[must_use]
    pub fn back_reference(&self) -> &str {
        &self.back_reference
    }

    /// The configured children policy.
    #[must_use]
    pub const fn children_policy(&self) -> ChildrenPolicy {
        self.children_policy
    }

    /// Properties written for each bean, back-reference excluded, in
    /// declaration order.
    ///
    /// # Errors
    /// Schema errors from the reader algorithm, or `DuplicateProperty` when a
    /// generated property or the back-reference reuses a name.
    pub fn schema(&self) -> BindResult<Vec<PropertyMetadata>> {
        let mut metadata = match &self.algorithm {
            Some(algorithm) => algorithm.properties(self.bean_type)?,
            None => Vec::new(),
        };
        metadata.extend(self.generated.iter().cloned().map(GeneratedProperty::into_metadata));

        let mut seen = HashSet::with_capacity(metadata.len() + 1);
        for name in metadata
            .iter()
            .map(PropertyMetadata::name)
            .chain([self.back_reference.as_str()])
        {
            if !seen.insert(name) {
                return Err(SchemaError::DuplicateProperty {
                    name: name.to_string(),
                    label: "store".to_string(),
                }
                .into());
            }
        }
        Ok(metadata)
    }

    /// Returns a store of `kind` holding exactly `beans` (and their
    /// descendants).
    ///
    /// `existing` is reused when it satisfies `kind` and replaced by a new
    /// store otherwise. The store is consumed on failure; use
    /// [`Self::fill`] to keep it.
    ///
    /// # Errors
    /// `UnsupportedStoreKind` when no store of `kind` can be created, plus
    /// every error of [`Self::fill`].
    pub fn build(
        &self,
        existing: Option<Box<dyn RecordStore>>,
        beans: &[BeanRef],
        kind: &StoreKind,
    ) -> BindResult<Box<dyn RecordStore>> {
        let mut store = match existing {
            Some(store) if kind.is_satisfied_by(store.as_ref()) => store,
            _ => self.registry.create(kind)?,
        };
        self.fill(store.as_mut(), beans)?;
        Ok(store)
    }

    /// [`Self::build`] with the existing store's own kind, or a filterable
    /// store when there is none.
    pub fn populate(
        &self,
        existing: Option<Box<dyn RecordStore>>,
        beans: &[BeanRef],
    ) -> BindResult<Box<dyn RecordStore>> {
        let kind = existing.as_ref().map_or_else(
            || StoreKind::from(Capability::Filterable),
            |store| StoreKind::named(store.kind_name()),
        );
        self.build(existing, beans, &kind)
    }

    /// Replaces the records of `store` with `beans`.
    ///
    /// # Errors
    /// - schema errors from [`Self::schema`] or from reading values
    /// - `TypeMismatch` for a bean that is not of the configured type
    /// - `CyclicGraph` when a bean is its own descendant
    /// - `ChildrenUnavailable` under [`ChildrenPolicy::Propagate`]
    /// - `InvalidId` or `DuplicateItem` from id assignment
    /// - store type mismatches against existing declarations
    ///
    /// The store is unchanged on error.
    pub fn fill(&self, store: &mut dyn RecordStore, beans: &[BeanRef]) -> BindResult<()> {
        let metadata = self.schema()?;
        let tree = store.supports(Capability::Tree);

        let ids = match (&self.id_strategy, &self.id_path) {
            (IdStrategy::Resolver(resolve), _) => IdSource::Resolver(Arc::clone(resolve)),
            (_, Some(path)) => IdSource::Path(path.clone()),
            _ => IdSource::Generated(0),
        };
        let mut staging = Staging {
            populator: self,
            metadata: &metadata,
            tree,
            ids,
            rows: Vec::with_capacity(beans.len()),
            edges: Vec::new(),
            ancestors: Vec::new(),
        };
        for bean in beans {
            staging.visit(bean)?;
        }
        let Staging { rows, edges, .. } = staging;

        let mut properties: Vec<PropertyDef> = metadata
            .iter()
            .map(|meta| PropertyDef {
                name: meta.name().to_string(),
                data_type: meta.data_type().clone(),
                default_value: meta.default_value().cloned(),
            })
            .collect();
        properties.push(PropertyDef::new(
            self.back_reference.clone(),
            DataType::Bean(TypeHandle::from_static(self.bean_type)),
        ));

        let records = rows.len();
        let relations: usize = edges.iter().map(|(_, children)| children.len()).sum();
        match store.as_tree_mut() {
            Some(tree_store) => {
                let hierarchy = Hierarchy::from_edges(rows.iter().map(|row| &row.id), edges)?;
                tree_store.commit_tree(Batch { properties, rows }, hierarchy)?;
            }
            None => store.commit(Batch { properties, rows })?,
        }

        debug!(
            bean_type = self.bean_type.name(),
            store = store.kind_name(),
            records,
            relations,
            "populated store"
        );
        Ok(())
    }
}

struct Staging<'a> {
    populator: &'a Populator,
    metadata: &'a [PropertyMetadata],
    tree: bool,
    ids: IdSource,
    rows: Vec<Row>,
    edges: Vec<(ItemId, Vec<ItemId>)>,
    /// Identities of the beans on the current descent path.
    ancestors: Vec<usize>,
}

impl Staging<'_> {
    fn visit(&mut self, bean: &BeanRef) -> BindResult<ItemId> {
        let expected = self.populator.bean_type;
        if !bean.bean_type().is_a(expected) {
            return Err(SchemaError::TypeMismatch {
                expected: expected.name().to_string(),
                actual: bean.bean_type().name().to_string(),
            }
            .into());
        }

        let id = self.ids.next(bean)?;
        let mut values = Vec::with_capacity(self.metadata.len() + 1);
        for meta in self.metadata {
            values.push((meta.name().to_string(), meta.read(bean)?));
        }
        values.push((
            self.populator.back_reference.clone(),
            Value::Bean(bean.clone()),
        ));
        self.rows.push(Row {
            id: id.clone(),
            values,
        });

        let children = self.children_of(bean)?;
        if children.is_empty() {
            return Ok(id);
        }

        self.ancestors.push(bean.identity());
        let mut child_ids = Vec::with_capacity(children.len());
        for child in &children {
            if self.ancestors.contains(&child.identity()) {
                return Err(PopulateError::CyclicGraph {
                    type_name: child.bean_type().name().to_string(),
                }
                .into());
            }
            child_ids.push(self.visit(child)?);
        }
        self.ancestors.pop();

        if self.tree {
            self.edges.push((id.clone(), child_ids));
        }
        Ok(id)
    }

    fn children_of(&self, bean: &BeanRef) -> BindResult<Vec<BeanRef>> {
        match bean.children() {
            None => Ok(Vec::new()),
            Some(Ok(children)) => Ok(children),
            Some(Err(e)) => match self.populator.children_policy {
                ChildrenPolicy::Propagate => Err(PopulateError::ChildrenUnavailable {
                    type_name: bean.bean_type().name().to_string(),
                    reason: e.reason,
                }
                .into()),
                ChildrenPolicy::TreatAsEmpty => {
                    warn!(
                        bean_type = bean.bean_type().name(),
                        reason = %e,
                        "children unavailable, treating as empty"
                    );
                    Ok(Vec::new())
                }
            },
        }
    }
}
