use std::collections::HashSet;
use std::sync::LazyLock;

use proptest::prelude::*;

use beanbind::{
    AnnotationReaderAlgorithm, AttributeReaderAlgorithm, Bean, BeanRef, BeanType, Capability,
    DataType, HierarchicalSynchronizer, ItemId, NestedPathResolver, Populator,
    PropertyDeclaration, PropertyReaderAlgorithm, SchemaDeclaration, Value, ViewLabel,
};

struct Shape;

impl Bean for Shape {
    fn bean_type() -> &'static BeanType {
        static TYPE: LazyLock<BeanType> =
            LazyLock::new(|| BeanType::builder::<Shape>("Shape").build());
        &TYPE
    }
}

/// Descriptor with arbitrary field names, built per case.
fn shape_type(fields: &[String], schema: Option<SchemaDeclaration>) -> BeanType {
    let mut builder = BeanType::builder::<Shape>("Shape");
    for name in fields {
        builder = builder.field(name.clone(), DataType::Int, |_: &Shape| Value::Int(0));
    }
    if let Some(schema) = schema {
        builder = builder.schema(schema);
    }
    builder.build()
}

#[derive(Debug, Clone)]
struct Link {
    label: String,
    next: Option<Box<Link>>,
}

impl Link {
    fn chain(len: usize) -> Self {
        let mut link = Self {
            label: format!("n{}", len - 1),
            next: None,
        };
        for i in (0..len - 1).rev() {
            link = Self {
                label: format!("n{i}"),
                next: Some(Box::new(link)),
            };
        }
        link
    }
}

impl Bean for Link {
    fn bean_type() -> &'static BeanType {
        static TYPE: LazyLock<BeanType> = LazyLock::new(|| {
            BeanType::builder::<Link>("Link")
                .field("label", DataType::Text, |l: &Link| Value::from(&l.label))
                .field("next", DataType::bean::<Link>(), |l: &Link| {
                    Value::optional_bean(l.next.as_deref())
                })
                .build()
        });
        &TYPE
    }
}

#[derive(Debug)]
struct Node {
    id: i64,
    children: Vec<i64>,
}

impl Bean for Node {
    fn bean_type() -> &'static BeanType {
        static TYPE: LazyLock<BeanType> = LazyLock::new(|| {
            BeanType::builder::<Node>("Node")
                .field("id", DataType::Int, |n: &Node| Value::Int(n.id))
                .build()
        });
        &TYPE
    }
}

fn node_children(bean: &BeanRef) -> Vec<ItemId> {
    bean.downcast_ref::<Node>()
        .map(|n| n.children.iter().copied().map(ItemId::Int).collect())
        .unwrap_or_default()
}

/// Random forest: each node optionally points at an earlier node as parent.
fn forest() -> impl Strategy<Value = Vec<Option<usize>>> {
    (1usize..40).prop_flat_map(|n| {
        (0..n)
            .map(|i| {
                if i == 0 {
                    Just(None).boxed()
                } else {
                    proptest::option::of(0..i).boxed()
                }
            })
            .collect::<Vec<_>>()
    })
}

fn path(hops: usize, tail: &str) -> String {
    let mut segments = vec!["next"; hops];
    segments.push(tail);
    segments.join(".")
}

proptest! {
    #[test]
    fn test_attribute_names_are_unique_declared_and_not_ignored(
        fields in proptest::collection::vec("[a-z]{1,5}", 0..12),
        ignored in proptest::collection::vec("[a-z]{1,5}", 0..4),
    ) {
        let bean_type = shape_type(&fields, None);
        let algorithm = AttributeReaderAlgorithm::new().ignoring(ignored.clone());
        let props = algorithm.properties(&bean_type).unwrap();

        let mut seen = HashSet::new();
        for p in &props {
            prop_assert!(seen.insert(p.name().to_string()), "duplicate {}", p.name());
            prop_assert!(fields.iter().any(|f| f == p.name()));
            prop_assert!(!ignored.iter().any(|i| i == p.name()));
        }
        let expected: HashSet<&String> =
            fields.iter().filter(|f| !ignored.contains(f)).collect();
        prop_assert_eq!(props.len(), expected.len());
    }

    #[test]
    fn test_annotation_names_follow_schema_view(
        fields in proptest::collection::hash_set("[a-z]{1,5}", 1..10),
        detail_mask in proptest::collection::vec(any::<bool>(), 10),
    ) {
        let fields: Vec<String> = fields.into_iter().collect();
        let mut schema = SchemaDeclaration::new();
        for (field, detail) in fields.iter().zip(&detail_mask) {
            let label = if *detail { ViewLabel::DETAIL } else { ViewLabel::SUMMARY };
            schema = schema.property(PropertyDeclaration::new(field.clone()).label(label));
        }
        let bean_type = shape_type(&fields, Some(schema));

        let detail = AnnotationReaderAlgorithm::new(ViewLabel::DETAIL).unwrap();
        let names: Vec<String> = detail
            .properties(&bean_type)
            .unwrap()
            .iter()
            .map(|p| p.name().to_string())
            .collect();
        let expected: Vec<String> = fields
            .iter()
            .zip(&detail_mask)
            .filter(|(_, d)| **d)
            .map(|(f, _)| f.clone())
            .collect();
        prop_assert_eq!(names, expected);
    }

    #[test]
    fn test_path_resolution_is_transitive(hops in 1usize..16, split in 0usize..16) {
        let split = split % hops;
        let full = NestedPathResolver::resolve_type(Link::bean_type(), &path(hops, "label")).unwrap();

        let prefix = vec!["next"; split + 1].join(".");
        let intermediate = NestedPathResolver::resolve_type(Link::bean_type(), &prefix).unwrap();
        let rest = path(hops - split - 1, "label");
        let tail = NestedPathResolver::resolve_type(intermediate.bean_type().unwrap(), &rest).unwrap();

        prop_assert_eq!(full.clone(), tail);
        prop_assert_eq!(full, DataType::Text);
    }

    #[test]
    fn test_path_values_walk_any_depth(len in 1usize..24, hops in 0usize..24) {
        let hops = hops % len;
        let chain = BeanRef::new(Link::chain(len));
        let value = NestedPathResolver::resolve_value(&chain, &path(hops, "label")).unwrap();
        prop_assert_eq!(value, Value::from(format!("n{hops}").as_str()));
    }

    #[test]
    fn test_back_reference_round_trip(count in 0usize..30) {
        let beans: Vec<BeanRef> = (0..count)
            .map(|i| BeanRef::new(Node { id: i64::try_from(i).unwrap(), children: Vec::new() }))
            .collect();
        let store = Populator::builder()
            .bean::<Node>()
            .build()
            .unwrap()
            .build(None, &beans, &Capability::Sortable.into())
            .unwrap();
        let ids = store.item_ids();
        prop_assert_eq!(ids.len(), count);
        for (id, bean) in ids.iter().zip(&beans) {
            match store.value(id, "bean").unwrap() {
                Value::Bean(stored) => prop_assert!(stored.ptr_eq(bean)),
                other => prop_assert!(false, "unexpected {:?}", other),
            }
        }
    }

    #[test]
    fn test_rebuild_is_idempotent_and_keeps_tree_invariant(parents in forest()) {
        let mut nodes: Vec<Node> = (0..parents.len())
            .map(|i| Node { id: i64::try_from(i).unwrap(), children: Vec::new() })
            .collect();
        for (child, parent) in parents.iter().enumerate() {
            if let Some(p) = parent {
                nodes[*p].children.push(i64::try_from(child).unwrap());
            }
        }
        let beans: Vec<BeanRef> = nodes.into_iter().map(BeanRef::new).collect();
        let store = Populator::builder()
            .bean::<Node>()
            .id_property("id")
            .build()
            .unwrap()
            .build(None, &beans, &Capability::Filterable.into())
            .unwrap();

        let mut sync = HierarchicalSynchronizer::from_boxed(store).with_resolver(node_children);
        sync.sync().unwrap();
        let first = sync.hierarchy().clone();
        let roots = sync.root_item_ids();
        sync.sync().unwrap();
        prop_assert_eq!(sync.hierarchy(), &first);
        prop_assert_eq!(&sync.root_item_ids(), &roots);

        for (child, parent) in sync.hierarchy().parent_map() {
            prop_assert!(sync.are_children_allowed(parent), "{} -> {}", child, parent);
        }
        let expected: Vec<ItemId> = parents
            .iter()
            .enumerate()
            .filter(|(_, p)| p.is_none())
            .map(|(i, _)| ItemId::Int(i64::try_from(i).unwrap()))
            .collect();
        prop_assert_eq!(roots, expected);
    }
}
