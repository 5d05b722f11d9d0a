use std::sync::{Arc, LazyLock};

use beanbind::{
    AttributeReaderAlgorithm, Bean, BeanRef, BeanType, BindError, Capability, DataType,
    HierarchicalSynchronizer, HierarchyError, ItemId, Populator, RecordStore, Value,
};

/// Task whose subtasks are referenced by id, the way a lazily loaded
/// relation would be.
#[derive(Debug)]
struct Task {
    id: i64,
    title: String,
    subtasks: Vec<i64>,
}

impl Task {
    fn new(id: i64, title: &str, subtasks: &[i64]) -> Self {
        Self {
            id,
            title: title.to_string(),
            subtasks: subtasks.to_vec(),
        }
    }
}

impl Bean for Task {
    fn bean_type() -> &'static BeanType {
        static TYPE: LazyLock<BeanType> = LazyLock::new(|| {
            BeanType::builder::<Task>("Task")
                .field("id", DataType::Int, |t: &Task| Value::Int(t.id))
                .field("title", DataType::Text, |t: &Task| Value::from(&t.title))
                .build()
        });
        &TYPE
    }
}

fn subtasks(bean: &BeanRef) -> Vec<ItemId> {
    bean.downcast_ref::<Task>()
        .map(|t| t.subtasks.iter().copied().map(ItemId::Int).collect())
        .unwrap_or_default()
}

fn board(tasks: Vec<Task>) -> Box<dyn RecordStore> {
    let beans: Vec<BeanRef> = tasks.into_iter().map(BeanRef::new).collect();
    Populator::builder()
        .bean::<Task>()
        .algorithm(AttributeReaderAlgorithm::new())
        .id_property("id")
        .build()
        .unwrap()
        .build(None, &beans, &Capability::Filterable.into())
        .unwrap()
}

fn synced(tasks: Vec<Task>) -> HierarchicalSynchronizer {
    let mut sync = HierarchicalSynchronizer::from_boxed(board(tasks)).with_resolver(subtasks);
    sync.sync().unwrap();
    sync
}

fn scenario() -> Vec<Task> {
    vec![
        Task::new(1, "A", &[2, 3]),
        Task::new(2, "A1", &[]),
        Task::new(3, "A2", &[]),
        Task::new(4, "B", &[]),
    ]
}

#[test]
fn test_rebuild_derives_tree_from_resolver() {
    let sync = synced(scenario());
    let (a, b) = (ItemId::Int(1), ItemId::Int(4));

    assert_eq!(sync.store().size(), 4);
    assert!(sync.has_children(&a));
    assert!(!sync.has_children(&b));
    assert_eq!(sync.root_item_ids(), vec![a.clone(), b.clone()]);
    assert!(sync.is_root(&b));
    assert!(!sync.is_root(&ItemId::Int(2)));
    assert!(sync.are_children_allowed(&a));
    assert!(!sync.are_children_allowed(&b));
}

#[test]
fn test_rebuild_twice_is_identical() {
    let mut sync = synced(scenario());
    let parents = sync.hierarchy().parent_map().clone();
    let disallowed = sync.hierarchy().disallowed().clone();
    let roots = sync.root_item_ids();

    sync.sync().unwrap();
    assert_eq!(sync.hierarchy().parent_map(), &parents);
    assert_eq!(sync.hierarchy().disallowed(), &disallowed);
    assert_eq!(sync.root_item_ids(), roots);
}

#[test]
fn test_every_parent_allows_children() {
    let sync = synced(vec![
        Task::new(1, "root", &[2]),
        Task::new(2, "mid", &[3, 4]),
        Task::new(3, "leaf", &[]),
        Task::new(4, "leaf", &[]),
    ]);
    for (child, parent) in sync.hierarchy().parent_map() {
        assert!(sync.are_children_allowed(parent), "{parent} parents {child}");
    }
    assert_eq!(sync.root_item_ids(), vec![ItemId::Int(1)]);
}

#[test]
fn test_store_mutations_resync() {
    let mut sync = synced(scenario());

    sync.add_bean(5_i64, BeanRef::new(Task::new(5, "C", &[4])))
        .unwrap();
    assert_eq!(sync.parent(&ItemId::Int(4)), Some(ItemId::Int(5)));

    let removed = sync
        .with_store_mut(|store| store.remove_item(&ItemId::Int(1)))
        .unwrap();
    assert!(removed);
    assert_eq!(
        sync.root_item_ids(),
        vec![ItemId::Int(2), ItemId::Int(3), ItemId::Int(5)]
    );

    // value edits leave the record set alone
    sync.with_store_mut(|store| {
        store
            .set_value(&ItemId::Int(5), "title", Value::from("renamed"))
            .unwrap();
    })
    .unwrap();
    assert!(!sync.needs_sync());
}

#[test]
fn test_unknown_child_id_is_surfaced() {
    let mut sync = HierarchicalSynchronizer::from_boxed(board(vec![
        Task::new(1, "A", &[2, 42]),
        Task::new(2, "A1", &[]),
    ]))
    .with_resolver(subtasks);

    let err = sync.sync().unwrap_err();
    assert!(err.is_inconsistent_hierarchy());
    assert_eq!(
        err,
        BindError::Hierarchy(HierarchyError::UnknownChild {
            parent: ItemId::Int(1),
            child: ItemId::Int(42),
        })
    );
    assert!(sync.needs_sync());
    assert!(sync.hierarchy().is_empty());
}

#[test]
fn test_resolver_cycle_is_rejected() {
    let mut sync = HierarchicalSynchronizer::from_boxed(board(vec![
        Task::new(1, "A", &[2]),
        Task::new(2, "B", &[1]),
    ]))
    .with_resolver(subtasks);

    let err = sync.sync().unwrap_err();
    assert!(err.is_inconsistent_hierarchy());
}

#[test]
fn test_pass_through_without_resolver() {
    let mut sync = HierarchicalSynchronizer::from_boxed(board(scenario()));
    sync.sync().unwrap();
    assert!(sync.hierarchy().is_empty());
    assert_eq!(sync.root_item_ids().len(), 4);

    let (a, a1) = (ItemId::Int(1), ItemId::Int(2));
    sync.set_parent(&a1, Some(&a)).unwrap();
    assert_eq!(sync.children(&a), vec![a1.clone()]);

    let err = sync.set_children_allowed(&a, false).unwrap_err();
    assert!(matches!(
        err,
        BindError::Hierarchy(HierarchyError::HasChildren { .. })
    ));

    let err = sync.set_parent(&a, Some(&a1)).unwrap_err();
    assert!(err.is_inconsistent_hierarchy());

    sync.remove_item(&a).unwrap();
    assert!(sync.parent(&a1).is_none());
}

#[test]
fn test_shared_store_handle_survives_into_store() {
    let shared = Arc::new(Task::new(1, "solo", &[]));
    let mut sync = HierarchicalSynchronizer::from_boxed(board(Vec::new())).with_resolver(subtasks);
    sync.add_bean(1_i64, BeanRef::from_arc(Arc::clone(&shared)))
        .unwrap();

    let store = sync.into_store();
    match store.value(&ItemId::Int(1), "bean").unwrap() {
        Value::Bean(bean) => assert!(Arc::ptr_eq(&bean.downcast::<Task>().unwrap(), &shared)),
        other => panic!("expected a bean, got {other:?}"),
    }
}
