mod support;

use dogether::error::Error;
use dogether::ordering::OrderEngine;
use dogether::storage::Storage;

use support::Fixture;

#[test]
fn inserts_append_at_the_end() -> anyhow::Result<()> {
    let fx = Fixture::new();
    let alice = fx.user("alice");
    let list = fx.list(&alice, "chores", false);

    let engine = OrderEngine::new(fx.store.as_ref());
    assert_eq!(engine.insert_position(&list.id)?, 0);

    let tasks = fx.tasks(&alice, &list, 3);
    let orders: Vec<usize> = tasks.iter().map(|t| t.list_order).collect();
    assert_eq!(orders, vec![0, 1, 2]);
    assert_eq!(engine.insert_position(&list.id)?, 3);
    Ok(())
}

#[test]
fn insert_into_missing_list_is_not_found() {
    let fx = Fixture::new();
    let engine = OrderEngine::new(fx.store.as_ref());
    assert!(matches!(
        engine.insert_position("nope"),
        Err(Error::ListNotFound(_))
    ));
}

#[test]
fn reorder_last_to_second() -> anyhow::Result<()> {
    let fx = Fixture::new();
    let alice = fx.user("alice");
    let list = fx.list(&alice, "chores", false);
    let tasks = fx.tasks(&alice, &list, 4);

    let reordered = fx.planner.reorder_task(&alice.id, &tasks[3].id, 1)?;
    let view: Vec<(String, usize)> = support::orders(&reordered);
    assert_eq!(
        view,
        vec![
            ("T0".to_string(), 0),
            ("T3".to_string(), 1),
            ("T1".to_string(), 2),
            ("T2".to_string(), 3),
        ]
    );
    Ok(())
}

#[test]
fn reorder_to_current_position_writes_nothing() -> anyhow::Result<()> {
    let fx = Fixture::new();
    let alice = fx.user("alice");
    let list = fx.list(&alice, "chores", false);
    let tasks = fx.tasks(&alice, &list, 3);

    // Any write would hit the injected failure
    fx.store.fail_after_writes(0);
    fx.planner.reorder_task(&alice.id, &tasks[1].id, 1)?;
    assert_eq!(fx.titles(&list), vec!["T0", "T1", "T2"]);
    Ok(())
}

#[test]
fn reorder_there_and_back_restores_order() -> anyhow::Result<()> {
    let fx = Fixture::new();
    let alice = fx.user("alice");
    let list = fx.list(&alice, "chores", false);
    let tasks = fx.tasks(&alice, &list, 6);
    let before = fx.titles(&list);

    fx.planner.reorder_task(&alice.id, &tasks[1].id, 4)?;
    assert_ne!(fx.titles(&list), before);
    fx.planner.reorder_task(&alice.id, &tasks[1].id, 1)?;
    assert_eq!(fx.titles(&list), before);
    Ok(())
}

#[test]
fn reorder_rejects_out_of_range_target() {
    let fx = Fixture::new();
    let alice = fx.user("alice");
    let list = fx.list(&alice, "chores", false);
    let tasks = fx.tasks(&alice, &list, 2);

    let err = fx
        .planner
        .reorder_task(&alice.id, &tasks[0].id, 2)
        .unwrap_err();
    assert!(matches!(err, Error::InvalidArgument(_)));
    fx.assert_dense(&list);
}

#[test]
fn reorder_of_task_from_another_list_is_not_found() {
    let fx = Fixture::new();
    let alice = fx.user("alice");
    let a = fx.list(&alice, "a", false);
    let b = fx.list(&alice, "b", false);
    fx.tasks(&alice, &a, 2);
    let stray = fx.task(&alice, &b, "stray");

    let engine = OrderEngine::new(fx.store.as_ref());
    assert!(matches!(
        engine.reorder(&stray.id, &a.id, 0),
        Err(Error::TaskNotFound(_))
    ));
}

#[test]
fn density_survives_a_long_mixed_sequence() -> anyhow::Result<()> {
    let fx = Fixture::new();
    let alice = fx.user("alice");
    let list = fx.list(&alice, "chores", false);
    fx.tasks(&alice, &list, 5);

    // Deterministic pseudo-random walk over insert / reorder / remove
    let mut seed: u64 = 0x2545_f491_4f6c_dd1d;
    let mut next = |bound: usize| {
        seed ^= seed << 13;
        seed ^= seed >> 7;
        seed ^= seed << 17;
        (seed % bound as u64) as usize
    };

    for step in 0..120 {
        let rows = fx.rows(&list);
        match next(3) {
            0 => {
                fx.task(&alice, &list, &format!("S{step}"));
            }
            1 if !rows.is_empty() => {
                let task = &rows[next(rows.len())];
                let target = next(rows.len());
                fx.planner.reorder_task(&alice.id, &task.id, target)?;
            }
            2 if rows.len() > 1 => {
                let task = &rows[next(rows.len())];
                fx.planner.delete_task(&alice.id, &task.id)?;
            }
            _ => {}
        }
        fx.assert_dense(&list);
    }
    Ok(())
}

#[test]
fn remove_closes_the_gap_in_relative_order() -> anyhow::Result<()> {
    let fx = Fixture::new();
    let alice = fx.user("alice");
    let list = fx.list(&alice, "chores", false);
    let tasks = fx.tasks(&alice, &list, 4);

    let removed = fx.planner.delete_task(&alice.id, &tasks[1].id)?;
    assert_eq!(removed.title, "T1");
    assert_eq!(fx.titles(&list), vec!["T0", "T2", "T3"]);
    fx.assert_dense(&list);
    Ok(())
}

#[test]
fn move_across_lists_appends_to_destination() -> anyhow::Result<()> {
    let fx = Fixture::new();
    let alice = fx.user("alice");
    let from = fx.list(&alice, "from", false);
    let to = fx.list(&alice, "to", false);
    let tasks = fx.tasks(&alice, &from, 4);
    fx.tasks(&alice, &to, 2);

    let moved = fx.planner.move_task(&alice.id, &tasks[1].id, &to.id)?;
    assert_eq!(moved.list_id, to.id);
    assert_eq!(moved.list_order, 2);

    assert_eq!(fx.titles(&from), vec!["T0", "T2", "T3"]);
    assert_eq!(fx.titles(&to), vec!["T0", "T1", "T1"]);
    fx.assert_dense(&from);
    fx.assert_dense(&to);
    Ok(())
}

#[test]
fn interrupted_move_leaves_task_last_in_source() -> anyhow::Result<()> {
    let fx = Fixture::new();
    let alice = fx.user("alice");
    let from = fx.list(&alice, "from", false);
    let to = fx.list(&alice, "to", false);
    let tasks = fx.tasks(&alice, &from, 3);

    // Moving T0 to the end of `from` rewrites three positions; the
    // reassignment after that fails.
    fx.store.fail_after_writes(3);
    let err = fx
        .planner
        .move_task(&alice.id, &tasks[0].id, &to.id)
        .unwrap_err();
    assert!(matches!(err, Error::StorageFailed(_)));

    assert_eq!(fx.titles(&from), vec!["T1", "T2", "T0"]);
    assert!(fx.titles(&to).is_empty());
    fx.assert_dense(&from);

    // Retrying completes the move
    fx.planner.move_task(&alice.id, &tasks[0].id, &to.id)?;
    assert_eq!(fx.titles(&from), vec!["T1", "T2"]);
    assert_eq!(fx.titles(&to), vec!["T0"]);
    Ok(())
}

#[test]
fn move_to_the_same_list_is_rejected() {
    let fx = Fixture::new();
    let alice = fx.user("alice");
    let list = fx.list(&alice, "l", false);
    let task = fx.task(&alice, &list, "a");

    let err = fx
        .planner
        .move_task(&alice.id, &task.id, &list.id)
        .unwrap_err();
    assert!(matches!(err, Error::InvalidArgument(_)));
}

#[test]
fn repair_closes_gaps_left_outside_the_engine() -> anyhow::Result<()> {
    let fx = Fixture::new();
    let alice = fx.user("alice");
    let list = fx.list(&alice, "l", false);
    let tasks = fx.tasks(&alice, &list, 3);

    fx.store.update_task_order(&tasks[2].id, 7)?;
    fx.store.delete_task(&tasks[0].id)?;

    assert_eq!(fx.planner.repair_list(&alice.id, &list.id)?, 2);
    assert_eq!(fx.titles(&list), vec!["T1", "T2"]);
    fx.assert_dense(&list);
    assert_eq!(fx.planner.repair_list(&alice.id, &list.id)?, 0);
    Ok(())
}
