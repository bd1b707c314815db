//! Concurrency tests against the JSON-file store. Each thread opens its
//! own `FileStore` on the shared directory, the way separate CLI processes
//! would.

use std::path::Path;
use std::sync::{Arc, Barrier};
use std::thread;

use dogether::model::{TaskDraft, TaskList, User};
use dogether::ordering::is_dense;
use dogether::storage::{FileStore, Storage};
use dogether::Planner;
use tempfile::TempDir;

const LOCK_TIMEOUT_MS: u64 = 30_000;

fn planner_at(dir: &Path) -> Planner {
    let store = FileStore::new(dir, LOCK_TIMEOUT_MS);
    store.init().expect("init store");
    Planner::new(Arc::new(store))
}

fn seed(dir: &Path) -> (User, TaskList) {
    let planner = planner_at(dir);
    let alice = planner.register("alice").expect("register");
    let list = planner
        .create_list(&alice.id, &alice.id, "shared", false)
        .expect("create list");
    (alice, list)
}

fn draft(owner: &User, list: &TaskList, title: String) -> TaskDraft {
    TaskDraft {
        owner: owner.id.clone(),
        title,
        list_id: list.id.clone(),
        ..TaskDraft::default()
    }
}

#[test]
fn tables_survive_reopening() -> anyhow::Result<()> {
    let dir = TempDir::new()?;
    let (alice, list) = seed(dir.path());
    planner_at(dir.path()).create_task(&alice.id, draft(&alice, &list, "persist".into()))?;

    let reopened = planner_at(dir.path());
    let tasks = reopened.tasks(&alice.id, &list.id, None)?;
    assert_eq!(tasks.len(), 1);
    assert_eq!(tasks[0].title, "persist");
    assert_eq!(reopened.find_by_username(&alice.id, "alice")?.id, alice.id);
    Ok(())
}

#[test]
fn parallel_inserts_stay_dense() -> anyhow::Result<()> {
    let dir = TempDir::new()?;
    let (alice, list) = seed(dir.path());

    let threads = 6;
    let per_thread = 8;
    let barrier = Arc::new(Barrier::new(threads));

    let handles: Vec<_> = (0..threads)
        .map(|t| {
            let dir = dir.path().to_path_buf();
            let (alice, list) = (alice.clone(), list.clone());
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || -> dogether::Result<()> {
                let planner = planner_at(&dir);
                barrier.wait();
                for i in 0..per_thread {
                    planner.create_task(&alice.id, draft(&alice, &list, format!("t{t}-{i}")))?;
                }
                Ok(())
            })
        })
        .collect();

    for handle in handles {
        handle.join().expect("join thread")?;
    }

    let tasks = planner_at(dir.path()).store().get_tasks_by_list(&list.id)?;
    assert_eq!(tasks.len(), threads * per_thread);
    assert!(is_dense(&tasks));
    Ok(())
}

#[test]
fn parallel_reorders_and_removes_stay_dense() -> anyhow::Result<()> {
    let dir = TempDir::new()?;
    let (alice, list) = seed(dir.path());
    let planner = planner_at(dir.path());
    let tasks: Vec<_> = (0..12)
        .map(|i| planner.create_task(&alice.id, draft(&alice, &list, format!("T{i}"))))
        .collect::<dogether::Result<_>>()?;

    let threads = 4;
    let barrier = Arc::new(Barrier::new(threads));
    let handles: Vec<_> = (0..threads)
        .map(|t| {
            let dir = dir.path().to_path_buf();
            let alice = alice.clone();
            let mine: Vec<String> = tasks
                .iter()
                .skip(t)
                .step_by(threads)
                .map(|task| task.id.clone())
                .collect();
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || -> dogether::Result<()> {
                let planner = planner_at(&dir);
                barrier.wait();
                for (i, id) in mine.iter().enumerate() {
                    if i == 0 {
                        planner.delete_task(&alice.id, id)?;
                    } else {
                        // Positions shrink as other threads remove; 0 is
                        // always in range.
                        planner.reorder_task(&alice.id, id, 0)?;
                    }
                }
                Ok(())
            })
        })
        .collect();

    for handle in handles {
        handle.join().expect("join thread")?;
    }

    let rows = planner.store().get_tasks_by_list(&list.id)?;
    assert_eq!(rows.len(), 12 - threads);
    assert!(is_dense(&rows));
    Ok(())
}

#[test]
fn parallel_friend_requests_on_one_pair_admit_one() -> anyhow::Result<()> {
    let dir = TempDir::new()?;
    let seed_planner = planner_at(dir.path());
    let alice = seed_planner.register("alice")?;
    let bob = seed_planner.register("bob")?;

    let threads = 6;
    let barrier = Arc::new(Barrier::new(threads));
    let handles: Vec<_> = (0..threads)
        .map(|t| {
            let dir = dir.path().to_path_buf();
            let (sender, recipient) = if t % 2 == 0 {
                (alice.id.clone(), bob.id.clone())
            } else {
                (bob.id.clone(), alice.id.clone())
            };
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                let planner = planner_at(&dir);
                barrier.wait();
                planner.send_request(&sender, &recipient).is_ok()
            })
        })
        .collect();

    let accepted = handles
        .into_iter()
        .map(|handle| handle.join().expect("join thread"))
        .filter(|ok| *ok)
        .count();
    assert_eq!(accepted, 1);

    let a = seed_planner.user(&alice.id)?;
    let b = seed_planner.user(&bob.id)?;
    assert_eq!(a.outgoing_req.len() + b.outgoing_req.len(), 1);
    assert_eq!(a.incoming_req.len() + b.incoming_req.len(), 1);
    Ok(())
}

#[test]
fn overlapping_pairs_keep_every_mirror() -> anyhow::Result<()> {
    let dir = TempDir::new()?;
    let seed_planner = planner_at(dir.path());
    let alice = seed_planner.register("alice")?;
    let others = (0..5)
        .map(|i| seed_planner.register(&format!("friend{i}")))
        .collect::<dogether::Result<Vec<User>>>()?;

    // Run one transition per friend, each thread on its own store
    let run_all = |op: fn(&Planner, &str, &str) -> dogether::Result<User>| {
        let barrier = Arc::new(Barrier::new(others.len()));
        let handles: Vec<_> = others
            .iter()
            .map(|other| {
                let dir = dir.path().to_path_buf();
                let (alice_id, other_id) = (alice.id.clone(), other.id.clone());
                let barrier = Arc::clone(&barrier);
                thread::spawn(move || {
                    let planner = planner_at(&dir);
                    barrier.wait();
                    op(&planner, &alice_id, &other_id).map(drop)
                })
            })
            .collect();
        handles
            .into_iter()
            .map(|handle| handle.join().expect("join thread"))
            .collect::<dogether::Result<Vec<()>>>()
    };

    run_all(|planner, alice, other| planner.send_request(alice, other))?;
    let alice_now = seed_planner.user(&alice.id)?;
    assert_eq!(alice_now.outgoing_req.len(), others.len());
    for other in &others {
        assert!(seed_planner.user(&other.id)?.incoming_req.contains(&alice.id));
    }

    run_all(|planner, alice, other| planner.accept_request(other, alice))?;
    let alice_now = seed_planner.user(&alice.id)?;
    assert!(alice_now.outgoing_req.is_empty());
    assert_eq!(alice_now.friends.len(), others.len());
    for other in &others {
        let other_now = seed_planner.user(&other.id)?;
        assert!(other_now.friends.contains(&alice.id));
        assert!(other_now.incoming_req.is_empty());
    }
    Ok(())
}
