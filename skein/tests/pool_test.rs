// Integration tests for skein::pool


use std::sync::Arc;

use skein::registry::Registry;
use skein::{
    values, with_position, PoolConfig, PoolError, Status, ThreadError, ThreadPool, Value, Values,
    WorkGroup,
};
use test_helpers::*;
use tokio::time::timeout;

/// Payload returning its position; members above `fast` wait on `gate` first
fn positions_gated_above(fast: usize, gate: &Gate) -> impl skein::Payload + Clone {
    let gate = gate.clone();
    with_position(move |position: Option<usize>, _args: Values| {
        if position.unwrap_or(0) > fast {
            gate.pass();
        }
        values![position]
    })
}

/// Payload echoing its arguments; an argument list starting with "hold" waits on `gate`
fn echo_holding(gate: &Gate) -> impl skein::Payload + Clone {
    let gate = gate.clone();
    move |args: Values| {
        if args.first().and_then(Value::as_str) == Some("hold") {
            gate.pass();
        }
        args
    }
}

async fn settle(pool: &ThreadPool) -> Result<(), ThreadError> {
    for thread in pool.threads() {
        wait_for_status(thread, Status::Suspended).await?;
    }
    Ok(())
}

#[tokio::test]
async fn test_members_see_their_position() -> anyhow::Result<()> {
    let pool = ThreadPool::new(4, with_position(|position: Option<usize>, _args: Values| values![position]))?;
    assert_eq!(pool.size(), 4);

    assert!(pool.dispatch(values![]).await?);
    assert!(pool.join_all(true).await?);
    for index in 1..=4 {
        assert_eq!(pool.join_result(index)?, Some(values![index]));
        assert_eq!(pool.thread(index).and_then(|t| t.position()), Some(index));
    }
    assert!(pool.thread(0).is_none());
    assert!(pool.thread(5).is_none());
    assert!(pool.destroy()?);
    Ok(())
}

#[tokio::test]
async fn test_dispatch_forwards_args_to_every_member() -> anyhow::Result<()> {
    let pool = ThreadPool::new(3, adder())?;

    assert!(pool.dispatch(values![20, 22]).await?);
    assert!(pool.join_all(true).await?);
    for index in 1..=3 {
        assert_eq!(pool.join_result(index)?, Some(values![42]));
    }
    Ok(())
}

#[tokio::test]
async fn test_dispatch_is_all_or_nothing() -> anyhow::Result<()> {
    let gate = Gate::new();
    let pool = ThreadPool::new(3, echo_holding(&gate))?;
    settle(&pool).await?;

    // Force member 2 into Running behind the pool's back
    let member = pool.thread(2).expect("member 2 exists");
    assert!(member.dispatch(values!["hold"]).await?);

    assert!(!pool.dispatch(values!["go"]).await?);
    assert_eq!(pool.statuses()?, vec![Status::Suspended, Status::Running, Status::Suspended]);

    gate.open(1);
    assert_eq!(member.join(true).await?, Some(values!["hold"]));

    assert!(pool.dispatch(values!["go"]).await?);
    assert!(pool.join_all(true).await?);
    for index in 1..=3 {
        assert_eq!(pool.join_result(index)?, Some(values!["go"]));
    }
    Ok(())
}

#[tokio::test]
async fn test_dispatch_waits_for_initialization() -> anyhow::Result<()> {
    let gate = Gate::new();
    let pool = Arc::new(ThreadPool::new(2, SlowInit { gate: gate.clone() })?);
    assert_eq!(pool.statuses()?, vec![Status::New, Status::New]);

    let dispatching = Arc::clone(&pool);
    let mut dispatch = tokio::spawn(async move { dispatching.dispatch(values![7]).await });
    assert!(timeout(SETTLE, &mut dispatch).await.is_err());

    gate.open(2);
    assert!(timeout(WAIT, dispatch).await???);
    assert!(pool.join_all(true).await?);
    assert_eq!(pool.join_result(2)?, Some(values![7]));
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_join_at_least_returns_early() -> anyhow::Result<()> {
    let gate = Gate::new();
    let pool = ThreadPool::new(5, positions_gated_above(2, &gate))?;

    assert!(pool.dispatch(values![]).await?);
    assert!(timeout(WAIT, pool.join_at_least(2, true)).await??);

    assert_eq!(pool.join_result(1)?, Some(values![1]));
    assert_eq!(pool.join_result(2)?, Some(values![2]));
    for index in 3..=5 {
        assert_eq!(pool.thread(index).map(|t| t.status()), Some(Ok(Status::Running)));
        assert_eq!(pool.join_result(index)?, None);
    }

    gate.open(3);
    assert!(timeout(WAIT, pool.join_all(true)).await??);
    assert_eq!(pool.join_result(5)?, Some(values![5]));
    assert!(pool.destroy()?);
    Ok(())
}

#[tokio::test]
async fn test_join_at_least_without_wait() -> anyhow::Result<()> {
    let gate = Gate::new();
    let pool = ThreadPool::new(3, positions_gated_above(0, &gate))?;

    assert!(pool.dispatch(values![]).await?);
    assert!(!pool.join_at_least(1, false).await?);
    for index in 1..=3 {
        assert_eq!(pool.join_result(index)?, None);
    }

    gate.open(3);
    assert!(timeout(WAIT, pool.join_at_least(3, true)).await??);
    assert!(pool.join_at_least(3, false).await?);
    Ok(())
}

#[tokio::test]
async fn test_join_at_least_rejects_bad_counts() -> anyhow::Result<()> {
    let pool = ThreadPool::new(5, adder())?;

    assert_eq!(
        pool.join_at_least(6, true).await,
        Err(PoolError::InvalidJoinCount { requested: 6, size: 5 })
    );
    assert_eq!(
        pool.join_at_least(0, false).await,
        Err(PoolError::InvalidJoinCount { requested: 0, size: 5 })
    );
    Ok(())
}

// With wait == false join_all stops at the first unfinished member and never visits the rest
#[tokio::test]
async fn test_join_all_without_wait_stops_early() -> anyhow::Result<()> {
    let gate = Gate::new();
    let pool = ThreadPool::new(3, echo_holding(&gate))?;
    settle(&pool).await?;

    // Member 2 holds, members 1 and 3 finish straight away
    for (index, args) in [(1, values!["a"]), (2, values!["hold"]), (3, values!["c"])] {
        let member = pool.thread(index).expect("member exists");
        assert!(member.dispatch(args).await?);
    }
    for index in [1, 3] {
        wait_for_status(pool.thread(index).expect("member exists"), Status::Suspended).await?;
    }

    assert!(!pool.join_all(false).await?);
    assert_eq!(pool.join_result(1)?, Some(values!["a"]));
    assert_eq!(pool.join_result(2)?, None);
    assert_eq!(pool.join_result(3)?, None);

    // With wait == true the same walk always completes
    gate.open(1);
    assert!(timeout(WAIT, pool.join_all(true)).await??);
    assert_eq!(pool.join_result(2)?, Some(values!["hold"]));
    assert_eq!(pool.join_result(3)?, Some(values!["c"]));
    Ok(())
}

#[tokio::test]
async fn test_join_result_bounds() -> anyhow::Result<()> {
    let pool = ThreadPool::new(3, adder())?;

    assert_eq!(pool.join_result(1)?, None);
    assert_eq!(pool.join_result(3)?, None);
    assert_eq!(pool.join_result(0), Err(PoolError::IndexOutOfRange { index: 0, size: 3 }));
    assert_eq!(pool.join_result(4), Err(PoolError::IndexOutOfRange { index: 4, size: 3 }));
    Ok(())
}

#[tokio::test]
async fn test_destroy_refused_while_running() -> anyhow::Result<()> {
    let gate = Gate::new();
    let pool = ThreadPool::new(3, echo_holding(&gate))?;

    assert!(pool.dispatch(values!["first"]).await?);
    assert!(pool.join_all(true).await?);

    assert!(pool.dispatch(values!["hold"]).await?);
    assert!(!pool.destroy()?);
    assert_eq!(pool.statuses()?, vec![Status::Running; 3]);
    assert_eq!(pool.join_result(1)?, Some(values!["first"]));

    gate.open(3);
    assert!(timeout(WAIT, pool.join_all(true)).await??);
    assert!(pool.destroy()?);

    let member = pool.thread(1).expect("members stay reachable");
    assert!(matches!(member.status(), Err(ThreadError::Destroyed { .. })));
    assert_eq!(pool.dispatch(values![]).await, Err(PoolError::Destroyed));
    assert_eq!(pool.join_all(false).await, Err(PoolError::Destroyed));
    assert_eq!(pool.join_result(1), Err(PoolError::Destroyed));
    assert_eq!(pool.destroy(), Err(PoolError::Destroyed));
    Ok(())
}

#[tokio::test]
async fn test_empty_pool_is_rejected() {
    assert!(matches!(ThreadPool::new(0, adder()), Err(PoolError::EmptyPool)));
}

#[tokio::test]
async fn test_member_panic_surfaces_with_index() -> anyhow::Result<()> {
    let pool = ThreadPool::new(
        3,
        with_position(|position: Option<usize>, args: Values| {
            if position == Some(2) {
                panic!("member two failed");
            }
            args
        }),
    )?;

    assert!(pool.dispatch(values![1]).await?);
    match pool.join_all(true).await {
        Err(PoolError::Member { index: 2, source: ThreadError::PayloadPanicked { message, .. } }) => {
            assert!(message.contains("member two failed"));
        }
        other => panic!("unexpected join outcome: {:?}", other),
    }
    assert_eq!(pool.join_result(1)?, Some(values![1]));
    Ok(())
}

#[tokio::test]
async fn test_pool_config_names_members() -> anyhow::Result<()> {
    let config = PoolConfig {
        size: 2,
        thread_name_prefix: "sum-".to_string(),
        stack_size: None,
    };
    let pool = ThreadPool::with_config(config, |_args: Values| values![std::thread::current().name()])?;

    assert!(pool.dispatch(values![]).await?);
    assert!(pool.join_all(true).await?);
    assert_eq!(pool.join_result(1)?, Some(values!["sum-1"]));
    assert_eq!(pool.join_result(2)?, Some(values!["sum-2"]));
    Ok(())
}

#[tokio::test]
async fn test_work_group_trait_object() -> anyhow::Result<()> {
    let group: Box<dyn WorkGroup> = Box::new(ThreadPool::new(2, adder())?);

    assert!(group.dispatch(values![1, 2]).await?);
    assert!(group.join_at_least(2, true).await?);
    assert_eq!(group.join_result(2)?, Some(values![3]));
    assert_eq!(group.size(), 2);
    assert!(group.destroy()?);
    Ok(())
}

#[tokio::test]
async fn test_join_at_least_stops_when_target_is_out_of_reach() -> anyhow::Result<()> {
    let gate = Gate::new();
    let held = gate.clone();
    let pool = ThreadPool::new(
        3,
        with_position(move |position: Option<usize>, _args: Values| {
            if position == Some(1) {
                held.pass();
            }
            values![position]
        }),
    )?;

    assert!(pool.dispatch(values![]).await?);
    for index in 2..=3 {
        wait_for_status(pool.thread(index).expect("member"), Status::Suspended).await?;
    }

    // Member 1 is still running, so three can no longer be reached after visiting it
    assert!(!pool.join_at_least(3, false).await?);
    assert_eq!(pool.join_result(1)?, None);
    assert_eq!(pool.join_result(2)?, None);
    assert_eq!(pool.join_result(3)?, None);

    assert!(pool.join_at_least(2, false).await?);
    assert_eq!(pool.join_result(2)?, Some(values![2]));
    assert_eq!(pool.join_result(3)?, Some(values![3]));

    gate.open(1);
    assert!(pool.join_all(true).await?);
    assert!(pool.destroy()?);
    Ok(())
}

#[tokio::test]
async fn test_members_are_destroyed_with_the_pool() -> anyhow::Result<()> {
    let pool = ThreadPool::new(3, adder())?;
    settle(&pool).await?;

    let member = pool.thread(2).expect("member 2");
    assert_eq!(
        member.destroy(),
        Err(ThreadError::PoolMember { id: member.id(), index: 2 })
    );
    assert_eq!(member.status()?, Status::Suspended);

    assert!(pool.dispatch(values![1, 2]).await?);
    assert!(pool.join_all(true).await?);
    assert_eq!(pool.join_result(2)?, Some(values![3]));

    assert!(pool.destroy()?);
    for thread in pool.threads() {
        assert!(matches!(thread.status(), Err(ThreadError::Destroyed { .. })));
    }
    Ok(())
}

#[tokio::test]
async fn test_drop_releases_member_entries() -> anyhow::Result<()> {
    let gate = Gate::new();
    let pool = ThreadPool::new(2, echo_holding(&gate))?;
    assert!(pool.dispatch(values!["hold"]).await?);

    let ids: Vec<_> = pool.threads().map(|thread| thread.id()).collect();
    for id in &ids {
        assert_eq!(Registry::global().status(*id), Some(Status::Running));
    }

    drop(pool);
    for id in &ids {
        assert_eq!(Registry::global().status(*id), None);
    }
    gate.open(ids.len());
    Ok(())
}
