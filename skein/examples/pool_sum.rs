use skein::{ThreadPool, Values, logging, values, with_position};

/// Sums `1..=limit` split into interleaved strides, one per pool member.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    logging::init_default();

    let pool = ThreadPool::with_available_parallelism(with_position(
        |position: Option<usize>, args: Values| {
            let first = position.unwrap_or(1) as u64;
            let stride = args[0].as_u64().unwrap_or(1).max(1) as usize;
            let limit = args[1].as_u64().unwrap_or(0);
            let sum: u64 = (first..=limit).step_by(stride).sum();
            values![sum]
        },
    ))?;
    let size = pool.size();
    let limit = 10_000_000u64;

    assert!(pool.dispatch(values![size, limit]).await?);

    // Report as soon as half the members are done, then wait for the rest
    let half = size.div_ceil(2);
    if pool.join_at_least(half, true).await? {
        println!("{half} of {size} members finished first");
    }
    assert!(pool.join_all(true).await?);

    let mut total = 0;
    for index in 1..=size {
        total += pool
            .join_result(index)?
            .and_then(|values| values.first().and_then(|v| v.as_u64()))
            .unwrap_or(0);
    }
    println!("sum of 1..={limit} = {total}");
    assert_eq!(total, limit * (limit + 1) / 2);

    assert!(pool.destroy()?);
    Ok(())
}
