use anyhow::Result;
use churnflow::runner::{ExecMode, Runner};
use churnflow::{Pipeline, from_vec};
use rayon::ThreadPoolBuilder;
use std::sync::Arc;

fn parallel(partitions: usize) -> Result<Runner> {
    let pool = ThreadPoolBuilder::new().num_threads(2).build()?;
    Ok(Runner::parallel(Arc::new(pool), partitions))
}

#[test]
fn sequential_and_parallel_agree() -> Result<()> {
    let p = Pipeline::default();
    let input: Vec<u32> = (0..101).collect();
    let col = from_vec(&p, input)
        .map(|x: &u32| x * 3)
        .map(|x: &u32| x + 1);

    let seq = col.collect_with(&Runner::default())?;
    let par = col.collect_with(&parallel(7)?)?;
    assert_eq!(seq, par);
    assert_eq!(seq.len(), 101);
    assert_eq!(seq[..3], [1, 4, 7]);
    Ok(())
}

#[test]
fn partitions_follow_the_runner() -> Result<()> {
    let p = Pipeline::default();
    let col = from_vec(&p, (0..10).collect::<Vec<u64>>());

    let parts = col.collect_partitions(&parallel(4)?)?;
    assert_eq!(parts.len(), 4);
    assert_eq!(parts.concat(), (0..10).collect::<Vec<_>>());

    let parts = col.collect_partitions(&Runner::default())?;
    assert_eq!(parts.len(), 1);
    Ok(())
}

#[test]
fn repartition_merges_then_splits_in_order() -> Result<()> {
    let p = Pipeline::default();
    let runner = parallel(5)?;
    assert_eq!(runner.mode, ExecMode::Parallel { partitions: 5 });

    let single = from_vec(&p, (0..23).collect::<Vec<i32>>())
        .map(|x: &i32| x + 1)
        .repartition(1);
    let parts = single.collect_partitions(&runner)?;
    assert_eq!(parts.len(), 1);
    assert_eq!(parts[0], (1..24).collect::<Vec<_>>());

    let three = single.clone().repartition(3).collect_partitions(&runner)?;
    assert_eq!(three.len(), 3);
    assert_eq!(three.concat(), (1..24).collect::<Vec<_>>());
    Ok(())
}

#[test]
fn empty_source_yields_one_empty_partition() -> Result<()> {
    let p = Pipeline::default();
    let parts = from_vec(&p, Vec::<String>::new()).collect_partitions(&parallel(4)?)?;
    assert_eq!(parts, vec![Vec::<String>::new()]);
    Ok(())
}
