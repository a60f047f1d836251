//! Batched execution of independent async tasks.

use std::future::Future;

/// Run `tasks` in consecutive groups of at most `batch_size`.
///
/// Tasks within a group run concurrently; groups run strictly in order, so
/// peak concurrency is bounded by `batch_size`. The first task error aborts
/// all remaining groups and is propagated; results from groups that already
/// completed are discarded with it. On full success the results come back
/// concatenated in task order.
pub async fn run_batched<F, Fut, T, E>(tasks: Vec<F>, batch_size: usize) -> Result<Vec<T>, E>
where
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    let batch_size = batch_size.max(1);
    let mut results = Vec::with_capacity(tasks.len());
    let mut tasks = tasks.into_iter();

    loop {
        let group: Vec<F> = tasks.by_ref().take(batch_size).collect();
        if group.is_empty() {
            break;
        }

        let settled =
            futures::future::try_join_all(group.into_iter().map(|task| task())).await?;
        results.extend(settled);
    }

    Ok(results)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[tokio::test]
    async fn results_are_attributable_and_in_task_order() {
        let tasks: Vec<_> = (0..10)
            .map(|i| move || async move { Ok::<usize, String>(i * 2) })
            .collect();

        let results = run_batched(tasks, 3).await.unwrap();
        assert_eq!(results, (0..10).map(|i| i * 2).collect::<Vec<_>>());
    }

    #[tokio::test]
    async fn empty_task_list_yields_empty_results() {
        let tasks: Vec<fn() -> std::future::Ready<Result<u32, String>>> = Vec::new();
        let results = run_batched(tasks, 100).await.unwrap();
        assert!(results.is_empty());
    }

    #[tokio::test]
    async fn groups_are_serial_and_bounded() {
        let in_flight = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));

        let tasks: Vec<_> = (0..10)
            .map(|i| {
                let in_flight = Arc::clone(&in_flight);
                let peak = Arc::clone(&peak);
                move || async move {
                    let now = in_flight.fetch_add(1, Ordering::SeqCst) + 1;
                    peak.fetch_max(now, Ordering::SeqCst);
                    tokio::time::sleep(std::time::Duration::from_millis(5)).await;
                    in_flight.fetch_sub(1, Ordering::SeqCst);
                    Ok::<usize, String>(i)
                }
            })
            .collect();

        run_batched(tasks, 4).await.unwrap();
        assert!(peak.load(Ordering::SeqCst) <= 4);
    }

    #[tokio::test]
    async fn group_failure_aborts_remaining_groups() {
        let started = Arc::new(AtomicUsize::new(0));

        let tasks: Vec<_> = (0..9)
            .map(|i| {
                let started = Arc::clone(&started);
                move || async move {
                    started.fetch_add(1, Ordering::SeqCst);
                    if i == 4 {
                        Err(format!("task {} failed", i))
                    } else {
                        Ok(i)
                    }
                }
            })
            .collect();

        let err = run_batched(tasks, 3).await.unwrap_err();
        assert_eq!(err, "task 4 failed");
        // Groups of 3: the first two groups start, the third never does.
        assert_eq!(started.load(Ordering::SeqCst), 6);
    }
}
