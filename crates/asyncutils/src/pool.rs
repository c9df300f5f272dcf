use futures::{FutureExt, StreamExt, TryStreamExt, stream};
use std::future::Future;

/// Fetch every index with at most `concurrency` fetches in flight, returning
/// results in ascending index order regardless of completion order.
///
/// The index iterator acts as the shared cursor: whenever a fetch completes
/// the next unclaimed index is started, until the iterator is exhausted. The
/// first error stops the pool and is returned; fetches still in flight are
/// dropped.
pub async fn fetch_ordered<T, E, F, Fut>(
    indices: impl IntoIterator<Item = u64>,
    concurrency: usize,
    mut fetch: F,
) -> Result<Vec<(u64, T)>, E>
where
    F: FnMut(u64) -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    let mut results: Vec<(u64, T)> = stream::iter(indices)
        .map(|index| fetch(index).map(move |result| result.map(|value| (index, value))))
        .buffer_unordered(concurrency.max(1))
        .try_collect()
        .await?;
    results.sort_unstable_by_key(|(index, _)| *index);
    Ok(results)
}
