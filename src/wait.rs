use std::future::Future;
use std::time::Duration;
use tokio::time::timeout;
use crate::error::{Error, Result};
use crate::events::Emitter;

// Subscribes before returning, so nothing emitted before the first poll
// is missed.
pub fn wait_for<E, T, F>(source: &Emitter<E>, mut select: F, limit: Duration) -> impl Future<Output = Result<T>>
where
    E: Clone,
    F: FnMut(&E) -> Option<T>,
{
    let mut sub = source.subscribe();
    async move {
        let next = async {
            while let Some(event) = sub.recv().await {
                if let Some(value) = select(&event) {
                    return Ok(value);
                }
            }
            Err(Error::Detached)
        };

        match timeout(limit, next).await {
            Ok(result) => result,
            Err(_)     => Err(Error::Timeout(limit)),
        }
    }
}

#[cfg(test)]
mod test {
    use std::time::Duration;
    use crate::error::Error;
    use crate::events::Emitter;
    use super::wait_for;

    #[tokio::test]
    async fn resolves_first_match() {
        let events = Emitter::new();
        let wait   = wait_for(&events, |n: &u32| Some(*n).filter(|n| n % 2 == 0), Duration::from_secs(1));

        events.emit(1);
        events.emit(3);
        events.emit(4);
        events.emit(6);

        assert_eq!(Ok(4), wait.await);
        assert_eq!(0, events.listeners());
    }

    #[tokio::test(start_paused = true)]
    async fn times_out_without_leak() {
        let events = Emitter::new();
        let limit  = Duration::from_secs(20);
        let wait   = wait_for(&events, |n: &u32| Some(*n).filter(|n| *n == 7), limit);

        events.emit(1);

        assert_eq!(1, events.listeners());
        assert_eq!(Err(Error::Timeout(limit)), wait.await);
        assert_eq!(0, events.listeners());
    }

    #[tokio::test]
    async fn many_waits_outstanding() {
        let events = Emitter::new();
        let limit  = Duration::from_secs(1);
        let a = wait_for(&events, |n: &u32| Some(*n).filter(|n| *n == 2), limit);
        let b = wait_for(&events, |n: &u32| Some(*n).filter(|n| *n == 1), limit);

        events.emit(1);
        events.emit(2);

        let (a, b) = tokio::join!(a, b);
        assert_eq!((Ok(2), Ok(1)), (a, b));
    }

    #[tokio::test]
    async fn detached_source() {
        let events = Emitter::<u32>::new();
        let wait   = wait_for(&events, |_| Some(()), Duration::from_secs(1));
        events.clear();
        assert_eq!(Err(Error::Detached), wait.await);
    }
}
