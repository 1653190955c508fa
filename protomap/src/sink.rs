//! Downstream delivery of mapped items.

use crate::error::{MapError, Result};

/// Receives items produced by an encoder or decoder.
pub trait EventSink<T> {
    fn publish(&self, item: T) -> Result<()>;
}

impl<T> EventSink<T> for flume::Sender<T> {
    fn publish(&self, item: T) -> Result<()> {
        self.send(item)
            .map_err(|_| MapError::Publish("receiver disconnected".into()))
    }
}

/// A sink backed by a closure, see [`sink_fn`].
#[derive(Clone, Copy, Debug)]
pub struct FnSink<F>(F);

/// Wrap a closure as an [`EventSink`].
pub fn sink_fn<T, F>(f: F) -> FnSink<F>
where
    F: Fn(T) -> Result<()>,
{
    FnSink(f)
}

impl<T, F> EventSink<T> for FnSink<F>
where
    F: Fn(T) -> Result<()>,
{
    fn publish(&self, item: T) -> Result<()> {
        (self.0)(item)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flume_sink() {
        let (tx, rx) = flume::unbounded::<u32>();
        tx.publish(1).unwrap();
        tx.publish(2).unwrap();
        assert_eq!(rx.try_iter().collect::<Vec<_>>(), vec![1, 2]);

        drop(rx);
        assert!(matches!(tx.publish(3), Err(MapError::Publish(_))));
    }

    #[test]
    fn test_closure_sink() {
        let seen = std::cell::RefCell::new(Vec::new());
        let sink = sink_fn(|item: &str| {
            seen.borrow_mut().push(item.to_string());
            Ok(())
        });
        sink.publish("a").unwrap();
        drop(sink);
        assert_eq!(seen.into_inner(), vec!["a".to_string()]);
    }
}
