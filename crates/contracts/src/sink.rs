//! FrameSink trait - query output interface
//!
//! Every query result (identified frames, collision frames, trajectories,
//! interactions) is delivered to a sink in load order.

use crate::ContractError;

/// Ordered consumer of query results.
///
/// Called from a single task, one item at a time.
pub trait FrameSink<T>: Send {
    /// Sink name (used for logging/metrics)
    fn name(&self) -> &str;

    /// Consume one result.
    ///
    /// # Errors
    /// A failed sink stops the query.
    fn consume(&mut self, item: T) -> Result<(), ContractError>;

    /// Called once after the last item.
    fn finish(&mut self) -> Result<(), ContractError> {
        Ok(())
    }
}

/// Adapts a closure into a [`FrameSink`].
pub struct CallbackSink<F> {
    name: String,
    callback: F,
}

impl<F> CallbackSink<F> {
    pub fn new(name: impl Into<String>, callback: F) -> Self {
        Self {
            name: name.into(),
            callback,
        }
    }
}

impl<T, F> FrameSink<T> for CallbackSink<F>
where
    F: FnMut(T) -> Result<(), ContractError> + Send,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn consume(&mut self, item: T) -> Result<(), ContractError> {
        (self.callback)(item)
    }
}

/// Collects every item in memory.
#[derive(Debug)]
pub struct VecSink<T> {
    pub items: Vec<T>,
}

impl<T> Default for VecSink<T> {
    fn default() -> Self {
        Self { items: Vec::new() }
    }
}

impl<T> VecSink<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn into_inner(self) -> Vec<T> {
        self.items
    }
}

impl<T: Send> FrameSink<T> for VecSink<T> {
    fn name(&self) -> &str {
        "vec"
    }

    fn consume(&mut self, item: T) -> Result<(), ContractError> {
        self.items.push(item);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_callback_sink() {
        let mut seen = Vec::new();
        {
            let mut sink = CallbackSink::new("cb", |x: u32| {
                seen.push(x);
                Ok(())
            });
            sink.consume(1).unwrap();
            sink.consume(2).unwrap();
            sink.finish().unwrap();
            assert_eq!(FrameSink::<u32>::name(&sink), "cb");
        }
        assert_eq!(seen, vec![1, 2]);
    }

    #[test]
    fn test_callback_sink_error() {
        let mut sink = CallbackSink::new("failing", |_: u32| {
            Err(ContractError::sink_write("failing", "disk full"))
        });
        assert!(sink.consume(0).is_err());
    }
}
