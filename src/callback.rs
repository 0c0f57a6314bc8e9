//! Token callbacks.

use crate::types::ResponseFragment;

/// Receives every fragment of a generation, in emission order.
///
/// Sinks are called synchronously, before the fragment is yielded to the
/// stream consumer or appended to the aggregate. Keep them cheap.
pub trait FragmentSink: Send + Sync {
    fn on_fragment(&self, fragment: &ResponseFragment);
}

impl<F> FragmentSink for F
where
    F: Fn(&ResponseFragment) + Send + Sync,
{
    fn on_fragment(&self, fragment: &ResponseFragment) {
        self(fragment)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    #[test]
    fn test_closure_sink() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = {
            let seen = seen.clone();
            move |fragment: &ResponseFragment| seen.lock().unwrap().push(fragment.text.clone())
        };

        sink.on_fragment(&ResponseFragment::text("Hal"));
        sink.on_fragment(&ResponseFragment::text("lo"));

        assert_eq!(*seen.lock().unwrap(), vec!["Hal", "lo"]);
    }
}
