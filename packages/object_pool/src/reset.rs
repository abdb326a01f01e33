use std::any::type_name;
use std::fmt;

/// Creates row payloads and returns them to their canonical empty state.
///
/// New payloads come from `factory`. If a custom callback is present, it runs once for every
/// row when its block is created and once on every release. Without one, a release replaces
/// the payload with a fresh value from `factory`. Nothing runs on acquisition.
pub(crate) struct Reset<T> {
    factory: fn() -> T,
    custom: Option<Box<dyn Fn(&mut T)>>,
}

impl<T> Reset<T> {
    #[must_use]
    pub(crate) fn new(factory: fn() -> T, custom: Option<Box<dyn Fn(&mut T)>>) -> Self {
        Self { factory, custom }
    }

    /// Creates the payload of a row in a new block.
    #[must_use]
    pub(crate) fn create(&self) -> T {
        let mut payload = (self.factory)();

        if let Some(reset_fn) = &self.custom {
            reset_fn(&mut payload);
        }

        payload
    }

    /// Returns the payload of a released row to its empty state.
    pub(crate) fn apply(&self, payload: &mut T) {
        match &self.custom {
            Some(reset_fn) => reset_fn(payload),
            None => *payload = (self.factory)(),
        }
    }
}

#[cfg(test)]
impl<T: Default> Reset<T> {
    pub(crate) fn to_default() -> Self {
        Self::new(T::default, None)
    }

    pub(crate) fn with(reset_fn: impl Fn(&mut T) + 'static) -> Self {
        Self::new(T::default, Some(Box::new(reset_fn)))
    }
}

impl<T> fmt::Debug for Reset<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct(type_name::<Self>())
            .field("custom", &self.custom.is_some())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
#[allow(
    clippy::arithmetic_side_effects,
    reason = "tests focus on succinct code and do not need to tick all the boxes"
)]
mod tests {
    use std::cell::Cell;
    use std::rc::Rc;

    use super::*;

    thread_local! {
        static FACTORY_CALLS: Cell<usize> = const { Cell::new(0) };
    }

    fn counted_vec() -> Vec<u8> {
        FACTORY_CALLS.with(|calls| calls.set(calls.get() + 1));
        Vec::new()
    }

    #[test]
    fn default_reset_assigns_default() {
        let reset = Reset::<Vec<u8>>::to_default();

        let mut payload = vec![1, 2, 3];
        reset.apply(&mut payload);

        assert!(payload.is_empty());
    }

    #[test]
    fn create_without_custom_calls_factory_once() {
        let reset = Reset::new(counted_vec, None);
        let before = FACTORY_CALLS.with(Cell::get);

        let payload = reset.create();

        assert!(payload.is_empty());
        assert_eq!(FACTORY_CALLS.with(Cell::get) - before, 1);
    }

    #[test]
    fn custom_reset_is_invoked() {
        let calls = Rc::new(Cell::new(0_usize));

        let reset = Reset::with({
            let calls = Rc::clone(&calls);
            move |payload: &mut u32| {
                calls.set(calls.get() + 1);
                *payload = 7;
            }
        });

        let mut payload = 1_u32;
        reset.apply(&mut payload);

        assert_eq!(payload, 7);
        assert_eq!(calls.get(), 1);

        // Creation runs the custom callback over the factory value.
        assert_eq!(reset.create(), 7);
        assert_eq!(calls.get(), 2);
    }

    #[test]
    fn custom_reset_may_keep_allocations() {
        let reset = Reset::with(Vec::<u8>::clear);

        let mut payload = Vec::with_capacity(64);
        payload.extend_from_slice(b"hello");
        reset.apply(&mut payload);

        assert!(payload.is_empty());
        assert!(payload.capacity() >= 64);
    }

    #[test]
    fn debug_reports_kind() {
        let output = format!("{:?}", Reset::<u8>::to_default());
        assert!(output.contains("custom: false"));
    }
}
