//! Request-scoped context
//!
//! Every trait method receives a [`Context`] as its first argument.

#[derive(Clone, Debug, Default)]
pub struct Context {
    _private: (),
}

impl Context {
    pub fn new() -> Self {
        Self::default()
    }
}
