use parking_lot::Mutex;
use std::sync::Arc;

/// Handle shared between a mock and the test that inspects it
pub type Shared<T> = Arc<Mutex<T>>;

pub fn new_state<T>(value: T) -> Shared<T> {
    Arc::new(Mutex::new(value))
}
