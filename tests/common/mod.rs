#![allow(dead_code)]

use sovran_metamap::{AnyValue, MapError, TypeDescriptor};
use std::any::TypeId;
use std::cmp::Ordering;
use std::sync::atomic::{AtomicUsize, Ordering as AtomicOrdering};

/// A `String` descriptor whose copies start failing once its budget runs out
///
/// Declare one per test as a `static` so budgets don't leak between tests.
pub struct FlakyDescriptor {
    copies_left: AtomicUsize,
}

impl FlakyDescriptor {
    pub const fn new(copies: usize) -> Self {
        Self {
            copies_left: AtomicUsize::new(copies),
        }
    }

    pub fn allow(&self, copies: usize) {
        self.copies_left.store(copies, AtomicOrdering::SeqCst);
    }

    fn text<'a>(&self, obj: &'a AnyValue) -> Result<&'a String, MapError> {
        obj.downcast_ref::<String>().ok_or(MapError::TypeMismatch {
            expected: "flaky string",
            found: obj.type_name(),
        })
    }
}

impl TypeDescriptor for FlakyDescriptor {
    fn name(&self) -> &'static str {
        "flaky string"
    }

    fn value_type_id(&self) -> TypeId {
        TypeId::of::<String>()
    }

    fn size(&self) -> usize {
        std::mem::size_of::<String>()
    }

    fn init_default(&self) -> Result<AnyValue, MapError> {
        Ok(AnyValue::new(String::new()))
    }

    fn init_copy(&self, src: &AnyValue) -> Result<AnyValue, MapError> {
        let text = self.text(src)?;
        self.copies_left
            .fetch_update(AtomicOrdering::SeqCst, AtomicOrdering::SeqCst, |left| {
                left.checked_sub(1)
            })
            .map_err(|_| MapError::AllocationFailure { requested: 1 })?;
        Ok(AnyValue::new(text.clone()))
    }

    fn init_move(&self, src: &mut AnyValue) -> Result<AnyValue, MapError> {
        self.text(src)?;
        let taken = src
            .downcast_mut::<String>()
            .map(std::mem::take)
            .unwrap_or_default();
        Ok(AnyValue::new(taken))
    }

    fn assign_copy(&self, dest: &mut AnyValue, src: &AnyValue) -> Result<(), MapError> {
        let copy = self.init_copy(src)?;
        *dest = copy;
        Ok(())
    }

    fn assign_move(&self, dest: &mut AnyValue, src: &mut AnyValue) -> Result<(), MapError> {
        *dest = self.init_move(src)?;
        Ok(())
    }

    fn equal(&self, a: &AnyValue, b: &AnyValue) -> bool {
        matches!((self.text(a), self.text(b)), (Ok(a), Ok(b)) if a == b)
    }

    fn compare(&self, a: &AnyValue, b: &AnyValue) -> Ordering {
        match (self.text(a), self.text(b)) {
            (Ok(a), Ok(b)) => a.cmp(b),
            _ => a.value_type_id().cmp(&b.value_type_id()),
        }
    }

    fn swap(&self, a: &mut AnyValue, b: &mut AnyValue) {
        std::mem::swap(a, b);
    }
}

/// Routes `tracing` output through the test harness
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}
