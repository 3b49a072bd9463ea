use sovran_metamap::{descriptor_of, AnyValue, Map, MapDescriptor, MapError, Pair, TypeDescriptor};
use std::any::{self, TypeId};
use std::cmp::Ordering;

/// Strings compared without regard to ASCII case
struct CaseInsensitive;

static CASE_INSENSITIVE: CaseInsensitive = CaseInsensitive;

impl CaseInsensitive {
    fn text<'a>(&self, obj: &'a AnyValue) -> Result<&'a String, MapError> {
        obj.downcast_ref::<String>().ok_or(MapError::TypeMismatch {
            expected: self.name(),
            found: obj.type_name(),
        })
    }

    fn text_mut<'a>(&self, obj: &'a mut AnyValue) -> Result<&'a mut String, MapError> {
        let found = obj.type_name();
        obj.downcast_mut::<String>().ok_or(MapError::TypeMismatch {
            expected: any::type_name::<String>(),
            found,
        })
    }
}

impl TypeDescriptor for CaseInsensitive {
    fn name(&self) -> &'static str {
        "case-insensitive string"
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
        Ok(AnyValue::new(self.text(src)?.clone()))
    }

    fn init_move(&self, src: &mut AnyValue) -> Result<AnyValue, MapError> {
        Ok(AnyValue::new(std::mem::take(self.text_mut(src)?)))
    }

    fn assign_copy(&self, dest: &mut AnyValue, src: &AnyValue) -> Result<(), MapError> {
        let copy = self.text(src)?.clone();
        *self.text_mut(dest)? = copy;
        Ok(())
    }

    fn assign_move(&self, dest: &mut AnyValue, src: &mut AnyValue) -> Result<(), MapError> {
        self.text_mut(dest)?;
        let taken = std::mem::take(self.text_mut(src)?);
        *self.text_mut(dest)? = taken;
        Ok(())
    }

    fn equal(&self, a: &AnyValue, b: &AnyValue) -> bool {
        self.compare(a, b) == Ordering::Equal && self.accepts(a) && self.accepts(b)
    }

    fn compare(&self, a: &AnyValue, b: &AnyValue) -> Ordering {
        match (self.text(a), self.text(b)) {
            (Ok(a), Ok(b)) => a
                .bytes()
                .map(|c| c.to_ascii_lowercase())
                .cmp(b.bytes().map(|c| c.to_ascii_lowercase())),
            _ => a.value_type_id().cmp(&b.value_type_id()),
        }
    }

    fn swap(&self, a: &mut AnyValue, b: &mut AnyValue) {
        std::mem::swap(a, b);
    }
}

fn main() -> Result<(), MapError> {
    let descriptor = MapDescriptor::new(&CASE_INSENSITIVE, descriptor_of::<u32>());
    let mut headers = Map::new(descriptor)?;

    for (name, value) in [("Content-Length", 12), ("content-length", 42), ("Accept", 1)] {
        let mut pair = Pair::from_key_value(
            *descriptor.pair(),
            AnyValue::new(name.to_string()),
            AnyValue::new(value as u32),
        )?;
        headers.insert_or_assign(&mut pair)?;
    }

    // "Content-Length" and "content-length" are the same key
    println!("{} headers", headers.len());
    let lookup = AnyValue::new("CONTENT-LENGTH".to_string());
    if let Some(pair) = headers.find(&lookup) {
        let name = pair.key().and_then(|k| k.downcast_ref::<String>());
        let value = pair.value().and_then(|v| v.downcast_ref::<u32>());
        println!("{:?} = {:?}", name, value);
    }

    // A native String map keeps both spellings apart
    let mut exact = Map::new(MapDescriptor::new(descriptor_of::<String>(), descriptor_of::<u32>()))?;
    for name in ["Content-Length", "content-length"] {
        exact.emplace_key_copy(&AnyValue::new(name.to_string()), |slot| {
            slot.set(0u32);
            Ok(())
        })?;
    }
    println!("{} exact headers", exact.len());

    Ok(())
}
