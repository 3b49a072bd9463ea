use sovran_metamap::{
    descriptor_of, AnyValue, Map, MapDescriptor, MapError, MapValueDescriptor,
};
use std::sync::LazyLock;

// Inner maps: word -> count
static COUNTS: LazyLock<MapValueDescriptor> = LazyLock::new(|| {
    MapValueDescriptor::new(MapDescriptor::new(
        descriptor_of::<String>(),
        descriptor_of::<u32>(),
    ))
});

fn tally(map: &mut Map, line: &str) -> Result<(), MapError> {
    for word in line.split_whitespace() {
        let key = AnyValue::new(word.to_string());
        map.emplace_key_copy(&key, |slot| {
            slot.set(0u32);
            Ok(())
        })?;
        if let Some(n) = map.at_mut_as::<u32>(&key) {
            *n += 1;
        }
    }
    Ok(())
}

fn main() -> Result<(), MapError> {
    // Outer map: document name -> word counts
    let mut documents = Map::new(MapDescriptor::new(descriptor_of::<String>(), &*COUNTS))?;

    let corpus = [
        ("fox", "The quick brown fox jumped over the lazy dog."),
        ("sort", "sort the sort table the way to sort what the sort said"),
    ];

    for (name, line) in corpus {
        documents.emplace_key_copy(&AnyValue::new(name.to_string()), |slot| {
            match slot.downcast_mut::<Map>() {
                Some(counts) => tally(counts, line),
                None => Err(MapError::Construction("expected a map".to_string())),
            }
        })?;
    }

    let snapshot = documents.try_clone()?;

    // Changing an inner map leaves the snapshot alone
    if let Some(sort) = documents.at_mut_as::<Map>(&AnyValue::new("sort".to_string())) {
        tally(sort, "sort again")?;
    }

    for map in [&documents, &snapshot] {
        let sort = map
            .get_as::<String, Map>("sort".to_string())
            .and_then(|counts| counts.get_as::<String, u32>("sort".to_string()));
        println!("sort appears {:?} times", sort);
    }
    println!("copies equal: {}", documents.equal(&snapshot));

    Ok(())
}
