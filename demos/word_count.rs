use sovran_metamap::{descriptor_of, AnyValue, Map, MapDescriptor, MapError, TypedMap};

fn count_untyped(words: &[&str]) -> Result<Map, MapError> {
    let mut counts = Map::new(MapDescriptor::new(
        descriptor_of::<String>(),
        descriptor_of::<u32>(),
    ))?;

    for word in words {
        let key = AnyValue::new(word.to_lowercase());
        // Starts every new word at zero, leaves existing counts alone
        counts.emplace_key_copy(&key, |slot| {
            slot.set(0u32);
            Ok(())
        })?;
        if let Some(count) = counts.at_mut_as::<u32>(&key) {
            *count += 1;
        }
    }

    Ok(counts)
}

fn main() -> Result<(), MapError> {
    let text = "sort the sort table the way to sort what the sort said";
    let words: Vec<&str> = text.split_whitespace().collect();

    let counts = count_untyped(&words)?;
    println!("{} distinct words, capacity {}", counts.len(), counts.capacity());
    for word in ["sort", "the", "said", "missing"] {
        match counts.get_as::<String, u32>(word.to_string()) {
            Some(n) => println!("{:>8}: {}", word, n),
            None => println!("{:>8}: not found", word),
        }
    }

    // Same thing through the typed facade
    let mut typed = TypedMap::<String, u32>::new()?;
    for word in &words {
        typed.emplace(word.to_string(), || 0)?;
        typed.with_mut(&word.to_string(), |n| *n += 1);
    }

    typed.apply(|word, n| {
        println!("{}: {}", word, n);
        Ok(())
    })?;

    assert!(typed.as_map().equal(&counts));
    Ok(())
}
