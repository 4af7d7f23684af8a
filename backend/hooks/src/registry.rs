/// Registry primitives over named-element collections.
///
/// Points of a lifecycle and hooks of a point are both plain `Vec`s of
/// elements; these functions are the only way the engine mutates them, so the
/// name-uniqueness invariant is enforced in one place. Every operation
/// validates before touching the collection: a failed call leaves it unchanged.
use std::collections::HashSet;

use crate::error::{HookError, Result};

// ---------------------------------------------------------------------------
// Element trait
// ---------------------------------------------------------------------------

/// A named, uniquely identified unit inside a collection.
pub trait Element {
    fn name(&self) -> &str;

    fn description(&self) -> Option<&str> {
        None
    }
}

// ---------------------------------------------------------------------------
// Primitives
// ---------------------------------------------------------------------------

/// Look up an element by name. Absence is not an error.
pub fn get<'a, T: Element>(name: &str, elements: &'a [T]) -> Option<&'a T> {
    elements.iter().find(|e| e.name() == name)
}

/// Position of the element called `name`, if any.
pub fn position<T: Element>(name: &str, elements: &[T]) -> Option<usize> {
    elements.iter().position(|e| e.name() == name)
}

/// Register `new_elements` into `elements`.
///
/// `new_elements` must not repeat a name. With `replace == false` every name
/// must also be new to `elements`. With `replace == true` an element whose
/// name is already registered is substituted in place, keeping its position;
/// the rest are appended in order.
pub fn add<T: Element>(elements: &mut Vec<T>, new_elements: Vec<T>, replace: bool) -> Result<()> {
    ensure_unique(&new_elements)?;

    if !replace {
        if let Some(taken) = new_elements.iter().find(|e| get(e.name(), elements).is_some()) {
            return Err(HookError::NameExists(taken.name().to_string()));
        }
    }

    for element in new_elements {
        match position(element.name(), elements) {
            Some(index) => elements[index] = element,
            None => elements.push(element),
        }
    }
    Ok(())
}

/// Map every element and return the result as a new collection.
///
/// The input is not touched; the caller stores the returned value.
pub fn modify<T, F>(elements: &[T], map: F) -> Result<Vec<T>>
where
    T: Element + Clone,
    F: FnMut(T) -> T,
{
    let mapped: Vec<T> = elements.iter().cloned().map(map).collect();
    ensure_unique(&mapped)?;
    Ok(mapped)
}

/// Swap the whole collection for `new_elements`. Previous names are not
/// cross-checked.
pub fn replace<T: Element>(elements: &mut Vec<T>, new_elements: Vec<T>) -> Result<()> {
    ensure_unique(&new_elements)?;
    *elements = new_elements;
    Ok(())
}

/// Substitute the element called `name` in place, or add `new_element` when
/// no such element exists.
pub fn replace_one<T: Element>(elements: &mut Vec<T>, name: &str, new_element: T) -> Result<()> {
    let Some(index) = position(name, elements) else {
        return add(elements, vec![new_element], false);
    };

    let collides = elements
        .iter()
        .enumerate()
        .any(|(i, e)| i != index && e.name() == new_element.name());
    if collides {
        return Err(HookError::DuplicateName(new_element.name().to_string()));
    }

    elements[index] = new_element;
    Ok(())
}

fn ensure_unique<T: Element>(elements: &[T]) -> Result<()> {
    let mut seen = HashSet::new();
    for element in elements {
        if !seen.insert(element.name()) {
            return Err(HookError::DuplicateName(element.name().to_string()));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, PartialEq)]
    struct Named {
        name: String,
        tag: u32,
    }

    impl Element for Named {
        fn name(&self) -> &str {
            &self.name
        }
    }

    fn named(name: &str, tag: u32) -> Named {
        Named { name: name.into(), tag }
    }

    fn names(elements: &[Named]) -> Vec<&str> {
        elements.iter().map(|e| e.name.as_str()).collect()
    }

    #[test]
    fn get_finds_by_name() {
        let elements = vec![named("a", 1), named("b", 2)];
        assert_eq!(get("b", &elements).map(|e| e.tag), Some(2));
        assert!(get("c", &elements).is_none());
    }

    #[test]
    fn add_appends_in_order() {
        let mut elements = vec![named("a", 1)];
        add(&mut elements, vec![named("b", 2), named("c", 3)], false).unwrap();
        assert_eq!(names(&elements), vec!["a", "b", "c"]);
    }

    #[test]
    fn add_rejects_repeated_new_names_even_with_replace() {
        let mut elements = vec![];
        let err = add(&mut elements, vec![named("x", 1), named("x", 2)], true).unwrap_err();
        assert!(matches!(err, HookError::DuplicateName(name) if name == "x"));
        assert!(elements.is_empty());
    }

    #[test]
    fn add_existing_name_fails_without_partial_mutation() {
        let mut elements = vec![named("a", 1)];
        let err = add(&mut elements, vec![named("b", 2), named("a", 9)], false).unwrap_err();
        assert!(matches!(err, HookError::NameExists(name) if name == "a"));
        assert_eq!(elements, vec![named("a", 1)]);
    }

    #[test]
    fn add_with_replace_substitutes_in_place() {
        let mut elements = vec![named("a", 1), named("b", 2)];
        add(&mut elements, vec![named("a", 10), named("c", 3)], true).unwrap();
        assert_eq!(elements, vec![named("a", 10), named("b", 2), named("c", 3)]);
    }

    #[test]
    fn modify_is_pure() {
        let elements = vec![named("a", 1), named("b", 2)];
        let bumped = modify(&elements, |mut e| {
            e.tag += 10;
            e
        })
        .unwrap();
        assert_eq!(bumped[0].tag, 11);
        assert_eq!(elements[0].tag, 1);
    }

    #[test]
    fn modify_rejects_collisions() {
        let elements = vec![named("a", 1), named("b", 2)];
        let err = modify(&elements, |mut e| {
            e.name = "same".into();
            e
        })
        .unwrap_err();
        assert!(matches!(err, HookError::DuplicateName(_)));
    }

    #[test]
    fn replace_discards_previous_content() {
        let mut elements = vec![named("a", 1)];
        replace(&mut elements, vec![named("a", 5), named("z", 6)]).unwrap();
        assert_eq!(elements, vec![named("a", 5), named("z", 6)]);

        let err = replace(&mut elements, vec![named("q", 1), named("q", 2)]).unwrap_err();
        assert!(matches!(err, HookError::DuplicateName(_)));
        assert_eq!(names(&elements), vec!["a", "z"]);
    }

    #[test]
    fn replace_one_keeps_position() {
        let mut elements = vec![named("a", 1), named("b", 2), named("c", 3)];
        replace_one(&mut elements, "b", named("b2", 20)).unwrap();
        assert_eq!(names(&elements), vec!["a", "b2", "c"]);
    }

    #[test]
    fn replace_one_falls_back_to_add() {
        let mut elements = vec![named("a", 1)];
        replace_one(&mut elements, "missing", named("d", 4)).unwrap();
        assert_eq!(names(&elements), vec!["a", "d"]);

        let err = replace_one(&mut elements, "missing", named("a", 7)).unwrap_err();
        assert!(matches!(err, HookError::NameExists(_)));
    }

    #[test]
    fn replace_one_rejects_rename_onto_sibling() {
        let mut elements = vec![named("a", 1), named("b", 2)];
        let err = replace_one(&mut elements, "a", named("b", 9)).unwrap_err();
        assert!(matches!(err, HookError::DuplicateName(name) if name == "b"));
        assert_eq!(elements, vec![named("a", 1), named("b", 2)]);
    }
}
