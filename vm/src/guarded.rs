//! Guarded primitives: the only subscript and iteration guest code has.
//!
//! Neither function can fail. Missing keys, wrong key types and
//! non-iterable values come back as `None` / an empty sequence, which the
//! guest observes as `nil` / a loop that runs zero times.

use crate::value::Value;

/// Resolve a possibly negative index against `len`.
fn resolve_index(index: i64, len: usize) -> Option<usize> {
    let len = i64::try_from(len).ok()?;
    let idx = if index < 0 { index.checked_add(len)? } else { index };
    if (0..len).contains(&idx) {
        usize::try_from(idx).ok()
    } else {
        None
    }
}

/// `container[key]` without errors.
///
/// Lists and strings take integer keys (negative counts from the end),
/// maps take string keys. Everything else is absent.
pub fn guarded_get(container: &Value, key: &Value) -> Option<Value> {
    match (container, key) {
        (Value::List(list), Value::Int(i)) => {
            let items = list.lock();
            resolve_index(*i, items.len()).map(|idx| items[idx].clone())
        }
        (Value::Str(s), Value::Int(i)) => {
            let count = s.chars().count();
            let idx = resolve_index(*i, count)?;
            s.chars().nth(idx).map(|c| Value::str(c.encode_utf8(&mut [0u8; 4])))
        }
        (Value::Map(map), Value::Str(k)) => map.lock().get(&**k).cloned(),
        _ => None,
    }
}

/// Snapshot of the values `for x in obj` walks.
///
/// Lists yield their elements as they are right now, maps their keys in
/// sorted order, strings one-character strings. Anything else is empty.
pub fn guarded_iter(obj: &Value) -> Vec<Value> {
    match obj {
        Value::List(list) => list.lock().clone(),
        Value::Map(map) => map.lock().keys().map(|k| Value::str(k)).collect(),
        Value::Str(s) => s
            .chars()
            .map(|c| Value::str(c.encode_utf8(&mut [0u8; 4])))
            .collect(),
        _ => Vec::new(),
    }
}

/// Index to assign through for `list[key] = v`; `None` when out of range.
pub(crate) fn list_slot(index: i64, len: usize) -> Option<usize> {
    resolve_index(index, len)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn ints(xs: &[i64]) -> Value {
        Value::list(xs.iter().map(|&n| Value::Int(n)).collect())
    }

    #[test]
    fn list_access() {
        let l = ints(&[10, 20, 30]);
        assert!(guarded_get(&l, &Value::Int(0)).unwrap().equals(&Value::Int(10)));
        assert!(guarded_get(&l, &Value::Int(-1)).unwrap().equals(&Value::Int(30)));
        assert!(guarded_get(&l, &Value::Int(3)).is_none());
        assert!(guarded_get(&l, &Value::Int(-4)).is_none());
        assert!(guarded_get(&l, &Value::str("0")).is_none());
        assert!(guarded_get(&l, &Value::Float(0.0)).is_none());
        assert!(guarded_get(&l, &Value::Int(i64::MIN)).is_none());
    }

    #[test]
    fn map_access() {
        let mut m = BTreeMap::new();
        m.insert("a".to_string(), Value::Int(1));
        let m = Value::map(m);
        assert!(guarded_get(&m, &Value::str("a")).unwrap().equals(&Value::Int(1)));
        assert!(guarded_get(&m, &Value::str("b")).is_none());
        assert!(guarded_get(&m, &Value::Int(0)).is_none());
    }

    #[test]
    fn string_access_is_by_char() {
        let s = Value::str("héllo");
        assert_eq!(guarded_get(&s, &Value::Int(1)).unwrap().display(), "é");
        assert_eq!(guarded_get(&s, &Value::Int(-1)).unwrap().display(), "o");
        assert!(guarded_get(&s, &Value::Int(5)).is_none());
    }

    #[test]
    fn non_containers_are_absent() {
        for v in [Value::Nil, Value::Int(3), Value::Bool(true), Value::Float(1.5)] {
            assert!(guarded_get(&v, &Value::Int(0)).is_none());
            assert!(guarded_iter(&v).is_empty());
        }
    }

    #[test]
    fn iteration_forms() {
        assert_eq!(guarded_iter(&ints(&[1, 2])).len(), 2);
        let mut m = BTreeMap::new();
        m.insert("z".to_string(), Value::Nil);
        m.insert("a".to_string(), Value::Nil);
        let keys: Vec<String> = guarded_iter(&Value::map(m))
            .iter()
            .map(Value::display)
            .collect();
        assert_eq!(keys, ["a", "z"]);
        let chars: Vec<String> = guarded_iter(&Value::str("ab")).iter().map(Value::display).collect();
        assert_eq!(chars, ["a", "b"]);
    }

    #[test]
    fn iteration_is_a_snapshot() {
        let l = ints(&[1]);
        let snap = guarded_iter(&l);
        if let Value::List(inner) = &l {
            inner.lock().push(Value::Int(2));
        }
        assert_eq!(snap.len(), 1);
    }
}
