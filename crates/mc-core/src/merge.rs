use serde_json::Value;

/// Deep-merge `patch` into `target` in place.
///
/// Objects merge key by key, recursing into nested objects. Arrays and
/// scalars replace the target value wholesale. `null` anywhere in the patch
/// means "leave unchanged", so a field can never be cleared through a merge.
pub fn deep_merge(target: &mut Value, patch: &Value) {
    match (target, patch) {
        (_, Value::Null) => {}
        (Value::Object(t), Value::Object(p)) => {
            for (k, v) in p {
                if v.is_null() {
                    continue;
                }
                match t.get_mut(k) {
                    Some(existing) => deep_merge(existing, v),
                    None => {
                        t.insert(k.clone(), strip_nulls(v));
                    }
                }
            }
        }
        (t, p) => *t = strip_nulls(p),
    }
}

/// Returns a merged copy, leaving `target` untouched.
pub fn merged(target: &Value, patch: &Value) -> Value {
    let mut out = target.clone();
    deep_merge(&mut out, patch);
    out
}

// A fresh object inserted from a patch follows the same rule: its null
// members are "no value", not "set to null".
fn strip_nulls(value: &Value) -> Value {
    match value {
        Value::Object(map) => Value::Object(
            map.iter()
                .filter(|(_, v)| !v.is_null())
                .map(|(k, v)| (k.clone(), strip_nulls(v)))
                .collect(),
        ),
        other => other.clone(),
    }
}
