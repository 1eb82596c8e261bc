//! The merge engine.
//!
//! Every operation returns a fragment holding exactly the fields its
//! reducer map names. Merging the fragment into the store is left to the
//! store substrate.

use rquery_api::{
    request::{LocalUpdateMap, OptimisticMap, RollbackMap, UpdateMap},
    store::Fragment,
};
use serde_json::Value;

fn prior_or_empty(prior: &Fragment, field: &str) -> Value {
    prior
        .get(field)
        .cloned()
        .unwrap_or_else(|| Value::Object(Fragment::new()))
}

/// Fold a transformed response into `prior` through `update`.
pub(super) fn merge_success(
    update: Option<&UpdateMap>,
    prior: &Fragment,
    transformed: &Value,
) -> Fragment {
    let Some(update) = update else {
        return Fragment::new();
    };
    update
        .iter()
        .map(|(field, reducer)| {
            let next = transformed.get(field).unwrap_or(&Value::Null);
            (field.clone(), reducer(&prior_or_empty(prior, field), next))
        })
        .collect()
}

/// Compute the speculative fragment of a mutation.
///
/// A field without a reducer passes its prior value through. If there is
/// no prior value either, the field is left out of the fragment.
pub(super) fn apply_optimistic(
    optimistic: &OptimisticMap,
    prior: &Fragment,
) -> Fragment {
    optimistic
        .iter()
        .filter_map(|(field, reducer)| match reducer {
            Some(reducer) => {
                Some((field.clone(), reducer(&prior_or_empty(prior, field))))
            }
            None => prior.get(field).map(|v| (field.clone(), v.clone())),
        })
        .collect()
}

/// Restore the fields a mutation touched optimistically.
///
/// A field with a rollback reducer gets `reducer(initial, current)`, where
/// missing values are empty objects. A field without one reverts to its
/// initial value. Fields outside `touched` are never part of the fragment.
pub(super) fn rollback<'a>(
    rollback: Option<&RollbackMap>,
    touched: impl IntoIterator<Item = &'a String>,
    initial: &Fragment,
    current: &Fragment,
) -> Fragment {
    touched
        .into_iter()
        .filter_map(|field| {
            let restored = match rollback.and_then(|r| r.get(field)) {
                Some(reducer) => Some(reducer(
                    &prior_or_empty(initial, field),
                    &prior_or_empty(current, field),
                )),
                None => initial.get(field).cloned(),
            };
            restored.map(|v| (field.clone(), v))
        })
        .collect()
}

/// Apply local unary reducers to the entity store.
pub(super) fn update_local(
    update: &LocalUpdateMap,
    prior: &Fragment,
) -> Fragment {
    update
        .iter()
        .map(|(field, reducer)| {
            (field.clone(), reducer(&prior_or_empty(prior, field)))
        })
        .collect()
}
