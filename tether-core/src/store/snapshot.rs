//! State snapshots and hydration.
//!
//! A snapshot is the plain JSON form of a store's state:
//!
//! - declarative stores: the state keys the factory declared, nothing else
//!   (getters and actions are derived, not state);
//! - setup stores: every export except actions, with refs, computeds and
//!   wrapped structures unwrapped to their plain value.
//!
//! Hydration is the reverse, applied silently: the store adopts the state
//! without advancing its change signal, since the state is already
//! current rather than a new mutation. Malformed input fails closed. A
//! store's snapshot is checked as a whole before anything is written, and
//! rejected input is logged and skipped.

use serde_json::{Map, Value as Json};
use tracing::{debug, warn};

use super::definition::Export;
use super::instance::{Store, StoreBody};
use crate::error::{Result, StoreError};
use crate::value::Value;
use crate::wrap::{wrap, Reactive, ReactiveObject};

/// Plain, serializable copy of a store's state.
pub fn get_state_snapshot(store: &Store) -> Result<Map<String, Json>> {
    store.runtime().untracked(|| match store.body() {
        StoreBody::Options {
            state, state_keys, ..
        } => snapshot_options(store, state, state_keys),
        StoreBody::Setup { exports } => {
            let mut out = Map::new();
            for (name, export) in exports.iter() {
                let value = match export {
                    Export::Ref(r) => r.get_untracked(),
                    Export::Reactive(r) => r.to_raw(),
                    Export::Value(v) => v.clone(),
                    Export::Computed(c) => match c.get_untracked() {
                        Ok(v) => v,
                        Err(error) => {
                            warn!(
                                store = store.id(),
                                export = name,
                                %error,
                                "computed export skipped in snapshot"
                            );
                            continue;
                        }
                    },
                    Export::Action(_) => continue,
                };
                out.insert(name.to_string(), value.to_json()?);
            }
            Ok(out)
        }
    })
}

fn snapshot_options(
    store: &Store,
    state: &ReactiveObject,
    state_keys: &[String],
) -> Result<Map<String, Json>> {
    let raw = state.to_raw();
    let Some(object) = raw.as_object() else {
        return Ok(Map::new());
    };
    let entries: Vec<(String, Value)> = object
        .read()
        .iter()
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect();

    let mut out = Map::new();
    if state_keys.is_empty() && !entries.is_empty() {
        warn!(
            store = store.id(),
            "no declared state keys; snapshot copies every property"
        );
        for (key, value) in entries {
            out.insert(key, value.to_json()?);
        }
        return Ok(out);
    }

    for (key, value) in entries {
        if state_keys.contains(&key) {
            out.insert(key, value.to_json()?);
        }
    }
    Ok(out)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ApplyMode {
    /// A user-initiated merge. Every key must be writable.
    Patch,
    /// Adopting transported state. Derived entries are skipped.
    Hydrate,
}

/// Merge `partial` into the store's state.
pub(crate) fn apply_state(store: &Store, partial: &Map<String, Json>, mode: ApplyMode) -> Result<()> {
    let mut writes = Vec::with_capacity(partial.len());
    for (key, json) in partial {
        if let Some(write) = plan(store, key, json, mode)? {
            writes.push(write);
        }
    }

    store.runtime().untracked(|| {
        for write in writes {
            match write {
                Write::Assign(object, key, json) => assign(&object, key, json),
                Write::Merge(object, map) => merge(&object, map),
                Write::SetRef(r, json) => {
                    r.set(Value::from_json(json));
                }
            }
        }
    });
    Ok(())
}

enum Write<'a> {
    Assign(ReactiveObject, &'a str, &'a Json),
    Merge(ReactiveObject, &'a Map<String, Json>),
    SetRef(crate::reactive::Ref<Value>, &'a Json),
}

/// Decide how one key is written, or reject it.
fn plan<'a>(
    store: &Store,
    key: &'a str,
    json: &'a Json,
    mode: ApplyMode,
) -> Result<Option<Write<'a>>> {
    let read_only = || StoreError::ReadOnly {
        store: store.id().to_string(),
        name: key.to_string(),
    };
    let skip_or = |error: StoreError| match mode {
        ApplyMode::Hydrate => {
            debug!(store = store.id(), key, "derived entry skipped during hydration");
            Ok(None)
        }
        ApplyMode::Patch => Err(error),
    };

    match store.body() {
        StoreBody::Options {
            state,
            getters,
            actions,
            ..
        } => {
            if getters.contains_key(key) || actions.contains_key(key) {
                return skip_or(read_only());
            }
            Ok(Some(Write::Assign(state.clone(), key, json)))
        }
        StoreBody::Setup { exports } => match exports.get(key) {
            Some(Export::Ref(r)) => {
                let current = r.get_untracked();
                match (&current, json) {
                    (Value::Object(_), Json::Object(map)) => {
                        let trigger = Some(store.trigger().clone());
                        let field = wrap(current.clone(), trigger, store.runtime());
                        match field.as_object() {
                            Some(object) => Ok(Some(Write::Merge(object.clone(), map))),
                            None => Ok(Some(Write::SetRef(r.clone(), json))),
                        }
                    }
                    _ => Ok(Some(Write::SetRef(r.clone(), json))),
                }
            }
            Some(Export::Reactive(Reactive::Object(object))) => match json {
                Json::Object(map) => Ok(Some(Write::Merge(object.clone(), map))),
                other => Err(StoreError::Hydration(format!(
                    "export `{key}` of store `{}` is an object, got {}",
                    store.id(),
                    json_type(other)
                ))),
            },
            Some(_) => skip_or(read_only()),
            None => skip_or(StoreError::UnknownProperty {
                store: store.id().to_string(),
                name: key.to_string(),
            }),
        },
    }
}

fn assign(object: &ReactiveObject, key: &str, json: &Json) {
    if let Json::Object(map) = json {
        let current = object.get_untracked(key);
        if let Some(nested) = current.as_object() {
            merge(nested, map);
            return;
        }
    }
    object.set(key, Value::from_json(json));
}

fn merge(object: &ReactiveObject, map: &Map<String, Json>) {
    for (key, json) in map {
        assign(object, key, json);
    }
}

pub(crate) fn json_type(json: &Json) -> &'static str {
    match json {
        Json::Null => "null",
        Json::Bool(_) => "a boolean",
        Json::Number(_) => "a number",
        Json::String(_) => "a string",
        Json::Array(_) => "an array",
        Json::Object(_) => "an object",
    }
}

/// Adopt `state` without advancing the change signal. Logs and skips the
/// whole store on malformed input.
pub(crate) fn hydrate_store(store: &Store, state: &Map<String, Json>) -> bool {
    match store
        .runtime()
        .silently(|| apply_state(store, state, ApplyMode::Hydrate))
    {
        Ok(()) => true,
        Err(error) => {
            warn!(store = store.id(), %error, "hydration state rejected");
            false
        }
    }
}
