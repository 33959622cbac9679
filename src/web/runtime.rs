//! Extension runtime shim over the `browser` / `chrome` globals

use crate::settings::StoreError;
use serde_json::{Map, Value};
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use wasm_bindgen_futures::JsFuture;

/// `browser` on Firefox, `chrome` elsewhere
fn extension_api() -> Option<JsValue> {
    let global = js_sys::global();
    ["browser", "chrome"].iter().find_map(|name| {
        js_sys::Reflect::get(&global, &JsValue::from_str(name))
            .ok()
            .filter(|api| api.is_object())
    })
}

fn lookup(root: &JsValue, path: &[&str]) -> Option<JsValue> {
    path.iter().try_fold(root.clone(), |value, key| {
        js_sys::Reflect::get(&value, &JsValue::from_str(key))
            .ok()
            .filter(|v| !v.is_undefined() && !v.is_null())
    })
}

fn method(target: &JsValue, name: &str) -> Option<js_sys::Function> {
    lookup(target, &[name])?.dyn_into().ok()
}

/// Structured-clone value to JSON; anything unserialisable becomes `null`
fn to_json(value: &JsValue) -> Value {
    js_sys::JSON::stringify(value)
        .ok()
        .map(String::from)
        .and_then(|text| serde_json::from_str(&text).ok())
        .unwrap_or(Value::Null)
}

/// Register `handler` on `runtime.onMessage`. The listener never replies.
pub fn on_message(mut handler: impl FnMut(Value) + 'static) -> Result<(), JsValue> {
    let api = extension_api().ok_or("extension runtime not available")?;
    let event = lookup(&api, &["runtime", "onMessage"]).ok_or("runtime.onMessage missing")?;
    let add_listener = method(&event, "addListener").ok_or("onMessage.addListener missing")?;

    let listener = Closure::<dyn FnMut(JsValue, JsValue, JsValue)>::new(
        move |message: JsValue, _sender: JsValue, _respond: JsValue| {
            handler(to_json(&message));
        },
    );
    add_listener.call1(&event, listener.as_ref())?;
    // Lives as long as the page
    listener.forget();
    Ok(())
}

/// Wrap the callback form of `get` in a promise. The callback rejects when
/// the runtime reports `lastError`.
fn get_with_callback(get: &js_sys::Function, target: &JsValue, keys: &JsValue) -> js_sys::Promise {
    js_sys::Promise::new(&mut |resolve, reject| {
        let on_error = reject.clone();
        let callback = Closure::once_into_js(move |items: JsValue| {
            let last_error =
                extension_api().and_then(|api| lookup(&api, &["runtime", "lastError"]));
            let outcome = match last_error {
                Some(error) => reject.call1(&JsValue::UNDEFINED, &error),
                None => resolve.call1(&JsValue::UNDEFINED, &items),
            };
            if let Err(e) = outcome {
                log::debug!("[Runtime] Settling storage read failed: {:?}", e);
            }
        });
        if let Err(e) = get.call2(target, keys, &callback) {
            if let Err(e) = on_error.call1(&JsValue::UNDEFINED, &e) {
                log::debug!("[Runtime] Settling storage read failed: {:?}", e);
            }
        }
    })
}

/// `storage.local.get(keys)`, promise form first, callback form otherwise
pub async fn storage_get(keys: &[&str]) -> Result<Map<String, Value>, StoreError> {
    let api = extension_api().ok_or_else(|| StoreError::Unavailable("no extension api".into()))?;
    let local = lookup(&api, &["storage", "local"])
        .ok_or_else(|| StoreError::Unavailable("storage.local missing".into()))?;
    let get = method(&local, "get")
        .ok_or_else(|| StoreError::Unavailable("storage.local.get missing".into()))?;

    let keys: js_sys::Array = keys.iter().map(|k| JsValue::from_str(k)).collect();
    let pending = match get.call1(&local, &keys) {
        Ok(result) if result.is_instance_of::<js_sys::Promise>() => result.unchecked_into(),
        // Callback-only runtimes throw or return undefined without one
        _ => get_with_callback(&get, &local, &keys),
    };
    let stored = JsFuture::from(pending)
        .await
        .map_err(|e| StoreError::Unavailable(format!("{:?}", e)))?;

    match to_json(&stored) {
        Value::Object(map) => Ok(map),
        _ => Ok(Map::new()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wasm_bindgen_test::*;

    /// Install a `chrome.storage.local.get` built from `body`
    fn install_storage(body: &str) {
        let get = js_sys::Function::new_with_args("keys, done", body);
        let local = js_sys::Object::new();
        js_sys::Reflect::set(&local, &"get".into(), &get).unwrap();
        let storage = js_sys::Object::new();
        js_sys::Reflect::set(&storage, &"local".into(), &local).unwrap();
        let api = js_sys::Object::new();
        js_sys::Reflect::set(&api, &"storage".into(), &storage).unwrap();
        js_sys::Reflect::set(&js_sys::global(), &"chrome".into(), &api).unwrap();
    }

    #[wasm_bindgen_test]
    async fn test_storage_get_promise_and_callback_forms() {
        install_storage("if (done) { done({ isEnabled: true, bassLevel: 3 }); }");
        let items = storage_get(&["isEnabled", "bassLevel"]).await.unwrap();
        assert_eq!(items.get("isEnabled"), Some(&json!(true)));
        assert_eq!(items.get("bassLevel"), Some(&json!(3)));

        install_storage("done({ trebleLevel: -2 })");
        let items = storage_get(&["trebleLevel"]).await.unwrap();
        assert_eq!(items.get("trebleLevel"), Some(&json!(-2)));

        install_storage("return Promise.resolve({ isEnabled: false })");
        let items = storage_get(&["isEnabled"]).await.unwrap();
        assert_eq!(items.get("isEnabled"), Some(&json!(false)));
    }
}
