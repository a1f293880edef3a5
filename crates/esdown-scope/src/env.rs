//! Ambient-global presets.
//!
//! Each preset is a list of `(name, writable)` pairs. A read-only global is
//! declared `const` in the ambient scope, so assigning to it is reported
//! like any other const reassignment.

/// Standard ECMAScript globals; always injected first.
pub const BUILTIN: &str = "builtin";

const BUILTIN_GLOBALS: &[(&str, bool)] = &[
    ("Array", true),
    ("ArrayBuffer", true),
    ("Boolean", true),
    ("DataView", true),
    ("Date", true),
    ("decodeURI", true),
    ("decodeURIComponent", true),
    ("encodeURI", true),
    ("encodeURIComponent", true),
    ("Error", true),
    ("escape", true),
    ("eval", true),
    ("EvalError", true),
    ("Float32Array", true),
    ("Float64Array", true),
    ("Function", true),
    ("Infinity", false),
    ("Int16Array", true),
    ("Int32Array", true),
    ("Int8Array", true),
    ("isFinite", true),
    ("isNaN", true),
    ("JSON", true),
    ("Map", true),
    ("Math", true),
    ("NaN", false),
    ("Number", true),
    ("Object", true),
    ("parseFloat", true),
    ("parseInt", true),
    ("Promise", true),
    ("Proxy", true),
    ("RangeError", true),
    ("ReferenceError", true),
    ("Reflect", true),
    ("RegExp", true),
    ("Set", true),
    ("String", true),
    ("Symbol", true),
    ("SyntaxError", true),
    ("TypeError", true),
    ("Uint16Array", true),
    ("Uint32Array", true),
    ("Uint8Array", true),
    ("Uint8ClampedArray", true),
    ("undefined", false),
    ("unescape", true),
    ("URIError", true),
    ("WeakMap", true),
    ("WeakSet", true),
];

const BROWSER_GLOBALS: &[(&str, bool)] = &[
    ("addEventListener", false),
    ("alert", false),
    ("atob", false),
    ("btoa", false),
    ("cancelAnimationFrame", false),
    ("clearInterval", false),
    ("clearTimeout", false),
    ("confirm", false),
    ("console", false),
    ("CustomEvent", false),
    ("document", false),
    ("Element", false),
    ("Event", false),
    ("fetch", false),
    ("FormData", false),
    ("history", false),
    ("HTMLElement", false),
    ("Image", false),
    ("localStorage", false),
    ("location", true),
    ("navigator", false),
    ("Node", false),
    ("onload", true),
    ("performance", false),
    ("prompt", false),
    ("removeEventListener", false),
    ("requestAnimationFrame", false),
    ("screen", false),
    ("self", false),
    ("sessionStorage", false),
    ("setInterval", false),
    ("setTimeout", false),
    ("WebSocket", false),
    ("window", false),
    ("XMLHttpRequest", false),
];

const NODE_GLOBALS: &[(&str, bool)] = &[
    ("__dirname", false),
    ("__filename", false),
    ("Buffer", false),
    ("clearImmediate", false),
    ("clearInterval", false),
    ("clearTimeout", false),
    ("console", false),
    ("exports", true),
    ("global", false),
    ("module", false),
    ("process", false),
    ("require", false),
    ("setImmediate", false),
    ("setInterval", false),
    ("setTimeout", false),
];

const WORKER_GLOBALS: &[(&str, bool)] = &[
    ("close", false),
    ("console", false),
    ("importScripts", false),
    ("onmessage", true),
    ("postMessage", false),
    ("self", false),
    ("setInterval", false),
    ("setTimeout", false),
];

const TEST_GLOBALS: &[(&str, bool)] = &[
    ("after", false),
    ("afterEach", false),
    ("before", false),
    ("beforeEach", false),
    ("describe", false),
    ("expect", false),
    ("it", false),
    ("jasmine", false),
    ("spyOn", false),
    ("xdescribe", false),
    ("xit", false),
];

/// Globals of a named preset.
pub fn preset(name: &str) -> Option<&'static [(&'static str, bool)]> {
    match name {
        BUILTIN => Some(BUILTIN_GLOBALS),
        "browser" => Some(BROWSER_GLOBALS),
        "node" => Some(NODE_GLOBALS),
        "worker" => Some(WORKER_GLOBALS),
        "test" => Some(TEST_GLOBALS),
        _ => None,
    }
}

/// Names accepted by [`preset`].
pub fn preset_names() -> &'static [&'static str] {
    &[BUILTIN, "browser", "node", "worker", "test"]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_listed_preset_exists() {
        for name in preset_names() {
            assert!(preset(name).is_some(), "{name}");
        }
        assert!(preset("amd").is_none());
    }

    #[test]
    fn test_builtin_constants_are_read_only() {
        let builtin = preset(BUILTIN).unwrap();
        assert!(builtin.contains(&("undefined", false)));
        assert!(builtin.contains(&("Object", true)));
    }
}
