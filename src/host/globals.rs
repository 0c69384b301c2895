//! Predefined global names

use crate::linter::AnalysisConfig;

/// Always defined, whatever the environment
pub const BUILTIN_GLOBALS: &[&str] = &[
    "AggregateError",
    "Array",
    "ArrayBuffer",
    "Atomics",
    "BigInt",
    "BigInt64Array",
    "BigUint64Array",
    "Boolean",
    "DataView",
    "Date",
    "Error",
    "EvalError",
    "FinalizationRegistry",
    "Float32Array",
    "Float64Array",
    "Function",
    "Infinity",
    "Int16Array",
    "Int32Array",
    "Int8Array",
    "Intl",
    "JSON",
    "Map",
    "Math",
    "NaN",
    "Number",
    "Object",
    "Promise",
    "Proxy",
    "RangeError",
    "ReferenceError",
    "Reflect",
    "RegExp",
    "Set",
    "SharedArrayBuffer",
    "String",
    "Symbol",
    "SyntaxError",
    "TypeError",
    "URIError",
    "Uint16Array",
    "Uint32Array",
    "Uint8Array",
    "Uint8ClampedArray",
    "WeakMap",
    "WeakRef",
    "WeakSet",
    "decodeURI",
    "decodeURIComponent",
    "encodeURI",
    "encodeURIComponent",
    "escape",
    "eval",
    "globalThis",
    "isFinite",
    "isNaN",
    "parseFloat",
    "parseInt",
    "undefined",
    "unescape",
];

/// Defined when the browser environment is on
pub const BROWSER_GLOBALS: &[&str] = &[
    "AbortController",
    "Blob",
    "CustomEvent",
    "Element",
    "Event",
    "File",
    "FileReader",
    "FormData",
    "HTMLElement",
    "Headers",
    "Image",
    "IntersectionObserver",
    "MutationObserver",
    "Node",
    "Request",
    "ResizeObserver",
    "Response",
    "URL",
    "URLSearchParams",
    "WebSocket",
    "Worker",
    "XMLHttpRequest",
    "alert",
    "atob",
    "btoa",
    "cancelAnimationFrame",
    "clearInterval",
    "clearTimeout",
    "confirm",
    "console",
    "crypto",
    "customElements",
    "document",
    "fetch",
    "getComputedStyle",
    "history",
    "indexedDB",
    "localStorage",
    "location",
    "matchMedia",
    "navigator",
    "performance",
    "prompt",
    "queueMicrotask",
    "requestAnimationFrame",
    "screen",
    "self",
    "sessionStorage",
    "setInterval",
    "setTimeout",
    "structuredClone",
    "window",
];

/// Whether `name` is predefined under `config`
#[must_use]
pub fn is_known_global(name: &str, config: &AnalysisConfig) -> bool {
    BUILTIN_GLOBALS.binary_search(&name).is_ok()
        || (config.browser && BROWSER_GLOBALS.binary_search(&name).is_ok())
        || config.globals.contains(name)
}
