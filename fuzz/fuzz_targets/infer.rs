#![no_main]

use libfuzzer_sys::fuzz_target;
use typeinfer::{infer_module, InferConfig, Module};

fuzz_target!(|data: &[u8]| {
    if data.len() > 32 * 1024 {
        return;
    }
    let src = String::from_utf8_lossy(data);
    let Ok(module) = Module::from_json(&src) else {
        return;
    };
    // Type errors and broken invariants are both fine; panics are not.
    let _ = infer_module(&module, &InferConfig::default());
});
