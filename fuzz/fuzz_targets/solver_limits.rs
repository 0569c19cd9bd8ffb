#![no_main]

use libfuzzer_sys::fuzz_target;
use typeinfer::{infer_module, InferConfig, Module, SolverConfig};

fuzz_target!(|data: &[u8]| {
    if data.len() < 2 || data.len() > 16 * 1024 {
        return;
    }
    // The first byte picks the solver settings so both `find` strategies get exercised.
    let config = InferConfig {
        solver: SolverConfig {
            path_compression: data[0] & 1 == 0,
            max_errors: Some(usize::from(data[0] >> 1)),
        },
    };
    let src = String::from_utf8_lossy(&data[1..]);
    let Ok(module) = Module::from_json(&src) else {
        return;
    };
    if let Err(err) = infer_module(&module, &config) {
        assert!(err.type_errors().len() <= usize::from(data[0] >> 1).max(1));
    }
});
