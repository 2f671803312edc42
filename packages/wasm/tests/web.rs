//! Runs in a browser via `wasm-pack test`

#![cfg(target_arch = "wasm32")]

use formsmith_wasm::FormBuilder;
use wasm_bindgen_test::*;

wasm_bindgen_test_configure!(run_in_browser);

#[wasm_bindgen_test]
fn test_builder_in_browser() {
    let mut builder = FormBuilder::new(None).unwrap();
    let id = builder.create_node("text", None, 0, None).unwrap();
    assert!(id.is_some());

    let saved = builder.save_envelope().unwrap();
    assert!(saved.contains("\"schemaVersion\": 1"));
    assert!(builder.undo());
}
