//! A parsed document through a handle and back

mod common;

use tandem_abi::Handle;
use tandem_core::{SafeBuffer, SafeBuilder, StructuralKind, ValueType};

const DOCUMENT: &str = r#"{"hello":"world","data":[1,1.0,2,3.0,5,8.0],"lies":false}"#;

fn check_document(doc: &SafeBuilder) {
    assert_eq!(doc.len(), 3);
    assert_eq!(doc.get("hello").unwrap().as_str(), Some("world"));
    assert_eq!(doc.get("lies").unwrap().as_bool(), Some(false));

    let data = doc.get("data").unwrap();
    assert_eq!(data.len(), 6);
    let expected = [1.0, 1.0, 2.0, 3.0, 5.0, 8.0];
    for (i, want) in expected.iter().enumerate() {
        let item = data.at(i).unwrap();
        if i % 2 == 0 {
            assert_eq!(item.value_type(), ValueType::Integer, "element {}", i);
            assert_eq!(item.as_integer(), Some(*want as i64));
        } else {
            assert_eq!(item.value_type(), ValueType::Decimal, "element {}", i);
            assert_eq!(item.as_decimal(), Some(*want));
        }
    }
}

#[test]
fn test_document_survives_handle() {
    common::init_tracing();
    let doc = SafeBuilder::parse(DOCUMENT).unwrap();
    let handle = Handle::from_ref(&doc);
    assert_eq!(handle.kind(), Some(StructuralKind::Builder));
    assert_eq!(handle.len(), 3);

    let back: SafeBuilder = handle.reconstruct().unwrap();
    check_document(&back);
    assert_eq!(back, doc);
    assert_eq!(back.refcount(), handle.refcount());
    // objects print in key order
    assert_eq!(
        back.to_string(),
        r#"{"data":[1,1.0,2,3.0,5,8.0],"hello":"world","lies":false}"#
    );
}

#[test]
fn test_finalized_document_survives_handle() {
    common::init_tracing();
    let buffer = SafeBuilder::parse(DOCUMENT).unwrap().finalize();
    let handle = Handle::from_value(buffer.clone());

    let back: SafeBuffer = handle.reconstruct().unwrap();
    assert!(back.ptr_eq(&buffer));
    check_document(&back.definalize());
}
