//! Shared test setup

use std::sync::Once;

use proptest::prelude::*;
use tandem_core::SafeBuilder;
use tracing_subscriber::EnvFilter;

static INIT: Once = Once::new();

/// Route tracing output through the test harness.
///
/// Silent unless `TANDEM_LOG` is set, e.g. `TANDEM_LOG=tandem_abi=trace`.
pub fn init_tracing() {
    INIT.call_once(|| {
        let filter = EnvFilter::try_from_env("TANDEM_LOG").unwrap_or_else(|_| EnvFilter::new("off"));
        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .try_init();
    });
}

/// Arbitrary JSON-like trees
#[allow(dead_code)]
pub fn arb_value() -> impl Strategy<Value = SafeBuilder> {
    let leaf = prop_oneof![
        Just(SafeBuilder::null()),
        any::<bool>().prop_map(SafeBuilder::from),
        any::<i64>().prop_map(SafeBuilder::from),
        (-1.0e6f64..1.0e6).prop_map(SafeBuilder::from),
        "[a-z ]{0,12}".prop_map(SafeBuilder::from),
    ];
    leaf.prop_recursive(3, 32, 5, |inner| {
        prop_oneof![
            prop::collection::vec(inner.clone(), 0..5).prop_map(|items| {
                let mut arr = SafeBuilder::array();
                for item in items {
                    arr.push(item).unwrap();
                }
                arr
            }),
            prop::collection::btree_map("[a-z]{1,6}", inner, 0..5).prop_map(|fields| {
                let mut obj = SafeBuilder::object();
                for (key, item) in fields {
                    obj.insert(key, item).unwrap();
                }
                obj
            }),
        ]
    })
}
