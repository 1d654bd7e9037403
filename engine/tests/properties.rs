use mold::{modifiers, Context, FieldDef, StructType, StructValue, Transformer, Type, Value};
use proptest::prelude::*;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

fn run(t: &Transformer, input: &str, tags: &str) -> String {
    let mut v = Value::string(input);
    t.transform_field(&Context::background(), &mut v, tags).unwrap();
    v.as_str().unwrap_or_default().to_string()
}

proptest! {
    #[test]
    fn test_trim_is_idempotent(s in "\\PC{0,40}") {
        let t = modifiers::new();
        let once = run(&t, &s, "trim");
        prop_assert_eq!(run(&t, &once, "trim"), once.clone());
        prop_assert_eq!(once, s.trim().to_string());
    }

    #[test]
    fn test_chain_runs_left_to_right(s in "[a-zA-Z ]{0,30}") {
        let t = modifiers::new();
        let chained = run(&t, &s, "trim,ucase");
        let stepwise = run(&t, &run(&t, &s, "trim"), "ucase");
        prop_assert_eq!(chained, stepwise);
    }

    #[test]
    fn test_cached_tags_give_same_result(s in "[a-z _-]{0,30}") {
        let t = modifiers::new();
        let cold = run(&t, &s, "trim,snake");
        let warm = run(&t, &s, "trim,snake");
        prop_assert_eq!(cold, warm);
    }

    #[test]
    fn test_dive_visits_every_element(len in 0usize..20) {
        let calls = Arc::new(AtomicUsize::new(0));
        let mut t = Transformer::new();
        {
            let calls = Arc::clone(&calls);
            t.register("count", move |_, _| {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok(())
            });
        }

        let list = StructType::new(
            "List",
            vec![FieldDef::new("Items", Type::slice_of(Type::int())).tag("mold", "dive,count")],
        );
        let items = (0..len as i64).map(Value::int).collect();
        let mut v = Value::from(
            StructValue::new(list).with("Items", Value::slice(Type::int(), items)),
        );
        t.transform_struct(&Context::background(), &mut v).unwrap();
        prop_assert_eq!(calls.load(Ordering::SeqCst), len);
    }
}
