use proptest::prelude::*;
use sb_args::{combine, diff, ArgValue, Args, Delta};

fn arg_value() -> impl Strategy<Value = ArgValue> {
    let leaf = prop_oneof![
        Just(ArgValue::Null),
        any::<bool>().prop_map(ArgValue::Bool),
        (-50i32..50).prop_map(ArgValue::from),
        Just(ArgValue::Number(f64::NAN)),
        "[a-z]{0,4}".prop_map(ArgValue::String),
        prop_oneof![Just("onClick"), Just("onHover")].prop_map(ArgValue::opaque),
    ];
    leaf.prop_recursive(3, 24, 4, |inner| {
        prop_oneof![
            prop::collection::vec(inner.clone(), 0..4).prop_map(ArgValue::Sequence),
            prop::collection::vec(("[a-d]", inner), 0..4)
                .prop_map(|pairs| ArgValue::Mapping(pairs.into_iter().collect())),
        ]
    })
}

fn args() -> impl Strategy<Value = Args> {
    prop::collection::vec(("[a-e]", arg_value()), 0..5).prop_map(|pairs| pairs.into_iter().collect())
}

proptest! {
    #[test]
    fn prop_combine_applies_diff(old in args(), new in args()) {
        let delta = diff(&old, &new);
        prop_assert_eq!(combine(&old, &delta), new);
    }

    #[test]
    fn prop_diff_of_self_is_deeply_equal(a in args()) {
        prop_assert_eq!(diff(&a, &a), Delta::DeeplyEqual);
    }

    #[test]
    fn prop_empty_diff_means_equal(old in args(), new in args()) {
        prop_assert_eq!(diff(&old, &new).is_deeply_equal(), old == new);
    }
}
