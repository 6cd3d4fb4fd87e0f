#[cfg(test)]
mod tests {
    use crate::proxy::reducer::*;
    use serde_json::{json, Value};

    fn values(raw: &[Value]) -> Vec<&Value> {
        raw.iter().collect()
    }

    #[test]
    fn test_sum() {
        let raw = [json!(2), json!(5), json!(3)];
        assert_eq!(apply(Operator::Sum, &values(&raw)), Some(json!(10)));
    }

    #[test]
    fn test_avg() {
        let raw = [json!(2), json!(5), json!(3)];
        let avg = apply(Operator::Avg, &values(&raw)).unwrap();
        assert!((avg.as_f64().unwrap() - 10.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn test_min_max() {
        let raw = [json!(7), json!(2), json!(9)];
        assert_eq!(apply(Operator::Min, &values(&raw)), Some(json!(2)));
        assert_eq!(apply(Operator::Max, &values(&raw)), Some(json!(9)));
    }

    #[test]
    fn test_min_tie_keeps_first_replica() {
        // Both replicas report 2; the first one's value must win.
        let raw = [json!(2.0), json!(2), json!(5)];
        let min = apply(Operator::Min, &values(&raw)).unwrap();
        assert_eq!(min, json!(2.0));
    }

    #[test]
    fn test_and_or() {
        let raw = [json!(true), json!(false), json!(true)];
        assert_eq!(apply(Operator::And, &values(&raw)), Some(json!(false)));
        assert_eq!(apply(Operator::Or, &values(&raw)), Some(json!(true)));

        let all_true = [json!(true), json!(true)];
        assert_eq!(apply(Operator::And, &values(&all_true)), Some(json!(true)));
    }

    #[test]
    fn test_array_preserves_replica_order() {
        let raw = [json!(3), json!(1), json!(2)];
        assert_eq!(
            apply(Operator::Array, &values(&raw)),
            Some(json!([3, 1, 2]))
        );
    }

    #[test]
    fn test_merge_concatenates_sequences() {
        let raw = [json!([1, 2]), json!([3])];
        assert_eq!(
            apply(Operator::Merge, &values(&raw)),
            Some(json!([1, 2, 3]))
        );
    }

    #[test]
    fn test_merge_skips_non_sequences() {
        let raw = [json!([1]), json!("not-a-list"), json!([2])];
        assert_eq!(apply(Operator::Merge, &values(&raw)), Some(json!([1, 2])));
    }

    #[test]
    fn test_empty_input_yields_nothing() {
        assert_eq!(apply(Operator::Sum, &[]), None);
        assert_eq!(apply(Operator::Array, &[]), None);
    }

    #[test]
    fn test_reduce_status_overview() {
        let spec = ReducerSpec::from_rules(&[
            ("totalRequests", "totalRequests", Operator::Sum),
            ("totalMicros", "totalMicros", Operator::Sum),
        ]);
        let replicas = [
            json!({ "totalRequests": 5, "totalMicros": 100 }),
            json!({ "totalRequests": 7, "totalMicros": 300 }),
            json!({ "totalRequests": 2, "totalMicros": 50 }),
        ];

        let result = reduce(&spec, &replicas);
        assert_eq!(result, json!({ "totalRequests": 14, "totalMicros": 450 }));
    }

    #[test]
    fn test_reduce_trace_subject() {
        let spec = ReducerSpec::from_rules(&[
            ("ok", "ok", Operator::And),
            ("okDetail", "ok", Operator::Array),
            ("id", "id", Operator::Min),
        ]);
        let replicas = [
            json!({ "ok": true, "id": 42 }),
            json!({ "ok": false, "id": 17 }),
        ];

        let result = reduce(&spec, &replicas);
        assert_eq!(
            result,
            json!({ "ok": false, "okDetail": [true, false], "id": 17 })
        );
    }

    #[test]
    fn test_reduce_skips_replicas_missing_the_source_key() {
        let spec = ReducerSpec::from_rules(&[("total", "count", Operator::Sum)]);
        let replicas = [json!({ "count": 3 }), json!({}), json!({ "count": 4 })];

        let result = reduce(&spec, &replicas);
        assert_eq!(result, json!({ "total": 7 }));
    }

    #[test]
    fn test_reduce_omits_key_no_replica_carries() {
        let spec = ReducerSpec::from_rules(&[("total", "count", Operator::Sum)]);
        let replicas = [json!({}), json!({ "other": 1 })];

        let result = reduce(&spec, &replicas);
        assert_eq!(result, json!({}));
    }

    #[test]
    fn test_reduce_empty_replica_set() {
        let spec = ReducerSpec::from_rules(&[("total", "count", Operator::Sum)]);
        assert_eq!(reduce(&spec, &[]), json!({}));
    }

    #[test]
    fn test_reducer_spec_wire_format() {
        let parsed: ReducerSpec = serde_json::from_value(json!({
            "ok": { "ok": "and" },
            "events": { "events": "merge" }
        }))
        .unwrap();

        let expected = ReducerSpec::from_rules(&[
            ("ok", "ok", Operator::And),
            ("events", "events", Operator::Merge),
        ]);
        assert_eq!(parsed, expected);
    }
}
