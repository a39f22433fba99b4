use super::*;
use crate::error::EvalError;
use crate::evaluator::ClosureEvaluator;
use serde_json::json;

const L: [i64; 3] = [1, 2, 3];
const M: [i64; 3] = [7, 8, 9];

fn rows(q: &Query<impl Evaluator>) -> Value {
    serde_json::to_value(q.rows().unwrap()).unwrap()
}

fn persons() -> Vec<Value> {
    vec![
        json!({"name": "Alice", "age": 27}),
        json!({"name": "Bob", "age": 28}),
        json!({"name": "Fred", "age": 19}),
        json!({"name": "George", "age": 19}),
    ]
}

#[test]
fn test_cross_product_with_filter() {
    let mut q = Query::new();
    q.from("x").unwrap().in_(L).unwrap();
    q.from("y").unwrap().in_(M).unwrap();
    q.where_("x > 1").unwrap().select(["x", "y"]).unwrap();

    assert_eq!(
        rows(&q),
        json!([[2, 7], [2, 8], [2, 9], [3, 7], [3, 8], [3, 9]])
    );
}

#[test]
fn test_filtering_early_gives_the_same_rows() {
    let mut late = Query::new();
    late.from("x").unwrap().in_(L).unwrap();
    late.from("y").unwrap().in_(M).unwrap();
    late.where_("x > 1").unwrap().select(["x", "y"]).unwrap();

    let mut early = Query::new();
    early.from("x").unwrap().in_(L).unwrap().where_("x > 1").unwrap();
    early.from("y").unwrap().in_(M).unwrap().select(["x", "y"]).unwrap();

    assert_eq!(rows(&late), rows(&early));
}

#[test]
fn test_order_by_desc() {
    let mut q = Query::from_name("x").unwrap();
    q.in_(L).unwrap().order_by(["x DESC"]).unwrap().select(["x"]).unwrap();
    assert_eq!(rows(&q), json!([[3], [2], [1]]));
}

#[test]
fn test_order_by_first_key_is_primary() {
    let mut q = Query::new();
    q.from("x").unwrap().in_(L).unwrap();
    q.from("y").unwrap().in_(M).unwrap();
    q.order_by(["x desc", "y asc"]).unwrap().select(["x", "y"]).unwrap();

    assert_eq!(
        rows(&q),
        json!([[3, 7], [3, 8], [3, 9], [2, 7], [2, 8], [2, 9], [1, 7], [1, 8], [1, 9]])
    );

    q.order_by(["y AsC", "x aSc"]).unwrap().select(["x", "y"]).unwrap();
    assert_eq!(
        rows(&q),
        json!([[1, 7], [2, 7], [3, 7], [1, 8], [2, 8], [3, 8], [1, 9], [2, 9], [3, 9]])
    );
}

#[test]
fn test_order_by_is_stable() {
    let mut q = Query::new();
    q.from("p").unwrap().in_(persons()).unwrap();
    q.order_by(["p.age"]).unwrap().select(["p.name"]).unwrap();

    // Fred and George share an age and keep their source order
    assert_eq!(
        rows(&q),
        json!([["Fred"], ["George"], ["Alice"], ["Bob"]])
    );
}

#[test]
fn test_order_by_mixed_spec_forms() {
    let mut q = Query::new();
    q.from("p").unwrap().in_(persons()).unwrap();
    q.order_by([
        OrderSpec::from(("p.age", false)),
        OrderSpec::desc("p.name"),
    ])
    .unwrap()
    .select(["p.name"])
    .unwrap();

    assert_eq!(
        rows(&q),
        json!([["Bob"], ["Alice"], ["George"], ["Fred"]])
    );
}

#[test]
fn test_select_then_distinct() {
    let mut q = Query::new();
    q.from("x").unwrap().in_(L).unwrap();
    q.from("y").unwrap().in_(M).unwrap();
    q.select(["x"]).unwrap();
    assert_eq!(q.rows().unwrap().len(), 9);

    q.distinct().unwrap();
    assert_eq!(rows(&q), json!([[1], [2], [3]]));

    // idempotent
    q.distinct().unwrap();
    assert_eq!(rows(&q), json!([[1], [2], [3]]));
}

#[test]
fn test_group_by_first_seen_key_order() {
    let mut q = Query::new();
    q.from("x").unwrap().in_(L).unwrap();
    q.group(["x"]).unwrap().by("x % 2").unwrap();

    let groups = q.groups().unwrap();
    assert_eq!(groups.len(), 2);
    assert_eq!(groups[0].key, json!(1));
    assert_eq!(groups[0].rows, vec![vec![json!(1)], vec![json!(3)]]);
    assert_eq!(groups[1].key, json!(0));
    assert_eq!(groups[1].rows, vec![vec![json!(2)]]);

    assert_eq!(
        q.results().unwrap().group(&json!(0)),
        Some(&[vec![json!(2)]][..])
    );
}

#[test]
fn test_group_with_several_selectors() {
    let mut q = Query::new();
    q.from("x").unwrap().in_(0..10).unwrap();
    q.from("y").unwrap().in_(["a", "b"]).unwrap();
    q.group(["x", "y"]).unwrap().by("x % 5").unwrap();

    let groups = q.groups().unwrap();
    assert_eq!(groups.len(), 5);
    assert_eq!(groups[0].key, json!(0));
    assert_eq!(
        serde_json::to_value(&groups[0].rows).unwrap(),
        json!([[0, "a"], [0, "b"], [5, "a"], [5, "b"]])
    );
}

#[test]
fn test_group_keys_follow_value_equality() {
    let mut q = Query::new();
    q.from("k")
        .unwrap()
        .in_([
            json!(9007199254740993_i64),
            json!(9007199254740992.0),
            json!(9007199254740992_i64),
        ])
        .unwrap();
    q.group(["k"]).unwrap().by("k").unwrap();

    let groups = q.groups().unwrap();
    assert_eq!(groups.len(), 2);
    assert_eq!(groups[0].rows.len(), 1);
    assert_eq!(groups[1].rows.len(), 2);

    q.select(["k"]).unwrap().distinct().unwrap();
    assert_eq!(q.rows().unwrap().len(), 2);
}

#[test]
fn test_let_be() {
    let mut q = Query::new();
    q.from("x").unwrap().in_(L).unwrap();
    q.let_("z").unwrap().be(4).unwrap();
    q.where_("x > 1").unwrap().select(["x", "z", "x * z", "(x, z)"]).unwrap();

    assert_eq!(rows(&q), json!([[2, 4, 8, [2, 4]], [3, 4, 12, [3, 4]]]));
}

#[test]
fn test_join_on() {
    let mut q = Query::new();
    q.from("x").unwrap().in_(L).unwrap();
    q.join("y").unwrap().in_(L).unwrap().on("x == y").unwrap();
    q.select(["x", "y"]).unwrap();

    assert_eq!(rows(&q), json!([[1, 1], [2, 2], [3, 3]]));
}

#[test]
fn test_on_requires_join() {
    let mut q = Query::new();
    q.from("x").unwrap().in_(L).unwrap();
    let err = q.on("x > 1").unwrap_err();
    assert!(matches!(err, KviriError::Usage { clause: Clause::On, .. }));

    // a join followed by something else closes the window
    q.join("y").unwrap().in_(L).unwrap().where_("x > 1").unwrap();
    assert!(q.on("x == y").is_err());
}

#[test]
fn test_closures_and_objects() {
    let mut q = Query::new();
    q.from("p").unwrap().in_(persons()).unwrap();
    q.where_(Expr::predicate(|b| Ok(b.resolve("p.age")? == json!(19))))
        .unwrap()
        .select(["p.name"])
        .unwrap();
    assert_eq!(rows(&q), json!([["Fred"], ["George"]]));

    q.where_("p.age > 21").unwrap().select(["p.name"]).unwrap();
    assert!(q.rows().unwrap().is_empty());
}

#[test]
fn test_mixed_closure_and_text_selectors() {
    let mut q = Query::new();
    q.from("x").unwrap().in_([0, 1, 2]).unwrap();
    q.from("y").unwrap().in_([7, 8]).unwrap();
    q.select([
        Expr::from("x"),
        Expr::from("y"),
        Expr::func(|b| {
            let x = b.value("x")?.as_i64().unwrap_or(0);
            let y = b.value("y")?.as_i64().unwrap_or(0);
            Ok(json!(x + y))
        }),
        Expr::from("x * y"),
    ])
    .unwrap();

    assert_eq!(
        rows(&q),
        json!([[0, 7, 7, 0], [0, 8, 8, 0], [1, 7, 8, 7], [1, 8, 9, 8], [2, 7, 9, 14], [2, 8, 10, 16]])
    );
}

#[test]
fn test_usage_errors() {
    let mut q = Query::new();

    // consume without a pending name
    assert!(matches!(
        q.in_(L).unwrap_err(),
        KviriError::Usage { clause: Clause::In, .. }
    ));
    assert!(matches!(
        q.be(1).unwrap_err(),
        KviriError::Usage { clause: Clause::Be, .. }
    ));

    // two names in a row
    q.from("x").unwrap();
    assert!(q.from("y").is_err());
    assert_eq!(q.pending_name(), Some("x"));

    // LET name cannot be consumed by IN, nor FROM name by BE
    let mut q2 = Query::new();
    q2.let_("z").unwrap();
    assert!(q2.in_(L).is_err());
    assert_eq!(q2.pending_name(), Some("z"));
    q2.be(3).unwrap();
    assert!(q.be(3).is_err());

    // distinct before select, by before group, group twice
    let mut q3 = Query::new();
    assert!(matches!(
        q3.distinct().unwrap_err(),
        KviriError::Usage { clause: Clause::Distinct, .. }
    ));
    assert!(q3.by("1").is_err());
    q3.group(["1"]).unwrap();
    assert!(q3.group(["2"]).is_err());
    assert!(q3.results().is_err());
}

#[test]
fn test_name_conflict_before_mutation() {
    let mut q = Query::new();
    q.from("x").unwrap().in_(L).unwrap();
    let before = q.bindings().clone();

    q.from("x").unwrap();
    let err = q.in_(M).unwrap_err();
    assert!(matches!(
        err,
        KviriError::NameConflict { clause: Clause::In, ref name } if name == "x"
    ));
    assert_eq!(q.bindings(), &before);
    // the failed IN consumed the name, so the chain can go on
    assert_eq!(q.pending_name(), None);
    q.from("y").unwrap().in_(M).unwrap();
    assert_eq!(q.bindings().len(), 9);
    assert_eq!(q.bindings().names(), &["x".to_string(), "y".to_string()]);

    let mut q = Query::new();
    q.from("x").unwrap().in_(L).unwrap();
    q.let_("x").unwrap();
    assert!(matches!(
        q.be(4).unwrap_err(),
        KviriError::NameConflict { clause: Clause::Be, .. }
    ));
    q.let_("k").unwrap().be(4).unwrap();
    q.join("j").unwrap().in_([0]).unwrap();
    assert_eq!(q.pending_name(), None);
    assert_eq!(q.bindings().len(), 3);
}

#[test]
fn test_conflict_detected_on_empty_set() {
    let mut q = Query::new();
    q.from("x").unwrap().in_(L).unwrap().where_("x > 10").unwrap();
    assert!(q.bindings().is_empty());

    q.from("x").unwrap();
    assert!(matches!(
        q.in_(M).unwrap_err(),
        KviriError::NameConflict { .. }
    ));
}

#[test]
fn test_evaluation_errors_are_atomic() {
    let mut q = Query::new();
    q.from("x").unwrap().in_(L).unwrap();
    let before = q.bindings().clone();

    let err = q.where_("y > 1").unwrap_err();
    match &err {
        KviriError::Evaluation {
            clause,
            expression,
            binding,
            source,
        } => {
            assert_eq!(*clause, Clause::Where);
            assert_eq!(expression, "y > 1");
            assert_eq!(binding, r#"{"x":1}"#);
            assert_eq!(*source, EvalError::UnboundName("y".to_string()));
        }
        other => panic!("unexpected error: {:?}", other),
    }
    assert_eq!(q.bindings(), &before);

    // fails only on the last binding: nothing is reordered
    assert!(q.order_by(["x == 3 ? z : -x"]).is_err());
    assert_eq!(q.bindings(), &before);

    // no partial result either
    q.select(["x"]).unwrap();
    assert!(q.select(["x", "10 / (x - 3)"]).is_err());
    assert_eq!(rows(&q), json!([[1], [2], [3]]));
}

#[test]
fn test_parse_error_surfaces_as_evaluation_error() {
    let mut q = Query::new();
    q.from("x").unwrap().in_(L).unwrap();
    let err = q.select(["x +"]).unwrap_err();
    assert!(matches!(
        err,
        KviriError::Evaluation {
            source: EvalError::Parse(_),
            ..
        }
    ));
}

#[test]
fn test_terminal_calls_keep_bindings() {
    let mut q = Query::new();
    q.from("x").unwrap().in_(L).unwrap();
    q.select(["x"]).unwrap();
    assert!(!q.is_stale());
    assert_eq!(q.bindings().len(), 3);

    // more clauses after a terminal call; the old result stays readable
    q.where_("x > 1").unwrap();
    assert!(q.is_stale());
    assert_eq!(q.rows().unwrap().len(), 3);

    q.select(["x"]).unwrap();
    assert!(!q.is_stale());
    assert_eq!(rows(&q), json!([[2], [3]]));
}

#[test]
fn test_iteration() {
    let mut q = Query::new();
    q.from("x").unwrap().in_(L).unwrap();

    let items: Vec<Value> = q.iter().map(|item| item.to_value()).collect();
    assert_eq!(items, vec![json!({"x": 1}), json!({"x": 2}), json!({"x": 3})]);
    assert!(matches!(q.iter().next(), Some(Item::Binding(_))));

    q.select(["x * 10"]).unwrap();
    let mut seen = Vec::new();
    for item in &q {
        if let Item::Row(row) = item {
            seen.push(row[0].clone());
        }
    }
    assert_eq!(seen, vec![json!(10), json!(20), json!(30)]);

    q.group(["x"]).unwrap().by("x > 1").unwrap();
    assert_eq!(q.iter().len(), 2);
    assert!(q.iter().all(|item| matches!(item, Item::Group(_))));
}

#[test]
fn test_display() {
    let mut q = Query::new();
    q.from("x").unwrap().in_([1]).unwrap();
    assert_eq!(q.to_string(), "[\n  {\n    \"x\": 1\n  }\n]");

    q.select(["x"]).unwrap();
    assert_eq!(q.to_value(), json!([[1]]));
}

#[test]
fn test_limits() {
    let mut q = Query::new().with_limits(QueryLimits { max_bindings: 8 });
    q.from("x").unwrap().in_(L).unwrap();
    q.from("y").unwrap();
    assert!(matches!(
        q.in_(M).unwrap_err(),
        KviriError::LimitExceeded {
            requested: 9,
            max: 8,
            ..
        }
    ));
    assert_eq!(q.bindings().len(), 3);

    let mut q = Query::new().with_limits(QueryLimits::unlimited());
    q.from("x").unwrap().in_(0..100).unwrap();
    q.from("y").unwrap().in_(0..100).unwrap();
    assert_eq!(q.bindings().len(), 10_000);
}

#[test]
fn test_closure_evaluator() {
    let mut q = Query::with_evaluator(ClosureEvaluator);
    q.from("p").unwrap().in_(persons()).unwrap();
    q.where_(Expr::predicate(|b| {
        Ok(b.resolve("p.age")?.as_i64().unwrap_or(0) > 21)
    }))
    .unwrap();
    q.order_by([OrderSpec::desc("p.age")]).unwrap();
    q.select(["p.name"]).unwrap();
    assert_eq!(rows(&q), json!([["Bob"], ["Alice"]]));

    let err = q.where_("p.age > 1").unwrap_err();
    assert!(matches!(
        err,
        KviriError::Evaluation {
            source: EvalError::Unsupported(_),
            ..
        }
    ));
}

#[test]
fn test_empty_source() {
    let mut q = Query::new();
    q.from("x").unwrap().in_(Vec::<Value>::new()).unwrap();
    q.select(["x"]).unwrap();
    assert!(q.rows().unwrap().is_empty());

    // iteration without select on the initial query yields one empty binding
    let q = Query::new();
    let items: Vec<_> = q.iter().collect();
    assert_eq!(items.len(), 1);
}

#[test]
fn test_cartesian_size_and_order() {
    for a in 0..4usize {
        for b in 0..4usize {
            let left: Vec<usize> = (0..a).collect();
            let right: Vec<usize> = (0..b).collect();

            let mut q = Query::new();
            q.from("x").unwrap().in_(left.iter().copied()).unwrap();
            q.from("y").unwrap().in_(right.iter().copied()).unwrap();
            q.select(["x", "y"]).unwrap();

            let expected: Vec<Row> = left
                .iter()
                .flat_map(|x| right.iter().map(move |y| vec![json!(x), json!(y)]))
                .collect();
            assert_eq!(q.rows().unwrap(), expected.as_slice());
        }
    }
}

#[test]
fn test_filter_is_monotonic() {
    let predicates = ["x > 1", "x % 2 == 0", "true", "false", "x IN [1, 3]"];
    for p in predicates {
        let mut q = Query::new();
        q.from("x").unwrap().in_(0..6).unwrap();
        let before: Vec<Binding> = q.bindings().iter().cloned().collect();
        q.where_(p).unwrap();

        // every survivor was present before, in the same relative order
        let mut remaining = before.iter();
        for kept in q.bindings() {
            assert!(remaining.any(|b| b == kept), "{}", p);
        }
    }
}
