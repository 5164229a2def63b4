// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Query expression tests for cloudos-sdk.

use cloudos_sdk::{MalformedPredicateError, Operator, Phenotype, PhenotypeValue, Query, QueryNode};
use serde_json::json;

fn p1() -> Phenotype {
    Phenotype::discrete(1, [1])
}

fn p2() -> Phenotype {
    Phenotype::discrete(2, [2])
}

fn p3() -> Phenotype {
    Phenotype::range(3, 5, 10)
}

#[test]
fn test_discrete_leaf_round_trip() {
    let p = Phenotype::discrete("smoking_status", ["Never", "Previous"]);
    let parsed = QueryNode::parse(&p.to_wire()).unwrap();

    assert_eq!(parsed, QueryNode::Phenotype(p.clone()));
    match parsed {
        QueryNode::Phenotype(leaf) => {
            assert!(!leaf.is_continuous());
            assert_eq!(leaf.field().as_str(), Some("smoking_status"));
            assert!(leaf.bounds().is_none());
            assert_eq!(leaf.values().unwrap(), &[json!("Never"), json!("Previous")]);
        }
        other => panic!("expected leaf, got {:?}", other),
    }
}

#[test]
fn test_continuous_leaf_round_trip() {
    let p = Phenotype::range(7, 5, 10);
    let parsed = Phenotype::from_wire(&p.to_wire()).unwrap();

    assert_eq!(parsed, p);
    assert!(parsed.is_continuous());
    assert_eq!(
        parsed.value(),
        &PhenotypeValue::Continuous {
            min: json!(5),
            max: json!(10)
        }
    );
    assert_eq!(parsed.bounds(), Some((&json!(5), &json!(10))));
    assert!(parsed.values().is_none());
}

#[test]
fn test_leaf_wire_shape() {
    assert_eq!(
        Phenotype::range(7, 5, 10).to_wire(),
        json!({"field": 7, "instance": ["0"], "isLabel": false, "value": {"from": 5, "to": 10}})
    );
    assert_eq!(
        Phenotype::discrete(8, ["a"]).to_wire(),
        json!({"field": 8, "instance": ["0"], "isLabel": false, "value": ["a"]})
    );
}

#[test]
fn test_float_range_keeps_precision() {
    let p = Phenotype::range(21001, 18.5, 24.9);

    let wire = p.to_wire();
    assert_eq!(wire["value"], json!({"from": 18.5, "to": 24.9}));
    assert_eq!(Phenotype::from_wire(&wire).unwrap(), p);
}

#[test]
fn test_field_id_is_echoed_verbatim() {
    for field in [json!(21022.0), json!(u64::MAX), json!(null), json!({"id": 7})] {
        let wire = json!({"field": field, "instance": ["0"], "isLabel": false, "value": [1]});
        let parsed = QueryNode::parse(&wire).unwrap();

        match &parsed {
            QueryNode::Phenotype(leaf) => assert_eq!(leaf.field().as_value(), &field),
            other => panic!("expected leaf, got {:?}", other),
        }
        assert_eq!(parsed.to_wire(), wire);
    }
}

#[test]
fn test_range_bounds_are_not_validated() {
    let wire = json!({
        "field": 5,
        "instance": ["0"],
        "isLabel": false,
        "value": {"from": null, "to": 10}
    });
    let leaf = Phenotype::from_wire(&wire).unwrap();

    assert!(leaf.is_continuous());
    assert_eq!(leaf.bounds(), Some((&json!(null), &json!(10))));
    assert_eq!(leaf.to_wire(), wire);

    let inverted = Phenotype::range(5, 10, 1);
    assert_eq!(Phenotype::from_wire(&inverted.to_wire()).unwrap(), inverted);
}

#[test]
fn test_composite_round_trip() {
    let q = Query::all_of([p1(), p2()]);
    let parsed = QueryNode::parse(&q.to_wire()).unwrap();

    match parsed {
        QueryNode::Query(query) => {
            assert_eq!(query.operator(), Operator::And);
            assert_eq!(
                query.children(),
                &[QueryNode::from(p1()), QueryNode::from(p2())]
            );
        }
        other => panic!("expected composite, got {:?}", other),
    }
}

#[test]
fn test_nested_composite_round_trip() {
    let q = Query::any_of([
        QueryNode::from(Query::negation(p1())),
        QueryNode::from(Query::all_of([p2(), p3()])),
    ]);
    let parsed = Query::from_wire(&q.to_wire()).unwrap();
    assert_eq!(parsed, q);
}

#[test]
fn test_and_lists_second_operand_first() {
    let q = p1() & p2();

    assert_eq!(q.operator(), Operator::And);
    assert_eq!(q.children(), &[QueryNode::from(p2()), QueryNode::from(p1())]);
}

#[test]
fn test_or_lists_second_operand_first() {
    let q = QueryNode::from(p1()).or(p2());

    assert_eq!(q.operator(), Operator::Or);
    assert_eq!(q.children(), &[QueryNode::from(p2()), QueryNode::from(p1())]);
}

#[test]
fn test_not_wraps_operand() {
    let q = !p1();

    assert_eq!(q.operator(), Operator::Not);
    assert_eq!(q.children(), &[QueryNode::from(p1())]);
}

#[test]
fn test_chained_and_nests_left_operand() {
    let q = p1() & p2() & p3();

    assert_eq!(q.operator(), Operator::And);
    assert_eq!(q.children()[0], QueryNode::from(p3()));
    assert_eq!(q.children()[1], QueryNode::from(p1() & p2()));
}

#[test]
fn test_normalize_collapses_nested_singletons() {
    let q = Query::all_of([Query::all_of([p1()])]);

    assert_eq!(QueryNode::from(q).normalize(), QueryNode::from(p1()));
}

#[test]
fn test_normalize_keeps_not() {
    let q = QueryNode::from(Query::negation(p1()));

    assert_eq!(q.clone().normalize(), q);
}

#[test]
fn test_normalize_inside_not() {
    let q = Query::negation(Query::any_of([Query::all_of([p1()])]));

    assert_eq!(
        QueryNode::from(q).normalize(),
        QueryNode::from(Query::negation(p1()))
    );
}

#[test]
fn test_normalize_keeps_multi_child_nodes() {
    let q = Query::all_of([
        QueryNode::from(Query::any_of([p1()])),
        QueryNode::from(Query::any_of([p2(), p3()])),
    ]);

    assert_eq!(
        QueryNode::from(q).normalize(),
        QueryNode::from(Query::all_of([
            QueryNode::from(p1()),
            QueryNode::from(Query::any_of([p2(), p3()])),
        ]))
    );
}

#[test]
fn test_strip_singletons_keeps_single_child_root() {
    let q = Query::any_of([Query::all_of([Query::all_of([p1()])])]);
    let stripped = q.strip_singletons();

    assert_eq!(stripped.operator(), Operator::Or);
    assert_eq!(stripped.children(), &[QueryNode::from(p1())]);
}

#[test]
fn test_normalize_leaf_is_identity() {
    assert_eq!(QueryNode::from(p3()).normalize(), QueryNode::from(p3()));
}

#[test]
fn test_list_phenotypes_depth_first() {
    let (a, b, c) = (p1(), p2(), p3());
    let q = Query::all_of([
        QueryNode::from(Query::any_of([a.clone(), b.clone()])),
        QueryNode::from(c.clone()),
    ]);

    assert_eq!(q.list_phenotypes(), vec![&a, &b, &c]);
    assert_eq!(QueryNode::from(q.clone()).phenotypes(), vec![&a, &b, &c]);
}

#[test]
fn test_phenotypes_of_leaf() {
    let node = QueryNode::from(p1());
    assert_eq!(node.phenotypes(), vec![&p1()]);
}

#[test]
fn test_parse_missing_queries() {
    assert_eq!(
        QueryNode::parse(&json!({"operator": "AND"})),
        Err(MalformedPredicateError::MissingKey("queries"))
    );
}

#[test]
fn test_parse_missing_field() {
    assert_eq!(
        QueryNode::parse(&json!({"value": [1, 2, 3]})),
        Err(MalformedPredicateError::MissingKey("operator"))
    );
}

#[test]
fn test_parse_rejects_bad_child() {
    let wire = json!({"operator": "OR", "queries": [{"field": 1, "value": [1]}, 42]});
    assert_eq!(
        QueryNode::parse(&wire),
        Err(MalformedPredicateError::NotAnObject("42".to_string()))
    );
}

#[test]
fn test_parse_rejects_unknown_operator() {
    let wire = json!({"operator": "XOR", "queries": []});
    assert_eq!(
        QueryNode::parse(&wire),
        Err(MalformedPredicateError::InvalidOperator("XOR".to_string()))
    );
}

#[test]
fn test_parse_rejects_non_list_queries() {
    let wire = json!({"operator": "AND", "queries": {"field": 1}});
    assert!(matches!(
        QueryNode::parse(&wire),
        Err(MalformedPredicateError::InvalidChildren(_))
    ));
}

#[test]
fn test_parse_rejects_not_with_two_children() {
    let wire = json!({
        "operator": "NOT",
        "queries": [p1().to_wire(), p2().to_wire()]
    });
    assert_eq!(
        QueryNode::parse(&wire),
        Err(MalformedPredicateError::NotArity(2))
    );
}

#[test]
fn test_parse_ignores_extra_leaf_keys() {
    let wire = json!({"field": 4, "instance": ["1"], "isLabel": true, "value": ["x"]});
    assert_eq!(
        QueryNode::parse(&wire).unwrap(),
        QueryNode::from(Phenotype::discrete(4, ["x"]))
    );
}

#[test]
fn test_empty_composite() {
    let q = Query::all_of(Vec::<QueryNode>::new());
    let wire = q.to_wire();

    assert_eq!(wire, json!({"operator": "AND", "queries": []}));

    let parsed = Query::from_wire(&wire).unwrap();
    assert_eq!(parsed.operator(), Operator::And);
    assert!(parsed.is_empty());
}

#[test]
fn test_serde_uses_wire_format() {
    let node = QueryNode::from(p1() | p3());
    let text = serde_json::to_string(&node).unwrap();
    let back: QueryNode = serde_json::from_str(&text).unwrap();

    assert_eq!(back, node);
    assert_eq!(serde_json::to_value(&node).unwrap(), node.to_wire());

    let err = serde_json::from_str::<QueryNode>(r#"{"operator": "AND"}"#).unwrap_err();
    assert!(err.to_string().contains("missing key `queries`"));
}
