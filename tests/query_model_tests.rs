use mbql_tree::{
    Catalog, ClauseKind, Document, Engine, Error, Key, Meta, ModelError, Node, NodeClass, Query, SortDirection,
    parse_document, parse_document_str,
};
use serde_json::json;

fn catalog() -> Catalog {
    Catalog::new()
        .with_field(1, "Hello")
        .with_field(2, "World")
        .with_table(1, "Orders")
        .with_metric(3, "Revenue")
        .with_segment(1, "Big")
}

fn query(json: serde_json::Value) -> Query {
    parse_document(json, Meta::new(catalog())).unwrap().query().unwrap()
}

/// Display name of `clause` parsed under the aggregation list of an empty query.
fn display_name(clause: serde_json::Value) -> Result<String, ModelError> {
    let aggregations = query(json!({})).aggregations();
    let node = aggregations.parse(clause, None, None).into_node().unwrap();
    node.display_name()
}

fn filter_lengths(stage: &Query) -> Vec<usize> {
    stage.queries().iter().map(|q| q.filters().len()).collect()
}

#[test]
fn test_filters_canonical_lengths() {
    assert_eq!(query(json!({})).filters().len(), 0);
    assert_eq!(query(json!({"filter": ["segment", 1]})).filters().len(), 1);
    assert_eq!(
        query(json!({"filter": ["and", ["segment", 1], ["segment", 2]]})).filters().len(),
        2
    );
}

#[test]
fn test_add_filter_to_absent_filter() {
    let filters = query(json!({})).filters();
    let updated = filters.add(json!(["segment", 3])).unwrap().parent().unwrap();
    assert_eq!(updated.to_json(), json!({"filter": ["segment", 3]}));
}

#[test]
fn test_add_filter_to_single_filter() {
    let filters = query(json!({"filter": ["segment", 1]})).filters();
    let updated = filters.add(json!(["segment", 3])).unwrap().parent().unwrap();
    assert_eq!(
        updated.to_json(),
        json!({"filter": ["and", ["segment", 1], ["segment", 3]]})
    );
}

#[test]
fn test_add_filter_to_compound_filter() {
    let filters = query(json!({"filter": ["and", ["segment", 1], ["segment", 2]]})).filters();
    let updated = filters.add(json!(["segment", 3])).unwrap().parent().unwrap();
    assert_eq!(
        updated.to_json(),
        json!({"filter": ["and", ["segment", 1], ["segment", 2], ["segment", 3]]})
    );
}

#[test]
fn test_remove_filter_collapses_and() {
    let q = query(json!({"source-table": 1, "filter": ["and", ["segment", 1], ["segment", 2]]}));
    let second = q.filters().node(1usize).unwrap();
    let updated = second.remove().unwrap().parent().unwrap();
    assert_eq!(updated.to_json(), json!({"source-table": 1, "filter": ["segment", 1]}));
}

#[test]
fn test_remove_last_filter_drops_field() {
    let q = query(json!({"source-table": 1, "filter": ["segment", 1]}));
    let only = q.filters().node(0usize).unwrap();
    let updated = only.remove().unwrap().query().unwrap();
    assert_eq!(updated.to_json(), json!({"source-table": 1}));
    assert_eq!(q.to_json(), json!({"source-table": 1, "filter": ["segment", 1]}));
}

#[test]
fn test_replace_one_filter() {
    let q = query(json!({"filter": ["and", ["segment", 1], ["segment", 2]]}));
    let first = q.filters().node(0usize).unwrap();
    assert_eq!(first.class(), NodeClass::Clause(ClauseKind::Segment));

    let updated = first.replace(json!(["segment", 5])).unwrap().root();
    assert_eq!(
        updated.to_json(),
        json!({"filter": ["and", ["segment", 5], ["segment", 2]]})
    );
}

#[test]
fn test_unchanged_filters_leave_query_alone() {
    let q = query(json!({"filter": ["and", ["segment", 1], ["segment", 2]]}));
    assert!(q.filters().parent().unwrap().ptr_eq(&q));
    assert!(query(json!({})).filters().parent().unwrap().is_empty());
}

#[test]
fn test_nullable_aggregation_round_trip() {
    let q = query(json!({}));
    let aggregations = q.aggregations();
    assert_eq!(aggregations.len(), 0);

    let with_count = aggregations.add(json!(["count"])).unwrap().query().unwrap();
    assert_eq!(with_count.to_json(), json!({"aggregation": [["count"]]}));

    let emptied = with_count
        .aggregations()
        .node(0usize)
        .unwrap()
        .remove()
        .unwrap()
        .query()
        .unwrap();
    assert_eq!(emptied.to_json(), json!({}));
}

#[test]
fn test_unedited_empty_collection_keeps_field() {
    let q = query(json!({"source-table": 1, "aggregation": []}));
    let owner = q.aggregations().parent().unwrap();
    assert!(owner.ptr_eq(&q));
    assert_eq!(owner.root().to_json(), json!({"source-table": 1, "aggregation": []}));

    let q = query(json!({"source-table": 1, "expressions": {}}));
    assert!(q.expressions().parent().unwrap().ptr_eq(&q));

    let q = query(json!({"source-table": 1, "aggregation": [["count"]]}));
    let emptied = q.aggregations().node(0usize).unwrap().remove().unwrap().parent().unwrap();
    assert_eq!(emptied.to_json(), json!({"source-table": 1}));
}

#[test]
fn test_nullable_collection_keeps_several_elements() {
    let q = query(json!({"breakout": [["field-id", 1]]}));
    let updated = q.breakouts().add(json!(["field-id", 2])).unwrap().query().unwrap();
    assert_eq!(
        updated.to_json(),
        json!({"breakout": [["field-id", 1], ["field-id", 2]]})
    );
}

#[test]
fn test_other_nullable_collections() {
    let q = query(json!({}));
    let sorted = q.sorts().add(json!(["desc", ["field-id", 1]])).unwrap().query().unwrap();
    assert_eq!(sorted.to_json(), json!({"order-by": [["desc", ["field-id", 1]]]}));

    let fields = sorted.fields().add(json!(["field-id", 2])).unwrap().query().unwrap();
    assert_eq!(
        fields.to_json(),
        json!({"order-by": [["desc", ["field-id", 1]]], "fields": [["field-id", 2]]})
    );
}

#[test]
fn test_expressions_view() {
    let q = query(json!({"expressions": {"foo": ["+", 1, 2], "bar": ["*", ["field-id", 1], 2]}}));
    let expressions = q.expressions();
    assert_eq!(expressions.len(), 2);

    let entry = expressions.node(1usize).unwrap().as_expression_entry().unwrap();
    assert_eq!(entry.name().unwrap(), "bar");
    assert_eq!(entry.display_name().unwrap(), "bar");
    let expression = entry.expression().unwrap().into_node().unwrap();
    assert_eq!(expression.display_name().unwrap(), "Hello * 2");
}

#[test]
fn test_expressions_add_and_remove() {
    let q = query(json!({"expressions": {"foo": ["+", 1, 2]}}));

    let added = q.expressions().add(json!(["baz", ["-", 4, 1]])).unwrap().query().unwrap();
    assert_eq!(
        added.to_json(),
        json!({"expressions": {"foo": ["+", 1, 2], "baz": ["-", 4, 1]}})
    );

    let removed = q.expressions().node(0usize).unwrap().remove().unwrap().query().unwrap();
    assert_eq!(removed.to_json(), json!({}));
}

#[test]
fn test_expressions_duplicate_name_last_write_wins() {
    let q = query(json!({"expressions": {"foo": ["+", 1, 2], "bar": 1}}));
    let updated = q.expressions().add(json!(["foo", 5])).unwrap().query().unwrap();
    assert_eq!(
        serde_json::to_string(&updated.to_json()).unwrap(),
        r#"{"expressions":{"foo":5,"bar":1}}"#
    );
}

#[test]
fn test_clause_dispatch_sum() {
    let q = query(json!({}));
    let sum = q
        .aggregations()
        .parse(json!(["sum", ["field-id", 1]]), None, None)
        .into_node()
        .unwrap();
    assert_eq!(sum.class(), NodeClass::Clause(ClauseKind::Sum));
    assert_eq!(sum.display_name().unwrap(), "Sum of Hello");
}

#[test]
fn test_replace_aggregation_with_other_kind() {
    let q = query(json!({"aggregation": [["sum", ["field-id", 1]]]}));
    let sum = q.aggregations().node(0usize).unwrap();

    let list = sum.replace(json!(["count"])).unwrap();
    let count = list.node(0usize).unwrap();
    assert_eq!(count.class(), NodeClass::Clause(ClauseKind::Count));
    assert_eq!(count.display_name().unwrap(), "Count");
    assert_eq!(list.root().to_json(), json!({"aggregation": [["count"]]}));
}

#[test]
fn test_breakout_display_names() {
    let q = query(json!({
        "breakout": [
            ["datetime-field", ["fk->", ["field-id", 1], ["field-id", 2]], "month"],
            ["datetime-field", ["field-id", 1], "day-of-week"],
            ["binning-strategy", ["field-id", 2], "num-bins", 10]
        ]
    }));
    let names: Vec<String> = q
        .breakouts()
        .children()
        .map(|child| child.into_node().unwrap().display_name().unwrap())
        .collect();
    assert_eq!(names, vec!["Hello → World: Month", "Hello: Day of week", "World: num-bins"]);
}

#[test]
fn test_sort_by_aggregation_reference() {
    let q = query(json!({
        "aggregation": [["sum", ["field-id", 1]]],
        "order-by": [["asc", ["aggregation", 0]]]
    }));
    let sort = q.sorts().node(0usize).unwrap();
    assert_eq!(sort.display_name().unwrap(), "Sum of Hello: Ascending");

    let reference = sort.node(1usize).unwrap().as_clause().unwrap();
    assert_eq!(reference.aggregation_index().unwrap(), 0);
    assert_eq!(reference.aggregation().unwrap().to_json(), json!(["sum", ["field-id", 1]]));
}

#[test]
fn test_keyless_aggregation_reference_resolves_through_query() {
    let q = query(json!({"aggregation": [["count"], ["sum", ["field-id", 2]]]}));
    let reference = q.parse(json!(["aggregation", 1]), None, None).into_node().unwrap();
    assert_eq!(reference.display_name().unwrap(), "Sum of World");
}

#[test]
fn test_aggregation_display_names() {
    assert_eq!(display_name(json!(["count"])).unwrap(), "Count");
    assert_eq!(display_name(json!(["count", ["field-id", 2]])).unwrap(), "Count");
    assert_eq!(display_name(json!(["avg", ["field-id", 1]])).unwrap(), "Average of Hello");
    assert_eq!(display_name(json!(["cum-sum", ["field-id", 1]])).unwrap(), "Cumulative sum of Hello");
    assert_eq!(display_name(json!(["distinct", ["field-id", 2]])).unwrap(), "Distinct values of World");
    assert_eq!(display_name(json!(["named", ["count"], "Foo"])).unwrap(), "Foo");
    assert_eq!(display_name(json!(["metric", 3])).unwrap(), "Revenue");
}

#[test]
fn test_field_reference_display_names() {
    assert_eq!(display_name(json!(["field-id", 1])).unwrap(), "Hello");
    assert_eq!(display_name(json!(["field-literal", "total", "type/Float"])).unwrap(), "total");
    assert_eq!(display_name(json!(["expression", "margin"])).unwrap(), "margin");
    assert_eq!(
        display_name(json!(["joined-field", "Products", ["field-id", 2]])).unwrap(),
        "Products → World"
    );
}

#[test]
fn test_filter_display_names() {
    assert_eq!(display_name(json!(["segment", 1])).unwrap(), "Big");
    assert_eq!(display_name(json!(["=", ["field-id", 1], 5])).unwrap(), "Hello = 5");
    assert_eq!(
        display_name(json!(["contains", ["field-id", 2], "abc"])).unwrap(),
        "World contains abc"
    );
    assert_eq!(
        display_name(json!(["between", ["field-id", 1], 1, 10])).unwrap(),
        "Hello between 1 and 10"
    );
    assert_eq!(
        display_name(json!(["and", ["segment", 1], ["is-null", ["field-id", 2]]])).unwrap(),
        "Big and World is empty"
    );
    assert_eq!(
        display_name(json!(["not", ["not-null", ["field-id", 1]]])).unwrap(),
        "not Hello is not empty"
    );
    assert_eq!(
        display_name(json!(["time-interval", ["field-id", 1], -30, "day"])).unwrap(),
        "Hello in the previous 30 days"
    );
    assert_eq!(
        display_name(json!(["time-interval", ["field-id", 1], "current", "month"])).unwrap(),
        "Hello is this month"
    );
}

#[test]
fn test_clause_accessors() {
    let q = query(json!({
        "breakout": [["datetime-field", ["field-id", 1], "month"]],
        "order-by": [["desc", ["field-id", 2]]],
        "filter": ["segment", 1]
    }));

    let datetime = q.breakouts().node(0usize).unwrap().as_clause().unwrap();
    assert_eq!(datetime.kind(), ClauseKind::DatetimeField);
    assert_eq!(datetime.unit().unwrap(), "month");
    let field = datetime.dimension().unwrap().as_clause().unwrap();
    assert_eq!(field.field_id().unwrap(), 1);
    assert_eq!(field.field().unwrap().display_name(), "Hello");

    let sort = q.sorts().node(0usize).unwrap().as_clause().unwrap();
    assert_eq!(sort.direction(), Some(SortDirection::Descending));
    assert_eq!(sort.operands().len(), 1);

    let segment = q.filters().node(0usize).unwrap().as_clause().unwrap();
    assert_eq!(segment.segment_id().unwrap(), 1);
    assert_eq!(segment.tag(), "segment");
}

#[test]
fn test_display_name_errors() {
    let bare = parse_document(json!({"aggregation": [["sum", ["field-id", 1]]]}), Meta::none())
        .unwrap()
        .query()
        .unwrap();
    let sum = bare.aggregations().node(0usize).unwrap();
    assert_eq!(sum.display_name().unwrap_err(), ModelError::MissingMetadata);

    assert_eq!(
        display_name(json!(["field-id", 99])).unwrap_err(),
        ModelError::UnknownEntity { kind: "field", id: 99 }
    );
    assert_eq!(
        display_name(json!(["sum"])).unwrap_err(),
        ModelError::ShapeMismatch {
            expected: "clause",
            key: Key::Index(1),
            found: "nothing"
        }
    );
    assert_eq!(
        display_name(json!(["percentile", ["field-id", 1], 0.5])).unwrap_err(),
        ModelError::NoDisplayName("sequence".to_string())
    );
}

#[test]
fn test_pipeline_chain() {
    let q = query(json!({
        "source-query": {
            "source-query": {
                "source-table": 1,
                "filter": ["and", ["segment", 1], ["segment", 2]]
            },
            "filter": ["segment", 3]
        }
    }));

    assert_eq!(q.queries().len(), 3);
    assert_eq!(filter_lengths(&q), vec![2, 1, 0]);
    assert_eq!(q.root_query().source_table_id(), Some(1));
    assert_eq!(q.table().unwrap().display_name(), "Orders");
    assert!(q.root_query().source_query().is_none());
}

#[test]
fn test_edit_inner_stage() {
    let q = query(json!({"source-query": {"source-table": 1}, "limit": 10}));
    let inner = q.root_query();
    let updated = inner.filters().add(json!(["segment", 4])).unwrap().root();
    assert_eq!(
        updated.to_json(),
        json!({"source-query": {"source-table": 1, "filter": ["segment", 4]}, "limit": 10})
    );
}

#[test]
fn test_joins() {
    let q = query(json!({
        "source-table": 1,
        "joins": [{"alias": "P", "source-query": {"source-table": 2, "filter": ["segment", 1]}}]
    }));
    let join = q.joins().node(0usize).unwrap();
    assert_eq!(join.class(), NodeClass::Join);

    let nested = join.node("source-query").unwrap().as_query().unwrap();
    assert_eq!(nested.filters().len(), 1);
    assert_eq!(nested.source_table_id(), Some(2));

    let emptied = join.remove().unwrap().query().unwrap();
    assert_eq!(emptied.to_json(), json!({"source-table": 1}));
}

#[test]
fn test_question_document() {
    let raw = json!({
        "name": "My Question",
        "display": "table",
        "dataset_query": {
            "type": "query",
            "database": 1,
            "query": {"source-table": 1, "aggregation": [["count"]]}
        }
    });
    let document = parse_document(raw.clone(), Meta::new(catalog())).unwrap();
    let Document::Question(question) = &document else {
        panic!("expected a question, got {:?}", document);
    };
    assert_eq!(question.display_name().unwrap(), "My Question");
    assert_eq!(document.node().display_name().unwrap(), "My Question");
    assert_eq!(
        question.dataset_query().unwrap().class(),
        NodeClass::StructuredDatasetQuery
    );

    let aggregations = document.query().unwrap().aggregations();
    assert_eq!(aggregations.len(), 1);
    let count = aggregations.node(0usize).unwrap();
    assert_eq!(count.question().unwrap().display_name().unwrap(), "My Question");

    let updated = aggregations.add(json!(["sum", ["field-id", 1]])).unwrap().root();
    assert_eq!(
        updated.to_json()["dataset_query"]["query"]["aggregation"],
        json!([["count"], ["sum", ["field-id", 1]]])
    );
    assert_eq!(updated.to_json()["name"], json!("My Question"));
    assert_eq!(document.node().to_json(), raw);
}

#[test]
fn test_native_documents() {
    let raw = json!({"type": "native", "native": {"query": "select 1"}, "database": 1});
    let document = parse_document(raw.clone(), Meta::none()).unwrap();
    assert!(matches!(document, Document::Native(_)));
    assert!(document.query().is_none());
    assert_eq!(document.node().to_json(), raw);

    let question = parse_document(json!({"name": "Q", "dataset_query": raw}), Meta::none()).unwrap();
    let Document::Question(question) = question else {
        panic!("expected a question");
    };
    assert_eq!(question.dataset_query().unwrap().class(), NodeClass::NativeDatasetQuery);
    assert!(question.structured().is_none());
}

#[test]
fn test_structured_dataset_query() {
    let document = parse_document(
        json!({"type": "query", "database": 1, "query": {"filter": ["segment", 1]}}),
        Meta::new(catalog()),
    )
    .unwrap();
    let Document::Structured(structured) = &document else {
        panic!("expected a structured query");
    };
    assert_eq!(structured.filters().len(), 1);
    assert_eq!(structured.aggregations().len(), 0);
    assert_eq!(structured.expressions().len(), 0);
}

#[test]
fn test_structured_dataset_query_without_stage() {
    let document = parse_document(json!({"type": "query", "database": 1}), Meta::none()).unwrap();
    let Document::Structured(structured) = document else {
        panic!("expected a structured query");
    };
    let updated = structured.aggregations().add(json!(["count"])).unwrap().root();
    assert_eq!(
        serde_json::to_string(&updated.to_json()).unwrap(),
        r#"{"type":"query","database":1,"query":{"aggregation":[["count"]]}}"#
    );
}

#[test]
fn test_non_object_document_is_rejected() {
    let err = parse_document(json!([1, 2]), Meta::none()).unwrap_err();
    assert_eq!(err, ModelError::NotADocument("array"));
}

#[test]
fn test_parse_document_from_text() {
    let text = r#"{"name":"Big orders","dataset_query":{"type":"query","query":{"source-table":1,"limit":18446744073709551615}}}"#;
    let document = parse_document_str(text, Meta::new(catalog())).unwrap();
    assert!(matches!(document, Document::Question(_)));
    assert_eq!(document.query().unwrap().table().unwrap().display_name, "Orders");
    assert_eq!(serde_json::to_string(&document.node().to_json()).unwrap(), text);

    let err = parse_document_str("[1, 2]", Meta::none()).unwrap_err();
    assert!(matches!(err, Error::Model(ModelError::NotADocument("array"))));

    let err = Engine::eager().parse_document_str("{\"filter\": ", Meta::none()).unwrap_err();
    assert!(matches!(err, Error::Json(_)));
}

#[test]
fn test_eager_engine_parses_same_document() {
    let raw = json!({"source-query": {"source-table": 1, "aggregation": [["count"]]}, "filter": ["segment", 1]});
    let lazy = Engine::lazy();
    let eager = Engine::eager();

    let lazy_doc = lazy.parse_document(raw.clone(), Meta::none()).unwrap();
    let eager_doc = eager.parse_document(raw.clone(), Meta::none()).unwrap();
    assert_eq!(lazy_doc.to_value(), eager_doc.to_value());
    assert_eq!(lazy.parsed_count(), 1);
    assert!(eager.parsed_count() > lazy.parsed_count());

    let stages: Vec<Node> = eager_doc.query().unwrap().queries().into_iter().map(Query::into_node).collect();
    assert_eq!(stages.len(), 2);
}
